use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Position of an entry in the change log.
///
/// Ordered by `(major, minor)`. The text form `"{major}-{minor}"` matches
/// Redis stream entry ids; the in-memory log uses `"{n}-0"` for its n-th entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cursor {
    pub major: u64,
    pub minor: u64,
}

impl Cursor {
    /// Precedes every entry.
    pub const ZERO: Cursor = Cursor { major: 0, minor: 0 };

    pub const fn new(major: u64, minor: u64) -> Self {
        Self { major, minor }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid log position: {0:?}")]
pub struct ParseCursorError(String);

impl FromStr for Cursor {
    type Err = ParseCursorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s
            .split_once('-')
            .ok_or_else(|| ParseCursorError(s.to_string()))?;
        let major = major.parse().map_err(|_| ParseCursorError(s.to_string()))?;
        let minor = minor.parse().map_err(|_| ParseCursorError(s.to_string()))?;
        Ok(Self { major, minor })
    }
}

/// Where a fresh subscriber starts reading.
///
/// - `Beginning` replays the whole log. Replay is idempotent, so a restarted
///   replica converges to the same state as one that never stopped.
/// - `Latest` sees only records appended after start; older entries reach the
///   local store only through cache-aside fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartFrom {
    #[default]
    Beginning,
    Latest,
}

impl fmt::Display for StartFrom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beginning => write!(f, "beginning"),
            Self::Latest => write!(f, "latest"),
        }
    }
}
