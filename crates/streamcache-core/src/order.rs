//! The cached entity.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Globally unique order identifier.
///
/// Assigned once when an order is saved and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for OrderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// An order as held in the local store and carried on the change log.
///
/// Equality and hashing consider only `id`. Compare the other fields
/// explicitly when content matters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "orderID")]
    pub id: OrderId,
    #[serde(rename = "orderName")]
    pub name: String,
    #[serde(rename = "orderCost")]
    pub cost: i64,
    #[serde(rename = "isDelivered")]
    pub delivered: bool,
}

impl Order {
    pub fn new(id: OrderId, name: impl Into<String>, cost: i64, delivered: bool) -> Self {
        Self {
            id,
            name: name.into(),
            cost,
            delivered,
        }
    }

    /// Returns `true` if every field, not just the id, matches `other`.
    pub fn same_content(&self, other: &Order) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.cost == other.cost
            && self.delivered == other.delivered
    }
}

impl PartialEq for Order {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Order {}

impl Hash for Order {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Caller input for creating an order. Has no identifier until saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub name: String,
    pub cost: i64,
    pub delivered: bool,
}

impl NewOrder {
    pub fn new(name: impl Into<String>, cost: i64, delivered: bool) -> Self {
        Self {
            name: name.into(),
            cost,
            delivered,
        }
    }

    /// Attach an identifier, producing the entity that gets published.
    pub fn with_id(self, id: OrderId) -> Order {
        Order {
            id,
            name: self.name,
            cost: self.cost,
            delivered: self.delivered,
        }
    }
}
