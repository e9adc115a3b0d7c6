//! Redis Streams change log.
//!
//! Every record becomes one stream entry with two fields, `method` and
//! `payload`. Appends go through a pooled connection; reads use a dedicated
//! multiplexed connection because `XREAD BLOCK` parks the connection until
//! data arrives.

use std::time::Duration;

use ::redis::aio::MultiplexedConnection;
use ::redis::streams::{StreamId, StreamMaxlen, StreamRangeReply, StreamReadOptions, StreamReadReply};
use ::redis::{AsyncCommands, Client};
use async_trait::async_trait;
use deadpool_redis::Pool;
use serde::{Deserialize, Serialize};
use streamcache_core::RawRecord;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cursor::Cursor;
use crate::error::LogError;
use crate::traits::{ChangeLog, LogEntry};

const METHOD_FIELD: &str = "method";
const PAYLOAD_FIELD: &str = "payload";

/// Redis stream connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisStreamConfig {
    /// Redis connection URL.
    pub url: String,
    /// Stream key shared by every replica.
    pub stream: String,
    /// Connection pool size for appends.
    pub pool_size: usize,
    /// Pool wait/create/recycle timeout in milliseconds.
    pub timeout_ms: u64,
    /// How long one `XREAD BLOCK` waits before it is reissued.
    pub block_ms: u64,
    /// Approximate upper bound on stream length (`MAXLEN ~`). Unbounded if unset.
    pub max_len: Option<usize>,
}

impl Default for RedisStreamConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            stream: "orders".to_string(),
            pool_size: 10,
            timeout_ms: 5000,
            block_ms: 5000,
            max_len: None,
        }
    }
}

/// Change log backed by a Redis stream.
pub struct RedisStreamLog {
    pool: Pool,
    client: Client,
    reader: Mutex<Option<MultiplexedConnection>>,
    stream: String,
    block_ms: u64,
    max_len: Option<usize>,
}

impl RedisStreamLog {
    /// Build the connection pool and check that Redis answers.
    pub async fn connect(config: &RedisStreamConfig) -> Result<Self, LogError> {
        info!(url = %config.url, stream = %config.stream, "Connecting to Redis stream");

        let mut pool_config = deadpool_redis::Config::from_url(&config.url);
        if let Some(ref mut pool) = pool_config.pool {
            pool.max_size = config.pool_size;
            pool.timeouts.wait = Some(Duration::from_millis(config.timeout_ms));
            pool.timeouts.create = Some(Duration::from_millis(config.timeout_ms));
            pool.timeouts.recycle = Some(Duration::from_millis(config.timeout_ms));
        }

        let pool = pool_config
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .map_err(|e| LogError::connection(e.to_string()))?;

        // Fail fast on a bad URL or unreachable server
        pool.get()
            .await
            .map_err(|e| LogError::connection(e.to_string()))?;

        let client =
            Client::open(config.url.as_str()).map_err(|e| LogError::connection(e.to_string()))?;

        info!("Connected to Redis stream");

        Ok(Self {
            pool,
            client,
            reader: Mutex::new(None),
            stream: config.stream.clone(),
            block_ms: config.block_ms,
            max_len: config.max_len,
        })
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    async fn reader_connection(&self) -> Result<MultiplexedConnection, LogError> {
        let mut guard = self.reader.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| LogError::connection(e.to_string()))?;
        debug!(stream = %self.stream, "Opened stream reader connection");
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn drop_reader_connection(&self) {
        self.reader.lock().await.take();
    }
}

/// Convert one stream entry into a log entry.
///
/// Missing fields come back empty so the consumer sees an undecodable record
/// instead of a stalled stream.
fn to_log_entry(entry: &StreamId) -> Result<LogEntry, LogError> {
    let position: Cursor = entry
        .id
        .parse()
        .map_err(|e: crate::cursor::ParseCursorError| LogError::protocol(e.to_string()))?;

    let method = entry.get::<String>(METHOD_FIELD).unwrap_or_default();
    let payload = entry.get::<Vec<u8>>(PAYLOAD_FIELD).unwrap_or_default();
    if method.is_empty() || payload.is_empty() {
        warn!(id = %entry.id, "Stream entry is missing method or payload");
    }

    Ok(LogEntry {
        position,
        record: RawRecord { method, payload },
    })
}

#[async_trait]
impl ChangeLog for RedisStreamLog {
    async fn append(&self, record: RawRecord) -> Result<Cursor, LogError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| LogError::unavailable(e.to_string()))?;

        let items: [(&str, &[u8]); 2] = [
            (METHOD_FIELD, record.method.as_bytes()),
            (PAYLOAD_FIELD, record.payload.as_slice()),
        ];

        let id: String = match self.max_len {
            Some(max_len) => {
                conn.xadd_maxlen(&self.stream, StreamMaxlen::Approx(max_len), "*", &items)
                    .await
            }
            None => conn.xadd(&self.stream, "*", &items).await,
        }
        .map_err(|e| LogError::unavailable(e.to_string()))?;

        debug!(stream = %self.stream, id = %id, method = %record.method, "Appended record");

        id.parse()
            .map_err(|e: crate::cursor::ParseCursorError| LogError::protocol(e.to_string()))
    }

    async fn read_next(&self, after: &Cursor) -> Result<LogEntry, LogError> {
        let options = StreamReadOptions::default().count(1).block(self.block_ms as usize);
        let after = after.to_string();

        loop {
            let mut conn = self.reader_connection().await?;
            let reply: Option<StreamReadReply> = match conn
                .xread_options(&[&self.stream], &[&after], &options)
                .await
            {
                Ok(reply) => reply,
                Err(e) => {
                    self.drop_reader_connection().await;
                    return Err(LogError::unavailable(e.to_string()));
                }
            };

            // A nil reply means the block timed out with nothing new
            let entry = reply
                .into_iter()
                .flat_map(|reply| reply.keys)
                .flat_map(|key| key.ids)
                .next();

            if let Some(entry) = entry {
                return to_log_entry(&entry);
            }
        }
    }

    async fn tail(&self) -> Result<Cursor, LogError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| LogError::unavailable(e.to_string()))?;

        let reply: StreamRangeReply = conn
            .xrevrange_count(&self.stream, "+", "-", 1)
            .await
            .map_err(|e| LogError::unavailable(e.to_string()))?;

        match reply.ids.first() {
            Some(entry) => entry
                .id
                .parse()
                .map_err(|e: crate::cursor::ParseCursorError| LogError::protocol(e.to_string())),
            None => Ok(Cursor::ZERO),
        }
    }
}
