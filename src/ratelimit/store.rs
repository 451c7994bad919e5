use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use redis::{AsyncCommands, Client as RedisClient};
use serde::{Deserialize, Serialize};

/// Persisted counter for one caller identifier.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RateLimitRecord {
    pub count: u32,
    pub reset_at: i64, // unix millis, end of the current window
}

#[derive(Debug)]
pub struct StoreError(pub String);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rate limit store error: {}", self.0)
    }
}

impl std::error::Error for StoreError {}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError(e.to_string())
    }
}

/// Key-value persistence used by the limiter. Implementations are free to
/// expire records on their own once `reset_at` has passed.
pub trait RateLimitStore {
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<RateLimitRecord>, StoreError>> + Send;

    fn set(
        &self,
        key: &str,
        record: &RateLimitRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Overwrite the count of an existing record, keeping its `reset_at`.
    fn update(&self, key: &str, count: u32) -> impl Future<Output = Result<(), StoreError>> + Send;
}

const RATE_LIMIT_KEY_PREFIX: &str = "rate_limit:";

/// Redis-backed store: one JSON record per identifier, TTL'd to the end of
/// its window so stale counters expire on their own.
#[derive(Clone)]
pub struct RedisStore {
    redis: Arc<RedisClient>,
}

impl RedisStore {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }

    fn ttl_secs(record: &RateLimitRecord) -> u64 {
        let remaining_ms = record.reset_at - chrono::Utc::now().timestamp_millis();
        (remaining_ms.max(1000) as u64).div_ceil(1000)
    }
}

impl RateLimitStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let redis_key = format!("{}{}", RATE_LIMIT_KEY_PREFIX, key);
        let result: Option<String> = conn.get(redis_key).await?;

        match result {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, record: &RateLimitRecord) -> Result<(), StoreError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let redis_key = format!("{}{}", RATE_LIMIT_KEY_PREFIX, key);
        let json = serde_json::to_string(record)?;
        let _: () = conn.set_ex(redis_key, json, Self::ttl_secs(record)).await?;

        Ok(())
    }

    async fn update(&self, key: &str, count: u32) -> Result<(), StoreError> {
        // record may have expired between read and write; nothing to update then
        if let Some(mut record) = self.get(key).await? {
            record.count = count;
            self.set(key, &record).await?;
        }
        Ok(())
    }
}

/// In-memory store used by tests.
#[derive(Default)]
pub struct MemoryStore {
    records: std::sync::Mutex<HashMap<String, RateLimitRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, key: &str) -> Option<RateLimitRecord> {
        self.records.lock().unwrap().get(key).cloned()
    }
}

impl RateLimitStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, record: &RateLimitRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .unwrap()
            .insert(key.to_string(), record.clone());
        Ok(())
    }

    async fn update(&self, key: &str, count: u32) -> Result<(), StoreError> {
        if let Some(record) = self.records.lock().unwrap().get_mut(key) {
            record.count = count;
        }
        Ok(())
    }
}
