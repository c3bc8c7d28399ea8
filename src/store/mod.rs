//! Backing store abstraction for rankings, aggregates and event fan-out.
//!
//! Everything the engine persists goes through [`KeyValueStore`]. The store is
//! treated as a best-effort cache: values carry TTLs and nothing here is a
//! system of record.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod memory_store;
pub mod redis_store;

pub use memory_store::InMemoryStore;
pub use redis_store::RedisStore;

/// A message received from a pub/sub subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct PubSubMessage {
    pub channel: String,
    pub payload: String,
}

/// Sorted-set member moved by `delta` in the same transaction as a hash
/// update. The sorted set itself never expires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreIncrement<'a> {
    pub key: &'a str,
    pub member: &'a str,
    pub delta: f64,
}

/// Stream of pub/sub messages. Ends when the underlying subscription closes.
pub type MessageStream = BoxStream<'static, PubSubMessage>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation against a key holding the wrong kind of value: {0}")]
    WrongType(String),
}

/// Contract the engine needs from its cache.
///
/// Implementations must not retry; failures surface to the caller unchanged.
/// A `ttl_seconds` of zero means the key does not expire.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError>;

    /// Atomically replace `key` and return the value it held before.
    async fn swap(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<Option<String>, StoreError>;

    /// Atomically add each `increments` delta to its numeric hash field, set
    /// each of `fields`, refresh the TTL of the hash and, when given, move
    /// `score` by its delta, all in one transaction.
    async fn hash_increment(
        &self,
        key: &str,
        increments: &[(&str, f64)],
        fields: &[(&str, String)],
        ttl_seconds: u64,
        score: Option<ScoreIncrement<'_>>,
    ) -> Result<(), StoreError>;

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError>;

    /// Upsert `member`; an existing score is replaced, not incremented.
    async fn sorted_set_add(&self, key: &str, score: f64, member: &str) -> Result<(), StoreError>;

    /// Members between `start` and `stop` (inclusive, negative indexes count
    /// from the end) ordered by descending score. Equal scores are ordered by
    /// member in descending byte order.
    async fn sorted_set_range_desc(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<(String, f64)>, StoreError>;

    /// Zero-based position of `member` in descending order.
    async fn sorted_set_rank(&self, key: &str, member: &str) -> Result<Option<u64>, StoreError>;

    async fn sorted_set_score(&self, key: &str, member: &str) -> Result<Option<f64>, StoreError>;

    async fn sorted_set_cardinality(&self, key: &str) -> Result<u64, StoreError>;

    /// Fire-and-forget publish. Subscribers that are not listening miss it.
    async fn publish(&self, channel: &str, message: &str) -> Result<(), StoreError>;

    /// Subscribe to a channel, or to a pattern when `channel` ends with `*`.
    async fn subscribe(&self, channel: &str) -> Result<MessageStream, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    fn backend_name(&self) -> &'static str;
}

/// Read and decode a JSON value stored under `key`.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encode `value` as JSON and store it under `key`.
pub async fn set_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
    ttl_seconds: u64,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw, ttl_seconds).await
}

/// Encode `value` as JSON and publish it on `channel`.
pub async fn publish_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    channel: &str,
    value: &T,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value)?;
    store.publish(channel, &raw).await
}

/// Glob-style match supporting a single trailing `*`.
pub(crate) fn channel_matches(pattern: &str, channel: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => channel.starts_with(prefix),
        None => pattern == channel,
    }
}
