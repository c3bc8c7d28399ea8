//! Process-local store with the same ordering and expiry semantics as the
//! Redis backend. Used by the test suite and for running without Redis.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;

use crate::store::{
    channel_matches, KeyValueStore, MessageStream, PubSubMessage, ScoreIncrement, StoreError,
};

const CHANNEL_CAPACITY: usize = 1024;
// Expired keys that are never read again are dropped on the next write after this
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

enum Value {
    Text(String),
    Hash(HashMap<String, String>),
    SortedSet(HashMap<String, f64>),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Text(_) => "string",
            Value::Hash(_) => "hash",
            Value::SortedSet(_) => "zset",
        }
    }
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    last_sweep: Mutex<Instant>,
    events: broadcast::Sender<PubSubMessage>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            entries: Mutex::new(HashMap::new()),
            last_sweep: Mutex::new(Instant::now()),
            events,
        }
    }

    /// Lock the keyspace for a write, first dropping every expired key if the
    /// last sweep is older than `SWEEP_INTERVAL`.
    fn lock_for_write(&self) -> parking_lot::MutexGuard<'_, HashMap<String, Entry>> {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        let mut last_sweep = self.last_sweep.lock();
        if now.duration_since(*last_sweep) >= SWEEP_INTERVAL {
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired(now));
            *last_sweep = now;
            if entries.len() < before {
                tracing::debug!("Swept {} expired keys", before - entries.len());
            }
        }
        entries
    }

    fn expiry(ttl_seconds: u64) -> Option<Instant> {
        (ttl_seconds > 0).then(|| Instant::now() + Duration::from_secs(ttl_seconds))
    }

    /// Drop `key` if its TTL has elapsed, then hand back what is left.
    fn live<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
        if entries.get(key).is_some_and(|e| e.is_expired(Instant::now())) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }

    fn with_sorted_set<R>(
        &self,
        key: &str,
        f: impl FnOnce(&HashMap<String, f64>) -> R,
    ) -> Result<Option<R>, StoreError> {
        let mut entries = self.entries.lock();
        match Self::live(&mut entries, key) {
            None => Ok(None),
            Some(Entry { value: Value::SortedSet(set), .. }) => Ok(Some(f(set))),
            Some(other) => Err(StoreError::WrongType(format!("{} is a {}", key, other.value.kind()))),
        }
    }
}

/// Descending by score, ties broken by member in descending byte order.
fn ordered_desc(set: &HashMap<String, f64>) -> Vec<(String, f64)> {
    let mut members: Vec<(String, f64)> = set.iter().map(|(m, s)| (m.clone(), *s)).collect();
    members.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
    members
}

/// Resolve Redis-style inclusive, possibly negative, range bounds.
fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (start + len).max(0) } else { start };
    let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock();
        match Self::live(&mut entries, key) {
            None => Ok(None),
            Some(Entry { value: Value::Text(text), .. }) => Ok(Some(text.clone())),
            Some(other) => Err(StoreError::WrongType(format!("{} is a {}", key, other.value.kind()))),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError> {
        self.lock_for_write().insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at: Self::expiry(ttl_seconds),
            },
        );
        Ok(())
    }

    async fn swap(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<Option<String>, StoreError> {
        let mut entries = self.lock_for_write();
        let previous = match Self::live(&mut entries, key) {
            None => None,
            Some(Entry { value: Value::Text(text), .. }) => Some(text.clone()),
            Some(other) => {
                return Err(StoreError::WrongType(format!("{} is a {}", key, other.value.kind())))
            }
        };
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at: Self::expiry(ttl_seconds),
            },
        );
        Ok(previous)
    }

    async fn hash_increment(
        &self,
        key: &str,
        increments: &[(&str, f64)],
        fields: &[(&str, String)],
        ttl_seconds: u64,
        score: Option<ScoreIncrement<'_>>,
    ) -> Result<(), StoreError> {
        let mut entries = self.lock_for_write();

        // Check every target first so a bad one leaves the keyspace untouched
        let mut updated = Vec::with_capacity(increments.len());
        match Self::live(&mut entries, key) {
            None => {
                for (field, delta) in increments {
                    updated.push((field.to_string(), delta.to_string()));
                }
            }
            Some(Entry { value: Value::Hash(hash), .. }) => {
                for (field, delta) in increments {
                    let current = match hash.get(*field) {
                        Some(raw) => raw.parse::<f64>().map_err(|_| {
                            StoreError::WrongType(format!("{}.{} is not a float", key, field))
                        })?,
                        None => 0.0,
                    };
                    updated.push((field.to_string(), (current + delta).to_string()));
                }
            }
            Some(other) => {
                return Err(StoreError::WrongType(format!("{} is a {}", key, other.value.kind())))
            }
        }
        if let Some(score) = &score {
            if let Some(other) = Self::live(&mut entries, score.key)
                .filter(|entry| !matches!(entry.value, Value::SortedSet(_)))
            {
                return Err(StoreError::WrongType(format!(
                    "{} is a {}",
                    score.key,
                    other.value.kind()
                )));
            }
        }

        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Hash(HashMap::new()),
            expires_at: None,
        });
        if let Value::Hash(hash) = &mut entry.value {
            hash.extend(updated);
            for (field, value) in fields {
                hash.insert(field.to_string(), value.clone());
            }
        }
        if ttl_seconds > 0 {
            entry.expires_at = Self::expiry(ttl_seconds);
        }

        if let Some(score) = score {
            let entry = entries.entry(score.key.to_string()).or_insert_with(|| Entry {
                value: Value::SortedSet(HashMap::new()),
                expires_at: None,
            });
            if let Value::SortedSet(set) = &mut entry.value {
                *set.entry(score.member.to_string()).or_insert(0.0) += score.delta;
            }
        }
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let mut entries = self.entries.lock();
        match Self::live(&mut entries, key) {
            None => Ok(HashMap::new()),
            Some(Entry { value: Value::Hash(hash), .. }) => Ok(hash.clone()),
            Some(other) => Err(StoreError::WrongType(format!("{} is a {}", key, other.value.kind()))),
        }
    }

    async fn sorted_set_add(&self, key: &str, score: f64, member: &str) -> Result<(), StoreError> {
        let mut entries = self.lock_for_write();
        match Self::live(&mut entries, key) {
            Some(Entry { value: Value::SortedSet(set), .. }) => {
                set.insert(member.to_string(), score);
            }
            Some(other) => {
                return Err(StoreError::WrongType(format!("{} is a {}", key, other.value.kind())))
            }
            None => {
                let mut set = HashMap::new();
                set.insert(member.to_string(), score);
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: Value::SortedSet(set),
                        expires_at: None,
                    },
                );
            }
        }
        Ok(())
    }

    async fn sorted_set_range_desc(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        let range = self.with_sorted_set(key, |set| {
            let ordered = ordered_desc(set);
            match resolve_range(ordered.len(), start, stop) {
                Some((from, to)) => ordered[from..=to].to_vec(),
                None => Vec::new(),
            }
        })?;
        Ok(range.unwrap_or_default())
    }

    async fn sorted_set_rank(&self, key: &str, member: &str) -> Result<Option<u64>, StoreError> {
        let rank = self.with_sorted_set(key, |set| {
            ordered_desc(set)
                .iter()
                .position(|(m, _)| m == member)
                .map(|position| position as u64)
        })?;
        Ok(rank.flatten())
    }

    async fn sorted_set_score(&self, key: &str, member: &str) -> Result<Option<f64>, StoreError> {
        let score = self.with_sorted_set(key, |set| set.get(member).copied())?;
        Ok(score.flatten())
    }

    async fn sorted_set_cardinality(&self, key: &str) -> Result<u64, StoreError> {
        let count = self.with_sorted_set(key, |set| set.len() as u64)?;
        Ok(count.unwrap_or(0))
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<(), StoreError> {
        // No receivers is not an error: delivery is at-most-once
        let _ = self.events.send(PubSubMessage {
            channel: channel.to_string(),
            payload: message.to_string(),
        });
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, StoreError> {
        let pattern = channel.to_string();
        let receiver = self.events.subscribe();
        let stream = futures::stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(message) => return Some((message, receiver)),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("In-memory subscriber lagged, {} messages dropped", skipped);
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
        .filter(move |message| futures::future::ready(channel_matches(&pattern, &message.channel)));
        Ok(stream.boxed())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
