use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use secrecy::ExposeSecret;
use tokio::sync::mpsc;

use crate::config::redis::RedisSettings;
use crate::store::{KeyValueStore, MessageStream, PubSubMessage, ScoreIncrement, StoreError};

// Buffered pub/sub messages per subscription before the reader applies backpressure
const SUBSCRIPTION_BUFFER: usize = 1024;

/// Redis-backed store. Commands share one auto-reconnecting connection;
/// every subscription gets its own dedicated pub/sub connection.
#[derive(Clone)]
pub struct RedisStore {
    client: Arc<Client>,
    manager: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(settings: &RedisSettings) -> Result<Self, StoreError> {
        let client = match Client::open(settings.get_redis_url().expose_secret()) {
            Ok(client) => {
                tracing::info!("Redis client created successfully");
                client
            }
            Err(e) => {
                tracing::error!("Failed to create Redis client: {}", e);
                return Err(e.into());
            }
        };
        let manager = ConnectionManager::new(client.clone()).await?;
        tracing::info!("Redis connection manager established");

        Ok(Self {
            client: Arc::new(client),
            manager,
        })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if ttl_seconds > 0 {
            cmd.arg("EX").arg(ttl_seconds);
        }
        cmd.query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    async fn swap(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<Option<String>, StoreError> {
        let mut conn = self.manager.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if ttl_seconds > 0 {
            cmd.arg("EX").arg(ttl_seconds);
        }
        // SET .. GET needs Redis 6.2+
        cmd.arg("GET");
        let previous: Option<String> = cmd.query_async(&mut conn).await?;
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
        let mut conn = self.manager.clone();
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (field, delta) in increments {
            pipe.cmd("HINCRBYFLOAT").arg(key).arg(*field).arg(*delta).ignore();
        }
        if !fields.is_empty() {
            let mut hset = redis::cmd("HSET");
            hset.arg(key);
            for (field, value) in fields {
                hset.arg(*field).arg(value.as_str());
            }
            pipe.add_command(hset).ignore();
        }
        if ttl_seconds > 0 {
            pipe.cmd("EXPIRE").arg(key).arg(ttl_seconds).ignore();
        }
        if let Some(score) = score {
            pipe.cmd("ZINCRBY").arg(score.key).arg(score.delta).arg(score.member).ignore();
        }
        pipe.query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let mut conn = self.manager.clone();
        let values: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(values)
    }

    async fn sorted_set_add(&self, key: &str, score: f64, member: &str) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let _: () = conn.zadd(key, member, score).await?;
        Ok(())
    }

    async fn sorted_set_range_desc(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        let mut conn = self.manager.clone();
        let entries: Vec<(String, f64)> = conn.zrevrange_withscores(key, start, stop).await?;
        Ok(entries)
    }

    async fn sorted_set_rank(&self, key: &str, member: &str) -> Result<Option<u64>, StoreError> {
        let mut conn = self.manager.clone();
        let rank: Option<u64> = redis::cmd("ZREVRANK")
            .arg(key)
            .arg(member)
            .query_async(&mut conn)
            .await?;
        Ok(rank)
    }

    async fn sorted_set_score(&self, key: &str, member: &str) -> Result<Option<f64>, StoreError> {
        let mut conn = self.manager.clone();
        let score: Option<f64> = conn.zscore(key, member).await?;
        Ok(score)
    }

    async fn sorted_set_cardinality(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.manager.clone();
        let count: u64 = conn.zcard(key).await?;
        Ok(count)
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let _: () = conn.publish(channel, message).await?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, StoreError> {
        let conn = self.client.get_async_connection().await?;
        let mut pubsub = conn.into_pubsub();
        if channel.contains('*') {
            pubsub.psubscribe(channel).await?;
        } else {
            pubsub.subscribe(channel).await?;
        }
        tracing::info!("Subscribed to Redis channel: {}", channel);

        let (tx, rx) = mpsc::channel::<PubSubMessage>(SUBSCRIPTION_BUFFER);
        let subscription = channel.to_string();
        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload = match msg.get_payload::<String>() {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!("Failed to read Redis payload on {}: {}", subscription, e);
                        continue;
                    }
                };
                let message = PubSubMessage {
                    channel: msg.get_channel_name().to_string(),
                    payload,
                };
                if tx.send(message).await.is_err() {
                    tracing::debug!("Subscriber for {} dropped, closing Redis subscription", subscription);
                    break;
                }
            }
            tracing::warn!("Redis message stream ended for {}", subscription);
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|message| (message, rx))
        });
        Ok(stream.boxed())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
