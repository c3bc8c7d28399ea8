//! Bridges the store's pub/sub channels into the local broadcaster so every
//! instance sharing one store delivers the same events to its rooms.

use std::sync::Arc;
use std::time::Duration;

use actix::Addr;
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::models::realtime_events::ServerEvent;
use crate::realtime::broadcaster::{LeaderboardBroadcaster, Relay};
use crate::services::leaderboard_service::{leaderboard_channel, LEADERBOARD_CHANNEL_PATTERN};
use crate::store::{KeyValueStore, MessageStream, PubSubMessage, StoreError};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Subscribe to every competition channel and forward events until the
/// process exits. The first subscription is made before returning so that
/// startup fails loudly when the store is unreachable; later losses of the
/// subscription are retried with exponential backoff.
pub async fn start_relay(
    store: Arc<dyn KeyValueStore>,
    broadcaster: Addr<LeaderboardBroadcaster>,
) -> Result<JoinHandle<()>, StoreError> {
    let stream = store.subscribe(LEADERBOARD_CHANNEL_PATTERN).await?;
    tracing::info!("Realtime relay listening on {}", LEADERBOARD_CHANNEL_PATTERN);

    Ok(tokio::spawn(async move {
        forward(stream, &broadcaster).await;

        let mut backoff = INITIAL_BACKOFF;
        loop {
            tracing::warn!("Realtime relay subscription ended, retrying in {:?}", backoff);
            tokio::time::sleep(backoff).await;
            match store.subscribe(LEADERBOARD_CHANNEL_PATTERN).await {
                Ok(stream) => {
                    tracing::info!("Realtime relay resubscribed to {}", LEADERBOARD_CHANNEL_PATTERN);
                    backoff = INITIAL_BACKOFF;
                    forward(stream, &broadcaster).await;
                }
                Err(e) => {
                    tracing::error!("Realtime relay failed to resubscribe: {}", e);
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }))
}

async fn forward(mut stream: MessageStream, broadcaster: &Addr<LeaderboardBroadcaster>) {
    while let Some(message) = stream.next().await {
        if let Some(event) = decode_relay_event(&message) {
            broadcaster.do_send(Relay(event));
        }
    }
}

/// Parse a pub/sub payload into a room event. Anything malformed, not room
/// scoped, or published on another competition's channel is logged and dropped.
pub fn decode_relay_event(message: &PubSubMessage) -> Option<ServerEvent> {
    let event = match serde_json::from_str::<ServerEvent>(&message.payload) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("Dropping malformed message on {}: {}", message.channel, e);
            return None;
        }
    };
    let Some(room) = event.room() else {
        tracing::warn!("Dropping non-room event on {}", message.channel);
        return None;
    };
    if leaderboard_channel(room) != message.channel {
        tracing::warn!("Dropping event for {} published on {}", room, message.channel);
        return None;
    }
    Some(event)
}
