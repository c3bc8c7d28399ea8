use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::leaderboard::Leaderboard;

/// Messages a websocket client may send.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe {
        #[serde(default)]
        competition_id: Option<String>,
    },
    Unsubscribe {
        #[serde(default)]
        competition_id: Option<String>,
    },
    Ping,
}

/// Messages the server sends over the websocket. `ScoreUpdate` and
/// `LeaderboardUpdate` also travel over the store's pub/sub channel.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected {
        message: String,
        timestamp: DateTime<Utc>,
    },
    Subscribed {
        competition_id: String,
        message: String,
    },
    Unsubscribed {
        competition_id: String,
        message: String,
    },
    Error {
        message: String,
    },
    Pong {
        timestamp: DateTime<Utc>,
    },
    LeaderboardUpdate {
        competition_id: String,
        data: Leaderboard,
        timestamp: DateTime<Utc>,
    },
    ScoreUpdate {
        competition_id: String,
        user_id: String,
        score: i64,
        timestamp: DateTime<Utc>,
    },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }

    /// Competition room an event fans out to. `None` for per-connection events.
    pub fn room(&self) -> Option<&str> {
        match self {
            ServerEvent::LeaderboardUpdate { competition_id, .. }
            | ServerEvent::ScoreUpdate { competition_id, .. } => Some(competition_id.as_str()),
            _ => None,
        }
    }
}
