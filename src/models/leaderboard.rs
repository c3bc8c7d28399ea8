use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_USER_NAME: &str = "Unknown";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScoreUpdateRequest {
    pub user_id: String,
    pub competition_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    pub steps: i64,
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub calories: f64,
}

/// Per-user snapshot written alongside every score write.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserDetails {
    pub user_id: String,
    pub user_name: String,
    pub competition_id: String,
    pub score: i64,
    pub steps: i64,
    pub distance: f64,
    pub calories: f64,
    pub last_synced_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub user_name: String,
    pub competition_id: String,
    pub score: i64,
    pub rank: u32,
    pub steps: i64,
    pub distance: f64,
    pub calories: f64,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl LeaderboardEntry {
    /// Combine a ranked member with its detail record, if one survived its TTL.
    pub fn new(
        competition_id: &str,
        user_id: String,
        score: f64,
        rank: u32,
        details: Option<UserDetails>,
    ) -> Self {
        let score = score.floor() as i64;
        match details {
            Some(details) => Self {
                user_id,
                user_name: if details.user_name.is_empty() {
                    UNKNOWN_USER_NAME.to_string()
                } else {
                    details.user_name
                },
                competition_id: competition_id.to_string(),
                score,
                rank,
                steps: details.steps,
                distance: details.distance,
                calories: details.calories,
                last_synced_at: Some(details.last_synced_at),
            },
            None => Self {
                user_id,
                user_name: UNKNOWN_USER_NAME.to_string(),
                competition_id: competition_id.to_string(),
                score,
                rank,
                steps: 0,
                distance: 0.0,
                calories: 0.0,
                last_synced_at: None,
            },
        }
    }
}

/// Read view over a competition's sorted set. Never persisted.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Leaderboard {
    pub competition_id: String,
    pub entries: Vec<LeaderboardEntry>,
    pub total_count: u64,
    pub updated_at: DateTime<Utc>,
}

/// One user's position within a competition.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserRank {
    pub competition_id: String,
    pub user_id: String,
    pub rank: u64,
    pub score: i64,
    pub total_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}
