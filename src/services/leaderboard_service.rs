use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;

use crate::error::AppError;
use crate::models::fitness::AggregatedStats;
use crate::models::leaderboard::{
    Leaderboard, LeaderboardEntry, ScoreUpdateRequest, UserDetails, UserRank,
};
use crate::models::realtime_events::ServerEvent;
use crate::store::{publish_json, set_json, KeyValueStore, StoreError};

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 100;
pub const MAX_LEADERBOARD_LIMIT: usize = 1000;
const USER_DETAILS_TTL_SECONDS: u64 = 24 * 60 * 60;

/// Every competition channel, for the realtime relay.
pub const LEADERBOARD_CHANNEL_PATTERN: &str = "leaderboard:*";

pub fn leaderboard_key(competition_id: &str) -> String {
    format!("leaderboard:{}", competition_id)
}

pub fn leaderboard_channel(competition_id: &str) -> String {
    format!("leaderboard:{}", competition_id)
}

fn user_details_key(competition_id: &str, user_id: &str) -> String {
    format!("user_details:{}:{}", competition_id, user_id)
}

/// Page size for a requested limit: defaults to 100, clamped to 1..=1000.
pub fn clamp_limit(limit: Option<i64>) -> usize {
    match limit {
        None => DEFAULT_LEADERBOARD_LIMIT,
        Some(limit) => limit.clamp(1, MAX_LEADERBOARD_LIMIT as i64) as usize,
    }
}

/// Owns the per-competition ranking. Reads are computed fresh from the sorted
/// set so they always reflect the latest score write.
#[derive(Clone)]
pub struct LeaderboardService {
    store: Arc<dyn KeyValueStore>,
}

impl LeaderboardService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn get_leaderboard(
        &self,
        competition_id: &str,
        limit: usize,
    ) -> Result<Leaderboard, AppError> {
        require_competition_id(competition_id)?;
        let key = leaderboard_key(competition_id);
        let stop = limit.clamp(1, MAX_LEADERBOARD_LIMIT) as isize - 1;

        let ranked = self.store.sorted_set_range_desc(&key, 0, stop).await?;
        let details = try_join_all(
            ranked
                .iter()
                .map(|(user_id, _)| self.get_user_details(competition_id, user_id)),
        )
        .await?;

        let entries = ranked
            .into_iter()
            .zip(details)
            .enumerate()
            .map(|(index, ((user_id, score), details))| {
                LeaderboardEntry::new(competition_id, user_id, score, index as u32 + 1, details)
            })
            .collect();

        let total_count = self.store.sorted_set_cardinality(&key).await?;

        Ok(Leaderboard {
            competition_id: competition_id.to_string(),
            entries,
            total_count,
            updated_at: Utc::now(),
        })
    }

    /// Replace the user's score with their cumulative steps, refresh the
    /// detail snapshot and announce the change on the competition channel.
    pub async fn update_score(&self, request: &ScoreUpdateRequest) -> Result<(), AppError> {
        require_competition_id(&request.competition_id)?;
        if request.user_id.trim().is_empty() {
            return Err(AppError::validation("User ID is required"));
        }
        if request.steps < 0 {
            return Err(AppError::validation("Steps must not be negative"));
        }

        let score = request.steps;
        self.store
            .sorted_set_add(&leaderboard_key(&request.competition_id), score as f64, &request.user_id)
            .await?;

        self.refresh_and_announce(
            &request.competition_id,
            &request.user_id,
            request.user_name.as_deref(),
            (request.steps, request.distance, request.calories),
            score,
        )
        .await?;
        tracing::info!(
            "Score for user {} in competition {} set to {}",
            request.user_id, request.competition_id, score
        );
        Ok(())
    }

    /// Follow-up to a fitness sync, which has already moved the score together
    /// with the aggregate. The announced score is read from the ranking, not
    /// taken from `stats`.
    pub async fn record_sync(&self, stats: &AggregatedStats) -> Result<(), AppError> {
        let score = self
            .store
            .sorted_set_score(&leaderboard_key(&stats.competition_id), &stats.user_id)
            .await?
            .unwrap_or(stats.steps as f64)
            .floor() as i64;

        self.refresh_and_announce(
            &stats.competition_id,
            &stats.user_id,
            None,
            (stats.steps, stats.distance, stats.calories),
            score,
        )
        .await
    }

    async fn refresh_and_announce(
        &self,
        competition_id: &str,
        user_id: &str,
        user_name: Option<&str>,
        (steps, distance, calories): (i64, f64, f64),
        score: i64,
    ) -> Result<(), AppError> {
        let user_name = match user_name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self
                .get_user_details(competition_id, user_id)
                .await?
                .map(|previous| previous.user_name)
                .unwrap_or_default(),
        };
        let now = Utc::now();
        let details = UserDetails {
            user_id: user_id.to_string(),
            user_name,
            competition_id: competition_id.to_string(),
            score,
            steps,
            distance,
            calories,
            last_synced_at: now,
        };
        set_json(
            self.store.as_ref(),
            &user_details_key(competition_id, user_id),
            &details,
            USER_DETAILS_TTL_SECONDS,
        )
        .await?;

        let event = ServerEvent::ScoreUpdate {
            competition_id: competition_id.to_string(),
            user_id: user_id.to_string(),
            score,
            timestamp: now,
        };
        publish_json(self.store.as_ref(), &leaderboard_channel(competition_id), &event).await?;
        Ok(())
    }

    /// Position of one user, `None` if they never had a score write.
    pub async fn get_user_rank(
        &self,
        competition_id: &str,
        user_id: &str,
    ) -> Result<Option<UserRank>, AppError> {
        require_competition_id(competition_id)?;
        let key = leaderboard_key(competition_id);

        let Some(rank) = self.store.sorted_set_rank(&key, user_id).await? else {
            return Ok(None);
        };
        let score = self.store.sorted_set_score(&key, user_id).await?.unwrap_or(0.0);
        let total_count = self.store.sorted_set_cardinality(&key).await?;

        Ok(Some(UserRank {
            competition_id: competition_id.to_string(),
            user_id: user_id.to_string(),
            rank: rank + 1,
            score: score.floor() as i64,
            total_count,
        }))
    }

    /// Build the current leaderboard and push it to every subscriber of the
    /// competition, on any instance.
    pub async fn publish_leaderboard(
        &self,
        competition_id: &str,
        limit: usize,
    ) -> Result<Leaderboard, AppError> {
        let leaderboard = self.get_leaderboard(competition_id, limit).await?;
        let event = ServerEvent::LeaderboardUpdate {
            competition_id: competition_id.to_string(),
            data: leaderboard.clone(),
            timestamp: Utc::now(),
        };
        publish_json(self.store.as_ref(), &leaderboard_channel(competition_id), &event).await?;
        tracing::info!(
            "Published leaderboard for competition {} ({} entries)",
            competition_id,
            leaderboard.entries.len()
        );
        Ok(leaderboard)
    }

    async fn get_user_details(
        &self,
        competition_id: &str,
        user_id: &str,
    ) -> Result<Option<UserDetails>, StoreError> {
        let key = user_details_key(competition_id, user_id);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<UserDetails>(&raw) {
            Ok(details) => Ok(Some(details)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable user details at {}: {}", key, e);
                Ok(None)
            }
        }
    }
}

fn require_competition_id(competition_id: &str) -> Result<(), AppError> {
    if competition_id.trim().is_empty() {
        return Err(AppError::validation("Competition ID is required"));
    }
    Ok(())
}
