use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::error::AppError;
use crate::models::fitness::{
    parse_sample_date, AggregatedStats, FitnessSample, FitnessSyncRequest, FIELD_ACTIVE_MINUTES,
    FIELD_CALORIES, FIELD_DISTANCE, FIELD_LAST_SYNCED_AT, FIELD_SOURCE, FIELD_STEPS,
};
use crate::services::leaderboard_service::leaderboard_key;
use crate::store::{KeyValueStore, ScoreIncrement};

// Raw samples and aggregates live for 30 days
pub const FITNESS_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;

pub fn sample_key(user_id: &str, competition_id: &str, date: NaiveDate) -> String {
    format!("fitness:{}:{}:{}", user_id, competition_id, date.format("%Y-%m-%d"))
}

pub fn stats_key(user_id: &str, competition_id: &str) -> String {
    format!("fitness_stats:{}:{}", user_id, competition_id)
}

/// Accepts telemetry deltas and folds them into per-user running totals.
#[derive(Clone)]
pub struct FitnessService {
    store: Arc<dyn KeyValueStore>,
}

impl FitnessService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Store the day's raw sample and fold it into the aggregate.
    ///
    /// Re-syncing a day replaces that day's contribution instead of adding to
    /// it: the previous sample is swapped out atomically and only the
    /// difference is applied. The competition score moves by the same steps
    /// difference in the same transaction, so the ranking always equals the
    /// aggregate's steps no matter how concurrent syncs interleave.
    pub async fn sync(&self, request: &FitnessSyncRequest) -> Result<AggregatedStats, AppError> {
        let date = validate_sync_request(request)?;
        let synced_at = Utc::now();
        let sample = FitnessSample::from_request(request, date, synced_at);

        let key = sample_key(&sample.user_id, &sample.competition_id, date);
        let raw = serde_json::to_string(&sample)?;
        let previous = self
            .store
            .swap(&key, &raw, FITNESS_TTL_SECONDS)
            .await?
            .and_then(|raw| match serde_json::from_str::<FitnessSample>(&raw) {
                Ok(previous) => Some(previous),
                Err(e) => {
                    tracing::warn!("Discarding unreadable sample at {}: {}", key, e);
                    None
                }
            });

        if previous.is_some() {
            tracing::info!(
                "Re-sync of {} for user {} in competition {}, applying difference only",
                date, sample.user_id, sample.competition_id
            );
        }

        let increments = fold_deltas(&sample, previous.as_ref());
        let ranking = leaderboard_key(&sample.competition_id);
        let score = ScoreIncrement {
            key: &ranking,
            member: &sample.user_id,
            delta: increments[0].1, // steps
        };
        let fields = [
            (FIELD_SOURCE, sample.source.clone()),
            (FIELD_LAST_SYNCED_AT, synced_at.to_rfc3339()),
        ];
        self.store
            .hash_increment(
                &stats_key(&sample.user_id, &sample.competition_id),
                &increments,
                &fields,
                FITNESS_TTL_SECONDS,
                Some(score),
            )
            .await?;

        self.get_user_stats(&sample.user_id, &sample.competition_id).await
    }

    /// Running totals, zeroed when the user has not synced yet.
    pub async fn get_user_stats(
        &self,
        user_id: &str,
        competition_id: &str,
    ) -> Result<AggregatedStats, AppError> {
        let hash = self.store.hash_get_all(&stats_key(user_id, competition_id)).await?;
        if hash.is_empty() {
            return Ok(AggregatedStats::zeroed(user_id, competition_id));
        }
        Ok(AggregatedStats::from_hash(user_id, competition_id, &hash))
    }
}

/// Amount each aggregate field moves when `sample` replaces `previous`.
fn fold_deltas(sample: &FitnessSample, previous: Option<&FitnessSample>) -> [(&'static str, f64); 4] {
    let (steps, distance, calories, active_minutes) = match previous {
        Some(p) => (p.steps, p.distance, p.calories, p.active_minutes),
        None => (0, 0.0, 0.0, 0),
    };
    [
        (FIELD_STEPS, (sample.steps - steps) as f64),
        (FIELD_DISTANCE, sample.distance - distance),
        (FIELD_CALORIES, sample.calories - calories),
        (FIELD_ACTIVE_MINUTES, (sample.active_minutes - active_minutes) as f64),
    ]
}

fn validate_sync_request(request: &FitnessSyncRequest) -> Result<NaiveDate, AppError> {
    if request.user_id.trim().is_empty() {
        return Err(AppError::validation("User ID is required"));
    }
    if request.competition_id.trim().is_empty() {
        return Err(AppError::validation("Competition ID is required"));
    }
    if request.steps < 0 || request.active_minutes < 0 {
        return Err(AppError::validation("Steps and active minutes must not be negative"));
    }
    for (name, value) in [("distance", request.distance), ("calories", request.calories)] {
        if !value.is_finite() || value < 0.0 {
            return Err(AppError::validation(format!(
                "{} must be a non-negative number",
                name
            )));
        }
    }
    parse_sample_date(&request.date)
        .ok_or_else(|| AppError::validation(format!("Invalid date: {}", request.date)))
}
