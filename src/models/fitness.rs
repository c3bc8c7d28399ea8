use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SOURCE: &str = "google_fit";

// Hash fields of the aggregate record
pub const FIELD_STEPS: &str = "steps";
pub const FIELD_DISTANCE: &str = "distance";
pub const FIELD_CALORIES: &str = "calories";
pub const FIELD_ACTIVE_MINUTES: &str = "active_minutes";
pub const FIELD_SOURCE: &str = "source";
pub const FIELD_LAST_SYNCED_AT: &str = "last_synced_at";

/// Telemetry delta pushed by a client for one calendar day.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FitnessSyncRequest {
    pub user_id: String,
    pub competition_id: String,
    pub steps: i64,
    pub distance: f64,
    pub calories: f64,
    pub active_minutes: i64,
    #[serde(default)]
    pub source: Option<String>,
    /// RFC 3339 timestamp or `YYYY-MM-DD`
    pub date: String,
}

/// Raw per-day sample as written to the store.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FitnessSample {
    pub id: String,
    pub user_id: String,
    pub competition_id: String,
    pub steps: i64,
    pub distance: f64,
    pub calories: f64,
    pub active_minutes: i64,
    pub source: String,
    pub date: NaiveDate,
    pub synced_at: DateTime<Utc>,
}

impl FitnessSample {
    pub fn from_request(request: &FitnessSyncRequest, date: NaiveDate, synced_at: DateTime<Utc>) -> Self {
        Self {
            id: format!("{}-{}-{}", request.user_id, request.competition_id, date),
            user_id: request.user_id.clone(),
            competition_id: request.competition_id.clone(),
            steps: request.steps,
            distance: request.distance,
            calories: request.calories,
            active_minutes: request.active_minutes,
            source: request
                .source
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            date,
            synced_at,
        }
    }
}

/// Running totals for one user within one competition.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AggregatedStats {
    pub user_id: String,
    pub competition_id: String,
    pub steps: i64,
    pub distance: f64,
    pub calories: f64,
    pub active_minutes: i64,
    pub source: String,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl AggregatedStats {
    pub fn zeroed(user_id: &str, competition_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            competition_id: competition_id.to_string(),
            steps: 0,
            distance: 0.0,
            calories: 0.0,
            active_minutes: 0,
            source: String::new(),
            last_synced_at: None,
        }
    }

    /// Build from the stored hash. Unparseable numeric fields read as zero.
    pub fn from_hash(user_id: &str, competition_id: &str, hash: &HashMap<String, String>) -> Self {
        let number = |field: &str| -> f64 {
            hash.get(field)
                .and_then(|raw| raw.parse::<f64>().ok())
                .unwrap_or(0.0)
        };
        Self {
            user_id: user_id.to_string(),
            competition_id: competition_id.to_string(),
            steps: number(FIELD_STEPS).round() as i64,
            distance: number(FIELD_DISTANCE),
            calories: number(FIELD_CALORIES),
            active_minutes: number(FIELD_ACTIVE_MINUTES).round() as i64,
            source: hash.get(FIELD_SOURCE).cloned().unwrap_or_default(),
            last_synced_at: hash
                .get(FIELD_LAST_SYNCED_AT)
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|ts| ts.with_timezone(&Utc)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserStatsQuery {
    pub competition_id: Option<String>,
}

/// Resolve the calendar day (UTC) a sample belongs to.
pub fn parse_sample_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc).date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
}
