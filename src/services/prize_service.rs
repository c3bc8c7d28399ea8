use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::leaderboard::LeaderboardEntry;
use crate::models::prize::{Prize, PrizeDistribution, PrizeStatus};
use crate::services::leaderboard_service::LeaderboardService;
use crate::store::{get_json, set_json, KeyValueStore};

const PRIZES_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;
const PRIZE_RANKS: usize = 3;

fn prizes_key(competition_id: &str) -> String {
    format!("prizes:{}", competition_id)
}

/// Splits a competition's prize pool across its top finishers.
#[derive(Clone)]
pub struct PrizeService {
    store: Arc<dyn KeyValueStore>,
    leaderboard: LeaderboardService,
    distribution: PrizeDistribution,
}

impl PrizeService {
    pub fn new(store: Arc<dyn KeyValueStore>, leaderboard: LeaderboardService) -> Self {
        Self {
            store,
            leaderboard,
            distribution: PrizeDistribution::default(),
        }
    }

    pub async fn calculate_prizes(
        &self,
        competition_id: &str,
        prize_pool: f64,
    ) -> Result<Vec<Prize>, AppError> {
        if !prize_pool.is_finite() || prize_pool < 0.0 {
            return Err(AppError::validation("Prize pool must be a non-negative amount"));
        }

        let leaderboard = self.leaderboard.get_leaderboard(competition_id, PRIZE_RANKS).await?;
        if leaderboard.entries.is_empty() {
            return Err(AppError::NoParticipants(competition_id.to_string()));
        }

        let prizes = split_prize_pool(
            competition_id,
            &leaderboard.entries,
            prize_pool,
            &self.distribution,
            Utc::now(),
        );
        set_json(self.store.as_ref(), &prizes_key(competition_id), &prizes, PRIZES_TTL_SECONDS).await?;

        tracing::info!(
            "Calculated {} prizes from pool {} for competition {}",
            prizes.len(), prize_pool, competition_id
        );
        Ok(prizes)
    }

    /// Most recently calculated prizes, empty once they have expired.
    pub async fn get_prizes(&self, competition_id: &str) -> Result<Vec<Prize>, AppError> {
        let prizes: Option<Vec<Prize>> = get_json(self.store.as_ref(), &prizes_key(competition_id)).await?;
        Ok(prizes.unwrap_or_default())
    }

    /// Hand the pending prizes over for settlement. Settlement happens
    /// elsewhere, so statuses stay `pending` here.
    pub async fn distribute_prizes(&self, competition_id: &str) -> Result<Vec<Prize>, AppError> {
        let pending: Vec<Prize> = self
            .get_prizes(competition_id)
            .await?
            .into_iter()
            .filter(|prize| prize.status == PrizeStatus::Pending)
            .collect();
        tracing::info!(
            "Prize distribution initiated for competition {} ({} pending prizes)",
            competition_id,
            pending.len()
        );
        Ok(pending)
    }
}

/// One prize per existing rank among the top three.
pub fn split_prize_pool(
    competition_id: &str,
    entries: &[LeaderboardEntry],
    prize_pool: f64,
    distribution: &PrizeDistribution,
    created_at: DateTime<Utc>,
) -> Vec<Prize> {
    entries
        .iter()
        .zip(distribution.shares())
        .enumerate()
        .map(|(index, (entry, share))| {
            let rank = index as u32 + 1;
            Prize {
                id: format!("prize-{}-{}", competition_id, rank),
                competition_id: competition_id.to_string(),
                user_id: entry.user_id.clone(),
                rank,
                amount: prize_pool * share,
                status: PrizeStatus::Pending,
                distributed_at: None,
                created_at,
            }
        })
        .collect()
}
