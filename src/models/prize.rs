use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrizeStatus {
    Pending,
    Distributed,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Prize {
    pub id: String,
    pub competition_id: String,
    pub user_id: String,
    pub rank: u32,
    pub amount: f64,
    pub status: PrizeStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub distributed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Share of the pool awarded to ranks 1, 2 and 3.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrizeDistribution {
    pub rank_1_percentage: f64,
    pub rank_2_percentage: f64,
    pub rank_3_percentage: f64,
}

impl Default for PrizeDistribution {
    fn default() -> Self {
        Self {
            rank_1_percentage: 0.6,
            rank_2_percentage: 0.3,
            rank_3_percentage: 0.1,
        }
    }
}

impl PrizeDistribution {
    pub fn shares(&self) -> [f64; 3] {
        [
            self.rank_1_percentage,
            self.rank_2_percentage,
            self.rank_3_percentage,
        ]
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CalculatePrizesRequest {
    pub prize_pool: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PrizeList {
    pub prizes: Vec<Prize>,
}
