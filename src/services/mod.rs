pub mod fitness_service;
pub mod leaderboard_service;
pub mod prize_service;

pub use fitness_service::FitnessService;
pub use leaderboard_service::LeaderboardService;
pub use prize_service::PrizeService;
