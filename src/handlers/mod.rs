pub mod backend_health_handler;
pub mod fitness_handler;
pub mod leaderboard_handler;
pub mod prize_handler;
