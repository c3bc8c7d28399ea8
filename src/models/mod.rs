pub mod common;
pub mod fitness;
pub mod leaderboard;
pub mod prize;
pub mod realtime_events;
