pub mod broadcaster;
pub mod relay;
pub mod session;

pub use broadcaster::LeaderboardBroadcaster;
pub use relay::start_relay;
pub use session::LeaderboardSession;
