use actix::Addr;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;

use crate::config::settings::RealtimeSettings;
use crate::realtime::{LeaderboardBroadcaster, LeaderboardSession};
use crate::services::leaderboard_service::LeaderboardService;

/// Upgrade to a leaderboard feed connection. Clients pick their competition
/// with a `subscribe` message after connecting and then receive its current
/// board.
pub async fn leaderboard_ws_route(
    req: HttpRequest,
    stream: web::Payload,
    broadcaster: web::Data<Addr<LeaderboardBroadcaster>>,
    leaderboard: web::Data<LeaderboardService>,
    settings: web::Data<RealtimeSettings>,
) -> Result<HttpResponse, Error> {
    tracing::info!("New leaderboard WebSocket connection request");
    let session = LeaderboardSession::new(
        broadcaster.get_ref().clone(),
        leaderboard.get_ref().clone(),
        &settings,
    );
    ws::start(session, &req, stream)
}
