use actix::Actor;
use actix_web::{http, web, App, HttpServer};
use actix_web::dev::Server;
use tracing_actix_web::TracingLogger;
use std::net::TcpListener;
use std::sync::Arc;
use actix_cors::Cors;

pub mod config;
pub mod error;
mod handlers;
pub mod models;
pub mod realtime;
mod routes;
pub mod services;
pub mod store;
pub mod telemetry;

use crate::config::settings::RealtimeSettings;
use crate::error::AppError;
use crate::realtime::{start_relay, LeaderboardBroadcaster};
use crate::routes::init_routes;
use crate::services::{FitnessService, LeaderboardService, PrizeService};
use crate::store::KeyValueStore;

/// Start the broadcaster and the pub/sub relay, then build the HTTP server.
/// Must be called from within an actix system.
pub async fn run(
    listener: TcpListener,
    store: Arc<dyn KeyValueStore>,
    realtime: RealtimeSettings,
) -> Result<Server, std::io::Error> {
    let broadcaster = LeaderboardBroadcaster::default().start();
    start_relay(store.clone(), broadcaster.clone())
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    let leaderboard_service = LeaderboardService::new(store.clone());
    let prize_service = PrizeService::new(store.clone(), leaderboard_service.clone());
    let fitness_service = FitnessService::new(store.clone());

    // Wrap using web::Data, which boils down to an Arc smart pointer
    let store_data = web::Data::new(store);
    let broadcaster_data = web::Data::new(broadcaster);
    let realtime_data = web::Data::new(realtime);
    let fitness_data = web::Data::new(fitness_service);
    let leaderboard_data = web::Data::new(leaderboard_service);
    let prize_data = web::Data::new(prize_service);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![
                http::header::ACCEPT,
                http::header::CONTENT_TYPE,
                http::header::UPGRADE,
                http::header::CONNECTION,
            ])
            .max_age(3600);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors)
            .app_data(store_data.clone())
            .app_data(broadcaster_data.clone())
            .app_data(realtime_data.clone())
            .app_data(fitness_data.clone())
            .app_data(leaderboard_data.clone())
            .app_data(prize_data.clone())
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                AppError::validation(format!("Invalid query string: {}", err)).into()
            }))
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                AppError::validation(format!("Invalid JSON body: {}", err)).into()
            }))
            .configure(init_routes)
    })
    .listen(listener)?
    .run();

    Ok(server)
}
