use actix_web::web;

pub mod backend_health;
pub mod fitness;
pub mod leaderboard;
pub mod prizes;
pub mod websocket;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(backend_health::backend_health);

    cfg.service(
        web::scope("/fitness")
            .service(fitness::sync_fitness_data)
            .service(fitness::get_user_stats)
    );
    // `/update` is registered ahead of the `{competition_id}` routes
    cfg.service(
        web::scope("/leaderboard")
            .service(leaderboard::update_score)
            .service(leaderboard::get_leaderboard)
            .service(leaderboard::get_user_rank)
            .service(leaderboard::broadcast_leaderboard)
    );
    cfg.service(
        web::scope("/prizes")
            .service(prizes::calculate_prizes)
            .service(prizes::distribute_prizes)
            .service(prizes::get_prizes)
    );
    cfg.service(
        web::resource("/ws/leaderboard")
            .route(web::get().to(websocket::leaderboard_ws_route))
    );
}
