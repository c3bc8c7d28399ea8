use actix_web::{get, post, web, HttpResponse};

use crate::error::AppError;
use crate::handlers::leaderboard_handler;
use crate::models::leaderboard::{LeaderboardQuery, ScoreUpdateRequest};
use crate::services::LeaderboardService;

/// Set a user's score directly
#[post("/update")]
async fn update_score(
    request: web::Json<ScoreUpdateRequest>,
    leaderboard: web::Data<LeaderboardService>,
) -> Result<HttpResponse, AppError> {
    leaderboard_handler::update_score(request, leaderboard).await
}

/// Top entries of a competition
#[get("/{competition_id}")]
async fn get_leaderboard(
    path: web::Path<String>,
    query: web::Query<LeaderboardQuery>,
    leaderboard: web::Data<LeaderboardService>,
) -> Result<HttpResponse, AppError> {
    leaderboard_handler::get_leaderboard(path.into_inner(), query, leaderboard).await
}

#[get("/{competition_id}/users/{user_id}")]
async fn get_user_rank(
    path: web::Path<(String, String)>,
    leaderboard: web::Data<LeaderboardService>,
) -> Result<HttpResponse, AppError> {
    let (competition_id, user_id) = path.into_inner();
    leaderboard_handler::get_user_rank(competition_id, user_id, leaderboard).await
}

/// Push the current leaderboard to websocket subscribers
#[post("/{competition_id}/broadcast")]
async fn broadcast_leaderboard(
    path: web::Path<String>,
    query: web::Query<LeaderboardQuery>,
    leaderboard: web::Data<LeaderboardService>,
) -> Result<HttpResponse, AppError> {
    leaderboard_handler::broadcast_leaderboard(path.into_inner(), query, leaderboard).await
}
