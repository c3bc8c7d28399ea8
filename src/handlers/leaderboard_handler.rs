use actix_web::{web, HttpResponse};

use crate::error::AppError;
use crate::models::common::ApiResponse;
use crate::models::leaderboard::{LeaderboardQuery, ScoreUpdateRequest};
use crate::services::leaderboard_service::clamp_limit;
use crate::services::LeaderboardService;

#[tracing::instrument(name = "Get leaderboard", skip(query, leaderboard))]
pub async fn get_leaderboard(
    competition_id: String,
    query: web::Query<LeaderboardQuery>,
    leaderboard: web::Data<LeaderboardService>,
) -> Result<HttpResponse, AppError> {
    let board = leaderboard
        .get_leaderboard(&competition_id, clamp_limit(query.limit))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Leaderboard retrieved", board)))
}

#[tracing::instrument(name = "Get user rank", skip(leaderboard))]
pub async fn get_user_rank(
    competition_id: String,
    user_id: String,
    leaderboard: web::Data<LeaderboardService>,
) -> Result<HttpResponse, AppError> {
    let rank = leaderboard
        .get_user_rank(&competition_id, &user_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "User {} is not ranked in competition {}",
                user_id, competition_id
            ))
        })?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("User rank retrieved", rank)))
}

#[tracing::instrument(
    name = "Update leaderboard score",
    skip(request, leaderboard),
    fields(
        user_id = %request.user_id,
        competition_id = %request.competition_id
    )
)]
pub async fn update_score(
    request: web::Json<ScoreUpdateRequest>,
    leaderboard: web::Data<LeaderboardService>,
) -> Result<HttpResponse, AppError> {
    leaderboard.update_score(&request).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::success_message("Score updated")))
}

#[tracing::instrument(name = "Broadcast leaderboard", skip(query, leaderboard))]
pub async fn broadcast_leaderboard(
    competition_id: String,
    query: web::Query<LeaderboardQuery>,
    leaderboard: web::Data<LeaderboardService>,
) -> Result<HttpResponse, AppError> {
    let board = leaderboard
        .publish_leaderboard(&competition_id, clamp_limit(query.limit))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Leaderboard broadcast", board)))
}
