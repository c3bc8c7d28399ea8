use actix_web::{web, HttpResponse};

use crate::error::AppError;
use crate::models::common::ApiResponse;
use crate::models::fitness::{FitnessSyncRequest, UserStatsQuery};
use crate::services::{FitnessService, LeaderboardService};

/// Store a daily sample, fold it into the running totals and move the user
/// on the competition leaderboard.
#[tracing::instrument(
    name = "Sync fitness data",
    skip(request, fitness, leaderboard),
    fields(
        user_id = %request.user_id,
        competition_id = %request.competition_id
    )
)]
pub async fn sync_fitness_data(
    request: web::Json<FitnessSyncRequest>,
    fitness: web::Data<FitnessService>,
    leaderboard: web::Data<LeaderboardService>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    let stats = fitness.sync(&request).await?;

    leaderboard.record_sync(&stats).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Fitness data synced successfully", stats)))
}

#[tracing::instrument(name = "Get fitness stats", skip(query, fitness))]
pub async fn get_user_stats(
    user_id: String,
    query: web::Query<UserStatsQuery>,
    fitness: web::Data<FitnessService>,
) -> Result<HttpResponse, AppError> {
    let competition_id = query
        .into_inner()
        .competition_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::validation("competition_id is required"))?;

    let stats = fitness.get_user_stats(&user_id, &competition_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Fitness stats retrieved", stats)))
}
