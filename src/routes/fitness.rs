use actix_web::{get, post, web, HttpResponse};

use crate::error::AppError;
use crate::handlers::fitness_handler;
use crate::models::fitness::{FitnessSyncRequest, UserStatsQuery};
use crate::services::{FitnessService, LeaderboardService};

/// Ingest one day of telemetry
#[post("/sync")]
async fn sync_fitness_data(
    request: web::Json<FitnessSyncRequest>,
    fitness: web::Data<FitnessService>,
    leaderboard: web::Data<LeaderboardService>,
) -> Result<HttpResponse, AppError> {
    fitness_handler::sync_fitness_data(request, fitness, leaderboard).await
}

/// Running totals for a user in one competition
#[get("/stats/{user_id}")]
async fn get_user_stats(
    path: web::Path<String>,
    query: web::Query<UserStatsQuery>,
    fitness: web::Data<FitnessService>,
) -> Result<HttpResponse, AppError> {
    fitness_handler::get_user_stats(path.into_inner(), query, fitness).await
}
