use actix_web::{web, HttpResponse};

use crate::error::AppError;
use crate::models::common::ApiResponse;
use crate::models::prize::{CalculatePrizesRequest, PrizeList};
use crate::services::PrizeService;

#[tracing::instrument(
    name = "Calculate prizes",
    skip(request, prizes),
    fields(prize_pool = request.prize_pool)
)]
pub async fn calculate_prizes(
    competition_id: String,
    request: web::Json<CalculatePrizesRequest>,
    prizes: web::Data<PrizeService>,
) -> Result<HttpResponse, AppError> {
    let prizes = prizes.calculate_prizes(&competition_id, request.prize_pool).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Prizes calculated", PrizeList { prizes })))
}

#[tracing::instrument(name = "Get prizes", skip(prizes))]
pub async fn get_prizes(
    competition_id: String,
    prizes: web::Data<PrizeService>,
) -> Result<HttpResponse, AppError> {
    let prizes = prizes.get_prizes(&competition_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Prizes retrieved", PrizeList { prizes })))
}

#[tracing::instrument(name = "Distribute prizes", skip(prizes))]
pub async fn distribute_prizes(
    competition_id: String,
    prizes: web::Data<PrizeService>,
) -> Result<HttpResponse, AppError> {
    let pending = prizes.distribute_prizes(&competition_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        format!("Prize distribution initiated for competition {}", competition_id),
        PrizeList { prizes: pending },
    )))
}
