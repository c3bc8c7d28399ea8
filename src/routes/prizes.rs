use actix_web::{get, post, web, HttpResponse};

use crate::error::AppError;
use crate::handlers::prize_handler;
use crate::models::prize::CalculatePrizesRequest;
use crate::services::PrizeService;

#[post("/calculate/{competition_id}")]
async fn calculate_prizes(
    path: web::Path<String>,
    request: web::Json<CalculatePrizesRequest>,
    prizes: web::Data<PrizeService>,
) -> Result<HttpResponse, AppError> {
    prize_handler::calculate_prizes(path.into_inner(), request, prizes).await
}

#[post("/distribute/{competition_id}")]
async fn distribute_prizes(
    path: web::Path<String>,
    prizes: web::Data<PrizeService>,
) -> Result<HttpResponse, AppError> {
    prize_handler::distribute_prizes(path.into_inner(), prizes).await
}

#[get("/{competition_id}")]
async fn get_prizes(
    path: web::Path<String>,
    prizes: web::Data<PrizeService>,
) -> Result<HttpResponse, AppError> {
    prize_handler::get_prizes(path.into_inner(), prizes).await
}
