use std::sync::Arc;

use actix_web::{get, web, Responder};

use crate::handlers::backend_health_handler::backend_health_check;
use crate::store::KeyValueStore;

#[get("/backend_health")]
async fn backend_health(store: web::Data<Arc<dyn KeyValueStore>>) -> impl Responder {
    backend_health_check(store).await
}
