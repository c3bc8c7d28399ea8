use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::store::KeyValueStore;

pub async fn backend_health_check(store: web::Data<Arc<dyn KeyValueStore>>) -> HttpResponse {
    match store.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "status": "UP",
            "store": "UP",
            "backend": store.backend_name()
        })),
        Err(e) => {
            tracing::error!("Store health check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "DOWN",
                "store": "DOWN",
                "backend": store.backend_name()
            }))
        }
    }
}
