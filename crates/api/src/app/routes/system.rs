use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::app::{errors, services::AppServices};

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

pub async fn stats(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.inventory.stats().await {
        Ok(stats) => (
            StatusCode::OK,
            Json(json!({
                "products": stats.products,
                "transactions": stats.transactions,
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
