use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use stockledger_core::TransactionId;

use crate::app::{dto, errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_transactions))
        .route("/:id", get(get_transaction))
}

/// All ledger entries, newest first.
pub async fn list_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListQuery>,
) -> axum::response::Response {
    match services
        .inventory
        .list_transactions(query.limit(), query.offset())
        .await
    {
        Ok(page) => (
            StatusCode::OK,
            Json(dto::page_to_json(&page, dto::transaction_to_json)),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(id) = id.parse::<TransactionId>() else {
        return errors::invalid_id("transaction");
    };

    match services.inventory.get_transaction(id).await {
        Ok(tx) => (StatusCode::OK, Json(dto::transaction_to_json(&tx))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
