//! Stock movement endpoints: `POST /products/:id/stock/{add,remove,reserve,unreserve,return}`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use stockledger_core::ProductId;
use stockledger_infra::StockRequest;
use stockledger_inventory::TransactionType;

use crate::app::{dto, errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/:id/stock/add", post(add_stock))
        .route("/:id/stock/remove", post(remove_stock))
        .route("/:id/stock/reserve", post(reserve_stock))
        .route("/:id/stock/unreserve", post(unreserve_stock))
        .route("/:id/stock/return", post(return_stock))
}

pub async fn add_stock(
    services: Extension<Arc<AppServices>>,
    id: Path<String>,
    body: Result<Json<StockRequest>, JsonRejection>,
) -> axum::response::Response {
    movement(services, id, body, TransactionType::In).await
}

pub async fn remove_stock(
    services: Extension<Arc<AppServices>>,
    id: Path<String>,
    body: Result<Json<StockRequest>, JsonRejection>,
) -> axum::response::Response {
    movement(services, id, body, TransactionType::Out).await
}

pub async fn reserve_stock(
    services: Extension<Arc<AppServices>>,
    id: Path<String>,
    body: Result<Json<StockRequest>, JsonRejection>,
) -> axum::response::Response {
    movement(services, id, body, TransactionType::Reserve).await
}

pub async fn unreserve_stock(
    services: Extension<Arc<AppServices>>,
    id: Path<String>,
    body: Result<Json<StockRequest>, JsonRejection>,
) -> axum::response::Response {
    movement(services, id, body, TransactionType::Unreserve).await
}

pub async fn return_stock(
    services: Extension<Arc<AppServices>>,
    id: Path<String>,
    body: Result<Json<StockRequest>, JsonRejection>,
) -> axum::response::Response {
    movement(services, id, body, TransactionType::Return).await
}

async fn movement(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<StockRequest>, JsonRejection>,
    kind: TransactionType,
) -> axum::response::Response {
    let Ok(id) = id.parse::<ProductId>() else {
        return errors::invalid_id("product");
    };
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection(rejection),
    };

    let inventory = &services.inventory;
    let result = match kind {
        TransactionType::In => inventory.add_stock(id, request).await,
        TransactionType::Out => inventory.remove_stock(id, request).await,
        TransactionType::Reserve => inventory.reserve_stock(id, request).await,
        TransactionType::Unreserve => inventory.unreserve_stock(id, request).await,
        TransactionType::Return => inventory.return_stock(id, request).await,
    };

    match result {
        Ok(movement) => (StatusCode::OK, Json(dto::movement_to_json(&movement))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
