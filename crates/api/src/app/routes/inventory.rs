use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use stockledger_core::InventoryItemId;

use crate::app::{dto, errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_inventory))
        .route("/:id", get(get_inventory_item))
        .route("/:id/transactions", get(list_item_transactions))
}

pub async fn list_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListQuery>,
) -> axum::response::Response {
    match services
        .inventory
        .list_inventory(query.limit(), query.offset())
        .await
    {
        Ok(page) => (
            StatusCode::OK,
            Json(dto::page_to_json(&page, dto::inventory_to_json)),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_inventory_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(id) = id.parse::<InventoryItemId>() else {
        return errors::invalid_id("inventory item");
    };

    match services.inventory.get_inventory_by_id(id).await {
        Ok(item) => (StatusCode::OK, Json(dto::inventory_to_json(&item))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_item_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(query): Query<dto::ListQuery>,
) -> axum::response::Response {
    let Ok(id) = id.parse::<InventoryItemId>() else {
        return errors::invalid_id("inventory item");
    };

    match services
        .inventory
        .list_inventory_transactions(id, query.limit(), query.offset())
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
