use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use stockledger_core::ProductId;
use stockledger_infra::NewProduct;

use crate::app::{dto, errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/:id/inventory", get(get_inventory).put(relocate_inventory))
        .route("/:id/transactions", get(list_transactions))
        .route("/:id/reconcile", get(reconcile))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection(rejection),
    };

    match services.inventory.register_product(body).await {
        Ok(details) => (StatusCode::CREATED, Json(dto::details_to_json(&details))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListQuery>,
) -> axum::response::Response {
    match services
        .inventory
        .list_products(query.limit(), query.offset())
        .await
    {
        Ok(page) => (
            StatusCode::OK,
            Json(dto::page_to_json(&page, dto::product_to_json)),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(id) = id.parse::<ProductId>() else {
        return errors::invalid_id("product");
    };

    match services.inventory.get_product(id).await {
        Ok(details) => (StatusCode::OK, Json(dto::details_to_json(&details))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_product_by_sku(
    Extension(services): Extension<Arc<AppServices>>,
    Path(sku): Path<String>,
) -> axum::response::Response {
    match services.inventory.get_product_by_sku(&sku).await {
        Ok(details) => (StatusCode::OK, Json(dto::details_to_json(&details))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let Ok(id) = id.parse::<ProductId>() else {
        return errors::invalid_id("product");
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection(rejection),
    };

    match services.inventory.update_product(id, body.into()).await {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(id) = id.parse::<ProductId>() else {
        return errors::invalid_id("product");
    };

    match services.inventory.delete_product(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(id) = id.parse::<ProductId>() else {
        return errors::invalid_id("product");
    };

    match services.inventory.get_inventory(id).await {
        Ok(item) => (StatusCode::OK, Json(dto::inventory_to_json(&item))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn relocate_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::RelocateRequest>, JsonRejection>,
) -> axum::response::Response {
    let Ok(id) = id.parse::<ProductId>() else {
        return errors::invalid_id("product");
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection(rejection),
    };

    match services.inventory.relocate(id, body.location).await {
        Ok(item) => (StatusCode::OK, Json(dto::inventory_to_json(&item))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(query): Query<dto::ListQuery>,
) -> axum::response::Response {
    let Ok(id) = id.parse::<ProductId>() else {
        return errors::invalid_id("product");
    };

    match services
        .inventory
        .list_product_transactions(id, query.limit(), query.offset())
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

pub async fn reconcile(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(id) = id.parse::<ProductId>() else {
        return errors::invalid_id("product");
    };

    match services.inventory.reconcile(id).await {
        Ok(report) => (StatusCode::OK, Json(dto::reconciliation_to_json(&report))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
