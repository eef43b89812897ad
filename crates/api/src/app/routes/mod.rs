use axum::{Router, routing::get};

pub mod inventory;
pub mod products;
pub mod stock;
pub mod system;
pub mod transactions;

/// Router for everything under `/api`.
pub fn router() -> Router {
    Router::new()
        .route("/stats", get(system::stats))
        .route("/skus/:sku", get(products::get_product_by_sku))
        .nest("/products", products::router().merge(stock::router()))
        .nest("/inventory", inventory::router())
        .nest("/transactions", transactions::router())
}
