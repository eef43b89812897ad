//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and the shared [`services::AppServices`]
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request bodies and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;
use std::time::Duration;

use axum::{Extension, Router, error_handling::HandleErrorLayer, routing::get};
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower_http::catch_panic::CatchPanicLayer;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the tests).
pub fn build_app(services: Arc<services::AppServices>, request_timeout: Duration) -> Router {
    let router = Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", routes::router());
    with_layers(router, services, request_timeout)
}

/// Wrap `router` in the request pipeline, outermost first: request logging,
/// panic recovery (JSON 500), the per-request timeout (JSON 408), and the
/// shared services.
pub fn with_layers(
    router: Router,
    services: Arc<services::AppServices>,
    request_timeout: Duration,
) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn(middleware::request_logging))
            .layer(CatchPanicLayer::custom(errors::panic_to_response))
            .layer(HandleErrorLayer::new(errors::middleware_error_to_response))
            .layer(TimeoutLayer::new(request_timeout))
            .layer(Extension(services)),
    )
}
