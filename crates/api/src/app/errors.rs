use std::any::Any;

use axum::{
    BoxError, Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};

use stockledger_infra::ServiceError;

use super::dto;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    json_error_with(status, code, message, Map::new())
}

/// Like [`json_error`], with extra top-level fields merged into the body.
pub fn json_error_with(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    extra: Map<String, Value>,
) -> Response {
    let mut body = Map::new();
    body.insert("error".into(), Value::from(code));
    body.insert("message".into(), Value::from(message.into()));
    body.extend(extra);
    (status, Json(Value::Object(body))).into_response()
}

pub fn invalid_id(what: &str) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id"))
}

pub fn json_rejection(rejection: JsonRejection) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text())
}

/// Response for a handler that panicked. The connection stays usable.
pub fn panic_to_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    tracing::error!(panic = detail, "request handler panicked");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "internal server error",
    )
}

/// Errors raised by tower middleware rather than handlers.
pub async fn middleware_error_to_response(err: BoxError) -> Response {
    if err.is::<tower::timeout::error::Elapsed>() {
        return json_error(
            StatusCode::REQUEST_TIMEOUT,
            "request_timeout",
            "request took too long",
        );
    }
    tracing::error!(error = %err, "unhandled middleware error");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "internal server error",
    )
}

pub fn service_error_to_response(err: ServiceError) -> Response {
    let message = err.to_string();
    match err {
        ServiceError::Validation(_) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", message)
        }
        ServiceError::NotFound { .. } => json_error(StatusCode::NOT_FOUND, "not_found", message),
        ServiceError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", message),
        ServiceError::InsufficientStock {
            requested,
            available,
        } => json_error_with(
            StatusCode::UNPROCESSABLE_ENTITY,
            "insufficient_stock",
            message,
            fields(json!({ "requested": requested, "available": available })),
        ),
        ServiceError::InsufficientReservedStock {
            requested,
            reserved,
        } => json_error_with(
            StatusCode::UNPROCESSABLE_ENTITY,
            "insufficient_reserved_stock",
            message,
            fields(json!({ "requested": requested, "reserved": reserved })),
        ),
        ServiceError::AuditAppendFailed { inventory, .. } => json_error_with(
            StatusCode::INTERNAL_SERVER_ERROR,
            "audit_append_failed",
            message,
            fields(json!({ "inventory": dto::inventory_to_json(&inventory) })),
        ),
        ServiceError::StoreUnavailable(_) => {
            tracing::error!(error = %message, "store unavailable");
            json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "store_unavailable",
                "storage backend unavailable",
            )
        }
    }
}

fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
