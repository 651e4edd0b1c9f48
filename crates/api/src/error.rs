//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, OrderError, ReturnError, ShipmentError};
use orchestrator::OrchestratorError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Resource not found.
    NotFound(String),
    /// Workflow error from the orchestrator.
    Orchestrator(OrchestratorError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": msg }),
            ),
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg }))
            }
            ApiError::Orchestrator(err) => orchestrator_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": msg }),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

fn orchestrator_error_to_response(err: OrchestratorError) -> (StatusCode, serde_json::Value) {
    let status = match &err {
        OrchestratorError::Validation(_) => StatusCode::BAD_REQUEST,
        OrchestratorError::InsufficientStock { shortfalls } => {
            // Itemized so the storefront can show per-product availability.
            return (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": err.to_string(),
                    "shortfalls": shortfalls,
                }),
            );
        }
        OrchestratorError::Payment(_) => StatusCode::PAYMENT_REQUIRED,
        OrchestratorError::ExternalService { .. } => StatusCode::BAD_GATEWAY,
        OrchestratorError::NotFound { .. } => StatusCode::NOT_FOUND,
        OrchestratorError::Forbidden(_) => StatusCode::FORBIDDEN,
        OrchestratorError::Configuration(_) => {
            tracing::error!(error = %err, "configuration error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        OrchestratorError::Domain(domain_err) => domain_error_status(domain_err),
        OrchestratorError::Store(store_err) => {
            tracing::error!(error = %store_err, "store error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, serde_json::json!({ "error": err.to_string() }))
}

fn domain_error_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Order(OrderError::InvalidTransition { .. })
        | DomainError::Return(ReturnError::InvalidTransition { .. })
        | DomainError::Return(ReturnError::RefundAlreadyRecorded { .. })
        | DomainError::Shipment(ShipmentError::InvalidTransition { .. }) => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        ApiError::Orchestrator(err)
    }
}

impl From<store::StoreError> for ApiError {
    fn from(err: store::StoreError) -> Self {
        match err {
            store::StoreError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{entity} not found: {id}"))
            }
            store::StoreError::Duplicate(what) => {
                ApiError::BadRequest(format!("duplicate value: {what}"))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}
