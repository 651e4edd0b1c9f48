//! Orchestrator error taxonomy.

use common::ProductId;
use domain::DomainError;
use serde::Serialize;
use store::StoreError;
use thiserror::Error;

/// One line item the checkout could not fulfill, with what is actually
/// available. Surfaced to the customer verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct StockShortfall {
    pub product_id: ProductId,
    pub title: String,
    pub requested: u32,
    pub available: u32,
}

/// Errors that can occur during workflow orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Bad input; the message is safe to show to the customer.
    #[error("validation failed: {0}")]
    Validation(String),

    /// One or more cart lines exceed available stock. The whole order is
    /// rejected; no partial orders.
    #[error("insufficient stock for {} item(s)", .shortfalls.len())]
    InsufficientStock { shortfalls: Vec<StockShortfall> },

    /// The payment gateway declined or failed the charge.
    #[error("payment failed: {0}")]
    Payment(String),

    /// A downstream service (label broker, refund gateway) failed. The
    /// message may carry remediation text for the admin.
    #[error("{service} error: {message}")]
    ExternalService {
        service: &'static str,
        message: String,
    },

    /// Entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The requester does not own the referenced resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Required operator configuration is missing. Operator-facing, never
    /// shown to customers.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Domain rule violation (invalid transition, bad return lines).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Storage failure.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for OrchestratorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => OrchestratorError::NotFound { entity, id },
            other => OrchestratorError::Store(other),
        }
    }
}

impl From<domain::OrderError> for OrchestratorError {
    fn from(err: domain::OrderError) -> Self {
        OrchestratorError::Domain(err.into())
    }
}

impl From<domain::ReturnError> for OrchestratorError {
    fn from(err: domain::ReturnError) -> Self {
        OrchestratorError::Domain(err.into())
    }
}

impl From<domain::ShipmentError> for OrchestratorError {
    fn from(err: domain::ShipmentError) -> Self {
        OrchestratorError::Domain(err.into())
    }
}

/// Convenience type alias for orchestrator results.
pub type Result<T> = std::result::Result<T, OrchestratorError>;
