//! Store error types.

use common::ProductId;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Conditional stock decrement failed.
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Unique constraint violation (slug, order number).
    #[error("duplicate value: {0}")]
    Duplicate(String),

    /// A stored column could not be interpreted.
    #[error("invalid stored value: {0}")]
    InvalidColumn(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error for JSON-backed columns.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;
