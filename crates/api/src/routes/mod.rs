//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod returns;
pub mod shipments;

use crate::error::ApiError;

pub(crate) fn parse_uuid(id: &str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(id).map_err(|e| ApiError::BadRequest(format!("invalid ID format: {e}")))
}
