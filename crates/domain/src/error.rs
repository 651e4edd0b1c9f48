//! Domain error types.

use thiserror::Error;

use crate::order::OrderError;
use crate::product::ProductError;
use crate::returns::ReturnError;
use crate::shipment::ShipmentError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the product entity.
    #[error("product error: {0}")]
    Product(#[from] ProductError),

    /// An error occurred in the order aggregate.
    #[error("order error: {0}")]
    Order(#[from] OrderError),

    /// An error occurred in the return aggregate.
    #[error("return error: {0}")]
    Return(#[from] ReturnError),

    /// An error occurred in the shipment aggregate.
    #[error("shipment error: {0}")]
    Shipment(#[from] ShipmentError),
}
