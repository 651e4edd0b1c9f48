//! Shipment aggregate: one label-purchase attempt against an order.

mod status;

pub use status::ShipmentStatus;

use chrono::{DateTime, Utc};
use common::{OrderId, ShipmentId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;
use crate::money::Money;

/// Errors that can occur during shipment operations.
#[derive(Debug, Error)]
pub enum ShipmentError {
    /// Status transition not permitted by the transition table.
    #[error("invalid shipment status transition: {from} -> {to}")]
    InvalidTransition {
        from: ShipmentStatus,
        to: ShipmentStatus,
    },
}

/// Parcel dimensions (inches) and weight (ounces) quoted to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub weight_oz: f64,
}

impl Parcel {
    /// Estimates parcel weight as `max(min_weight, per_item x count)`.
    ///
    /// A linear estimate, not a physical measurement; small jewelry parcels
    /// are dominated by packaging weight.
    pub fn estimate_weight(item_count: u32, per_item_oz: f64, min_oz: f64) -> f64 {
        (per_item_oz * item_count as f64).max(min_oz)
    }
}

/// A label-purchase attempt.
///
/// One order may accumulate several attempts; at most one `purchased` row is
/// authoritative. Rows are never deleted so failures stay auditable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub order_id: OrderId,
    pub status: ShipmentStatus,
    pub from_address: Address,
    pub to_address: Address,
    pub parcel: Parcel,
    pub carrier: Option<String>,
    pub service: Option<String>,
    pub cost: Option<Money>,
    /// Broker-side shipment id, set once the quote succeeds.
    pub external_shipment_id: Option<String>,
    /// Broker-side rate id selected for purchase.
    pub rate_id: Option<String>,
    /// Broker-side purchase transaction id.
    pub transaction_id: Option<String>,
    pub label_url: Option<String>,
    pub tracking_number: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Shipment {
    /// Creates the durable `pending` row persisted before any broker call.
    pub fn pending(
        id: ShipmentId,
        order_id: OrderId,
        from_address: Address,
        to_address: Address,
        parcel: Parcel,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            order_id,
            status: ShipmentStatus::Pending,
            from_address,
            to_address,
            parcel,
            carrier: None,
            service: None,
            cost: None,
            external_shipment_id: None,
            rate_id: None,
            transaction_id: None,
            label_url: None,
            tracking_number: None,
            error_message: None,
            created_at,
        }
    }

    /// Records the broker's shipment quote.
    pub fn mark_created(&mut self, external_shipment_id: String) -> Result<(), ShipmentError> {
        self.transition_to(ShipmentStatus::Created)?;
        self.external_shipment_id = Some(external_shipment_id);
        Ok(())
    }

    /// Records a successful label purchase.
    #[allow(clippy::too_many_arguments)]
    pub fn mark_purchased(
        &mut self,
        carrier: String,
        service: String,
        cost: Money,
        rate_id: String,
        transaction_id: String,
        tracking_number: String,
        label_url: String,
    ) -> Result<(), ShipmentError> {
        self.transition_to(ShipmentStatus::Purchased)?;
        self.carrier = Some(carrier);
        self.service = Some(service);
        self.cost = Some(cost);
        self.rate_id = Some(rate_id);
        self.transaction_id = Some(transaction_id);
        self.tracking_number = Some(tracking_number);
        self.label_url = Some(label_url);
        Ok(())
    }

    /// Records a broker failure; the row stays as the audit trail.
    pub fn mark_failed(&mut self, error_message: String) {
        // Failure is always recordable from a non-terminal status; if the
        // row already reached a terminal status, keep the original outcome.
        if self.status.can_transition_to(ShipmentStatus::Failed) {
            self.status = ShipmentStatus::Failed;
            self.error_message = Some(error_message);
        }
    }

    fn transition_to(&mut self, next: ShipmentStatus) -> Result<(), ShipmentError> {
        if !self.status.can_transition_to(next) {
            return Err(ShipmentError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
