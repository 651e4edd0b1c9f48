//! Order aggregate and its line items.

mod status;

pub use status::OrderStatus;

use chrono::{DateTime, Utc};
use common::{OrderId, OrderItemId, ProductId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::{Address, CustomerContact};
use crate::money::Money;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Status transition not permitted by the transition table.
    #[error("invalid order status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

/// A line item within an order.
///
/// The unit price is captured at purchase time and never re-read from the
/// product, so later catalog edits cannot alter historical orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderItem {
    /// Creates a new order line item.
    pub fn new(
        order_id: OrderId,
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            id: OrderItemId::new(),
            order_id,
            product_id,
            quantity,
            unit_price,
        }
    }

    /// Returns the total price for this line (quantity x unit price).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Order aggregate root.
///
/// Addresses and contact details are snapshots taken at checkout. Once in a
/// terminal status the order admits no further transitions; the tracking
/// number is set by the label workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Human-readable number, `PREFIX-YYYYMMDD-NNNN`.
    pub order_number: String,
    /// Absent for guest checkout.
    pub user_id: Option<UserId>,
    pub status: OrderStatus,
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub contact: CustomerContact,
    /// External payment reference from the gateway.
    pub payment_id: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Creates an order with the total derived from its parts.
    ///
    /// Orders created with a payment reference start `paid`; otherwise
    /// `pending`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: OrderId,
        order_number: String,
        user_id: Option<UserId>,
        subtotal: Money,
        tax: Money,
        shipping: Money,
        shipping_address: Address,
        billing_address: Address,
        contact: CustomerContact,
        payment_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let status = if payment_id.is_some() {
            OrderStatus::Paid
        } else {
            OrderStatus::Pending
        };
        Self {
            id,
            order_number,
            user_id,
            status,
            subtotal,
            tax,
            shipping,
            total: subtotal + tax + shipping,
            shipping_address,
            billing_address,
            contact,
            payment_id,
            tracking_number: None,
            created_at,
        }
    }

    /// Returns true if `subtotal + tax + shipping == total`.
    pub fn totals_balance(&self) -> bool {
        self.subtotal + self.tax + self.shipping == self.total
    }

    /// Advances the order status, enforcing the transition table.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Returns true if the order is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
