//! Return request aggregate.

mod status;

pub use status::ReturnStatus;

use chrono::{DateTime, Utc};
use common::{OrderId, OrderItemId, ReturnId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;
use crate::money::Money;
use crate::order::{Order, OrderItem};

/// Errors that can occur during return operations.
#[derive(Debug, Error)]
pub enum ReturnError {
    /// Status transition not permitted by the transition table.
    #[error("invalid return status transition: {from} -> {to}")]
    InvalidTransition {
        from: ReturnStatus,
        to: ReturnStatus,
    },

    /// A return must name at least one item.
    #[error("return must include at least one item")]
    NoItems,

    /// Referenced line item does not belong to the order.
    #[error("order item {order_item_id} is not part of order {order_id}")]
    ItemNotInOrder {
        order_item_id: OrderItemId,
        order_id: OrderId,
    },

    /// Quantity must be at least 1.
    #[error("invalid quantity {quantity} for item {order_item_id}")]
    InvalidQuantity {
        order_item_id: OrderItemId,
        quantity: u32,
    },

    /// Cannot return more units than were ordered.
    #[error("quantity {requested} exceeds ordered quantity {ordered} for item {order_item_id}")]
    QuantityExceedsOrdered {
        order_item_id: OrderItemId,
        requested: u32,
        ordered: u32,
    },

    /// The computed refund would exceed what the customer paid.
    #[error("refund amount {refund} exceeds order total {total}")]
    ExceedsOrderTotal { refund: Money, total: Money },

    /// The refund transaction id is write-once.
    #[error("refund already recorded under transaction {transaction_id}")]
    RefundAlreadyRecorded { transaction_id: String },
}

/// One returned line: a reference into the order plus the quantity coming
/// back, priced at the original purchase price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnItem {
    pub order_item_id: OrderItemId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl ReturnItem {
    /// Returns the refund contribution of this line.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Return request aggregate root.
///
/// The refund amount and return address are computed once at creation and
/// never recomputed; `refund_transaction_id` is write-once and set only by
/// a successful refund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub id: ReturnId,
    /// Human-readable number, `PREFIX-YYYYMMDD-NNNN`.
    pub return_number: String,
    pub order_id: OrderId,
    pub user_id: Option<UserId>,
    pub status: ReturnStatus,
    pub reason: Option<String>,
    pub items: Vec<ReturnItem>,
    pub refund_amount: Money,
    /// Snapshot of the order's shipping address at return-creation time.
    pub return_address: Address,
    /// Set by the customer once the items are on their way back.
    pub return_tracking_number: Option<String>,
    /// External refund reference; present exactly when status is refunded.
    pub refund_transaction_id: Option<String>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ReturnRequest {
    /// Creates a return request against an order.
    ///
    /// Validates that the requested lines are a subset of the order's items
    /// with sane quantities, prices each line at the original purchase
    /// price, and computes the refund amount. The caller is responsible for
    /// the ownership check.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ReturnId,
        return_number: String,
        order: &Order,
        order_items: &[OrderItem],
        requested: &[(OrderItemId, u32)],
        requester: Option<UserId>,
        reason: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ReturnError> {
        if requested.is_empty() {
            return Err(ReturnError::NoItems);
        }

        let mut items = Vec::with_capacity(requested.len());
        for &(order_item_id, quantity) in requested {
            let ordered = order_items
                .iter()
                .find(|item| item.id == order_item_id)
                .ok_or(ReturnError::ItemNotInOrder {
                    order_item_id,
                    order_id: order.id,
                })?;

            if quantity == 0 {
                return Err(ReturnError::InvalidQuantity {
                    order_item_id,
                    quantity,
                });
            }
            if quantity > ordered.quantity {
                return Err(ReturnError::QuantityExceedsOrdered {
                    order_item_id,
                    requested: quantity,
                    ordered: ordered.quantity,
                });
            }

            items.push(ReturnItem {
                order_item_id,
                quantity,
                unit_price: ordered.unit_price,
            });
        }

        let refund_amount: Money = items.iter().map(ReturnItem::line_total).sum();
        if refund_amount > order.total {
            return Err(ReturnError::ExceedsOrderTotal {
                refund: refund_amount,
                total: order.total,
            });
        }

        Ok(Self {
            id,
            return_number,
            order_id: order.id,
            user_id: requester.or(order.user_id),
            status: ReturnStatus::Pending,
            reason,
            items,
            refund_amount,
            return_address: order.shipping_address.clone(),
            return_tracking_number: None,
            refund_transaction_id: None,
            admin_notes: None,
            created_at,
        })
    }

    /// Advances the return status, enforcing the transition table.
    ///
    /// The `refunded` status cannot be reached this way; use
    /// [`ReturnRequest::record_refund`] so the transaction id is recorded
    /// in the same step.
    pub fn transition_to(&mut self, next: ReturnStatus) -> Result<(), ReturnError> {
        if next == ReturnStatus::Refunded || !self.status.can_transition_to(next) {
            return Err(ReturnError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Marks the return refunded after a successful gateway refund.
    ///
    /// The transaction id is write-once; calling this twice is an error.
    pub fn record_refund(&mut self, transaction_id: String) -> Result<(), ReturnError> {
        if let Some(existing) = &self.refund_transaction_id {
            return Err(ReturnError::RefundAlreadyRecorded {
                transaction_id: existing.clone(),
            });
        }
        if !self.status.can_transition_to(ReturnStatus::Refunded) {
            return Err(ReturnError::InvalidTransition {
                from: self.status,
                to: ReturnStatus::Refunded,
            });
        }
        self.status = ReturnStatus::Refunded;
        self.refund_transaction_id = Some(transaction_id);
        Ok(())
    }

    /// Records the customer's return tracking number and marks the return
    /// shipped. Only valid once the return has been approved.
    pub fn mark_shipped(&mut self, tracking_number: String) -> Result<(), ReturnError> {
        self.transition_to(ReturnStatus::Shipped)?;
        self.return_tracking_number = Some(tracking_number);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::CustomerContact;
    use common::ProductId;

    fn sample_address() -> Address {
        Address {
            name: "Jordan Rivers".to_string(),
            line1: "12 Harbor Lane".to_string(),
            line2: None,
            city: "Barnstable".to_string(),
            state: "MA".to_string(),
            zip: "02601".to_string(),
            country: "US".to_string(),
        }
    }

    fn order_with_items() -> (Order, Vec<OrderItem>) {
        let order = Order::new(
            OrderId::new(),
            "ORD-20250307-0001".to_string(),
            Some(UserId::new()),
            Money::from_cents(5000),
            Money::from_cents(432),
            Money::zero(),
            sample_address(),
            sample_address(),
            CustomerContact {
                email: "jordan@example.com".to_string(),
                first_name: "Jordan".to_string(),
                last_name: "Rivers".to_string(),
                phone: None,
            },
            Some("PAY-123".to_string()),
            Utc::now(),
        );
        let items = vec![
            OrderItem::new(order.id, ProductId::new(), 1, Money::from_cents(2500)),
            OrderItem::new(order.id, ProductId::new(), 2, Money::from_cents(1250)),
        ];
        (order, items)
    }

    fn make_return(
        order: &Order,
        items: &[OrderItem],
        requested: &[(OrderItemId, u32)],
    ) -> Result<ReturnRequest, ReturnError> {
        ReturnRequest::new(
            ReturnId::new(),
            "RET-20250310-0001".to_string(),
            order,
            items,
            requested,
            order.user_id,
            None,
            Utc::now(),
        )
    }

    #[test]
    fn test_refund_amount_computed_from_purchase_prices() {
        let (order, items) = order_with_items();
        let ret = make_return(&order, &items, &[(items[0].id, 1)]).unwrap();

        assert_eq!(ret.status, ReturnStatus::Pending);
        assert_eq!(ret.refund_amount.cents(), 2500);
        assert_eq!(ret.return_address, order.shipping_address);
    }

    #[test]
    fn test_refund_amount_sums_lines() {
        let (order, items) = order_with_items();
        let ret = make_return(&order, &items, &[(items[0].id, 1), (items[1].id, 2)]).unwrap();
        assert_eq!(ret.refund_amount.cents(), 2500 + 2500);
        assert_eq!(
            ret.refund_amount,
            ret.items.iter().map(ReturnItem::line_total).sum()
        );
    }

    #[test]
    fn test_empty_return_rejected() {
        let (order, items) = order_with_items();
        assert!(matches!(
            make_return(&order, &items, &[]),
            Err(ReturnError::NoItems)
        ));
    }

    #[test]
    fn test_foreign_item_rejected() {
        let (order, items) = order_with_items();
        let foreign = OrderItemId::new();
        assert!(matches!(
            make_return(&order, &items, &[(foreign, 1)]),
            Err(ReturnError::ItemNotInOrder { .. })
        ));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let (order, items) = order_with_items();
        assert!(matches!(
            make_return(&order, &items, &[(items[0].id, 0)]),
            Err(ReturnError::InvalidQuantity { .. })
        ));
    }

    #[test]
    fn test_quantity_above_ordered_rejected() {
        let (order, items) = order_with_items();
        let result = make_return(&order, &items, &[(items[0].id, 2)]);
        assert!(matches!(
            result,
            Err(ReturnError::QuantityExceedsOrdered {
                requested: 2,
                ordered: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_record_refund_sets_status_and_transaction() {
        let (order, items) = order_with_items();
        let mut ret = make_return(&order, &items, &[(items[0].id, 1)]).unwrap();

        ret.record_refund("REF-42".to_string()).unwrap();
        assert_eq!(ret.status, ReturnStatus::Refunded);
        assert_eq!(ret.refund_transaction_id.as_deref(), Some("REF-42"));
    }

    #[test]
    fn test_record_refund_is_write_once() {
        let (order, items) = order_with_items();
        let mut ret = make_return(&order, &items, &[(items[0].id, 1)]).unwrap();

        ret.record_refund("REF-42".to_string()).unwrap();
        let again = ret.record_refund("REF-43".to_string());
        assert!(matches!(
            again,
            Err(ReturnError::RefundAlreadyRecorded { .. })
        ));
        assert_eq!(ret.refund_transaction_id.as_deref(), Some("REF-42"));
    }

    #[test]
    fn test_transition_to_refunded_requires_record_refund() {
        let (order, items) = order_with_items();
        let mut ret = make_return(&order, &items, &[(items[0].id, 1)]).unwrap();

        let result = ret.transition_to(ReturnStatus::Refunded);
        assert!(matches!(result, Err(ReturnError::InvalidTransition { .. })));
        assert_eq!(ret.status, ReturnStatus::Pending);
        assert!(ret.refund_transaction_id.is_none());
    }

    #[test]
    fn test_mark_shipped_requires_approval() {
        let (order, items) = order_with_items();
        let mut ret = make_return(&order, &items, &[(items[0].id, 1)]).unwrap();

        assert!(ret.mark_shipped("1Z999".to_string()).is_err());
        assert!(ret.return_tracking_number.is_none());

        ret.transition_to(ReturnStatus::Approved).unwrap();
        ret.mark_shipped("1Z999".to_string()).unwrap();
        assert_eq!(ret.status, ReturnStatus::Shipped);
        assert_eq!(ret.return_tracking_number.as_deref(), Some("1Z999"));
    }

    #[test]
    fn test_rejected_is_terminal() {
        let (order, items) = order_with_items();
        let mut ret = make_return(&order, &items, &[(items[0].id, 1)]).unwrap();

        ret.transition_to(ReturnStatus::Rejected).unwrap();
        assert!(ret.transition_to(ReturnStatus::Approved).is_err());
        assert!(ret.record_refund("REF-1".to_string()).is_err());
    }
}
