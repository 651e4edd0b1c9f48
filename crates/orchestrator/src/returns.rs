//! Return workflow: creation, admin review, and the refund transition.
//!
//! The refund transition is not optimistic. The gateway refund must
//! succeed before the return row is touched — refund-then-record, never
//! record-then-refund — so a return can never claim `refunded` without
//! money having moved.

use chrono::Utc;
use common::{OrderItemId, ReturnId, UserId};
use domain::{ReturnRequest, ReturnStatus, document_number};
use serde::Deserialize;
use store::Store;

use crate::adapters::{LabelBroker, PaymentGateway};
use crate::error::{OrchestratorError, Result};
use crate::notify::{Notification, Notifier};
use crate::orchestrator::Orchestrator;

/// One requested return line.
#[derive(Debug, Clone, Deserialize)]
pub struct ReturnLine {
    pub order_item_id: OrderItemId,
    pub quantity: u32,
}

/// A customer's return request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReturnRequest {
    pub order_id: common::OrderId,
    /// The requesting customer; absent when the session is anonymous.
    pub requester: Option<UserId>,
    pub items: Vec<ReturnLine>,
    pub reason: Option<String>,
}

impl<S, P, L, N> Orchestrator<S, P, L, N>
where
    S: Store,
    P: PaymentGateway,
    L: LabelBroker,
    N: Notifier,
{
    /// Creates a return request for a subset of an order's items.
    ///
    /// Ownership: the order's owner must match the requester. Guest orders
    /// (no owner on record) are exempt, since there is no account to check
    /// against.
    #[tracing::instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn create_return(&self, request: CreateReturnRequest) -> Result<ReturnRequest> {
        let order = self.require_order(request.order_id).await?;

        if let Some(owner) = order.user_id
            && request.requester != Some(owner)
        {
            return Err(OrchestratorError::Forbidden(
                "order belongs to a different customer".to_string(),
            ));
        }

        let order_items = self.store.get_order_items(order.id).await?;
        let requested: Vec<(OrderItemId, u32)> = request
            .items
            .iter()
            .map(|line| (line.order_item_id, line.quantity))
            .collect();

        let today = Utc::now().date_naive();
        let sequence = self.store.next_return_sequence(today).await?;
        let return_number =
            document_number(&self.policy.return_number_prefix, today, sequence);

        let return_request = ReturnRequest::new(
            ReturnId::new(),
            return_number,
            &order,
            &order_items,
            &requested,
            request.requester,
            request.reason,
            Utc::now(),
        )?;

        self.store.insert_return(return_request.clone()).await?;

        metrics::counter!("returns_requested_total").increment(1);
        tracing::info!(
            return_id = %return_request.id,
            return_number = %return_request.return_number,
            refund_amount = %return_request.refund_amount,
            "return requested"
        );

        self.dispatcher
            .dispatch(
                &order.contact.email,
                Notification::ReturnReceived {
                    return_number: return_request.return_number.clone(),
                    order_number: order.order_number.clone(),
                },
            )
            .await;

        Ok(return_request)
    }

    /// Admin operation: advances a return's status.
    ///
    /// A move to `refunded` first executes the gateway refund against the
    /// order's original payment with the return's frozen refund amount. On
    /// gateway failure the return keeps its prior status and the error
    /// surfaces to the admin; nothing is persisted.
    #[tracing::instrument(skip(self, admin_notes))]
    pub async fn update_return_status(
        &self,
        return_id: ReturnId,
        next: ReturnStatus,
        admin_notes: Option<String>,
    ) -> Result<ReturnRequest> {
        let mut return_request = self.require_return(return_id).await?;
        let order = self.require_order(return_request.order_id).await?;

        if next == ReturnStatus::Refunded {
            // Validate the transition before calling out, so a refund is
            // never attempted for a return that cannot accept it.
            if !return_request.status.can_transition_to(ReturnStatus::Refunded) {
                return Err(domain::ReturnError::InvalidTransition {
                    from: return_request.status,
                    to: ReturnStatus::Refunded,
                }
                .into());
            }
            let payment_id = order.payment_id.as_deref().ok_or_else(|| {
                OrchestratorError::Validation(
                    "order has no payment reference to refund".to_string(),
                )
            })?;

            // Fresh key per admin attempt; gateway-level retries of the
            // same attempt dedupe on it.
            let idempotency_key =
                format!("refund-{}-{}", return_id, Utc::now().timestamp_millis());
            let refund = self
                .payments
                .refund(payment_id, return_request.refund_amount, &idempotency_key)
                .await?;

            return_request.record_refund(refund.refund_id)?;
            if admin_notes.is_some() {
                return_request.admin_notes = admin_notes;
            }
            self.store.update_return(&return_request).await?;

            metrics::counter!("refunds_processed_total").increment(1);
            tracing::info!(
                %return_id,
                amount = %return_request.refund_amount,
                "refund processed"
            );

            self.dispatcher
                .dispatch(
                    &order.contact.email,
                    Notification::RefundProcessed {
                        return_number: return_request.return_number.clone(),
                        amount: return_request.refund_amount,
                    },
                )
                .await;

            return Ok(return_request);
        }

        return_request.transition_to(next)?;
        if admin_notes.is_some() {
            return_request.admin_notes = admin_notes;
        }
        self.store.update_return(&return_request).await?;
        tracing::info!(%return_id, status = %next, "return status updated");

        if next == ReturnStatus::Approved {
            self.dispatcher
                .dispatch(
                    &order.contact.email,
                    Notification::ReturnApproved {
                        return_number: return_request.return_number.clone(),
                        return_address: return_request.return_address.clone(),
                    },
                )
                .await;
        }

        Ok(return_request)
    }

    /// Customer operation: records the tracking number for an approved
    /// return and marks it shipped.
    #[tracing::instrument(skip(self, tracking_number))]
    pub async fn set_return_tracking(
        &self,
        return_id: ReturnId,
        requester: Option<UserId>,
        tracking_number: String,
    ) -> Result<ReturnRequest> {
        let mut return_request = self.require_return(return_id).await?;

        if let Some(owner) = return_request.user_id
            && requester != Some(owner)
        {
            return Err(OrchestratorError::Forbidden(
                "return belongs to a different customer".to_string(),
            ));
        }
        if tracking_number.trim().is_empty() {
            return Err(OrchestratorError::Validation(
                "a tracking number is required".to_string(),
            ));
        }

        return_request.mark_shipped(tracking_number)?;
        self.store.update_return(&return_request).await?;
        Ok(return_request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryLabelBroker, InMemoryPaymentGateway};
    use crate::notify::RecordingNotifier;
    use crate::policy::FulfillmentPolicy;
    use crate::testing;
    use domain::Money;
    use store::{MemoryStore, ReturnRepository};

    struct Fixture {
        orchestrator: Orchestrator<
            MemoryStore,
            InMemoryPaymentGateway,
            InMemoryLabelBroker,
            RecordingNotifier,
        >,
        store: MemoryStore,
        payments: InMemoryPaymentGateway,
        notifier: RecordingNotifier,
    }

    fn setup() -> Fixture {
        let store = MemoryStore::new();
        let payments = InMemoryPaymentGateway::new();
        let notifier = RecordingNotifier::new();
        let orchestrator = Orchestrator::new(
            store.clone(),
            payments.clone(),
            InMemoryLabelBroker::new(),
            notifier.clone(),
            FulfillmentPolicy::default(),
        );
        Fixture {
            orchestrator,
            store,
            payments,
            notifier,
        }
    }

    /// Seeds a paid order (total $54.32) whose payment the gateway knows.
    async fn seed_order(fx: &Fixture, user_id: Option<UserId>) -> (domain::Order, Vec<domain::OrderItem>) {
        let charge = fx
            .payments
            .charge("tok-visa", Money::from_cents(5432), "seed-order")
            .await
            .unwrap();
        testing::insert_order_with_items(&fx.store, user_id, &charge.payment_id).await
    }

    #[tokio::test]
    async fn test_return_one_item_of_order() {
        // Order total $54.32 (subtotal $50.00, $0 shipping, $4.32 tax);
        // returning the single $25.00 item refunds exactly $25.00.
        let fx = setup();
        let user = UserId::new();
        let (order, items) = seed_order(&fx, Some(user)).await;

        let ret = fx
            .orchestrator
            .create_return(CreateReturnRequest {
                order_id: order.id,
                requester: Some(user),
                items: vec![ReturnLine {
                    order_item_id: items[0].id,
                    quantity: 1,
                }],
                reason: Some("wrong size".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(ret.status, ReturnStatus::Pending);
        assert_eq!(ret.refund_amount.cents(), 2500);
        assert!(ret.return_number.starts_with("RET-"));
        assert_eq!(ret.return_address, order.shipping_address);
        assert_eq!(fx.notifier.sent_templates(), vec!["return-received"]);
    }

    #[tokio::test]
    async fn test_foreign_requester_rejected() {
        let fx = setup();
        let (order, items) = seed_order(&fx, Some(UserId::new())).await;

        let result = fx
            .orchestrator
            .create_return(CreateReturnRequest {
                order_id: order.id,
                requester: Some(UserId::new()),
                items: vec![ReturnLine {
                    order_item_id: items[0].id,
                    quantity: 1,
                }],
                reason: None,
            })
            .await;

        assert!(matches!(result, Err(OrchestratorError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_guest_order_allows_any_requester() {
        let fx = setup();
        let (order, items) = seed_order(&fx, None).await;

        let ret = fx
            .orchestrator
            .create_return(CreateReturnRequest {
                order_id: order.id,
                requester: Some(UserId::new()),
                items: vec![ReturnLine {
                    order_item_id: items[0].id,
                    quantity: 1,
                }],
                reason: None,
            })
            .await
            .unwrap();
        assert_eq!(ret.status, ReturnStatus::Pending);
    }

    #[tokio::test]
    async fn test_approval_notifies_with_return_address() {
        let fx = setup();
        let user = UserId::new();
        let (order, items) = seed_order(&fx, Some(user)).await;
        let ret = fx
            .orchestrator
            .create_return(CreateReturnRequest {
                order_id: order.id,
                requester: Some(user),
                items: vec![ReturnLine {
                    order_item_id: items[0].id,
                    quantity: 1,
                }],
                reason: None,
            })
            .await
            .unwrap();

        let updated = fx
            .orchestrator
            .update_return_status(ret.id, ReturnStatus::Approved, Some("ok to return".into()))
            .await
            .unwrap();

        assert_eq!(updated.status, ReturnStatus::Approved);
        assert_eq!(updated.admin_notes.as_deref(), Some("ok to return"));
        assert_eq!(
            fx.notifier.sent_templates(),
            vec!["return-received", "return-approved"]
        );
    }

    #[tokio::test]
    async fn test_refund_moves_money_then_records() {
        let fx = setup();
        let user = UserId::new();
        let (order, items) = seed_order(&fx, Some(user)).await;
        let ret = fx
            .orchestrator
            .create_return(CreateReturnRequest {
                order_id: order.id,
                requester: Some(user),
                items: vec![ReturnLine {
                    order_item_id: items[0].id,
                    quantity: 1,
                }],
                reason: None,
            })
            .await
            .unwrap();
        fx.orchestrator
            .update_return_status(ret.id, ReturnStatus::Approved, None)
            .await
            .unwrap();

        let refunded = fx
            .orchestrator
            .update_return_status(ret.id, ReturnStatus::Refunded, None)
            .await
            .unwrap();

        assert_eq!(refunded.status, ReturnStatus::Refunded);
        assert!(refunded.refund_transaction_id.is_some());
        assert_eq!(fx.payments.refund_count(), 1);
        let (payment_id, amount) = fx.payments.last_refund().unwrap();
        assert_eq!(Some(payment_id), order.payment_id);
        assert_eq!(amount.cents(), 2500);
        assert!(fx
            .notifier
            .sent_templates()
            .contains(&"refund-processed"));
    }

    #[tokio::test]
    async fn test_failed_refund_leaves_return_untouched() {
        let fx = setup();
        let user = UserId::new();
        let (order, items) = seed_order(&fx, Some(user)).await;
        let ret = fx
            .orchestrator
            .create_return(CreateReturnRequest {
                order_id: order.id,
                requester: Some(user),
                items: vec![ReturnLine {
                    order_item_id: items[0].id,
                    quantity: 1,
                }],
                reason: None,
            })
            .await
            .unwrap();
        fx.orchestrator
            .update_return_status(ret.id, ReturnStatus::Approved, None)
            .await
            .unwrap();

        fx.payments.set_fail_on_refund(true);
        let result = fx
            .orchestrator
            .update_return_status(ret.id, ReturnStatus::Refunded, None)
            .await;

        assert!(matches!(
            result,
            Err(OrchestratorError::ExternalService { .. })
        ));

        // Refund-then-record: the stored return still reads approved with
        // no transaction id.
        let stored = fx.store.get_return(ret.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReturnStatus::Approved);
        assert!(stored.refund_transaction_id.is_none());
        assert_eq!(fx.payments.refund_count(), 0);
    }

    #[tokio::test]
    async fn test_refund_on_terminal_return_never_calls_gateway() {
        let fx = setup();
        let user = UserId::new();
        let (order, items) = seed_order(&fx, Some(user)).await;
        let ret = fx
            .orchestrator
            .create_return(CreateReturnRequest {
                order_id: order.id,
                requester: Some(user),
                items: vec![ReturnLine {
                    order_item_id: items[0].id,
                    quantity: 1,
                }],
                reason: None,
            })
            .await
            .unwrap();
        fx.orchestrator
            .update_return_status(ret.id, ReturnStatus::Rejected, None)
            .await
            .unwrap();

        let result = fx
            .orchestrator
            .update_return_status(ret.id, ReturnStatus::Refunded, None)
            .await;

        assert!(matches!(result, Err(OrchestratorError::Domain(_))));
        assert_eq!(fx.payments.refund_count(), 0);
    }

    #[tokio::test]
    async fn test_customer_sets_tracking_after_approval() {
        let fx = setup();
        let user = UserId::new();
        let (order, items) = seed_order(&fx, Some(user)).await;
        let ret = fx
            .orchestrator
            .create_return(CreateReturnRequest {
                order_id: order.id,
                requester: Some(user),
                items: vec![ReturnLine {
                    order_item_id: items[0].id,
                    quantity: 1,
                }],
                reason: None,
            })
            .await
            .unwrap();

        // Not yet approved: setting tracking is an invalid transition.
        let early = fx
            .orchestrator
            .set_return_tracking(ret.id, Some(user), "1Z999".to_string())
            .await;
        assert!(matches!(early, Err(OrchestratorError::Domain(_))));

        fx.orchestrator
            .update_return_status(ret.id, ReturnStatus::Approved, None)
            .await
            .unwrap();

        // A different customer cannot attach tracking.
        let foreign = fx
            .orchestrator
            .set_return_tracking(ret.id, Some(UserId::new()), "1Z999".to_string())
            .await;
        assert!(matches!(foreign, Err(OrchestratorError::Forbidden(_))));

        let shipped = fx
            .orchestrator
            .set_return_tracking(ret.id, Some(user), "1Z999".to_string())
            .await
            .unwrap();
        assert_eq!(shipped.status, ReturnStatus::Shipped);
        assert_eq!(shipped.return_tracking_number.as_deref(), Some("1Z999"));
    }

    #[tokio::test]
    async fn test_return_for_unknown_order() {
        let fx = setup();
        let result = fx
            .orchestrator
            .create_return(CreateReturnRequest {
                order_id: common::OrderId::new(),
                requester: None,
                items: vec![],
                reason: None,
            })
            .await;
        assert!(matches!(result, Err(OrchestratorError::NotFound { .. })));
    }
}
