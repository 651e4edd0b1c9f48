//! The orchestrator: the only component that writes multiple aggregates
//! within one logical workflow.

use common::{OrderId, ReturnId};
use domain::{Order, OrderStatus, ReturnRequest};
use store::Store;

use crate::adapters::{LabelBroker, PaymentGateway};
use crate::error::{OrchestratorError, Result};
use crate::notify::{NotificationDispatcher, Notifier};
use crate::policy::FulfillmentPolicy;

/// Drives the checkout, return, refund, and label workflows.
///
/// Every external collaborator is injected: the store behind repository
/// traits, the payment gateway, the label broker, and the notifier. Tests
/// substitute the in-memory doubles for all four.
pub struct Orchestrator<S, P, L, N>
where
    S: Store,
    P: PaymentGateway,
    L: LabelBroker,
    N: Notifier,
{
    pub(crate) store: S,
    pub(crate) payments: P,
    pub(crate) broker: L,
    pub(crate) dispatcher: NotificationDispatcher<N>,
    pub(crate) policy: FulfillmentPolicy,
}

impl<S, P, L, N> Orchestrator<S, P, L, N>
where
    S: Store,
    P: PaymentGateway,
    L: LabelBroker,
    N: Notifier,
{
    /// Creates a new orchestrator.
    pub fn new(store: S, payments: P, broker: L, notifier: N, policy: FulfillmentPolicy) -> Self {
        Self {
            store,
            payments,
            broker,
            dispatcher: NotificationDispatcher::new(notifier),
            policy,
        }
    }

    /// Returns the active policy.
    pub fn policy(&self) -> &FulfillmentPolicy {
        &self.policy
    }

    /// Loads an order or fails with a typed not-found error.
    pub(crate) async fn require_order(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or(OrchestratorError::NotFound {
                entity: "order",
                id: order_id.to_string(),
            })
    }

    /// Loads a return request or fails with a typed not-found error.
    pub(crate) async fn require_return(&self, return_id: ReturnId) -> Result<ReturnRequest> {
        self.store
            .get_return(return_id)
            .await?
            .ok_or(OrchestratorError::NotFound {
                entity: "return",
                id: return_id.to_string(),
            })
    }

    /// Admin operation: advances an order's status through the transition
    /// table (ship, deliver, cancel).
    #[tracing::instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<Order> {
        let mut order = self.require_order(order_id).await?;
        order.transition_to(next)?;
        self.store.update_order_status(order_id, next).await?;
        tracing::info!(%order_id, status = %next, "order status updated");
        Ok(order)
    }
}
