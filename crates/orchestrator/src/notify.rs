//! Lifecycle notifications: fire-and-forget emails keyed to transitions.
//!
//! A notification failure must never fail the workflow that triggered it;
//! the dispatcher logs and swallows every error.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{Address, Money};

use crate::error::OrchestratorError;

/// A lifecycle event worth telling the customer about.
#[derive(Debug, Clone)]
pub enum Notification {
    /// Order confirmation. The hook exists but dispatch is gated by
    /// policy (`send_order_confirmation`), currently off.
    OrderCreated {
        order_number: String,
        total: Money,
    },
    /// Return request received and pending review.
    ReturnReceived {
        return_number: String,
        order_number: String,
    },
    /// Return approved; includes where to send the items.
    ReturnApproved {
        return_number: String,
        return_address: Address,
    },
    /// Refund executed.
    RefundProcessed {
        return_number: String,
        amount: Money,
    },
    /// Label purchased; the order is on its way.
    ShipmentConfirmed {
        order_number: String,
        carrier: String,
        tracking_number: String,
    },
}

impl Notification {
    /// Template key for the delivery provider.
    pub fn template_key(&self) -> &'static str {
        match self {
            Notification::OrderCreated { .. } => "order-created",
            Notification::ReturnReceived { .. } => "return-received",
            Notification::ReturnApproved { .. } => "return-approved",
            Notification::RefundProcessed { .. } => "refund-processed",
            Notification::ShipmentConfirmed { .. } => "shipment-confirmed",
        }
    }
}

/// Trait for the notification delivery provider.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one notification to one recipient.
    async fn send(
        &self,
        recipient: &str,
        notification: &Notification,
    ) -> Result<(), OrchestratorError>;
}

/// Best-effort wrapper around a [`Notifier`].
#[derive(Debug, Clone)]
pub struct NotificationDispatcher<N> {
    notifier: N,
}

impl<N: Notifier> NotificationDispatcher<N> {
    /// Creates a dispatcher around a delivery provider.
    pub fn new(notifier: N) -> Self {
        Self { notifier }
    }

    /// Sends a notification, logging and swallowing any failure.
    pub async fn dispatch(&self, recipient: &str, notification: Notification) {
        if let Err(err) = self.notifier.send(recipient, &notification).await {
            metrics::counter!("notifications_failed_total").increment(1);
            tracing::warn!(
                template = notification.template_key(),
                error = %err,
                "notification delivery failed"
            );
        }
    }
}

#[derive(Debug, Default)]
struct RecordingState {
    sent: Vec<(String, Notification)>,
    fail_on_send: bool,
}

/// In-memory notifier that records what was sent, for tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    state: Arc<RwLock<RecordingState>>,
}

impl RecordingNotifier {
    /// Creates a new recording notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the notifier to fail deliveries.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.write().unwrap().fail_on_send = fail;
    }

    /// Returns every (recipient, notification) delivered so far.
    pub fn sent(&self) -> Vec<(String, Notification)> {
        self.state.read().unwrap().sent.clone()
    }

    /// Returns the template keys delivered so far, in order.
    pub fn sent_templates(&self) -> Vec<&'static str> {
        self.state
            .read()
            .unwrap()
            .sent
            .iter()
            .map(|(_, n)| n.template_key())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        recipient: &str,
        notification: &Notification,
    ) -> Result<(), OrchestratorError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_send {
            return Err(OrchestratorError::ExternalService {
                service: "notifier",
                message: "delivery failed".to_string(),
            });
        }

        state
            .sent
            .push((recipient.to_string(), notification.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatch_records_delivery() {
        let notifier = RecordingNotifier::new();
        let dispatcher = NotificationDispatcher::new(notifier.clone());

        dispatcher
            .dispatch(
                "jordan@example.com",
                Notification::RefundProcessed {
                    return_number: "RET-20250310-0001".to_string(),
                    amount: Money::from_cents(2500),
                },
            )
            .await;

        assert_eq!(notifier.sent_templates(), vec!["refund-processed"]);
        assert_eq!(notifier.sent()[0].0, "jordan@example.com");
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let notifier = RecordingNotifier::new();
        notifier.set_fail_on_send(true);
        let dispatcher = NotificationDispatcher::new(notifier.clone());

        // Must not panic or propagate the error.
        dispatcher
            .dispatch(
                "jordan@example.com",
                Notification::ReturnReceived {
                    return_number: "RET-20250310-0001".to_string(),
                    order_number: "ORD-20250307-0001".to_string(),
                },
            )
            .await;

        assert!(notifier.sent().is_empty());
    }
}
