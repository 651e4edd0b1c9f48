//! Payment gateway adapter trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::Money;

use crate::error::OrchestratorError;

/// Result of a successful charge.
#[derive(Debug, Clone)]
pub struct ChargeResult {
    /// The payment ID assigned by the gateway.
    pub payment_id: String,
}

/// Result of a successful refund.
#[derive(Debug, Clone)]
pub struct RefundResult {
    /// The refund transaction ID assigned by the gateway.
    pub refund_id: String,
}

/// Trait for payment capture and refund operations.
///
/// Both operations take an idempotency key so a retried request has the
/// same effect as the original, not a duplicate charge or refund.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges a payment source token.
    async fn charge(
        &self,
        source_token: &str,
        amount: Money,
        idempotency_key: &str,
    ) -> Result<ChargeResult, OrchestratorError>;

    /// Refunds part or all of a previously captured payment.
    async fn refund(
        &self,
        payment_id: &str,
        amount: Money,
        idempotency_key: &str,
    ) -> Result<RefundResult, OrchestratorError>;
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    charges_by_key: HashMap<String, ChargeResult>,
    refunds_by_key: HashMap<String, RefundResult>,
    payments: HashMap<String, Money>,
    refunds: Vec<(String, Money)>,
    next_id: u32,
    fail_on_charge: bool,
    fail_on_refund: bool,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory payment gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to decline charges.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.state.write().unwrap().fail_on_charge = fail;
    }

    /// Configures the gateway to reject refunds.
    pub fn set_fail_on_refund(&self, fail: bool) {
        self.state.write().unwrap().fail_on_refund = fail;
    }

    /// Returns the number of captured payments.
    pub fn charge_count(&self) -> usize {
        self.state.read().unwrap().payments.len()
    }

    /// Returns the number of executed refunds.
    pub fn refund_count(&self) -> usize {
        self.state.read().unwrap().refunds.len()
    }

    /// Returns the last executed refund as (payment_id, amount).
    pub fn last_refund(&self) -> Option<(String, Money)> {
        self.state.read().unwrap().refunds.last().cloned()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn charge(
        &self,
        _source_token: &str,
        amount: Money,
        idempotency_key: &str,
    ) -> Result<ChargeResult, OrchestratorError> {
        let mut state = self.state.write().unwrap();

        if let Some(existing) = state.charges_by_key.get(idempotency_key) {
            return Ok(existing.clone());
        }

        if state.fail_on_charge {
            return Err(OrchestratorError::Payment("card declined".to_string()));
        }

        state.next_id += 1;
        let result = ChargeResult {
            payment_id: format!("PAY-{:04}", state.next_id),
        };
        state.payments.insert(result.payment_id.clone(), amount);
        state
            .charges_by_key
            .insert(idempotency_key.to_string(), result.clone());

        Ok(result)
    }

    async fn refund(
        &self,
        payment_id: &str,
        amount: Money,
        idempotency_key: &str,
    ) -> Result<RefundResult, OrchestratorError> {
        let mut state = self.state.write().unwrap();

        if let Some(existing) = state.refunds_by_key.get(idempotency_key) {
            return Ok(existing.clone());
        }

        if state.fail_on_refund {
            return Err(OrchestratorError::ExternalService {
                service: "payment gateway",
                message: "refund rejected".to_string(),
            });
        }

        if !state.payments.contains_key(payment_id) {
            return Err(OrchestratorError::ExternalService {
                service: "payment gateway",
                message: format!("unknown payment: {payment_id}"),
            });
        }

        state.next_id += 1;
        let result = RefundResult {
            refund_id: format!("REF-{:04}", state.next_id),
        };
        state.refunds.push((payment_id.to_string(), amount));
        state
            .refunds_by_key
            .insert(idempotency_key.to_string(), result.clone());

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_charge_and_refund() {
        let gateway = InMemoryPaymentGateway::new();

        let charge = gateway
            .charge("tok-visa", Money::from_cents(5000), "order-1")
            .await
            .unwrap();
        assert!(charge.payment_id.starts_with("PAY-"));
        assert_eq!(gateway.charge_count(), 1);

        let refund = gateway
            .refund(&charge.payment_id, Money::from_cents(2500), "refund-1")
            .await
            .unwrap();
        assert!(refund.refund_id.starts_with("REF-"));
        assert_eq!(gateway.refund_count(), 1);
        assert_eq!(
            gateway.last_refund(),
            Some((charge.payment_id, Money::from_cents(2500)))
        );
    }

    #[tokio::test]
    async fn test_charge_is_idempotent_per_key() {
        let gateway = InMemoryPaymentGateway::new();

        let first = gateway
            .charge("tok-visa", Money::from_cents(5000), "order-1")
            .await
            .unwrap();
        let retried = gateway
            .charge("tok-visa", Money::from_cents(5000), "order-1")
            .await
            .unwrap();

        assert_eq!(first.payment_id, retried.payment_id);
        assert_eq!(gateway.charge_count(), 1);
    }

    #[tokio::test]
    async fn test_refund_is_idempotent_per_key() {
        let gateway = InMemoryPaymentGateway::new();
        let charge = gateway
            .charge("tok-visa", Money::from_cents(5000), "order-1")
            .await
            .unwrap();

        let first = gateway
            .refund(&charge.payment_id, Money::from_cents(5000), "refund-1")
            .await
            .unwrap();
        let retried = gateway
            .refund(&charge.payment_id, Money::from_cents(5000), "refund-1")
            .await
            .unwrap();

        assert_eq!(first.refund_id, retried.refund_id);
        assert_eq!(gateway.refund_count(), 1);
    }

    #[tokio::test]
    async fn test_fail_on_charge() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_fail_on_charge(true);

        let result = gateway
            .charge("tok-visa", Money::from_cents(5000), "order-1")
            .await;
        assert!(matches!(result, Err(OrchestratorError::Payment(_))));
        assert_eq!(gateway.charge_count(), 0);
    }

    #[tokio::test]
    async fn test_refund_unknown_payment() {
        let gateway = InMemoryPaymentGateway::new();
        let result = gateway
            .refund("PAY-9999", Money::from_cents(100), "refund-1")
            .await;
        assert!(matches!(
            result,
            Err(OrchestratorError::ExternalService { .. })
        ));
    }
}
