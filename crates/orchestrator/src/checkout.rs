//! Checkout workflow: validate, reserve stock, charge, persist.
//!
//! The sequence is strict and each step gates the next. Stock is reserved
//! with atomic check-and-decrements before the charge and released again if
//! payment declines, so a failed checkout leaves no persistent state. The
//! one gap that cannot be compensated automatically — a captured payment
//! whose order write then fails — is logged loudly for manual
//! reconciliation instead of being silently accepted.

use chrono::Utc;
use common::{OrderId, ProductId, UserId};
use domain::{Address, CustomerContact, Money, Order, OrderItem, OrderStatus, document_number};
use serde::{Deserialize, Serialize};
use store::{Store, StoreError};

use crate::adapters::{LabelBroker, PaymentGateway};
use crate::error::{OrchestratorError, Result, StockShortfall};
use crate::notify::{Notification, Notifier};
use crate::orchestrator::Orchestrator;

/// One cart line in a checkout request.
#[derive(Debug, Clone, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A checkout request from the storefront.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    /// Absent for guest checkout.
    pub user_id: Option<UserId>,
    pub contact: CustomerContact,
    pub shipping_address: Address,
    pub billing_address: Address,
    /// Payment source token produced by the gateway's client SDK.
    pub payment_token: String,
    pub items: Vec<CartItem>,
}

/// What the storefront needs back after a successful checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
}

impl<S, P, L, N> Orchestrator<S, P, L, N>
where
    S: Store,
    P: PaymentGateway,
    L: LabelBroker,
    N: Notifier,
{
    /// Places an order.
    ///
    /// Sequence: validate cart and addresses; reserve stock per line
    /// (collecting every shortfall so the customer sees an itemized list,
    /// and rejecting the whole order on any shortfall — no partial
    /// orders); charge the payment before any order row exists; persist
    /// the order and its items atomically; fire the (policy-gated) order
    /// confirmation.
    #[tracing::instrument(skip(self, request), fields(user_id = ?request.user_id))]
    pub async fn place_order(&self, request: CheckoutRequest) -> Result<CheckoutReceipt> {
        metrics::counter!("checkout_attempts_total").increment(1);

        self.validate_checkout(&request)?;

        // Capture unit prices now; the order items keep these forever.
        let mut priced = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let product = self.store.get_product(line.product_id).await?.ok_or(
                OrchestratorError::NotFound {
                    entity: "product",
                    id: line.product_id.to_string(),
                },
            )?;
            if !product.is_active {
                return Err(OrchestratorError::Validation(format!(
                    "product '{}' is no longer available",
                    product.title
                )));
            }
            priced.push((product, line.quantity));
        }

        // Reserve stock line by line. Each reservation is an atomic
        // check-and-decrement; concurrent checkouts serialize here.
        let mut reserved: Vec<(ProductId, u32)> = Vec::new();
        let mut shortfalls: Vec<StockShortfall> = Vec::new();
        for (product, quantity) in &priced {
            match self.store.reserve_stock(product.id, *quantity).await {
                Ok(()) => reserved.push((product.id, *quantity)),
                Err(StoreError::InsufficientStock {
                    requested,
                    available,
                    ..
                }) => shortfalls.push(StockShortfall {
                    product_id: product.id,
                    title: product.title.clone(),
                    requested,
                    available,
                }),
                Err(err) => {
                    self.release_reservations(&reserved).await;
                    return Err(err.into());
                }
            }
        }
        if !shortfalls.is_empty() {
            self.release_reservations(&reserved).await;
            metrics::counter!("checkout_stock_rejections_total").increment(1);
            return Err(OrchestratorError::InsufficientStock { shortfalls });
        }

        let subtotal: Money = priced
            .iter()
            .map(|(product, quantity)| product.price.multiply(*quantity))
            .sum();
        let tax = self.policy.tax_for(subtotal);
        let shipping = self.policy.shipping_for(subtotal);
        let total = subtotal + tax + shipping;

        // Charge before creating the order row: no order records for
        // failed payments. The key makes a gateway-level retry safe.
        let order_id = OrderId::new();
        let idempotency_key = format!("order-{order_id}");
        let charge = match self
            .payments
            .charge(&request.payment_token, total, &idempotency_key)
            .await
        {
            Ok(charge) => charge,
            Err(err) => {
                self.release_reservations(&reserved).await;
                metrics::counter!("checkout_payment_failures_total").increment(1);
                return Err(err);
            }
        };

        let today = Utc::now().date_naive();
        let order_number = match self.store.next_order_sequence(today).await {
            Ok(seq) => document_number(&self.policy.order_number_prefix, today, seq),
            Err(err) => {
                self.report_orphaned_payment(order_id, &charge.payment_id, &err);
                self.release_reservations(&reserved).await;
                return Err(err.into());
            }
        };

        let order = Order::new(
            order_id,
            order_number.clone(),
            request.user_id,
            subtotal,
            tax,
            shipping,
            request.shipping_address.clone(),
            request.billing_address.clone(),
            request.contact.clone(),
            Some(charge.payment_id.clone()),
            Utc::now(),
        );
        let status = order.status;
        let items: Vec<OrderItem> = priced
            .iter()
            .map(|(product, quantity)| {
                OrderItem::new(order_id, product.id, *quantity, product.price)
            })
            .collect();

        if let Err(err) = self.store.insert_order(order, items).await {
            // The most dangerous failure in the system: money moved but no
            // order exists. No automatic refund; reconcile manually.
            self.report_orphaned_payment(order_id, &charge.payment_id, &err);
            self.release_reservations(&reserved).await;
            return Err(err.into());
        }

        if self.policy.send_order_confirmation {
            self.dispatcher
                .dispatch(
                    &request.contact.email,
                    Notification::OrderCreated {
                        order_number: order_number.clone(),
                        total,
                    },
                )
                .await;
        }

        metrics::counter!("checkout_orders_total").increment(1);
        tracing::info!(%order_id, %order_number, total = %total, "order placed");

        Ok(CheckoutReceipt {
            order_id,
            order_number,
            status,
            subtotal,
            tax,
            shipping,
            total,
        })
    }

    fn validate_checkout(&self, request: &CheckoutRequest) -> Result<()> {
        if request.items.is_empty() {
            return Err(OrchestratorError::Validation("cart is empty".to_string()));
        }
        if request.items.iter().any(|line| line.quantity == 0) {
            return Err(OrchestratorError::Validation(
                "item quantities must be at least 1".to_string(),
            ));
        }
        if !request.contact.has_email() {
            return Err(OrchestratorError::Validation(
                "a contact email is required".to_string(),
            ));
        }
        for (label, address) in [
            ("shipping address", &request.shipping_address),
            ("billing address", &request.billing_address),
        ] {
            let missing = address.missing_fields();
            if !missing.is_empty() {
                return Err(OrchestratorError::Validation(format!(
                    "{label} is missing: {}",
                    missing.join(", ")
                )));
            }
        }
        if request.payment_token.trim().is_empty() {
            return Err(OrchestratorError::Validation(
                "a payment token is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns reserved stock after a failed checkout. Best-effort: a
    /// release failure is logged, not propagated over the original error.
    async fn release_reservations(&self, reserved: &[(ProductId, u32)]) {
        for (product_id, quantity) in reserved {
            if let Err(err) = self.store.release_stock(*product_id, *quantity).await {
                tracing::error!(
                    %product_id,
                    quantity,
                    error = %err,
                    "failed to release reserved stock"
                );
            }
        }
    }

    fn report_orphaned_payment(
        &self,
        order_id: OrderId,
        payment_id: &str,
        err: &dyn std::fmt::Display,
    ) {
        metrics::counter!("checkout_orphaned_payments_total").increment(1);
        tracing::error!(
            %order_id,
            payment_id,
            error = %err,
            "payment captured but order creation failed; manual reconciliation required"
        );
    }
}
