//! Lifecycle orchestration for the storefront.
//!
//! This crate coordinates the multi-system workflows — checkout, returns,
//! refunds, and shipping-label purchases — against the store's repository
//! traits and injected adapters for the payment gateway, label broker, and
//! notification provider.
//!
//! The workflows are sagas, not transactions: each step writes a durable
//! breadcrumb (the order row after the charge, the pending shipment row
//! before the broker call) so a crash mid-sequence stays auditable, and
//! compensations (stock release, refund-then-record ordering) keep the
//! aggregates honest when an external call fails.

pub mod adapters;
pub mod checkout;
pub mod error;
pub mod labels;
pub mod notify;
pub mod orchestrator;
pub mod policy;
pub mod returns;

#[cfg(test)]
pub(crate) mod testing;

pub use adapters::{
    ChargeResult, InMemoryLabelBroker, InMemoryPaymentGateway, LabelBroker, LabelPurchase,
    PaymentGateway, RateQuote, RefundResult, ShipmentQuote,
};
pub use checkout::{CartItem, CheckoutReceipt, CheckoutRequest};
pub use error::{OrchestratorError, Result, StockShortfall};
pub use notify::{Notification, NotificationDispatcher, Notifier, RecordingNotifier};
pub use orchestrator::Orchestrator;
pub use policy::FulfillmentPolicy;
pub use returns::{CreateReturnRequest, ReturnLine};
