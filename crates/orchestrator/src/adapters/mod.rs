//! Adapter traits for external services, with in-memory test doubles.

pub mod payment;
pub mod shipping;

pub use payment::{ChargeResult, InMemoryPaymentGateway, PaymentGateway, RefundResult};
pub use shipping::{InMemoryLabelBroker, LabelBroker, LabelPurchase, RateQuote, ShipmentQuote};
