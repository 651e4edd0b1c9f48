//! Label broker adapter trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{Address, Money, Parcel};

use crate::error::OrchestratorError;

/// One purchasable rate quoted by the broker.
#[derive(Debug, Clone)]
pub struct RateQuote {
    /// Broker-side rate id, used to purchase the label.
    pub rate_id: String,
    /// Carrier token, e.g. `usps`.
    pub carrier: String,
    /// Service level display name.
    pub service: String,
    pub amount: Money,
}

/// A broker shipment quote: the broker-side shipment id plus its rates.
#[derive(Debug, Clone)]
pub struct ShipmentQuote {
    pub shipment_id: String,
    pub rates: Vec<RateQuote>,
}

/// A purchased label.
#[derive(Debug, Clone)]
pub struct LabelPurchase {
    pub transaction_id: String,
    pub tracking_number: String,
    pub label_url: String,
}

/// Trait for shipping label quote and purchase operations.
#[async_trait]
pub trait LabelBroker: Send + Sync {
    /// Creates a shipment quote for the given addresses and parcel.
    async fn create_shipment(
        &self,
        from: &Address,
        to: &Address,
        parcel: &Parcel,
    ) -> Result<ShipmentQuote, OrchestratorError>;

    /// Purchases the label for a previously quoted rate.
    async fn purchase_label(&self, rate_id: &str) -> Result<LabelPurchase, OrchestratorError>;
}

#[derive(Debug)]
struct InMemoryBrokerState {
    rates: Vec<RateQuote>,
    last_destination: Option<Address>,
    purchases: Vec<String>,
    next_id: u32,
    fail_on_create: bool,
    fail_on_purchase: bool,
}

impl Default for InMemoryBrokerState {
    fn default() -> Self {
        Self {
            rates: vec![
                RateQuote {
                    rate_id: "RATE-usps-priority".to_string(),
                    carrier: "usps".to_string(),
                    service: "Priority Mail".to_string(),
                    amount: Money::from_cents(850),
                },
                RateQuote {
                    rate_id: "RATE-usps-ground".to_string(),
                    carrier: "usps".to_string(),
                    service: "Ground Advantage".to_string(),
                    amount: Money::from_cents(620),
                },
                RateQuote {
                    rate_id: "RATE-fedex-ground".to_string(),
                    carrier: "fedex".to_string(),
                    service: "FedEx Ground".to_string(),
                    amount: Money::from_cents(580),
                },
            ],
            last_destination: None,
            purchases: Vec::new(),
            next_id: 0,
            fail_on_create: false,
            fail_on_purchase: false,
        }
    }
}

/// In-memory label broker for testing.
///
/// Quotes a fixed rate table; the default table includes a cheap rate from
/// a carrier that needs account registration, exercising the rate
/// selection policy.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLabelBroker {
    state: Arc<RwLock<InMemoryBrokerState>>,
}

impl InMemoryLabelBroker {
    /// Creates a new in-memory label broker with the default rate table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the quoted rate table.
    pub fn set_rates(&self, rates: Vec<RateQuote>) {
        self.state.write().unwrap().rates = rates;
    }

    /// Configures the broker to fail shipment quotes.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Configures the broker to fail label purchases.
    pub fn set_fail_on_purchase(&self, fail: bool) {
        self.state.write().unwrap().fail_on_purchase = fail;
    }

    /// Returns the number of purchased labels.
    pub fn purchase_count(&self) -> usize {
        self.state.read().unwrap().purchases.len()
    }

    /// Returns the destination address of the most recent quote.
    pub fn last_destination(&self) -> Option<Address> {
        self.state.read().unwrap().last_destination.clone()
    }
}

#[async_trait]
impl LabelBroker for InMemoryLabelBroker {
    async fn create_shipment(
        &self,
        _from: &Address,
        to: &Address,
        _parcel: &Parcel,
    ) -> Result<ShipmentQuote, OrchestratorError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(OrchestratorError::ExternalService {
                service: "label broker",
                message: "shipment quote failed".to_string(),
            });
        }

        state.last_destination = Some(to.clone());
        state.next_id += 1;
        Ok(ShipmentQuote {
            shipment_id: format!("SHP-{:04}", state.next_id),
            rates: state.rates.clone(),
        })
    }

    async fn purchase_label(&self, rate_id: &str) -> Result<LabelPurchase, OrchestratorError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_purchase {
            return Err(OrchestratorError::ExternalService {
                service: "label broker",
                message: "label purchase failed".to_string(),
            });
        }

        if !state.rates.iter().any(|r| r.rate_id == rate_id) {
            return Err(OrchestratorError::ExternalService {
                service: "label broker",
                message: format!("unknown rate: {rate_id}"),
            });
        }

        state.next_id += 1;
        let transaction_id = format!("TXN-{:04}", state.next_id);
        let purchase = LabelPurchase {
            tracking_number: format!("TRK-{:04}", state.next_id),
            label_url: format!("https://labels.example.com/{transaction_id}.pdf"),
            transaction_id,
        };
        state.purchases.push(rate_id.to_string());

        Ok(purchase)
    }
}
