//! Workflow policy configuration: pricing, numbering, parcels, carriers.

use domain::{Address, Money, Parcel};

use crate::adapters::RateQuote;
use crate::error::OrchestratorError;

/// Operator-configured policy for the fulfillment workflows.
#[derive(Debug, Clone)]
pub struct FulfillmentPolicy {
    /// Prefix for order numbers (`ORD-YYYYMMDD-NNNN`).
    pub order_number_prefix: String,
    /// Prefix for return numbers.
    pub return_number_prefix: String,
    /// Sales tax rate in basis points (625 = 6.25%).
    pub tax_rate_bps: u32,
    /// Flat shipping charge below the free-shipping threshold.
    pub flat_shipping: Money,
    /// Subtotal at which shipping becomes free, if any.
    pub free_shipping_threshold: Option<Money>,
    /// Origin ("from") address for label purchases. Label generation fails
    /// fast with a configuration error when absent.
    pub origin_address: Option<Address>,
    /// Default parcel dimensions in inches.
    pub parcel_length: f64,
    pub parcel_width: f64,
    pub parcel_height: f64,
    /// Weight estimation: ounces per item.
    pub per_item_weight_oz: f64,
    /// Weight estimation: floor in ounces (packaging dominates).
    pub min_parcel_weight_oz: f64,
    /// Carrier tokens whose rates need a registered carrier account.
    /// Rates from these carriers are never auto-purchased.
    pub registration_required_carriers: Vec<String>,
    /// Whether to send the order confirmation email. Off by product
    /// decision; the dispatch hook stays in place.
    pub send_order_confirmation: bool,
}

impl Default for FulfillmentPolicy {
    fn default() -> Self {
        Self {
            order_number_prefix: "ORD".to_string(),
            return_number_prefix: "RET".to_string(),
            tax_rate_bps: 625,
            flat_shipping: Money::from_cents(599),
            free_shipping_threshold: Some(Money::from_cents(7500)),
            origin_address: None,
            parcel_length: 8.0,
            parcel_width: 6.0,
            parcel_height: 2.0,
            per_item_weight_oz: 1.5,
            min_parcel_weight_oz: 4.0,
            registration_required_carriers: vec!["fedex".to_string(), "ups".to_string()],
            send_order_confirmation: false,
        }
    }
}

impl FulfillmentPolicy {
    /// Shipping charge for a given subtotal.
    pub fn shipping_for(&self, subtotal: Money) -> Money {
        match self.free_shipping_threshold {
            Some(threshold) if subtotal >= threshold => Money::zero(),
            _ => self.flat_shipping,
        }
    }

    /// Tax for a given subtotal.
    pub fn tax_for(&self, subtotal: Money) -> Money {
        subtotal.percentage_bps(self.tax_rate_bps)
    }

    /// Builds the parcel for a given total item count.
    pub fn parcel_for(&self, item_count: u32) -> Parcel {
        Parcel {
            length: self.parcel_length,
            width: self.parcel_width,
            height: self.parcel_height,
            weight_oz: Parcel::estimate_weight(
                item_count,
                self.per_item_weight_oz,
                self.min_parcel_weight_oz,
            ),
        }
    }

    /// Returns true if rates from this carrier need a registered account.
    pub fn requires_registration(&self, carrier: &str) -> bool {
        self.registration_required_carriers
            .iter()
            .any(|c| c.eq_ignore_ascii_case(carrier))
    }

    /// Picks the rate to purchase: the cheapest positively-priced rate from
    /// a carrier that needs no account registration.
    ///
    /// When the only usable rates belong to registration-required carriers,
    /// this fails explicitly with remediation text instead of silently
    /// purchasing a label the shop cannot use.
    pub fn select_rate<'a>(
        &self,
        rates: &'a [RateQuote],
    ) -> Result<&'a RateQuote, OrchestratorError> {
        let priced: Vec<&RateQuote> = rates.iter().filter(|r| r.amount.is_positive()).collect();
        if priced.is_empty() {
            return Err(OrchestratorError::ExternalService {
                service: "label broker",
                message: "no usable rates returned for shipment".to_string(),
            });
        }

        let selected = priced
            .iter()
            .copied()
            .filter(|r| !self.requires_registration(&r.carrier))
            .min_by_key(|r| r.amount);

        match selected {
            Some(rate) => Ok(rate),
            None => {
                let carriers: Vec<&str> = priced.iter().map(|r| r.carrier.as_str()).collect();
                Err(OrchestratorError::ExternalService {
                    service: "label broker",
                    message: format!(
                        "carrier account not registered for {} — register the account or enable a fallback carrier",
                        carriers.join(", ")
                    ),
                })
            }
        }
    }
}
