//! Application configuration loaded from environment variables.

use domain::{Address, Money};
use orchestrator::FulfillmentPolicy;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `ORDER_NUMBER_PREFIX` / `RETURN_NUMBER_PREFIX` — document numbering
/// - `TAX_RATE_BPS` — sales tax in basis points
/// - `FLAT_SHIPPING_CENTS` / `FREE_SHIPPING_THRESHOLD_CENTS` — shipping
/// - `SEND_ORDER_CONFIRMATION` — `"true"` to enable the order email
/// - `ORIGIN_NAME`, `ORIGIN_STREET`, `ORIGIN_CITY`, `ORIGIN_STATE`,
///   `ORIGIN_ZIP`, `ORIGIN_COUNTRY` — label origin address; label
///   generation fails with a configuration error until these are set
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub policy: FulfillmentPolicy,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut policy = FulfillmentPolicy::default();

        if let Ok(prefix) = std::env::var("ORDER_NUMBER_PREFIX") {
            policy.order_number_prefix = prefix;
        }
        if let Ok(prefix) = std::env::var("RETURN_NUMBER_PREFIX") {
            policy.return_number_prefix = prefix;
        }
        if let Some(bps) = env_parse("TAX_RATE_BPS") {
            policy.tax_rate_bps = bps;
        }
        if let Some(cents) = env_parse("FLAT_SHIPPING_CENTS") {
            policy.flat_shipping = Money::from_cents(cents);
        }
        if let Some(cents) = env_parse("FREE_SHIPPING_THRESHOLD_CENTS") {
            policy.free_shipping_threshold = Some(Money::from_cents(cents));
        }
        if let Ok(flag) = std::env::var("SEND_ORDER_CONFIRMATION") {
            policy.send_order_confirmation = flag == "true" || flag == "1";
        }
        policy.origin_address = origin_from_env();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            policy,
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            policy: FulfillmentPolicy::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Builds the origin address when every required variable is present.
fn origin_from_env() -> Option<Address> {
    let name = std::env::var("ORIGIN_NAME").ok()?;
    let line1 = std::env::var("ORIGIN_STREET").ok()?;
    let city = std::env::var("ORIGIN_CITY").ok()?;
    let zip = std::env::var("ORIGIN_ZIP").ok()?;
    Some(Address {
        name,
        line1,
        line2: None,
        city,
        state: std::env::var("ORIGIN_STATE").unwrap_or_default(),
        zip,
        country: std::env::var("ORIGIN_COUNTRY").unwrap_or_else(|_| "US".to_string()),
    })
}
