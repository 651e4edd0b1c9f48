//! Shared typed identifiers used across the storefront crates.
//!
//! Every entity gets its own UUID newtype so order ids, return ids, and
//! product ids cannot be mixed up at compile time.

pub mod types;

pub use types::{OrderId, OrderItemId, ProductId, ReturnId, ShipmentId, UserId};
