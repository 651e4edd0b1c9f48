//! Storage layer for the storefront order-lifecycle system.
//!
//! This crate provides:
//! - Repository traits per aggregate (products/inventory, orders, returns,
//!   shipments) plus the combined [`Store`] bound the orchestrator uses
//! - [`MemoryStore`], an in-memory implementation for tests
//! - [`PgStore`], the PostgreSQL implementation (schema in `migrations/`)

pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repository::{
    OrderRepository, ProductRepository, ReturnRepository, ShipmentRepository, Store,
};
