//! Repository traits, one per aggregate.
//!
//! The orchestration layer talks only to these traits so workflows can run
//! against the in-memory store in tests and the PostgreSQL store in
//! production. There is one logical database; no other service holds a
//! competing copy of inventory counts.

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{OrderId, ProductId, ReturnId, ShipmentId};
use domain::{Order, OrderItem, OrderStatus, Product, ReturnRequest, Shipment};

use crate::error::Result;

/// Catalog products and the inventory ledger.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Persists a new product.
    async fn insert_product(&self, product: Product) -> Result<()>;

    /// Loads a product by id. Returns None if it doesn't exist.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Lists all products, newest first.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Atomically decrements inventory if at least `quantity` is available.
    ///
    /// This is the single serialization point for concurrent checkouts:
    /// the check and the decrement happen as one conditional update, so
    /// inventory can never go negative.
    async fn reserve_stock(&self, id: ProductId, quantity: u32) -> Result<()>;

    /// Increments inventory, compensating a reservation or restocking.
    async fn release_stock(&self, id: ProductId, quantity: u32) -> Result<()>;
}

/// Orders and their immutable line items.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persists an order and its items atomically.
    async fn insert_order(&self, order: Order, items: Vec<OrderItem>) -> Result<()>;

    /// Loads an order by id. Returns None if it doesn't exist.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Loads the line items of an order.
    async fn get_order_items(&self, id: OrderId) -> Result<Vec<OrderItem>>;

    /// Writes a new order status. Transition validity is the caller's job.
    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> Result<()>;

    /// Records the tracking number from a purchased label.
    async fn set_order_tracking(&self, id: OrderId, tracking_number: &str) -> Result<()>;

    /// Hands out the next order number sequence value for the given day.
    async fn next_order_sequence(&self, day: NaiveDate) -> Result<u32>;
}

/// Return requests.
#[async_trait]
pub trait ReturnRepository: Send + Sync {
    /// Persists a new return request.
    async fn insert_return(&self, request: ReturnRequest) -> Result<()>;

    /// Loads a return request by id. Returns None if it doesn't exist.
    async fn get_return(&self, id: ReturnId) -> Result<Option<ReturnRequest>>;

    /// Writes back a return request mutated through its domain methods.
    async fn update_return(&self, request: &ReturnRequest) -> Result<()>;

    /// Hands out the next return number sequence value for the given day.
    async fn next_return_sequence(&self, day: NaiveDate) -> Result<u32>;
}

/// Shipment attempts. Rows are never deleted; they are the audit trail.
#[async_trait]
pub trait ShipmentRepository: Send + Sync {
    /// Persists a new shipment row.
    async fn insert_shipment(&self, shipment: Shipment) -> Result<()>;

    /// Writes back a shipment mutated through its domain methods.
    async fn update_shipment(&self, shipment: &Shipment) -> Result<()>;

    /// Loads a shipment by id. Returns None if it doesn't exist.
    async fn get_shipment(&self, id: ShipmentId) -> Result<Option<Shipment>>;

    /// Lists every shipment attempt for an order, oldest first.
    async fn list_shipments_for_order(&self, order_id: OrderId) -> Result<Vec<Shipment>>;

    /// Finds the authoritative purchased shipment for an order, if any.
    async fn find_purchased_shipment(&self, order_id: OrderId) -> Result<Option<Shipment>>;
}

/// The full storage surface the orchestrator needs.
pub trait Store:
    ProductRepository + OrderRepository + ReturnRepository + ShipmentRepository + Clone + 'static
{
}

impl<T> Store for T where
    T: ProductRepository + OrderRepository + ReturnRepository + ShipmentRepository + Clone + 'static
{
}
