//! In-memory store implementation for tests and local development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{OrderId, ProductId, ReturnId, ShipmentId};
use domain::{Order, OrderItem, OrderStatus, Product, ReturnRequest, Shipment, ShipmentStatus};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::repository::{OrderRepository, ProductRepository, ReturnRepository, ShipmentRepository};

#[derive(Default)]
struct Inner {
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    order_items: HashMap<OrderId, Vec<OrderItem>>,
    returns: HashMap<ReturnId, ReturnRequest>,
    shipments: Vec<Shipment>,
    sequences: HashMap<(&'static str, NaiveDate), u32>,
}

/// In-memory store implementation.
///
/// Provides the same interface as the PostgreSQL implementation. Stock
/// reservations take the write lock for the whole check-and-decrement, so
/// concurrent checkouts serialize exactly like the conditional update in
/// PostgreSQL.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current inventory count of a product, for assertions.
    pub async fn inventory_of(&self, id: ProductId) -> Option<u32> {
        self.inner
            .read()
            .await
            .products
            .get(&id)
            .map(|p| p.inventory_count)
    }

    /// Returns the number of persisted orders.
    pub async fn order_count(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    /// Returns the number of shipment rows (all attempts, any status).
    pub async fn shipment_count(&self) -> usize {
        self.inner.read().await.shipments.len()
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn insert_product(&self, product: Product) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.products.values().any(|p| p.slug == product.slug) {
            return Err(StoreError::Duplicate(format!("slug '{}'", product.slug)));
        }
        inner.products.insert(product.id, product);
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.inner.read().await.products.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let inner = self.inner.read().await;
        let mut products: Vec<_> = inner.products.values().cloned().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn reserve_stock(&self, id: ProductId, quantity: u32) -> Result<()> {
        let mut inner = self.inner.write().await;
        let product = inner
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "product",
                id: id.to_string(),
            })?;

        if product.inventory_count < quantity {
            return Err(StoreError::InsufficientStock {
                product_id: id,
                requested: quantity,
                available: product.inventory_count,
            });
        }
        product.inventory_count -= quantity;
        Ok(())
    }

    async fn release_stock(&self, id: ProductId, quantity: u32) -> Result<()> {
        let mut inner = self.inner.write().await;
        let product = inner
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "product",
                id: id.to_string(),
            })?;
        product.inventory_count += quantity;
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn insert_order(&self, order: Order, items: Vec<OrderItem>) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.orders.values().any(|o| o.order_number == order.order_number) {
            return Err(StoreError::Duplicate(format!(
                "order number '{}'",
                order.order_number
            )));
        }
        inner.order_items.insert(order.id, items);
        inner.orders.insert(order.id, order);
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn get_order_items(&self, id: OrderId) -> Result<Vec<OrderItem>> {
        Ok(self
            .inner
            .read()
            .await
            .order_items
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> Result<()> {
        let mut inner = self.inner.write().await;
        let order = inner.orders.get_mut(&id).ok_or_else(|| StoreError::NotFound {
            entity: "order",
            id: id.to_string(),
        })?;
        order.status = status;
        Ok(())
    }

    async fn set_order_tracking(&self, id: OrderId, tracking_number: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let order = inner.orders.get_mut(&id).ok_or_else(|| StoreError::NotFound {
            entity: "order",
            id: id.to_string(),
        })?;
        order.tracking_number = Some(tracking_number.to_string());
        Ok(())
    }

    async fn next_order_sequence(&self, day: NaiveDate) -> Result<u32> {
        let mut inner = self.inner.write().await;
        let value = inner.sequences.entry(("order", day)).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}

#[async_trait]
impl ReturnRepository for MemoryStore {
    async fn insert_return(&self, request: ReturnRequest) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.returns.insert(request.id, request);
        Ok(())
    }

    async fn get_return(&self, id: ReturnId) -> Result<Option<ReturnRequest>> {
        Ok(self.inner.read().await.returns.get(&id).cloned())
    }

    async fn update_return(&self, request: &ReturnRequest) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.returns.contains_key(&request.id) {
            return Err(StoreError::NotFound {
                entity: "return",
                id: request.id.to_string(),
            });
        }
        inner.returns.insert(request.id, request.clone());
        Ok(())
    }

    async fn next_return_sequence(&self, day: NaiveDate) -> Result<u32> {
        let mut inner = self.inner.write().await;
        let value = inner.sequences.entry(("return", day)).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}

#[async_trait]
impl ShipmentRepository for MemoryStore {
    async fn insert_shipment(&self, shipment: Shipment) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.shipments.push(shipment);
        Ok(())
    }

    async fn update_shipment(&self, shipment: &Shipment) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.shipments.iter_mut().find(|s| s.id == shipment.id) {
            Some(existing) => {
                *existing = shipment.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                entity: "shipment",
                id: shipment.id.to_string(),
            }),
        }
    }

    async fn get_shipment(&self, id: ShipmentId) -> Result<Option<Shipment>> {
        Ok(self
            .inner
            .read()
            .await
            .shipments
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn list_shipments_for_order(&self, order_id: OrderId) -> Result<Vec<Shipment>> {
        Ok(self
            .inner
            .read()
            .await
            .shipments
            .iter()
            .filter(|s| s.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn find_purchased_shipment(&self, order_id: OrderId) -> Result<Option<Shipment>> {
        Ok(self
            .inner
            .read()
            .await
            .shipments
            .iter()
            .find(|s| s.order_id == order_id && s.status == ShipmentStatus::Purchased)
            .cloned())
    }
}
