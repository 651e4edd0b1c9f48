//! Shared fixtures for workflow tests.

use chrono::Utc;
use common::{OrderId, ProductId, UserId};
use domain::{
    Address, CustomerContact, Money, Order, OrderItem, Product, ProductCategory,
};
use store::{MemoryStore, OrderRepository, ProductRepository};

pub fn sample_address() -> Address {
    Address {
        name: "Jordan Rivers".to_string(),
        line1: "12 Harbor Lane".to_string(),
        line2: None,
        city: "Barnstable".to_string(),
        state: "MA".to_string(),
        zip: "02601".to_string(),
        country: "US".to_string(),
    }
}

pub fn sample_contact() -> CustomerContact {
    CustomerContact {
        email: "jordan@example.com".to_string(),
        first_name: "Jordan".to_string(),
        last_name: "Rivers".to_string(),
        phone: None,
    }
}

/// Inserts a product and returns it.
pub async fn insert_product(store: &MemoryStore, slug: &str, price: i64, stock: u32) -> Product {
    let product = Product::new(
        ProductId::new(),
        "Silver Hoop Earrings",
        slug,
        ProductCategory::Earrings,
        Money::from_cents(price),
        None,
        vec![],
        stock,
        Utc::now(),
    )
    .unwrap();
    store.insert_product(product.clone()).await.unwrap();
    product
}

/// Inserts a paid order owned by a fresh user, with no items.
pub async fn insert_paid_order(store: &MemoryStore) -> Order {
    insert_paid_order_for(store, Some(UserId::new())).await
}

/// Inserts a paid order for the given user (None = guest), with no items.
pub async fn insert_paid_order_for(store: &MemoryStore, user_id: Option<UserId>) -> Order {
    let order = Order::new(
        OrderId::new(),
        format!("ORD-20250307-{:04}", store.order_count().await + 1),
        user_id,
        Money::from_cents(5000),
        Money::from_cents(432),
        Money::zero(),
        sample_address(),
        sample_address(),
        sample_contact(),
        Some("PAY-SEED".to_string()),
        Utc::now(),
    );
    store.insert_order(order.clone(), vec![]).await.unwrap();
    order
}

/// Inserts a paid order with two line items ($25.00 and 2 x $12.50),
/// referencing the given gateway payment id.
pub async fn insert_order_with_items(
    store: &MemoryStore,
    user_id: Option<UserId>,
    payment_id: &str,
) -> (Order, Vec<OrderItem>) {
    let order = Order::new(
        OrderId::new(),
        format!("ORD-20250307-{:04}", store.order_count().await + 1),
        user_id,
        Money::from_cents(5000),
        Money::from_cents(432),
        Money::zero(),
        sample_address(),
        sample_address(),
        sample_contact(),
        Some(payment_id.to_string()),
        Utc::now(),
    );
    let items = vec![
        OrderItem::new(order.id, ProductId::new(), 1, Money::from_cents(2500)),
        OrderItem::new(order.id, ProductId::new(), 2, Money::from_cents(1250)),
    ];
    store
        .insert_order(order.clone(), items.clone())
        .await
        .unwrap();
    (order, items)
}
