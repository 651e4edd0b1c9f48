//! PostgreSQL store implementation.
//!
//! Addresses, contacts, parcels, and return items are stored as JSONB
//! columns; statuses as lowercase text; money as BIGINT cents. The stock
//! reservation uses a conditional `UPDATE ... WHERE inventory_count >= n`
//! so concurrent checkouts serialize on the row without explicit locking.

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{OrderId, OrderItemId, ProductId, ReturnId, ShipmentId, UserId};
use domain::{
    Money, Order, OrderItem, OrderStatus, Product, ReturnRequest, Shipment, ShipmentStatus,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::repository::{OrderRepository, ProductRepository, ReturnRepository, ShipmentRepository};

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a store from an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database with a small pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_insert_error(err: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.is_unique_violation()
    {
        return StoreError::Duplicate(what.to_string());
    }
    StoreError::Database(err)
}

fn parse_status<T: std::str::FromStr<Err = String>>(raw: &str) -> Result<T> {
    raw.parse().map_err(StoreError::InvalidColumn)
}

fn json_column<T: serde::de::DeserializeOwned>(row: &PgRow, column: &str) -> Result<T> {
    let value: serde_json::Value = row.try_get(column)?;
    Ok(serde_json::from_value(value)?)
}

fn product_from_row(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id")?),
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        category: parse_status::<domain::ProductCategory>(row.try_get::<String, _>("category")?.as_str())?,
        price: Money::from_cents(row.try_get("price_cents")?),
        compare_at_price: row
            .try_get::<Option<i64>, _>("compare_at_price_cents")?
            .map(Money::from_cents),
        images: json_column(row, "images")?,
        inventory_count: row.try_get::<i32, _>("inventory_count")? as u32,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn order_from_row(row: &PgRow) -> Result<Order> {
    Ok(Order {
        id: OrderId::from_uuid(row.try_get("id")?),
        order_number: row.try_get("order_number")?,
        user_id: row
            .try_get::<Option<Uuid>, _>("user_id")?
            .map(UserId::from_uuid),
        status: parse_status(row.try_get::<String, _>("status")?.as_str())?,
        subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
        tax: Money::from_cents(row.try_get("tax_cents")?),
        shipping: Money::from_cents(row.try_get("shipping_cents")?),
        total: Money::from_cents(row.try_get("total_cents")?),
        shipping_address: json_column(row, "shipping_address")?,
        billing_address: json_column(row, "billing_address")?,
        contact: json_column(row, "contact")?,
        payment_id: row.try_get("payment_id")?,
        tracking_number: row.try_get("tracking_number")?,
        created_at: row.try_get("created_at")?,
    })
}

fn order_item_from_row(row: &PgRow) -> Result<OrderItem> {
    Ok(OrderItem {
        id: OrderItemId::from_uuid(row.try_get("id")?),
        order_id: OrderId::from_uuid(row.try_get("order_id")?),
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        quantity: row.try_get::<i32, _>("quantity")? as u32,
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
    })
}

fn return_from_row(row: &PgRow) -> Result<ReturnRequest> {
    Ok(ReturnRequest {
        id: ReturnId::from_uuid(row.try_get("id")?),
        return_number: row.try_get("return_number")?,
        order_id: OrderId::from_uuid(row.try_get("order_id")?),
        user_id: row
            .try_get::<Option<Uuid>, _>("user_id")?
            .map(UserId::from_uuid),
        status: parse_status(row.try_get::<String, _>("status")?.as_str())?,
        reason: row.try_get("reason")?,
        items: json_column(row, "items")?,
        refund_amount: Money::from_cents(row.try_get("refund_amount_cents")?),
        return_address: json_column(row, "return_address")?,
        return_tracking_number: row.try_get("return_tracking_number")?,
        refund_transaction_id: row.try_get("refund_transaction_id")?,
        admin_notes: row.try_get("admin_notes")?,
        created_at: row.try_get("created_at")?,
    })
}

fn shipment_from_row(row: &PgRow) -> Result<Shipment> {
    Ok(Shipment {
        id: ShipmentId::from_uuid(row.try_get("id")?),
        order_id: OrderId::from_uuid(row.try_get("order_id")?),
        status: parse_status(row.try_get::<String, _>("status")?.as_str())?,
        from_address: json_column(row, "from_address")?,
        to_address: json_column(row, "to_address")?,
        parcel: json_column(row, "parcel")?,
        carrier: row.try_get("carrier")?,
        service: row.try_get("service")?,
        cost: row.try_get::<Option<i64>, _>("cost_cents")?.map(Money::from_cents),
        external_shipment_id: row.try_get("external_shipment_id")?,
        rate_id: row.try_get("rate_id")?,
        transaction_id: row.try_get("transaction_id")?,
        label_url: row.try_get("label_url")?,
        tracking_number: row.try_get("tracking_number")?,
        error_message: row.try_get("error_message")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl ProductRepository for PgStore {
    #[tracing::instrument(skip(self, product), fields(product_id = %product.id))]
    async fn insert_product(&self, product: Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products
                (id, title, slug, category, price_cents, compare_at_price_cents,
                 images, inventory_count, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.title)
        .bind(&product.slug)
        .bind(product.category.as_str())
        .bind(product.price.cents())
        .bind(product.compare_at_price.map(|p| p.cents()))
        .bind(serde_json::to_value(&product.images)?)
        .bind(product.inventory_count as i32)
        .bind(product.is_active)
        .bind(product.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "product slug"))?;
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT * FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query("SELECT * FROM products ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(product_from_row).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn reserve_stock(&self, id: ProductId, quantity: u32) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET inventory_count = inventory_count - $2
            WHERE id = $1 AND inventory_count >= $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(quantity as i32)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Guard rejected the decrement: distinguish a missing product from
        // an insufficient count.
        let row = sqlx::query("SELECT inventory_count FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Err(StoreError::InsufficientStock {
                product_id: id,
                requested: quantity,
                available: row.try_get::<i32, _>("inventory_count")? as u32,
            }),
            None => Err(StoreError::NotFound {
                entity: "product",
                id: id.to_string(),
            }),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn release_stock(&self, id: ProductId, quantity: u32) -> Result<()> {
        let result = sqlx::query(
            "UPDATE products SET inventory_count = inventory_count + $2 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(quantity as i32)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "product",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    #[tracing::instrument(skip(self, order, items), fields(order_id = %order.id))]
    async fn insert_order(&self, order: Order, items: Vec<OrderItem>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders
                (id, order_number, user_id, status, subtotal_cents, tax_cents,
                 shipping_cents, total_cents, shipping_address, billing_address,
                 contact, payment_id, tracking_number, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.order_number)
        .bind(order.user_id.map(|u| u.as_uuid()))
        .bind(order.status.as_str())
        .bind(order.subtotal.cents())
        .bind(order.tax.cents())
        .bind(order.shipping.cents())
        .bind(order.total.cents())
        .bind(serde_json::to_value(&order.shipping_address)?)
        .bind(serde_json::to_value(&order.billing_address)?)
        .bind(serde_json::to_value(&order.contact)?)
        .bind(&order.payment_id)
        .bind(&order.tracking_number)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, "order number"))?;

        for item in &items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(item.order_id.as_uuid())
            .bind(item.product_id.as_uuid())
            .bind(item.quantity as i32)
            .bind(item.unit_price.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn get_order_items(&self, id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query("SELECT * FROM order_items WHERE order_id = $1")
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(order_item_from_row).collect()
    }

    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "order",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn set_order_tracking(&self, id: OrderId, tracking_number: &str) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET tracking_number = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(tracking_number)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "order",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn next_order_sequence(&self, day: NaiveDate) -> Result<u32> {
        next_sequence(&self.pool, "order", day).await
    }
}

async fn next_sequence(pool: &PgPool, kind: &str, day: NaiveDate) -> Result<u32> {
    let row = sqlx::query(
        r#"
        INSERT INTO document_sequences (kind, day, value)
        VALUES ($1, $2, 1)
        ON CONFLICT (kind, day)
        DO UPDATE SET value = document_sequences.value + 1
        RETURNING value
        "#,
    )
    .bind(kind)
    .bind(day)
    .fetch_one(pool)
    .await?;
    Ok(row.try_get::<i32, _>("value")? as u32)
}

#[async_trait]
impl ReturnRepository for PgStore {
    #[tracing::instrument(skip(self, request), fields(return_id = %request.id))]
    async fn insert_return(&self, request: ReturnRequest) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO returns
                (id, return_number, order_id, user_id, status, reason, items,
                 refund_amount_cents, return_address, return_tracking_number,
                 refund_transaction_id, admin_notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(request.id.as_uuid())
        .bind(&request.return_number)
        .bind(request.order_id.as_uuid())
        .bind(request.user_id.map(|u| u.as_uuid()))
        .bind(request.status.as_str())
        .bind(&request.reason)
        .bind(serde_json::to_value(&request.items)?)
        .bind(request.refund_amount.cents())
        .bind(serde_json::to_value(&request.return_address)?)
        .bind(&request.return_tracking_number)
        .bind(&request.refund_transaction_id)
        .bind(&request.admin_notes)
        .bind(request.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "return number"))?;
        Ok(())
    }

    async fn get_return(&self, id: ReturnId) -> Result<Option<ReturnRequest>> {
        let row = sqlx::query("SELECT * FROM returns WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(return_from_row).transpose()
    }

    async fn update_return(&self, request: &ReturnRequest) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE returns
            SET status = $2,
                return_tracking_number = $3,
                refund_transaction_id = $4,
                admin_notes = $5
            WHERE id = $1
            "#,
        )
        .bind(request.id.as_uuid())
        .bind(request.status.as_str())
        .bind(&request.return_tracking_number)
        .bind(&request.refund_transaction_id)
        .bind(&request.admin_notes)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "return",
                id: request.id.to_string(),
            });
        }
        Ok(())
    }

    async fn next_return_sequence(&self, day: NaiveDate) -> Result<u32> {
        next_sequence(&self.pool, "return", day).await
    }
}

#[async_trait]
impl ShipmentRepository for PgStore {
    #[tracing::instrument(skip(self, shipment), fields(shipment_id = %shipment.id))]
    async fn insert_shipment(&self, shipment: Shipment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO shipments
                (id, order_id, status, from_address, to_address, parcel,
                 carrier, service, cost_cents, external_shipment_id, rate_id,
                 transaction_id, label_url, tracking_number, error_message,
                 created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16)
            "#,
        )
        .bind(shipment.id.as_uuid())
        .bind(shipment.order_id.as_uuid())
        .bind(shipment.status.as_str())
        .bind(serde_json::to_value(&shipment.from_address)?)
        .bind(serde_json::to_value(&shipment.to_address)?)
        .bind(serde_json::to_value(&shipment.parcel)?)
        .bind(&shipment.carrier)
        .bind(&shipment.service)
        .bind(shipment.cost.map(|c| c.cents()))
        .bind(&shipment.external_shipment_id)
        .bind(&shipment.rate_id)
        .bind(&shipment.transaction_id)
        .bind(&shipment.label_url)
        .bind(&shipment.tracking_number)
        .bind(&shipment.error_message)
        .bind(shipment.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_shipment(&self, shipment: &Shipment) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE shipments
            SET status = $2,
                carrier = $3,
                service = $4,
                cost_cents = $5,
                external_shipment_id = $6,
                rate_id = $7,
                transaction_id = $8,
                label_url = $9,
                tracking_number = $10,
                error_message = $11
            WHERE id = $1
            "#,
        )
        .bind(shipment.id.as_uuid())
        .bind(shipment.status.as_str())
        .bind(&shipment.carrier)
        .bind(&shipment.service)
        .bind(shipment.cost.map(|c| c.cents()))
        .bind(&shipment.external_shipment_id)
        .bind(&shipment.rate_id)
        .bind(&shipment.transaction_id)
        .bind(&shipment.label_url)
        .bind(&shipment.tracking_number)
        .bind(&shipment.error_message)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "shipment",
                id: shipment.id.to_string(),
            });
        }
        Ok(())
    }

    async fn get_shipment(&self, id: ShipmentId) -> Result<Option<Shipment>> {
        let row = sqlx::query("SELECT * FROM shipments WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(shipment_from_row).transpose()
    }

    async fn list_shipments_for_order(&self, order_id: OrderId) -> Result<Vec<Shipment>> {
        let rows =
            sqlx::query("SELECT * FROM shipments WHERE order_id = $1 ORDER BY created_at ASC")
                .bind(order_id.as_uuid())
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(shipment_from_row).collect()
    }

    async fn find_purchased_shipment(&self, order_id: OrderId) -> Result<Option<Shipment>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM shipments
            WHERE order_id = $1 AND status = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(ShipmentStatus::Purchased.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(shipment_from_row).transpose()
    }
}
