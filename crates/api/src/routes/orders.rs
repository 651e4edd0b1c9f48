//! Checkout and order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::OrderId;
use domain::{Address, CustomerContact, Order, OrderItem, OrderStatus};
use orchestrator::{
    CheckoutReceipt, CheckoutRequest, InMemoryLabelBroker, InMemoryPaymentGateway, Orchestrator,
    RecordingNotifier,
};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;
use crate::routes::parse_uuid;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub orchestrator:
        Orchestrator<S, InMemoryPaymentGateway, InMemoryLabelBroker, RecordingNotifier>,
    pub store: S,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub id: String,
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub order_number: String,
    pub user_id: Option<String>,
    pub status: String,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub contact: CustomerContact,
    pub payment_id: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: String,
    pub items: Vec<OrderItemResponse>,
}

pub(crate) fn order_response(order: Order, items: Vec<OrderItem>) -> OrderResponse {
    OrderResponse {
        id: order.id.to_string(),
        order_number: order.order_number,
        user_id: order.user_id.map(|u| u.to_string()),
        status: order.status.to_string(),
        subtotal_cents: order.subtotal.cents(),
        tax_cents: order.tax.cents(),
        shipping_cents: order.shipping.cents(),
        total_cents: order.total.cents(),
        shipping_address: order.shipping_address,
        billing_address: order.billing_address,
        contact: order.contact,
        payment_id: order.payment_id,
        tracking_number: order.tracking_number,
        created_at: order.created_at.to_rfc3339(),
        items: items
            .into_iter()
            .map(|item| OrderItemResponse {
                id: item.id.to_string(),
                product_id: item.product_id.to_string(),
                quantity: item.quantity,
                unit_price_cents: item.unit_price.cents(),
            })
            .collect(),
    }
}

// -- Handlers --

/// POST /orders — checkout: charge the payment and create the order.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(axum::http::StatusCode, Json<CheckoutReceipt>), ApiError> {
    let receipt = state.orchestrator.place_order(req).await?;
    Ok((axum::http::StatusCode::CREATED, Json(receipt)))
}

/// GET /orders/{id} — load an order with its items.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = OrderId::from_uuid(parse_uuid(&id)?);
    let order = state
        .store
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))?;
    let items = state.store.get_order_items(order_id).await?;
    Ok(Json(order_response(order, items)))
}

#[derive(Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

/// POST /orders/{id}/status — admin advances the order status.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = OrderId::from_uuid(parse_uuid(&id)?);
    let status: OrderStatus = req.status.parse().map_err(ApiError::BadRequest)?;

    let order = state.orchestrator.update_order_status(order_id, status).await?;
    let items = state.store.get_order_items(order_id).await?;
    Ok(Json(order_response(order, items)))
}
