//! Shipping label endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::OrderId;
use domain::Shipment;
use serde::Serialize;
use store::Store;

use crate::error::ApiError;
use crate::routes::orders::AppState;
use crate::routes::parse_uuid;

#[derive(Serialize)]
pub struct ShipmentResponse {
    pub id: String,
    pub order_id: String,
    pub status: String,
    pub carrier: Option<String>,
    pub service: Option<String>,
    pub cost_cents: Option<i64>,
    pub tracking_number: Option<String>,
    pub label_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
}

impl From<Shipment> for ShipmentResponse {
    fn from(shipment: Shipment) -> Self {
        Self {
            id: shipment.id.to_string(),
            order_id: shipment.order_id.to_string(),
            status: shipment.status.to_string(),
            carrier: shipment.carrier,
            service: shipment.service,
            cost_cents: shipment.cost.map(|c| c.cents()),
            tracking_number: shipment.tracking_number,
            label_url: shipment.label_url,
            error_message: shipment.error_message,
            created_at: shipment.created_at.to_rfc3339(),
        }
    }
}

/// POST /orders/{id}/label — purchase a shipping label for the order.
///
/// Idempotent: an already-purchased label is returned without a second
/// broker charge.
#[tracing::instrument(skip(state))]
pub async fn generate<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ShipmentResponse>, ApiError> {
    let order_id = OrderId::from_uuid(parse_uuid(&id)?);
    let shipment = state.orchestrator.generate_label(order_id).await?;
    Ok(Json(shipment.into()))
}

/// GET /orders/{id}/shipments — every label attempt for the order, the
/// audit trail included.
#[tracing::instrument(skip(state))]
pub async fn list_for_order<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ShipmentResponse>>, ApiError> {
    let order_id = OrderId::from_uuid(parse_uuid(&id)?);
    let shipments = state.store.list_shipments_for_order(order_id).await?;
    Ok(Json(shipments.into_iter().map(Into::into).collect()))
}
