//! Return request endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{ReturnId, UserId};
use domain::{Address, ReturnItem, ReturnRequest, ReturnStatus};
use orchestrator::CreateReturnRequest;
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;
use crate::routes::orders::AppState;
use crate::routes::parse_uuid;

#[derive(Serialize)]
pub struct ReturnItemResponse {
    pub order_item_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Serialize)]
pub struct ReturnResponse {
    pub id: String,
    pub return_number: String,
    pub order_id: String,
    pub user_id: Option<String>,
    pub status: String,
    pub reason: Option<String>,
    pub items: Vec<ReturnItemResponse>,
    pub refund_amount_cents: i64,
    pub return_address: Address,
    pub return_tracking_number: Option<String>,
    pub refund_transaction_id: Option<String>,
    pub admin_notes: Option<String>,
    pub created_at: String,
}

impl From<ReturnRequest> for ReturnResponse {
    fn from(ret: ReturnRequest) -> Self {
        Self {
            id: ret.id.to_string(),
            return_number: ret.return_number,
            order_id: ret.order_id.to_string(),
            user_id: ret.user_id.map(|u| u.to_string()),
            status: ret.status.to_string(),
            reason: ret.reason,
            items: ret
                .items
                .into_iter()
                .map(|item: ReturnItem| ReturnItemResponse {
                    order_item_id: item.order_item_id.to_string(),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                })
                .collect(),
            refund_amount_cents: ret.refund_amount.cents(),
            return_address: ret.return_address,
            return_tracking_number: ret.return_tracking_number,
            refund_transaction_id: ret.refund_transaction_id,
            admin_notes: ret.admin_notes,
            created_at: ret.created_at.to_rfc3339(),
        }
    }
}

/// POST /returns — customer requests a return.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateReturnRequest>,
) -> Result<(axum::http::StatusCode, Json<ReturnResponse>), ApiError> {
    let ret = state.orchestrator.create_return(req).await?;
    Ok((axum::http::StatusCode::CREATED, Json(ret.into())))
}

/// GET /returns/{id} — load a return request.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ReturnResponse>, ApiError> {
    let return_id = ReturnId::from_uuid(parse_uuid(&id)?);
    let ret = state
        .store
        .get_return(return_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("return {id} not found")))?;
    Ok(Json(ret.into()))
}

#[derive(Deserialize)]
pub struct UpdateReturnStatusRequest {
    pub status: String,
    pub admin_notes: Option<String>,
}

/// POST /returns/{id}/status — admin advances the return status.
///
/// A move to `refunded` executes the gateway refund first; on gateway
/// failure this responds 502 and the return keeps its prior status.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateReturnStatusRequest>,
) -> Result<Json<ReturnResponse>, ApiError> {
    let return_id = ReturnId::from_uuid(parse_uuid(&id)?);
    let status: ReturnStatus = req.status.parse().map_err(ApiError::BadRequest)?;

    let ret = state
        .orchestrator
        .update_return_status(return_id, status, req.admin_notes)
        .await?;
    Ok(Json(ret.into()))
}

#[derive(Deserialize)]
pub struct ReturnTrackingRequest {
    pub tracking_number: String,
    pub requester: Option<UserId>,
}

/// POST /returns/{id}/tracking — customer attaches the return tracking
/// number once the items are on their way back.
#[tracing::instrument(skip(state, req))]
pub async fn set_tracking<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<ReturnTrackingRequest>,
) -> Result<Json<ReturnResponse>, ApiError> {
    let return_id = ReturnId::from_uuid(parse_uuid(&id)?);
    let ret = state
        .orchestrator
        .set_return_tracking(return_id, req.requester, req.tracking_number)
        .await?;
    Ok(Json(ret.into()))
}
