//! Admin catalog endpoints: the minimum surface checkout needs.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;
use common::ProductId;
use domain::{Money, Product, ProductCategory};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;
use crate::routes::orders::AppState;
use crate::routes::parse_uuid;

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub title: String,
    pub slug: String,
    pub category: String,
    pub price_cents: i64,
    pub compare_at_price_cents: Option<i64>,
    #[serde(default)]
    pub images: Vec<String>,
    pub inventory_count: u32,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub category: String,
    pub price_cents: i64,
    pub compare_at_price_cents: Option<i64>,
    pub images: Vec<String>,
    pub inventory_count: u32,
    pub is_active: bool,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            title: product.title,
            slug: product.slug,
            category: product.category.to_string(),
            price_cents: product.price.cents(),
            compare_at_price_cents: product.compare_at_price.map(|p| p.cents()),
            images: product.images,
            inventory_count: product.inventory_count,
            is_active: product.is_active,
        }
    }
}

/// POST /products — admin creates a catalog product.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(axum::http::StatusCode, Json<ProductResponse>), ApiError> {
    let category: ProductCategory = req.category.parse().map_err(ApiError::BadRequest)?;

    let product = Product::new(
        ProductId::new(),
        req.title,
        req.slug,
        category,
        Money::from_cents(req.price_cents),
        req.compare_at_price_cents.map(Money::from_cents),
        req.images,
        req.inventory_count,
        Utc::now(),
    )
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state.store.insert_product(product.clone()).await?;

    Ok((axum::http::StatusCode::CREATED, Json(product.into())))
}

/// GET /products — list the catalog, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.store.list_products().await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// GET /products/{id} — load one product.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id = ProductId::from_uuid(parse_uuid(&id)?);
    let product = state
        .store
        .get_product(product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("product {id} not found")))?;
    Ok(Json(product.into()))
}
