//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ProductId;
use domain::{CartOutcome, CartView};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::Caller;

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    /// Signed; negative values remove units.
    pub quantity: i32,
}

#[derive(Serialize)]
pub struct QuantityResponse {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// POST /cart/items: add or remove units of a product.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(user_id): Caller,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartOutcome>, ApiError> {
    let outcome = state
        .carts
        .add_item(user_id, req.product_id, req.quantity)
        .await?;
    Ok(Json(outcome))
}

/// DELETE /cart: remove every line from the cart.
#[tracing::instrument(skip(state))]
pub async fn empty<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(user_id): Caller,
) -> Result<StatusCode, ApiError> {
    state.carts.empty_cart(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /cart: the caller's cart with its lines.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(user_id): Caller,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(state.carts.get_cart(user_id).await?))
}

/// GET /cart/products/{id}: units of one product in the cart.
#[tracing::instrument(skip(state))]
pub async fn quantity<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(user_id): Caller,
    Path(product_id): Path<ProductId>,
) -> Result<Json<QuantityResponse>, ApiError> {
    let quantity = state.carts.quantity_in_cart(user_id, product_id).await?;
    Ok(Json(QuantityResponse {
        product_id,
        quantity,
    }))
}
