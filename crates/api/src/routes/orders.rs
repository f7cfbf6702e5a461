//! Order history endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::OrderId;
use history::OrderView;
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::Caller;

/// GET /orders: the caller's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(user_id): Caller,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    Ok(Json(state.orders.list_for_user(user_id).await?))
}

/// GET /orders/{id}: one order, for its owner or an admin.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(user_id): Caller,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(state.orders.get_one(user_id, order_id).await?))
}
