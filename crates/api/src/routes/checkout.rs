//! Checkout endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use history::OrderView;
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::Caller;

/// POST /checkout: turn the caller's cart into an order.
#[tracing::instrument(skip(state))]
pub async fn checkout<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(user_id): Caller,
) -> Result<(StatusCode, Json<OrderView>), ApiError> {
    let order = state.checkout.checkout(user_id).await?;
    Ok((StatusCode::CREATED, Json(order)))
}
