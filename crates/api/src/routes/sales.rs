//! Sales endpoints for store owners.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::ProductId;
use history::SaleView;
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::Caller;

/// GET /sales: every sale of the caller's store.
#[tracing::instrument(skip(state))]
pub async fn store_sales<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(user_id): Caller,
) -> Result<Json<Vec<SaleView>>, ApiError> {
    Ok(Json(state.sales.store_sales(user_id).await?))
}

/// GET /sales/products/{id}: sales of one product.
#[tracing::instrument(skip(state))]
pub async fn product_sales<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(user_id): Caller,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Vec<SaleView>>, ApiError> {
    Ok(Json(state.sales.product_sales(user_id, product_id).await?))
}
