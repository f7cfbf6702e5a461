//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use store::{Store, Transaction};

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health: reports whether the store accepts transactions.
pub async fn check<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> (StatusCode, Json<HealthResponse>) {
    let reachable = match state.carts.store().begin().await {
        Ok(tx) => tx.rollback().await.is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "health check could not open a transaction");
            false
        }
    };

    if reachable {
        (StatusCode::OK, Json(HealthResponse { status: "ok" }))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unavailable",
            }),
        )
    }
}
