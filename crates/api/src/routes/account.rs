//! Balance endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{Money, UserId};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::Caller;

#[derive(Deserialize)]
pub struct DepositRequest {
    pub amount_cents: i64,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub user_id: UserId,
    pub balance_cents: i64,
}

/// GET /account: the caller's balance.
#[tracing::instrument(skip(state))]
pub async fn balance<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(user_id): Caller,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.ledger.balance(user_id).await?;
    Ok(Json(BalanceResponse {
        user_id,
        balance_cents: balance.cents(),
    }))
}

/// POST /account/deposit: credit the caller's balance.
#[tracing::instrument(skip(state, req))]
pub async fn deposit<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(user_id): Caller,
    Json(req): Json<DepositRequest>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state
        .ledger
        .deposit(user_id, Money::from_cents(req.amount_cents))
        .await?;
    Ok(Json(BalanceResponse {
        user_id,
        balance_cents: balance.cents(),
    }))
}

/// POST /accounts/{id}/reset: zero another user's balance (admins only).
#[tracing::instrument(skip(state))]
pub async fn reset<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Path(target): Path<UserId>,
) -> Result<StatusCode, ApiError> {
    state.ledger.reset_balance(caller, target).await?;
    Ok(StatusCode::NO_CONTENT)
}
