//! Handlers for the sandbox token ledger.
//!
//! Balances and allowances here stand in for the external chain's token
//! state: `credit` mints, `approve` grants the registry its pull allowance.

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use cadence_core::{identity::Address, ledger::TokenLedger as _};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct CreditBody {
  pub token:  Address,
  pub holder: Address,
  pub amount: u64,
}

/// `POST /ledger/credit`
pub async fn credit(
  State(state): State<AppState>,
  Json(body): Json<CreditBody>,
) -> Result<StatusCode, ApiError> {
  state.ledger.credit(body.token, body.holder, body.amount);
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ApproveBody {
  pub token:  Address,
  pub owner:  Address,
  pub amount: u64,
}

/// `POST /ledger/approve`
pub async fn approve(
  State(state): State<AppState>,
  Json(body): Json<ApproveBody>,
) -> Result<StatusCode, ApiError> {
  state.ledger.approve(body.token, body.owner, body.amount);
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct BalanceParams {
  pub token:  Address,
  pub holder: Address,
}

/// `GET /ledger/balance?token=0x…&holder=0x…`
pub async fn balance(
  State(state): State<AppState>,
  Query(params): Query<BalanceParams>,
) -> Result<impl IntoResponse, ApiError> {
  let balance = state.ledger.balance_of(params.token, params.holder);
  Ok(Json(json!({ "balance": balance })))
}

#[derive(Debug, Deserialize)]
pub struct AllowanceParams {
  pub token: Address,
  pub owner: Address,
}

/// `GET /ledger/allowance?token=0x…&owner=0x…`
pub async fn allowance(
  State(state): State<AppState>,
  Query(params): Query<AllowanceParams>,
) -> Result<impl IntoResponse, ApiError> {
  let allowance = state.ledger.allowance(params.token, params.owner);
  Ok(Json(json!({ "allowance": allowance })))
}
