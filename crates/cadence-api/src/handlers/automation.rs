//! Handlers for `/automation` endpoints.
//!
//! Registered accounts get an in-process [`SandboxTarget`] standing in for
//! the external caller contract; its eligibility and failure toggles let
//! keeper integrations drive every branch of the execution handshake.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use cadence_core::{AccountNumber, identity::Address};

use crate::{AppState, SandboxTarget, error::ApiError};

// ─── Registration ─────────────────────────────────────────────────────────────

fn default_eligible() -> bool { true }

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub caller: Address,
  pub id:     u64,
  /// Initial answer of the sandbox target's eligibility hook.
  #[serde(default = "default_eligible")]
  pub eligible: bool,
}

/// `POST /automation/accounts`
pub async fn create(
  State(state): State<AppState>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let target = Arc::new(SandboxTarget::new(body.eligible));
  let account_number = {
    let mut registry = state.automation.lock().await;
    let before = registry.accounts_by_address(body.caller);
    registry.create_account(body.caller, body.id, target.clone())?;
    // The creation event does not carry the new number; discover it the
    // way external callers do, by diffing the address index.
    let after = registry.accounts_by_address(body.caller);
    after.into_iter().find(|n| !before.contains(n))
  }
  .ok_or_else(|| {
    ApiError::Internal("registration left no trace in the address index".into())
  })?;
  state.targets.lock().await.insert(account_number, target);
  state.sync_journal().await?;
  Ok((StatusCode::CREATED, Json(json!({ "account_number": account_number }))))
}

#[derive(Debug, Deserialize)]
pub struct CancelBody {
  pub caller: Address,
  pub id:     u64,
}

/// `POST /automation/cancel` — refunds the creation fee captured at
/// registration.
pub async fn cancel(
  State(state): State<AppState>,
  Json(body): Json<CancelBody>,
) -> Result<StatusCode, ApiError> {
  {
    let mut registry = state.automation.lock().await;
    registry.cancel_account(body.caller, body.id)?;
  }
  state.sync_journal().await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Execution ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExecuteBody {
  /// The node invoking the handshake; receives the execution fee.
  pub executor: Address,
}

/// `POST /automation/accounts/{n}/execute`
///
/// `executed: false` means the delegated check declined — nothing ran and
/// nothing was charged.
pub async fn execute(
  State(state): State<AppState>,
  Path(account_number): Path<AccountNumber>,
  Json(body): Json<ExecuteBody>,
) -> Result<impl IntoResponse, ApiError> {
  let executed = {
    let mut registry = state.automation.lock().await;
    registry.execute(body.executor, account_number)?
  };
  state.sync_journal().await?;
  Ok(Json(json!({ "executed": executed })))
}

#[derive(Debug, Deserialize)]
pub struct TargetBody {
  pub eligible:    Option<bool>,
  pub fail_action: Option<bool>,
}

/// `POST /automation/accounts/{n}/target` — sandbox-only toggles.
pub async fn configure_target(
  State(state): State<AppState>,
  Path(account_number): Path<AccountNumber>,
  Json(body): Json<TargetBody>,
) -> Result<StatusCode, ApiError> {
  let targets = state.targets.lock().await;
  let target = targets.get(&account_number).ok_or_else(|| {
    ApiError::NotFound(format!("automation account {account_number} not found"))
  })?;
  if let Some(eligible) = body.eligible {
    target.set_eligible(eligible);
  }
  if let Some(fail) = body.fail_action {
    target.set_fail_action(fail);
  }
  Ok(StatusCode::NO_CONTENT)
}

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /automation/accounts/{n}`
pub async fn get_one(
  State(state): State<AppState>,
  Path(account_number): Path<AccountNumber>,
) -> Result<impl IntoResponse, ApiError> {
  let account = state
    .automation
    .lock()
    .await
    .account(account_number)
    .cloned()
    .ok_or_else(|| {
      ApiError::NotFound(format!("automation account {account_number} not found"))
    })?;
  Ok(Json(account))
}

/// `GET /automation/accounts/{n}/check` — delegated eligibility; false (not
/// 404) for unknown or cancelled accounts.
pub async fn check(
  State(state): State<AppState>,
  Path(account_number): Path<AccountNumber>,
) -> Result<impl IntoResponse, ApiError> {
  let eligible = state
    .automation
    .lock()
    .await
    .check_simple_automation(account_number);
  Ok(Json(json!({ "eligible": eligible })))
}

/// `GET /automation/accounts/{n}/cancelled` — false (not 404) for unknown
/// accounts.
pub async fn is_cancelled(
  State(state): State<AppState>,
  Path(account_number): Path<AccountNumber>,
) -> Result<impl IntoResponse, ApiError> {
  let cancelled = state
    .automation
    .lock()
    .await
    .is_account_cancelled(account_number);
  Ok(Json(json!({ "cancelled": cancelled })))
}

#[derive(Debug, Deserialize)]
pub struct AddressParams {
  pub address: Address,
}

/// `GET /automation/accounts?address=0x…`
pub async fn by_address(
  State(state): State<AppState>,
  Query(params): Query<AddressParams>,
) -> Result<impl IntoResponse, ApiError> {
  let account_numbers = state
    .automation
    .lock()
    .await
    .accounts_by_address(params.address);
  Ok(Json(json!({ "account_numbers": account_numbers })))
}

/// `GET /automation/accounts/cancelled`
pub async fn cancelled(
  State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
  let account_numbers = state.automation.lock().await.cancelled_accounts();
  Ok(Json(json!({ "account_numbers": account_numbers })))
}

/// `GET /automation/fee-token` — the asset currently accepted for fees.
pub async fn fee_token(
  State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
  let fee_token = state.automation.lock().await.fee_token();
  Ok(Json(json!({ "fee_token": fee_token })))
}

// ─── Configuration ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FeesBody {
  pub caller: Address,
  pub account_creation_fee: Option<u64>,
  pub execution_fee:        Option<u64>,
  pub fee_token:            Option<Address>,
}

/// `POST /automation/fees` — owner-only; affects only future registrations
/// and executions.
pub async fn set_fees(
  State(state): State<AppState>,
  Json(body): Json<FeesBody>,
) -> Result<StatusCode, ApiError> {
  let mut registry = state.automation.lock().await;
  if let Some(fee) = body.account_creation_fee {
    registry.set_creation_fee(body.caller, fee)?;
  }
  if let Some(fee) = body.execution_fee {
    registry.set_execution_fee(body.caller, fee)?;
  }
  if let Some(token) = body.fee_token {
    registry.set_fee_token(body.caller, token)?;
  }
  Ok(StatusCode::NO_CONTENT)
}
