//! Handlers for `/subscriptions` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/subscriptions` | Register; no tokens move at creation |
//! | `GET`  | `/subscriptions?address=0x…` | Account numbers for an address |
//! | `GET`  | `/subscriptions/cancelled` | All cancelled account numbers |
//! | `POST` | `/subscriptions/fees` | Owner-only fee-split update |
//! | `GET`  | `/subscriptions/{n}[/valid\|/due\|/metadata]` | Reads |
//! | `POST` | `/subscriptions/{n}/cancel` | Sender, recipient, or owner |
//! | `POST` | `/subscriptions/{n}/execute` | Node-side charge execution |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use cadence_core::{AccountNumber, identity::Address, subscription::NewSubscription};

use crate::{AppState, error::ApiError};

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub sender:    Address,
  pub recipient: Address,
  pub amount:    u64,
  pub token:     Address,
  pub time_interval_seconds: u64,
  pub payment_interface:     Address,
  #[serde(default)]
  pub additional_information: Vec<String>,
  #[serde(default)]
  pub free_trial_seconds: u64,
}

/// `POST /subscriptions`
pub async fn create(
  State(state): State<AppState>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let (account_number, subscription) = {
    let mut registry = state.subscriptions.lock().await;
    let account_number = registry.create_recurring_payment(
      body.sender,
      NewSubscription {
        recipient: body.recipient,
        amount: body.amount,
        token: body.token,
        time_interval_seconds: body.time_interval_seconds,
        payment_interface: body.payment_interface,
        additional_information: body.additional_information,
        free_trial_seconds: body.free_trial_seconds,
      },
    )?;
    (account_number, registry.recurring_payment(account_number).cloned())
  };
  state.sync_journal().await?;
  Ok((
    StatusCode::CREATED,
    Json(json!({
      "account_number": account_number,
      "subscription": subscription,
    })),
  ))
}

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /subscriptions/{n}`
pub async fn get_one(
  State(state): State<AppState>,
  Path(account_number): Path<AccountNumber>,
) -> Result<impl IntoResponse, ApiError> {
  let subscription = state
    .subscriptions
    .lock()
    .await
    .recurring_payment(account_number)
    .cloned()
    .ok_or_else(|| {
      ApiError::NotFound(format!("subscription {account_number} not found"))
    })?;
  Ok(Json(subscription))
}

/// `GET /subscriptions/{n}/valid` — false (not 404) for unknown accounts.
pub async fn valid(
  State(state): State<AppState>,
  Path(account_number): Path<AccountNumber>,
) -> Result<impl IntoResponse, ApiError> {
  let valid = state
    .subscriptions
    .lock()
    .await
    .is_subscription_valid(account_number);
  Ok(Json(json!({ "valid": valid })))
}

/// `GET /subscriptions/{n}/due`
pub async fn due(
  State(state): State<AppState>,
  Path(account_number): Path<AccountNumber>,
) -> Result<impl IntoResponse, ApiError> {
  let due = state
    .subscriptions
    .lock()
    .await
    .payment_due(account_number)
    .ok_or_else(|| {
      ApiError::NotFound(format!("subscription {account_number} not found"))
    })?;
  Ok(Json(json!({ "payment_due": due })))
}

/// `GET /subscriptions/{n}/metadata`
pub async fn metadata(
  State(state): State<AppState>,
  Path(account_number): Path<AccountNumber>,
) -> Result<impl IntoResponse, ApiError> {
  let additional_information = state
    .subscriptions
    .lock()
    .await
    .additional_information(account_number)
    .map(<[String]>::to_vec)
    .ok_or_else(|| {
      ApiError::NotFound(format!("subscription {account_number} not found"))
    })?;
  Ok(Json(json!({ "additional_information": additional_information })))
}

/// `GET /subscriptions/{n}/cancelled` — false (not 404) for unknown accounts.
pub async fn is_cancelled(
  State(state): State<AppState>,
  Path(account_number): Path<AccountNumber>,
) -> Result<impl IntoResponse, ApiError> {
  let cancelled = state
    .subscriptions
    .lock()
    .await
    .is_payment_cancelled(account_number);
  Ok(Json(json!({ "cancelled": cancelled })))
}

#[derive(Debug, Deserialize)]
pub struct AddressParams {
  pub address: Address,
}

/// `GET /subscriptions?address=0x…`
pub async fn by_address(
  State(state): State<AppState>,
  Query(params): Query<AddressParams>,
) -> Result<impl IntoResponse, ApiError> {
  let account_numbers = state
    .subscriptions
    .lock()
    .await
    .account_numbers_by_address(params.address);
  Ok(Json(json!({ "account_numbers": account_numbers })))
}

/// `GET /subscriptions/cancelled`
pub async fn cancelled(
  State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
  let account_numbers = state.subscriptions.lock().await.cancelled_accounts();
  Ok(Json(json!({ "account_numbers": account_numbers })))
}

// ─── Mutations ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CancelBody {
  pub caller: Address,
}

/// `POST /subscriptions/{n}/cancel`
pub async fn cancel(
  State(state): State<AppState>,
  Path(account_number): Path<AccountNumber>,
  Json(body): Json<CancelBody>,
) -> Result<StatusCode, ApiError> {
  {
    let mut registry = state.subscriptions.lock().await;
    registry.cancel_recurring_payment(body.caller, account_number)?;
  }
  state.sync_journal().await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /subscriptions/{n}/execute`
pub async fn execute(
  State(state): State<AppState>,
  Path(account_number): Path<AccountNumber>,
) -> Result<StatusCode, ApiError> {
  {
    let mut registry = state.subscriptions.lock().await;
    registry.execute_payment(account_number)?;
  }
  state.sync_journal().await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct FeeSplitBody {
  pub caller: Address,
  pub interface_fee_bps: u16,
  pub protocol_fee_bps:  u16,
}

/// `POST /subscriptions/fees` — owner-only, applies to future charges.
pub async fn set_fees(
  State(state): State<AppState>,
  Json(body): Json<FeeSplitBody>,
) -> Result<StatusCode, ApiError> {
  state.subscriptions.lock().await.set_fee_split(
    body.caller,
    body.interface_fee_bps,
    body.protocol_fee_bps,
  )?;
  Ok(StatusCode::NO_CONTENT)
}
