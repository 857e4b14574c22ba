//! Handlers for the sandbox clock and the finalized event journal.

use axum::{
  Json,
  extract::{Query, State},
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use cadence_core::{AccountNumber, clock::Clock as _, journal::EventJournal as _};

use crate::{AppState, error::ApiError};

// ─── Clock ────────────────────────────────────────────────────────────────────

/// `GET /clock`
pub async fn clock_now(
  State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(json!({ "now": state.clock.now() })))
}

#[derive(Debug, Deserialize)]
pub struct AdvanceBody {
  pub seconds: u64,
}

/// `POST /clock/advance`
pub async fn clock_advance(
  State(state): State<AppState>,
  Json(body): Json<AdvanceBody>,
) -> Result<impl IntoResponse, ApiError> {
  let now = state.clock.advance(body.seconds);
  Ok(Json(json!({ "now": now })))
}

#[derive(Debug, Deserialize)]
pub struct SetBody {
  pub now: u64,
}

/// `POST /clock/set`
pub async fn clock_set(
  State(state): State<AppState>,
  Json(body): Json<SetBody>,
) -> Result<impl IntoResponse, ApiError> {
  state.clock.set(body.now);
  Ok(Json(json!({ "now": body.now })))
}

// ─── Journal ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EventsParams {
  pub account_number: Option<AccountNumber>,
}

/// `GET /events[?account_number=n]` — finalized entries only; events rolled
/// back inside an operation never appear here.
pub async fn events(
  State(state): State<AppState>,
  Query(params): Query<EventsParams>,
) -> Result<impl IntoResponse, ApiError> {
  let entries = match params.account_number {
    Some(n) => state.journal.entries_for_account(n).await?,
    None => state.journal.entries().await?,
  };
  Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct CountParams {
  pub kind: String,
}

/// `GET /events/count?kind=transaction_success`
pub async fn events_count(
  State(state): State<AppState>,
  Query(params): Query<CountParams>,
) -> Result<impl IntoResponse, ApiError> {
  let count = state.journal.count_by_kind(&params.kind).await?;
  Ok(Json(json!({ "kind": params.kind, "count": count })))
}
