//! JSON sandbox API for the Cadence registries.
//!
//! Exposes both registries' entry points one-to-one over HTTP, plus the
//! controls an integration sandbox needs: an in-memory token ledger, a
//! warpable clock, per-account stub automation targets, and read access to
//! the finalized event journal. Everything runs in-process against a single
//! serialized state, mirroring the execution environment the registries are
//! documented for. This is a development tool, not a custody service.

pub mod error;
pub mod handlers;

pub use error::ApiError;

use std::{
  collections::HashMap,
  path::PathBuf,
  sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
  },
};

use axum::{
  Router,
  routing::{get, post},
};
use serde::Deserialize;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use cadence_core::{
  AccountNumber,
  automation::{AutomationRegistry, AutomationTarget, HookError},
  clock::ManualClock,
  event::Event,
  identity::Address,
  journal::EventJournal as _,
  ledger::MemoryLedger,
  subscription::SubscriptionRegistry,
};
use cadence_journal_sqlite::SqliteJournal;

use handlers::{automation, chain, ledger, subscriptions};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` (or
/// `CADENCE_`-prefixed environment variables).
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host: String,
  pub port: u16,
  /// SQLite file the event journal is persisted to.
  pub journal_path: PathBuf,
  /// Registry owner: receives protocol fees, grants refund allowances.
  pub owner: Address,
  /// Asset accepted for automation fees at startup.
  pub fee_token: Address,
  pub account_creation_fee: u64,
  pub execution_fee:        u64,
  pub interface_fee_bps:    u16,
  pub protocol_fee_bps:     u16,
}

// ─── Sandbox automation target ────────────────────────────────────────────────

/// In-process stand-in for an external caller contract's hooks.
///
/// Eligibility and failure are toggleable per account so keeper integration
/// tests can drive every branch of the execution handshake.
#[derive(Debug, Default)]
pub struct SandboxTarget {
  eligible:    AtomicBool,
  fail_action: AtomicBool,
  runs:        AtomicU64,
}

impl SandboxTarget {
  pub fn new(eligible: bool) -> Self {
    let target = Self::default();
    target.eligible.store(eligible, Ordering::SeqCst);
    target
  }

  pub fn set_eligible(&self, eligible: bool) {
    self.eligible.store(eligible, Ordering::SeqCst);
  }

  pub fn set_fail_action(&self, fail: bool) {
    self.fail_action.store(fail, Ordering::SeqCst);
  }

  /// How many times the action hook has completed.
  pub fn runs(&self) -> u64 { self.runs.load(Ordering::SeqCst) }
}

impl AutomationTarget for SandboxTarget {
  fn check_simple_automation(&self, _id: u64) -> Result<bool, HookError> {
    Ok(self.eligible.load(Ordering::SeqCst))
  }

  fn simple_automation(&self, _id: u64) -> Result<(), HookError> {
    if self.fail_action.load(Ordering::SeqCst) {
      return Err(HookError::new("sandbox action failure"));
    }
    self.runs.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Cursors into each registry's committed event log, marking what has
/// already been copied into the journal.
#[derive(Debug, Default)]
pub struct JournalCursors {
  pub subscriptions: usize,
  pub automation:    usize,
}

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState {
  pub subscriptions: Arc<Mutex<SubscriptionRegistry>>,
  pub automation:    Arc<Mutex<AutomationRegistry>>,
  pub ledger:  Arc<MemoryLedger>,
  pub clock:   Arc<ManualClock>,
  pub journal: Arc<SqliteJournal>,
  /// Sandbox targets by account number, kept so their toggles stay
  /// reachable after registration.
  pub targets: Arc<Mutex<HashMap<AccountNumber, Arc<SandboxTarget>>>>,
  pub cursors: Arc<Mutex<JournalCursors>>,
}

impl AppState {
  /// Copy newly committed registry events into the journal.
  ///
  /// Called after every mutating operation, outside the registry locks.
  /// Events reverted inside an operation never appear in a registry's
  /// committed log, so they can never reach the journal.
  pub async fn sync_journal(&self) -> Result<(), ApiError> {
    let mut cursors = self.cursors.lock().await;

    let fresh: Vec<Event> = {
      let registry = self.subscriptions.lock().await;
      registry
        .events()
        .get(cursors.subscriptions..)
        .unwrap_or(&[])
        .to_vec()
    };
    if !fresh.is_empty() {
      self.journal.append(&fresh).await?;
      cursors.subscriptions += fresh.len();
    }

    let fresh: Vec<Event> = {
      let registry = self.automation.lock().await;
      registry
        .events()
        .get(cursors.automation..)
        .unwrap_or(&[])
        .to_vec()
    };
    if !fresh.is_empty() {
      self.journal.append(&fresh).await?;
      cursors.automation += fresh.len();
    }

    Ok(())
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the sandbox [`Router`].
pub fn router(state: AppState) -> Router {
  Router::new()
    // Subscriptions
    .route(
      "/subscriptions",
      post(subscriptions::create).get(subscriptions::by_address),
    )
    .route("/subscriptions/cancelled", get(subscriptions::cancelled))
    .route("/subscriptions/fees", post(subscriptions::set_fees))
    .route("/subscriptions/{n}", get(subscriptions::get_one))
    .route("/subscriptions/{n}/valid", get(subscriptions::valid))
    .route("/subscriptions/{n}/due", get(subscriptions::due))
    .route("/subscriptions/{n}/metadata", get(subscriptions::metadata))
    .route("/subscriptions/{n}/cancelled", get(subscriptions::is_cancelled))
    .route("/subscriptions/{n}/cancel", post(subscriptions::cancel))
    .route("/subscriptions/{n}/execute", post(subscriptions::execute))
    // Automation
    .route(
      "/automation/accounts",
      post(automation::create).get(automation::by_address),
    )
    .route("/automation/accounts/cancelled", get(automation::cancelled))
    .route("/automation/accounts/{n}", get(automation::get_one))
    .route("/automation/accounts/{n}/cancelled", get(automation::is_cancelled))
    .route("/automation/accounts/{n}/check", get(automation::check))
    .route("/automation/accounts/{n}/execute", post(automation::execute))
    .route("/automation/accounts/{n}/target", post(automation::configure_target))
    .route("/automation/cancel", post(automation::cancel))
    .route("/automation/fee-token", get(automation::fee_token))
    .route("/automation/fees", post(automation::set_fees))
    // Sandbox ledger
    .route("/ledger/credit", post(ledger::credit))
    .route("/ledger/approve", post(ledger::approve))
    .route("/ledger/balance", get(ledger::balance))
    .route("/ledger/allowance", get(ledger::allowance))
    // Clock and journal
    .route("/clock", get(chain::clock_now))
    .route("/clock/advance", post(chain::clock_advance))
    .route("/clock/set", post(chain::clock_set))
    .route("/events", get(chain::events))
    .route("/events/count", get(chain::events_count))
    .with_state(state)
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use cadence_core::subscription::SubscriptionConfig;
  use cadence_core::automation::AutomationConfig;

  const START: u64 = 1_000;

  fn addr(n: u64) -> String { Address::from_low_u64(n).to_string() }

  async fn make_state() -> AppState {
    let clock = Arc::new(ManualClock::new(START));
    let ledger = Arc::new(MemoryLedger::new());
    let owner = Address::from_low_u64(0xA0);
    let fee_token = Address::from_low_u64(0xFE);

    let subscriptions = SubscriptionRegistry::new(
      SubscriptionConfig { owner, interface_fee_bps: 100, protocol_fee_bps: 50 },
      clock.clone(),
      ledger.clone(),
    )
    .unwrap();
    let automation = AutomationRegistry::new(
      AutomationConfig {
        owner,
        fee_token,
        account_creation_fee: 500,
        execution_fee: 25,
      },
      ledger.clone(),
    )
    .unwrap();
    let journal = SqliteJournal::open_in_memory().await.unwrap();

    AppState {
      subscriptions: Arc::new(Mutex::new(subscriptions)),
      automation:    Arc::new(Mutex::new(automation)),
      ledger,
      clock,
      journal: Arc::new(journal),
      targets: Arc::new(Mutex::new(HashMap::new())),
      cursors: Arc::new(Mutex::new(JournalCursors::default())),
    }
  }

  async fn request(
    state: AppState,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let builder = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json");
    let req = match body {
      Some(value) => builder.body(Body::from(value.to_string())).unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    let resp = router(state).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  fn subscription_body() -> Value {
    json!({
      "sender": addr(1),
      "recipient": addr(2),
      "amount": 1_000,
      "token": addr(9),
      "time_interval_seconds": 2_592_000,
      "payment_interface": addr(7),
      "free_trial_seconds": 0,
    })
  }

  async fn fund(state: &AppState, token: u64, holder: u64, amount: u64) {
    let (status, _) = request(
      state.clone(),
      "POST",
      "/ledger/credit",
      Some(json!({ "token": addr(token), "holder": addr(holder), "amount": amount })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = request(
      state.clone(),
      "POST",
      "/ledger/approve",
      Some(json!({ "token": addr(token), "owner": addr(holder), "amount": amount })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
  }

  // ── Subscriptions ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_and_fetch_subscription() {
    let state = make_state().await;

    let (status, body) = request(
      state.clone(),
      "POST",
      "/subscriptions",
      Some(subscription_body()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["account_number"], 1);

    let (status, body) = request(state.clone(), "GET", "/subscriptions/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sender"], addr(1));
    assert_eq!(body["payment_due"], START);

    let (status, body) =
      request(state.clone(), "GET", "/subscriptions/1/valid", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);

    let (status, _) = request(state, "GET", "/subscriptions/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn create_rejects_invalid_amount() {
    let state = make_state().await;
    let mut body = subscription_body();
    body["amount"] = json!(0);

    let (status, body) =
      request(state, "POST", "/subscriptions", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("amount"));
  }

  #[tokio::test]
  async fn cancel_flow_maps_registry_errors_to_statuses() {
    let state = make_state().await;
    request(state.clone(), "POST", "/subscriptions", Some(subscription_body()))
      .await;

    // A stranger may not cancel.
    let (status, _) = request(
      state.clone(),
      "POST",
      "/subscriptions/1/cancel",
      Some(json!({ "caller": addr(0x99) })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
      state.clone(),
      "POST",
      "/subscriptions/1/cancel",
      Some(json!({ "caller": addr(1) })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Re-cancelling is a conflict, not a no-op.
    let (status, _) = request(
      state.clone(),
      "POST",
      "/subscriptions/1/cancel",
      Some(json!({ "caller": addr(1) })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) =
      request(state, "GET", "/subscriptions/cancelled", None).await;
    assert_eq!(body["account_numbers"], json!([1]));
  }

  #[tokio::test]
  async fn execute_payment_moves_funds_and_journals_the_event() {
    let state = make_state().await;
    request(state.clone(), "POST", "/subscriptions", Some(subscription_body()))
      .await;
    fund(&state, 9, 1, 1_000).await;

    let (status, _) =
      request(state.clone(), "POST", "/subscriptions/1/execute", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = request(
      state.clone(),
      "GET",
      &format!("/ledger/balance?token={}&holder={}", addr(9), addr(2)),
      None,
    )
    .await;
    assert_eq!(body["balance"], 985);

    let (_, body) = request(
      state,
      "GET",
      "/events/count?kind=payment_transferred",
      None,
    )
    .await;
    assert_eq!(body["count"], 1);
  }

  #[tokio::test]
  async fn unfunded_execution_is_payment_required_and_unjournaled() {
    let state = make_state().await;
    request(state.clone(), "POST", "/subscriptions", Some(subscription_body()))
      .await;

    let (status, _) =
      request(state.clone(), "POST", "/subscriptions/1/execute", None).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

    let (_, body) = request(
      state,
      "GET",
      "/events/count?kind=payment_transferred",
      None,
    )
    .await;
    assert_eq!(body["count"], 0);
  }

  #[tokio::test]
  async fn clock_warp_expires_the_grace_window() {
    let state = make_state().await;
    request(state.clone(), "POST", "/subscriptions", Some(subscription_body()))
      .await;

    // Inside the grace window.
    let (status, _) = request(
      state.clone(),
      "POST",
      "/clock/advance",
      Some(json!({ "seconds": 86_400 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) =
      request(state.clone(), "GET", "/subscriptions/1/valid", None).await;
    assert_eq!(body["valid"], true);

    // One second past it.
    request(state.clone(), "POST", "/clock/advance", Some(json!({ "seconds": 1 })))
      .await;
    let (_, body) =
      request(state.clone(), "GET", "/subscriptions/1/valid", None).await;
    assert_eq!(body["valid"], false);

    // The due date itself never moved.
    let (_, body) = request(state, "GET", "/subscriptions/1/due", None).await;
    assert_eq!(body["payment_due"], START);
  }

  // ── Automation ──────────────────────────────────────────────────────────────

  async fn create_automation_account(
    state: &AppState,
    caller: u64,
    id: u64,
  ) -> u64 {
    fund(state, 0xFE, caller, 500).await;
    let (status, body) = request(
      state.clone(),
      "POST",
      "/automation/accounts",
      Some(json!({ "caller": addr(caller), "id": id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["account_number"].as_u64().unwrap()
  }

  #[tokio::test]
  async fn automation_registration_and_duplicate_rejection() {
    let state = make_state().await;
    let account_number = create_automation_account(&state, 1, 5).await;
    assert_eq!(account_number, 1);

    fund(&state, 0xFE, 1, 500).await;
    let (status, _) = request(
      state.clone(),
      "POST",
      "/automation/accounts",
      Some(json!({ "caller": addr(1), "id": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Same id, different caller: a distinct internal account number.
    let second = create_automation_account(&state, 2, 5).await;
    assert_ne!(second, account_number);

    let (_, body) = request(
      state,
      "GET",
      &format!("/automation/accounts?address={}", addr(1)),
      None,
    )
    .await;
    assert_eq!(body["account_numbers"], json!([account_number]));
  }

  #[tokio::test]
  async fn automation_execute_pays_the_node_and_journals_once() {
    let state = make_state().await;
    let account_number = create_automation_account(&state, 1, 5).await;
    fund(&state, 0xFE, 1, 25).await;

    let (status, body) = request(
      state.clone(),
      "POST",
      &format!("/automation/accounts/{account_number}/execute"),
      Some(json!({ "executor": addr(0x30) })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["executed"], true);

    let (_, body) = request(
      state.clone(),
      "GET",
      &format!("/ledger/balance?token={}&holder={}", addr(0xFE), addr(0x30)),
      None,
    )
    .await;
    assert_eq!(body["balance"], 25);

    let (_, body) =
      request(state, "GET", "/events/count?kind=transaction_success", None).await;
    assert_eq!(body["count"], 1);
  }

  #[tokio::test]
  async fn ineligible_target_reports_not_executed() {
    let state = make_state().await;
    let account_number = create_automation_account(&state, 1, 5).await;

    let (status, _) = request(
      state.clone(),
      "POST",
      &format!("/automation/accounts/{account_number}/target"),
      Some(json!({ "eligible": false })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = request(
      state.clone(),
      "GET",
      &format!("/automation/accounts/{account_number}/check"),
      None,
    )
    .await;
    assert_eq!(body["eligible"], false);

    let (status, body) = request(
      state.clone(),
      "POST",
      &format!("/automation/accounts/{account_number}/execute"),
      Some(json!({ "executor": addr(0x30) })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["executed"], false);

    let (_, body) =
      request(state, "GET", "/events/count?kind=transaction_success", None).await;
    assert_eq!(body["count"], 0);
  }

  #[tokio::test]
  async fn failed_fee_charge_never_reaches_the_journal() {
    let state = make_state().await;
    let account_number = create_automation_account(&state, 1, 5).await;
    // No execution-fee funding: the handshake runs, then the charge fails.

    let (status, _) = request(
      state.clone(),
      "POST",
      &format!("/automation/accounts/{account_number}/execute"),
      Some(json!({ "executor": addr(0x30) })),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

    let (_, body) = request(
      state.clone(),
      "GET",
      "/events/count?kind=transaction_success",
      None,
    )
    .await;
    assert_eq!(body["count"], 0);

    // Funded, the same account executes cleanly.
    fund(&state, 0xFE, 1, 25).await;
    let (status, body) = request(
      state.clone(),
      "POST",
      &format!("/automation/accounts/{account_number}/execute"),
      Some(json!({ "executor": addr(0x30) })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["executed"], true);

    let (_, body) =
      request(state, "GET", "/events/count?kind=transaction_success", None).await;
    assert_eq!(body["count"], 1);
  }

  #[tokio::test]
  async fn cancel_refunds_and_events_scope_by_account() {
    let state = make_state().await;
    let account_number = create_automation_account(&state, 1, 5).await;

    // Owner funds the refund.
    fund(&state, 0xFE, 0xA0, 500).await;
    let (status, _) = request(
      state.clone(),
      "POST",
      "/automation/cancel",
      Some(json!({ "caller": addr(1), "id": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = request(
      state.clone(),
      "GET",
      &format!("/ledger/balance?token={}&holder={}", addr(0xFE), addr(1)),
      None,
    )
    .await;
    assert_eq!(body["balance"], 500);

    let (_, body) = request(
      state.clone(),
      "GET",
      &format!("/events?account_number={account_number}"),
      None,
    )
    .await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["event"]["kind"], "account_cancelled");

    let (_, body) =
      request(state, "GET", "/automation/accounts/cancelled", None).await;
    assert_eq!(body["account_numbers"], json!([account_number]));
  }

  #[tokio::test]
  async fn fee_token_read_and_owner_gated_updates() {
    let state = make_state().await;

    let (_, body) = request(state.clone(), "GET", "/automation/fee-token", None).await;
    assert_eq!(body["fee_token"], addr(0xFE));

    let (status, _) = request(
      state.clone(),
      "POST",
      "/automation/fees",
      Some(json!({ "caller": addr(1), "account_creation_fee": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
      state.clone(),
      "POST",
      "/automation/fees",
      Some(json!({ "caller": addr(0xA0), "account_creation_fee": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
  }
}
