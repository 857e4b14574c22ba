//! Registry events and the in-memory emission log.
//!
//! Events become observable only when the operation that emitted them
//! completes. The automation execution path emits its success event *before*
//! charging the node fee, then reverts the log to a checkpoint if the charge
//! fails — so an event that survives in the log proves the whole attempt
//! (eligibility check, action, fee payment) went through. Committed events
//! are what downstream journals persist.

use serde::{Deserialize, Serialize};

use crate::{AccountNumber, identity::Address, subscription::Subscription};

/// Everything the two registries announce. The variant name, snake_cased,
/// doubles as the `kind` discriminant in serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
  /// A new subscription, with the full record as created.
  RecurringPaymentCreated { subscription: Subscription },

  RecurringPaymentCancelled {
    account_number: AccountNumber,
    sender:         Address,
    recipient:      Address,
  },

  /// A charge completed: funds moved and the due date advanced.
  PaymentTransferred { account_number: AccountNumber },

  /// An automation account was registered. Deliberately carries neither the
  /// caller-chosen id nor the internal account number; callers discover the
  /// number by diffing `getAccountsByAddress` around the registration.
  AccountCreated { account: Address },

  AccountCancelled {
    account_number: AccountNumber,
    account:        Address,
  },

  /// The full automation handshake — check, action, node fee — completed.
  TransactionSuccess { account_number: AccountNumber },
}

impl Event {
  /// The discriminant string used as the journal `kind` column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::RecurringPaymentCreated { .. } => "recurring_payment_created",
      Self::RecurringPaymentCancelled { .. } => "recurring_payment_cancelled",
      Self::PaymentTransferred { .. } => "payment_transferred",
      Self::AccountCreated { .. } => "account_created",
      Self::AccountCancelled { .. } => "account_cancelled",
      Self::TransactionSuccess { .. } => "transaction_success",
    }
  }

  /// The account number this event concerns, where it carries one.
  pub fn account_number(&self) -> Option<AccountNumber> {
    match self {
      Self::RecurringPaymentCreated { subscription } => {
        Some(subscription.account_number)
      }
      Self::RecurringPaymentCancelled { account_number, .. }
      | Self::PaymentTransferred { account_number }
      | Self::AccountCancelled { account_number, .. }
      | Self::TransactionSuccess { account_number } => Some(*account_number),
      Self::AccountCreated { .. } => None,
    }
  }
}

// ─── Log ─────────────────────────────────────────────────────────────────────

/// Append-only event log with a revert window for in-flight operations.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
  events: Vec<Event>,
}

impl EventLog {
  pub(crate) fn emit(&mut self, event: Event) { self.events.push(event); }

  /// Mark the current log position. Everything emitted after a checkpoint
  /// can still be dropped by [`revert_to`](EventLog::revert_to).
  pub(crate) fn checkpoint(&self) -> usize { self.events.len() }

  /// Drop every event emitted since `checkpoint`.
  pub(crate) fn revert_to(&mut self, checkpoint: usize) {
    self.events.truncate(checkpoint);
  }

  pub fn events(&self) -> &[Event] { &self.events }

  pub fn len(&self) -> usize { self.events.len() }

  pub fn is_empty(&self) -> bool { self.events.is_empty() }
}
