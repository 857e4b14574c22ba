//! The token-movement seam.
//!
//! Registries never hold balances themselves. Every fee, charge, and refund
//! is a *pull*: an allowance-gated withdrawal the registry executes against
//! whatever [`TokenLedger`] it was constructed with. Holders grant the
//! registry an allowance per token; a pull both checks and consumes it.

use std::{
  collections::HashMap,
  sync::{Mutex, MutexGuard, PoisonError},
};

use thiserror::Error;

use crate::identity::Address;

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LedgerError {
  #[error(
    "insufficient funds: {holder} holds {available} of {token}, needs {required}"
  )]
  InsufficientFunds {
    token:     Address,
    holder:    Address,
    available: u64,
    required:  u64,
  },

  #[error(
    "insufficient allowance: {owner} granted {available} of {token}, needs {required}"
  )]
  InsufficientAllowance {
    token:     Address,
    owner:     Address,
    available: u64,
    required:  u64,
  },
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the fungible-asset ledger a registry moves value on.
///
/// `pull_split` is the atomic unit: implementations must apply every payout
/// or none of them, so a multi-way charge can never leave a partial
/// transfer behind.
pub trait TokenLedger: Send + Sync {
  fn balance_of(&self, token: Address, holder: Address) -> u64;

  /// The remaining registry allowance `owner` has granted for `token`.
  fn allowance(&self, token: Address, owner: Address) -> u64;

  /// Withdraw the payout total from `from` and distribute it, all-or-nothing.
  fn pull_split(
    &self,
    token: Address,
    from: Address,
    payouts: &[(Address, u64)],
  ) -> Result<(), LedgerError>;

  /// Single-payee [`pull_split`](TokenLedger::pull_split).
  fn pull(
    &self,
    token: Address,
    from: Address,
    to: Address,
    amount: u64,
  ) -> Result<(), LedgerError> {
    self.pull_split(token, from, &[(to, amount)])
  }
}

// ─── In-memory implementation ────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Inner {
  /// (token, holder) → balance.
  balances:   HashMap<(Address, Address), u64>,
  /// (token, owner) → remaining registry allowance.
  allowances: HashMap<(Address, Address), u64>,
}

/// A process-local [`TokenLedger`] for tests and the sandbox.
#[derive(Debug, Default)]
pub struct MemoryLedger {
  inner: Mutex<Inner>,
}

impl MemoryLedger {
  pub fn new() -> Self { Self::default() }

  /// Mint `amount` of `token` into `holder`'s balance.
  pub fn credit(&self, token: Address, holder: Address, amount: u64) {
    let mut inner = self.lock();
    let balance = inner.balances.entry((token, holder)).or_default();
    *balance = balance.saturating_add(amount);
  }

  /// Set the registry allowance `owner` grants for `token`.
  pub fn approve(&self, token: Address, owner: Address, amount: u64) {
    self.lock().allowances.insert((token, owner), amount);
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl TokenLedger for MemoryLedger {
  fn balance_of(&self, token: Address, holder: Address) -> u64 {
    self.lock().balances.get(&(token, holder)).copied().unwrap_or(0)
  }

  fn allowance(&self, token: Address, owner: Address) -> u64 {
    self.lock().allowances.get(&(token, owner)).copied().unwrap_or(0)
  }

  fn pull_split(
    &self,
    token: Address,
    from: Address,
    payouts: &[(Address, u64)],
  ) -> Result<(), LedgerError> {
    let mut inner = self.lock();

    let required: u128 = payouts.iter().map(|(_, amount)| *amount as u128).sum();
    let balance = inner.balances.get(&(token, from)).copied().unwrap_or(0);
    if (balance as u128) < required {
      return Err(LedgerError::InsufficientFunds {
        token,
        holder: from,
        available: balance,
        required: required.min(u64::MAX as u128) as u64,
      });
    }
    let allowance = inner.allowances.get(&(token, from)).copied().unwrap_or(0);
    if (allowance as u128) < required {
      return Err(LedgerError::InsufficientAllowance {
        token,
        owner: from,
        available: allowance,
        required: required.min(u64::MAX as u128) as u64,
      });
    }

    // Checks passed; required fits in u64 from here on.
    let required = required as u64;
    inner.balances.insert((token, from), balance - required);
    inner.allowances.insert((token, from), allowance - required);
    for (to, amount) in payouts {
      let credited = inner.balances.entry((token, *to)).or_default();
      *credited = credited.saturating_add(*amount);
    }
    Ok(())
  }
}
