//! The automation-layer registry.
//!
//! A generic execution primitive: contracts register an account (paying a
//! creation fee), expose two hooks keyed by their own id, and off-chain
//! nodes drive the handshake — delegated eligibility check, delegated
//! action, then a per-call fee to the invoking node. The registry holds no
//! eligibility logic of its own; it only translates its internal account
//! number to the caller's id and asks.

use std::{
  collections::{BTreeMap, HashMap},
  sync::Arc,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  AccountNumber, Error, Result,
  event::{Event, EventLog},
  identity::Address,
  ledger::TokenLedger,
};

// ─── Capability ──────────────────────────────────────────────────────────────

/// Failure reported by a caller-supplied hook.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
  pub fn new(message: impl Into<String>) -> Self { Self(message.into()) }
}

/// The two entry points a registering contract must expose. Both are keyed
/// by the caller's own `id`, never the registry's internal account number.
pub trait AutomationTarget: Send + Sync {
  /// Should the registered action run right now?
  fn check_simple_automation(&self, id: u64) -> Result<bool, HookError>;

  /// The registered action itself.
  fn simple_automation(&self, id: u64) -> Result<(), HookError>;
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A registered automation account. The creation fee (asset and amount) is
/// captured at registration so cancellation can refund it verbatim, no
/// matter how the registry's fee configuration changes in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationAccount {
  pub account_number: AccountNumber,
  /// The registering caller.
  pub account: Address,
  /// Caller-chosen key, non-zero, unique within the caller's namespace.
  pub id: u64,
  pub fee_token: Address,
  pub account_creation_fee: u64,
  pub cancelled: bool,
}

// ─── Configuration ───────────────────────────────────────────────────────────

/// Owner identity and fee schedule. Injected at construction; updates are
/// owner-only and affect only future registrations and executions.
#[derive(Debug, Clone)]
pub struct AutomationConfig {
  pub owner: Address,
  /// Asset currently accepted for both fees.
  pub fee_token: Address,
  /// Charged at registration, captured for refund.
  pub account_creation_fee: u64,
  /// Charged per successful execution, payable to the invoking node.
  pub execution_fee: u64,
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Owns automation-account records, the `(account, id)` namespace, and the
/// fee-gated execution handshake.
pub struct AutomationRegistry {
  config: AutomationConfig,
  ledger: Arc<dyn TokenLedger>,
  records: BTreeMap<AccountNumber, AutomationAccount>,
  targets: HashMap<AccountNumber, Arc<dyn AutomationTarget>>,
  by_id: HashMap<(Address, u64), AccountNumber>,
  by_address: HashMap<Address, Vec<AccountNumber>>,
  next_account_number: AccountNumber,
  events: EventLog,
}

impl AutomationRegistry {
  pub fn new(config: AutomationConfig, ledger: Arc<dyn TokenLedger>) -> Result<Self> {
    if config.fee_token.is_zero() {
      return Err(Error::InvalidArgument("fee token must not be the zero address"));
    }
    Ok(Self {
      config,
      ledger,
      records: BTreeMap::new(),
      targets: HashMap::new(),
      by_id: HashMap::new(),
      by_address: HashMap::new(),
      next_account_number: 1,
      events: EventLog::default(),
    })
  }

  // ── Mutators ──────────────────────────────────────────────────────────

  /// Register an automation account for `caller` under its chosen `id`,
  /// pulling the current creation fee to the owner. The `(caller, id)` pair
  /// must be unused — cancelled registrations still occupy it. The emitted
  /// event carries only the caller; the assigned account number is
  /// discovered by diffing [`accounts_by_address`](Self::accounts_by_address).
  pub fn create_account(
    &mut self,
    caller: Address,
    id: u64,
    target: Arc<dyn AutomationTarget>,
  ) -> Result<()> {
    if id == 0 {
      return Err(Error::InvalidArgument("id must be non-zero"));
    }
    if self.by_id.contains_key(&(caller, id)) {
      return Err(Error::DuplicateRegistration { account: caller, id });
    }

    self.ledger.pull(
      self.config.fee_token,
      caller,
      self.config.owner,
      self.config.account_creation_fee,
    )?;

    let account_number = self.next_account_number;
    self.next_account_number += 1;

    self.records.insert(account_number, AutomationAccount {
      account_number,
      account: caller,
      id,
      fee_token: self.config.fee_token,
      account_creation_fee: self.config.account_creation_fee,
      cancelled: false,
    });
    self.targets.insert(account_number, target);
    self.by_id.insert((caller, id), account_number);
    self.by_address.entry(caller).or_default().push(account_number);

    self.events.emit(Event::AccountCreated { account: caller });
    Ok(())
  }

  /// Cancel `caller`'s registration under `id`, refunding the creation fee
  /// captured at registration. The refund must complete before the flag
  /// flips; a failed refund leaves the account active.
  pub fn cancel_account(&mut self, caller: Address, id: u64) -> Result<()> {
    let account_number = *self
      .by_id
      .get(&(caller, id))
      .ok_or(Error::IdNotFound { account: caller, id })?;
    let record = self
      .records
      .get(&account_number)
      .ok_or(Error::NotFound(account_number))?;
    if record.cancelled {
      return Err(Error::AlreadyCancelled(account_number));
    }

    let (fee_token, fee) = (record.fee_token, record.account_creation_fee);
    self.ledger.pull(fee_token, self.config.owner, caller, fee)?;

    let record = self
      .records
      .get_mut(&account_number)
      .ok_or(Error::NotFound(account_number))?;
    record.cancelled = true;
    self.events.emit(Event::AccountCancelled { account_number, account: caller });
    Ok(())
  }

  /// Run the execution handshake for `account_number`, invoked by a node.
  ///
  /// Returns `Ok(false)` when the delegated check declines — nothing ran,
  /// no fee moved, no event. On `Ok(true)` the action ran, the node fee was
  /// paid to `executor`, and a `TransactionSuccess` event is in the log.
  /// Every other outcome is an error with no surviving effects: the success
  /// event is emitted before the fee charge, and reverted with it.
  pub fn execute(
    &mut self,
    executor: Address,
    account_number: AccountNumber,
  ) -> Result<bool> {
    let record = self
      .records
      .get(&account_number)
      .ok_or(Error::NotFound(account_number))?;
    if record.cancelled {
      return Err(Error::AlreadyCancelled(account_number));
    }
    let (id, registrant) = (record.id, record.account);
    let target = self
      .targets
      .get(&account_number)
      .cloned()
      .ok_or_else(|| Error::Hook("no automation target registered".into()))?;

    let checkpoint = self.events.checkpoint();
    let eligible = target
      .check_simple_automation(id)
      .map_err(|e| Error::Hook(e.to_string()))?;
    if !eligible {
      return Ok(false);
    }
    target
      .simple_automation(id)
      .map_err(|e| Error::Hook(e.to_string()))?;

    self.events.emit(Event::TransactionSuccess { account_number });
    if let Err(e) = self.ledger.pull(
      self.config.fee_token,
      registrant,
      executor,
      self.config.execution_fee,
    ) {
      // The success event must not survive a failed fee charge.
      self.events.revert_to(checkpoint);
      return Err(e.into());
    }
    Ok(true)
  }

  /// Update the creation fee charged to future registrations. Owner-only.
  pub fn set_creation_fee(&mut self, caller: Address, fee: u64) -> Result<()> {
    self.require_owner(caller)?;
    self.config.account_creation_fee = fee;
    Ok(())
  }

  /// Update the per-execution node fee. Owner-only.
  pub fn set_execution_fee(&mut self, caller: Address, fee: u64) -> Result<()> {
    self.require_owner(caller)?;
    self.config.execution_fee = fee;
    Ok(())
  }

  /// Change the fee asset for future registrations and executions.
  /// Existing accounts keep refund rights in the asset they paid.
  pub fn set_fee_token(&mut self, caller: Address, token: Address) -> Result<()> {
    self.require_owner(caller)?;
    if token.is_zero() {
      return Err(Error::InvalidArgument("fee token must not be the zero address"));
    }
    self.config.fee_token = token;
    Ok(())
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Delegate to the registered target's eligibility hook and return its
  /// answer verbatim. Unknown and cancelled accounts are `false` without
  /// invoking the hook; a failing hook also reads as `false`.
  pub fn check_simple_automation(&self, account_number: AccountNumber) -> bool {
    let Some(record) = self.records.get(&account_number) else {
      return false;
    };
    if record.cancelled {
      return false;
    }
    self
      .targets
      .get(&account_number)
      .is_some_and(|target| {
        target.check_simple_automation(record.id).unwrap_or(false)
      })
  }

  pub fn account(&self, account_number: AccountNumber) -> Option<&AutomationAccount> {
    self.records.get(&account_number)
  }

  pub fn is_account_cancelled(&self, account_number: AccountNumber) -> bool {
    self
      .records
      .get(&account_number)
      .is_some_and(|record| record.cancelled)
  }

  /// Every account number ever assigned to `address`, cancelled or not,
  /// in creation order.
  pub fn accounts_by_address(&self, address: Address) -> Vec<AccountNumber> {
    self.by_address.get(&address).cloned().unwrap_or_default()
  }

  /// Every cancelled account number, in creation order.
  pub fn cancelled_accounts(&self) -> Vec<AccountNumber> {
    self
      .records
      .values()
      .filter(|record| record.cancelled)
      .map(|record| record.account_number)
      .collect()
  }

  /// The asset currently accepted for fees.
  pub fn fee_token(&self) -> Address { self.config.fee_token }

  /// Committed events, oldest first.
  pub fn events(&self) -> &[Event] { self.events.events() }

  pub fn config(&self) -> &AutomationConfig { &self.config }

  fn require_owner(&self, caller: Address) -> Result<()> {
    if caller != self.config.owner {
      return Err(Error::Unauthorized { caller });
    }
    Ok(())
  }
}
