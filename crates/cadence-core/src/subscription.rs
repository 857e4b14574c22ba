//! The recurring-payments registry.
//!
//! Subscriptions are pull-payment agreements: a sender authorizes periodic
//! charges of a fixed amount to a recipient, and an off-chain node layer
//! executes each charge once it falls due. Records are never deleted —
//! cancellation flips a terminal flag and the record stays queryable for
//! its entire history.

use std::{
  collections::{BTreeMap, HashMap},
  sync::Arc,
};

use serde::{Deserialize, Serialize};

use crate::{
  AccountNumber, Error, Result, Timestamp,
  clock::Clock,
  event::{Event, EventLog},
  identity::Address,
  ledger::TokenLedger,
};

/// Fixed read-side validity extension past the due date, absorbing
/// execution delay without moving `payment_due` itself.
pub const GRACE_PERIOD_SECS: u64 = 86_400;

/// Fee shares are expressed in basis points of the charged amount.
const BPS_DENOMINATOR: u128 = 10_000;

// ─── Records ─────────────────────────────────────────────────────────────────

/// A subscription agreement. `sender`, `recipient`, `token`, and
/// `payment_interface` are immutable after creation; only `payment_due`
/// (advanced by successful charges) and `cancelled` ever change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
  pub account_number: AccountNumber,
  pub sender:    Address,
  pub recipient: Address,
  /// Charge per interval, in the token's smallest unit. Always positive.
  pub amount: u64,
  pub token:  Address,
  pub time_interval_seconds: u64,
  /// The referring gateway, entitled to a fee share of every charge.
  pub payment_interface: Address,
  /// Opaque developer metadata; the registry attaches no meaning to it.
  pub additional_information: Vec<String>,
  /// Next scheduled charge instant. Initialized to creation time plus the
  /// free-trial offset; the grace period never moves it.
  pub payment_due: Timestamp,
  pub cancelled:   bool,
}

impl Subscription {
  /// Whether the subscription grants access at `now`: not cancelled and
  /// within the grace window of the due date.
  pub fn is_valid(&self, now: Timestamp) -> bool {
    !self.cancelled && now <= self.payment_due.saturating_add(GRACE_PERIOD_SECS)
  }
}

/// Input to [`SubscriptionRegistry::create_recurring_payment`].
/// The account number, due date, and sender are assigned by the registry.
#[derive(Debug, Clone)]
pub struct NewSubscription {
  pub recipient: Address,
  pub amount:    u64,
  pub token:     Address,
  pub time_interval_seconds:  u64,
  pub payment_interface:      Address,
  pub additional_information: Vec<String>,
  /// Initial delay before the first charge becomes due.
  pub free_trial_seconds: u64,
}

// ─── Configuration ───────────────────────────────────────────────────────────

/// Owner identity and charge-time fee split. Injected at construction;
/// the split is updatable by the owner and read at charge time.
#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
  pub owner: Address,
  /// Share of each charge paid to the subscription's payment interface.
  pub interface_fee_bps: u16,
  /// Share of each charge paid to the registry owner.
  pub protocol_fee_bps: u16,
}

fn validate_fee_split(interface_fee_bps: u16, protocol_fee_bps: u16) -> Result<()> {
  if interface_fee_bps as u128 + protocol_fee_bps as u128 > BPS_DENOMINATOR {
    return Err(Error::InvalidArgument("combined fee split exceeds 100%"));
  }
  Ok(())
}

fn fee_share(amount: u64, bps: u16) -> u64 {
  ((amount as u128 * bps as u128) / BPS_DENOMINATOR) as u64
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Owns subscription records, due-date bookkeeping, grace-window validity
/// checks, and charge execution.
pub struct SubscriptionRegistry {
  config: SubscriptionConfig,
  clock:  Arc<dyn Clock>,
  ledger: Arc<dyn TokenLedger>,
  records: BTreeMap<AccountNumber, Subscription>,
  /// Sender and recipient both index every account they appear on.
  by_address: HashMap<Address, Vec<AccountNumber>>,
  next_account_number: AccountNumber,
  events: EventLog,
}

impl SubscriptionRegistry {
  pub fn new(
    config: SubscriptionConfig,
    clock: Arc<dyn Clock>,
    ledger: Arc<dyn TokenLedger>,
  ) -> Result<Self> {
    validate_fee_split(config.interface_fee_bps, config.protocol_fee_bps)?;
    Ok(Self {
      config,
      clock,
      ledger,
      records: BTreeMap::new(),
      by_address: HashMap::new(),
      next_account_number: 1,
      events: EventLog::default(),
    })
  }

  // ── Mutators ──────────────────────────────────────────────────────────

  /// Register a new subscription for `sender`. No tokens move at creation;
  /// transfers happen only at charge time.
  pub fn create_recurring_payment(
    &mut self,
    sender: Address,
    new: NewSubscription,
  ) -> Result<AccountNumber> {
    if new.amount == 0 {
      return Err(Error::InvalidArgument("amount must be positive"));
    }
    if new.time_interval_seconds == 0 {
      return Err(Error::InvalidArgument("time interval must be positive"));
    }
    if new.recipient.is_zero() {
      return Err(Error::InvalidArgument("recipient must not be the zero address"));
    }
    if new.token.is_zero() {
      return Err(Error::InvalidArgument("token must not be the zero address"));
    }
    if new.payment_interface.is_zero() {
      return Err(Error::InvalidArgument(
        "payment interface must not be the zero address",
      ));
    }

    let account_number = self.next_account_number;
    self.next_account_number += 1;

    let subscription = Subscription {
      account_number,
      sender,
      recipient: new.recipient,
      amount: new.amount,
      token: new.token,
      time_interval_seconds: new.time_interval_seconds,
      payment_interface: new.payment_interface,
      additional_information: new.additional_information,
      payment_due: self.clock.now().saturating_add(new.free_trial_seconds),
      cancelled: false,
    };

    self.index_address(sender, account_number);
    if subscription.recipient != sender {
      self.index_address(subscription.recipient, account_number);
    }
    self.events.emit(Event::RecurringPaymentCreated {
      subscription: subscription.clone(),
    });
    self.records.insert(account_number, subscription);
    Ok(account_number)
  }

  /// Cancel a subscription. Only the sender, the recipient, or the registry
  /// owner may cancel; cancelling an already-cancelled record is an error,
  /// not a no-op.
  pub fn cancel_recurring_payment(
    &mut self,
    caller: Address,
    account_number: AccountNumber,
  ) -> Result<()> {
    let record = self
      .records
      .get_mut(&account_number)
      .ok_or(Error::NotFound(account_number))?;
    if caller != record.sender
      && caller != record.recipient
      && caller != self.config.owner
    {
      return Err(Error::Unauthorized { caller });
    }
    if record.cancelled {
      return Err(Error::AlreadyCancelled(account_number));
    }

    record.cancelled = true;
    let (sender, recipient) = (record.sender, record.recipient);
    self.events.emit(Event::RecurringPaymentCancelled {
      account_number,
      sender,
      recipient,
    });
    Ok(())
  }

  /// Execute a due charge, called by the node layer. Pulls the full amount
  /// from the sender in one atomic step — recipient share, interface fee,
  /// and protocol fee — then advances the due date. Any failure leaves the
  /// record, the ledger, and the event log untouched.
  pub fn execute_payment(&mut self, account_number: AccountNumber) -> Result<()> {
    let record = self
      .records
      .get(&account_number)
      .ok_or(Error::NotFound(account_number))?;
    if record.cancelled {
      return Err(Error::AlreadyCancelled(account_number));
    }
    let now = self.clock.now();
    if now < record.payment_due {
      return Err(Error::NotYetDue { account_number, due: record.payment_due });
    }

    let interface_fee = fee_share(record.amount, self.config.interface_fee_bps);
    let protocol_fee = fee_share(record.amount, self.config.protocol_fee_bps);
    let net = record.amount - interface_fee - protocol_fee;

    let mut payouts = vec![(record.recipient, net)];
    if interface_fee > 0 {
      payouts.push((record.payment_interface, interface_fee));
    }
    if protocol_fee > 0 {
      payouts.push((self.config.owner, protocol_fee));
    }
    self.ledger.pull_split(record.token, record.sender, &payouts)?;

    let record = self
      .records
      .get_mut(&account_number)
      .ok_or(Error::NotFound(account_number))?;
    record.payment_due =
      record.payment_due.saturating_add(record.time_interval_seconds);
    self.events.emit(Event::PaymentTransferred { account_number });
    Ok(())
  }

  /// Update the charge-time fee split. Owner-only; applies to future
  /// charges, never retroactively.
  pub fn set_fee_split(
    &mut self,
    caller: Address,
    interface_fee_bps: u16,
    protocol_fee_bps: u16,
  ) -> Result<()> {
    if caller != self.config.owner {
      return Err(Error::Unauthorized { caller });
    }
    validate_fee_split(interface_fee_bps, protocol_fee_bps)?;
    self.config.interface_fee_bps = interface_fee_bps;
    self.config.protocol_fee_bps = protocol_fee_bps;
    Ok(())
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub fn recurring_payment(
    &self,
    account_number: AccountNumber,
  ) -> Option<&Subscription> {
    self.records.get(&account_number)
  }

  /// True iff the record exists, is not cancelled, and now is within the
  /// grace window of the due date.
  pub fn is_subscription_valid(&self, account_number: AccountNumber) -> bool {
    self
      .records
      .get(&account_number)
      .is_some_and(|record| record.is_valid(self.clock.now()))
  }

  pub fn payment_due(&self, account_number: AccountNumber) -> Option<Timestamp> {
    self.records.get(&account_number).map(|record| record.payment_due)
  }

  pub fn is_payment_cancelled(&self, account_number: AccountNumber) -> bool {
    self
      .records
      .get(&account_number)
      .is_some_and(|record| record.cancelled)
  }

  /// Every account number `address` appears on as sender or recipient,
  /// cancelled ones included, in creation order.
  pub fn account_numbers_by_address(&self, address: Address) -> Vec<AccountNumber> {
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

  pub fn additional_information(
    &self,
    account_number: AccountNumber,
  ) -> Option<&[String]> {
    self
      .records
      .get(&account_number)
      .map(|record| record.additional_information.as_slice())
  }

  /// Committed events, oldest first.
  pub fn events(&self) -> &[Event] { self.events.events() }

  pub fn config(&self) -> &SubscriptionConfig { &self.config }

  fn index_address(&mut self, address: Address, account_number: AccountNumber) {
    self.by_address.entry(address).or_default().push(account_number);
  }
}
