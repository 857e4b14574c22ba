//! Error types for `cadence-core`.

use thiserror::Error;

use crate::{AccountNumber, Timestamp, identity::Address, ledger::LedgerError};

#[derive(Debug, Error)]
pub enum Error {
  #[error("caller {caller} is not authorized for this operation")]
  Unauthorized { caller: Address },

  #[error("id {id} is already registered for {account}")]
  DuplicateRegistration { account: Address, id: u64 },

  #[error("account {0} not found")]
  NotFound(AccountNumber),

  #[error("{account} has no registration under id {id}")]
  IdNotFound { account: Address, id: u64 },

  #[error("invalid argument: {0}")]
  InvalidArgument(&'static str),

  #[error(transparent)]
  Ledger(#[from] LedgerError),

  #[error("account {0} is already cancelled")]
  AlreadyCancelled(AccountNumber),

  #[error("payment on account {account_number} is not due until {due}")]
  NotYetDue {
    account_number: AccountNumber,
    due:            Timestamp,
  },

  #[error("automation hook failed: {0}")]
  Hook(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
