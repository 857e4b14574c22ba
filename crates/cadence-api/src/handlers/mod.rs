//! Request handlers, grouped by surface.

pub mod automation;
pub mod chain;
pub mod ledger;
pub mod subscriptions;
