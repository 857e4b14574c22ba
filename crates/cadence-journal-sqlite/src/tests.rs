//! Integration tests for `SqliteJournal` against an in-memory database.

use cadence_core::{
  event::Event,
  identity::Address,
  journal::EventJournal,
  subscription::Subscription,
};

use crate::SqliteJournal;

async fn journal() -> SqliteJournal {
  SqliteJournal::open_in_memory()
    .await
    .expect("in-memory journal")
}

fn addr(n: u64) -> Address { Address::from_low_u64(n) }

fn creation_event(account_number: u64) -> Event {
  Event::RecurringPaymentCreated {
    subscription: Subscription {
      account_number,
      sender: addr(1),
      recipient: addr(2),
      amount: 1_000,
      token: addr(9),
      time_interval_seconds: 2_592_000,
      payment_interface: addr(7),
      additional_information: vec!["plan:pro".into()],
      payment_due: 604_800,
      cancelled: false,
    },
  }
}

// ─── Append and scan ─────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_journal_has_no_entries() {
  let j = journal().await;
  assert!(j.entries().await.unwrap().is_empty());
  assert_eq!(j.count_by_kind("transaction_success").await.unwrap(), 0);
}

#[tokio::test]
async fn append_and_read_back_in_order() {
  let j = journal().await;
  let events = vec![
    creation_event(1),
    Event::PaymentTransferred { account_number: 1 },
    Event::TransactionSuccess { account_number: 3 },
  ];
  j.append(&events).await.unwrap();

  let entries = j.entries().await.unwrap();
  assert_eq!(entries.len(), 3);
  for (entry, event) in entries.iter().zip(&events) {
    assert_eq!(&entry.event, event);
  }
}

#[tokio::test]
async fn append_empty_slice_is_a_noop() {
  let j = journal().await;
  j.append(&[]).await.unwrap();
  assert!(j.entries().await.unwrap().is_empty());
}

#[tokio::test]
async fn sequence_numbers_increase_across_appends() {
  let j = journal().await;
  j.append(&[Event::TransactionSuccess { account_number: 1 }])
    .await
    .unwrap();
  j.append(&[Event::TransactionSuccess { account_number: 2 }])
    .await
    .unwrap();

  let entries = j.entries().await.unwrap();
  assert_eq!(entries.len(), 2);
  assert!(entries[0].seq < entries[1].seq);
}

// ─── Payload round-trips ─────────────────────────────────────────────────────

#[tokio::test]
async fn full_record_payload_round_trips() {
  let j = journal().await;
  let event = creation_event(42);
  j.append(std::slice::from_ref(&event)).await.unwrap();

  let entries = j.entries().await.unwrap();
  assert_eq!(entries[0].event, event);
}

#[tokio::test]
async fn cancellation_payload_round_trips() {
  let j = journal().await;
  let event = Event::RecurringPaymentCancelled {
    account_number: 7,
    sender: addr(1),
    recipient: addr(2),
  };
  j.append(std::slice::from_ref(&event)).await.unwrap();

  let entries = j.entries_for_account(7).await.unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].event, event);
}

// ─── Filters ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn entries_for_account_filters_by_account_column() {
  let j = journal().await;
  j.append(&[
    creation_event(1),
    Event::PaymentTransferred { account_number: 1 },
    Event::PaymentTransferred { account_number: 2 },
    // Carries no account number; must never match an account filter.
    Event::AccountCreated { account: addr(5) },
  ])
  .await
  .unwrap();

  let entries = j.entries_for_account(1).await.unwrap();
  assert_eq!(entries.len(), 2);
  assert!(
    entries
      .iter()
      .all(|entry| entry.event.account_number() == Some(1))
  );

  assert!(j.entries_for_account(99).await.unwrap().is_empty());
}

#[tokio::test]
async fn count_by_kind_counts_only_that_kind() {
  let j = journal().await;
  j.append(&[
    Event::TransactionSuccess { account_number: 1 },
    Event::TransactionSuccess { account_number: 2 },
    Event::AccountCreated { account: addr(5) },
  ])
  .await
  .unwrap();

  assert_eq!(j.count_by_kind("transaction_success").await.unwrap(), 2);
  assert_eq!(j.count_by_kind("account_created").await.unwrap(), 1);
  assert_eq!(j.count_by_kind("payment_transferred").await.unwrap(), 0);
}
