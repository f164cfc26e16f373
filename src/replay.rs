//! Replays an operations export against a wallet store.
//!
//! Each operation is one atomic load-mutate-save against the owning
//! wallet's row. Rows that fail domain validation are logged and skipped;
//! the replay never stops on a bad row.

use std::collections::HashMap;

use rust_decimal::Decimal;
use thiserror::Error;
use tokio_stream::{Stream, StreamExt};
use tracing::info;
use uuid::Uuid;

use crate::model::{LedgerId, ReservationId, WalletId};
use crate::money::{Currency, Money};
use crate::store::{StoreError, WalletStore};
use crate::wallet::{Wallet, WalletError};

/// One row of an operations export. Wallets are addressed by a client
/// label; `op` is the row's sequence number, which later rows reference to
/// name the ledger entry or reservation an earlier row created.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Stage an incoming deposit.
    Deposit {
        client: String,
        op: u64,
        amount: Decimal,
        reference: Option<String>,
    },
    /// Approve the deposit created by row `target`.
    Approve {
        client: String,
        op: u64,
        target: u64,
        actor: String,
    },
    /// Reject the deposit created by row `target`.
    Reject {
        client: String,
        op: u64,
        target: u64,
        actor: String,
        reason: String,
    },
    /// Withdraw spendable funds.
    Withdraw {
        client: String,
        op: u64,
        amount: Decimal,
        note: Option<String>,
    },
    /// Instant purchase.
    Purchase {
        client: String,
        op: u64,
        amount: Decimal,
        supplier: String,
        note: String,
    },
    /// Platform service fee.
    ServiceFee {
        client: String,
        op: u64,
        amount: Decimal,
        note: String,
    },
    /// Reserve funds for a purchase pending fulfillment.
    Reserve {
        client: String,
        op: u64,
        amount: Decimal,
        fee: Decimal,
        supplier: String,
        method: String,
        note: String,
    },
    /// Settle the reservation created by row `target`.
    Complete {
        client: String,
        op: u64,
        target: u64,
        actor: String,
    },
    /// Release the reservation created by row `target`.
    Cancel {
        client: String,
        op: u64,
        target: u64,
        actor: String,
        reason: String,
    },
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Deposit { .. } => "deposit",
            Operation::Approve { .. } => "approve",
            Operation::Reject { .. } => "reject",
            Operation::Withdraw { .. } => "withdraw",
            Operation::Purchase { .. } => "purchase",
            Operation::ServiceFee { .. } => "fee",
            Operation::Reserve { .. } => "reserve",
            Operation::Complete { .. } => "complete",
            Operation::Cancel { .. } => "cancel",
        }
    }

    pub fn client(&self) -> &str {
        match self {
            Operation::Deposit { client, .. }
            | Operation::Approve { client, .. }
            | Operation::Reject { client, .. }
            | Operation::Withdraw { client, .. }
            | Operation::Purchase { client, .. }
            | Operation::ServiceFee { client, .. }
            | Operation::Reserve { client, .. }
            | Operation::Complete { client, .. }
            | Operation::Cancel { client, .. } => client,
        }
    }

    pub fn op(&self) -> u64 {
        match self {
            Operation::Deposit { op, .. }
            | Operation::Approve { op, .. }
            | Operation::Reject { op, .. }
            | Operation::Withdraw { op, .. }
            | Operation::Purchase { op, .. }
            | Operation::ServiceFee { op, .. }
            | Operation::Reserve { op, .. }
            | Operation::Complete { op, .. }
            | Operation::Cancel { op, .. } => *op,
        }
    }
}

/// Error from applying one replayed operation.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("{0}")]
    Wallet(#[from] WalletError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("row {0} did not create a ledger entry in this replay")]
    UnknownEntryRef(u64),

    #[error("row {0} did not create a reservation in this replay")]
    UnknownReservationRef(u64),
}

/// The replay driver: resolves client labels to wallets (creating them on
/// first sight) and row references to the ids those rows produced.
pub struct Replay<S: WalletStore> {
    store: S,
    base_currency: Currency,
    wallets: HashMap<String, WalletId>,
    entry_refs: HashMap<u64, LedgerId>,
    reservation_refs: HashMap<u64, ReservationId>,
}

/// Public API
impl<S: WalletStore> Replay<S> {
    pub fn new(store: S, base_currency: Currency) -> Self {
        Replay {
            store,
            base_currency,
            wallets: HashMap::new(),
            entry_refs: HashMap::new(),
            reservation_refs: HashMap::new(),
        }
    }

    /// Run the replay over the given operation stream.
    pub async fn run(&mut self, mut stream: impl Stream<Item = Operation> + Unpin) {
        while let Some(operation) = stream.next().await {
            let kind = operation.kind();
            let client = operation.client().to_string();
            let op = operation.op();
            match self.apply(operation) {
                Ok(()) => info!(client = %client, op, "{kind} applied"),
                Err(e) => info!(client = %client, op, reason = %e, "{kind} skipped"),
            }
        }
    }

    /// Apply a single operation: one load-mutate-save round trip.
    pub fn apply(&mut self, operation: Operation) -> Result<(), ReplayError> {
        match operation {
            Operation::Deposit {
                client,
                op,
                amount,
                reference,
            } => {
                let wallet_id = self.wallet_for(&client)?;
                let mut snapshot = self.store.load(wallet_id)?;
                let entry =
                    snapshot
                        .value
                        .deposit(self.money(amount), reference, None)?;
                self.store.save(snapshot)?;
                self.entry_refs.insert(op, entry);
            }
            Operation::Approve {
                client,
                target,
                actor,
                ..
            } => {
                let wallet_id = self.wallet_for(&client)?;
                let entry = self.entry_ref(target)?;
                let mut snapshot = self.store.load(wallet_id)?;
                snapshot.value.approve_deposit(entry, &actor)?;
                self.store.save(snapshot)?;
            }
            Operation::Reject {
                client,
                target,
                actor,
                reason,
                ..
            } => {
                let wallet_id = self.wallet_for(&client)?;
                let entry = self.entry_ref(target)?;
                let mut snapshot = self.store.load(wallet_id)?;
                snapshot.value.reject_deposit(entry, &reason, &actor)?;
                self.store.save(snapshot)?;
            }
            Operation::Withdraw {
                client, op, amount, note,
            } => {
                let wallet_id = self.wallet_for(&client)?;
                let mut snapshot = self.store.load(wallet_id)?;
                let entry = snapshot.value.withdraw(self.money(amount), note)?;
                self.store.save(snapshot)?;
                self.entry_refs.insert(op, entry);
            }
            Operation::Purchase {
                client,
                op,
                amount,
                supplier,
                note,
            } => {
                let wallet_id = self.wallet_for(&client)?;
                let mut snapshot = self.store.load(wallet_id)?;
                let entry = snapshot
                    .value
                    .purchase(self.money(amount), &note, &supplier)?;
                self.store.save(snapshot)?;
                self.entry_refs.insert(op, entry);
            }
            Operation::ServiceFee {
                client, op, amount, note,
            } => {
                let wallet_id = self.wallet_for(&client)?;
                let mut snapshot = self.store.load(wallet_id)?;
                let entry = snapshot
                    .value
                    .charge_service_fee(self.money(amount), &note)?;
                self.store.save(snapshot)?;
                self.entry_refs.insert(op, entry);
            }
            Operation::Reserve {
                client,
                op,
                amount,
                fee,
                supplier,
                method,
                note,
            } => {
                let wallet_id = self.wallet_for(&client)?;
                let mut snapshot = self.store.load(wallet_id)?;
                let ticket = snapshot.value.reserve_for_purchase(
                    self.money(amount),
                    self.money(fee),
                    &note,
                    &supplier,
                    &method,
                )?;
                self.store.save(snapshot)?;
                self.reservation_refs.insert(op, ticket.reservation);
                self.entry_refs.insert(op, ticket.purchase_entry);
            }
            Operation::Complete {
                client,
                target,
                actor,
                ..
            } => {
                let wallet_id = self.wallet_for(&client)?;
                let reservation = self.reservation_ref(target)?;
                let mut snapshot = self.store.load(wallet_id)?;
                snapshot.value.complete_purchase(reservation, &actor)?;
                self.store.save(snapshot)?;
            }
            Operation::Cancel {
                client,
                target,
                actor,
                reason,
                ..
            } => {
                let wallet_id = self.wallet_for(&client)?;
                let reservation = self.reservation_ref(target)?;
                let mut snapshot = self.store.load(wallet_id)?;
                snapshot.value.cancel_purchase(reservation, &reason, &actor)?;
                self.store.save(snapshot)?;
            }
        }
        Ok(())
    }

    /// Final per-wallet balances, sorted by client label:
    /// `(client, total, available, pending)`.
    pub fn balances(&self) -> Vec<(String, Money, Money, Money)> {
        let mut rows: Vec<_> = self
            .wallets
            .iter()
            .filter_map(|(label, id)| {
                let snapshot = self.store.load(*id).ok()?;
                let wallet = snapshot.value;
                Some((
                    label.clone(),
                    wallet.total_balance(),
                    wallet.available_balance(),
                    wallet.pending_balance(),
                ))
            })
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Private API
impl<S: WalletStore> Replay<S> {
    fn money(&self, amount: Decimal) -> Money {
        Money::new(amount, self.base_currency)
    }

    fn wallet_for(&mut self, client: &str) -> Result<WalletId, ReplayError> {
        if let Some(id) = self.wallets.get(client) {
            return Ok(*id);
        }
        let wallet = Wallet::new(Uuid::new_v4(), self.base_currency);
        let id = wallet.id();
        self.store.insert(wallet)?;
        self.wallets.insert(client.to_string(), id);
        Ok(id)
    }

    fn entry_ref(&self, target: u64) -> Result<LedgerId, ReplayError> {
        self.entry_refs
            .get(&target)
            .copied()
            .ok_or(ReplayError::UnknownEntryRef(target))
    }

    fn reservation_ref(&self, target: u64) -> Result<ReservationId, ReplayError> {
        self.reservation_refs
            .get(&target)
            .copied()
            .ok_or(ReplayError::UnknownReservationRef(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;

    // test utils

    fn replay() -> Replay<MemoryStore> {
        Replay::new(MemoryStore::new(), Currency::USD)
    }

    fn deposit(client: &str, op: u64, amount: Decimal) -> Operation {
        Operation::Deposit {
            client: client.to_string(),
            op,
            amount,
            reference: None,
        }
    }

    fn approve(client: &str, op: u64, target: u64) -> Operation {
        Operation::Approve {
            client: client.to_string(),
            op,
            target,
            actor: "ops".to_string(),
        }
    }

    fn withdraw(client: &str, op: u64, amount: Decimal) -> Operation {
        Operation::Withdraw {
            client: client.to_string(),
            op,
            amount,
            note: None,
        }
    }

    fn reserve(client: &str, op: u64, amount: Decimal, fee: Decimal) -> Operation {
        Operation::Reserve {
            client: client.to_string(),
            op,
            amount,
            fee,
            supplier: "ACME".to_string(),
            method: "card".to_string(),
            note: "replay test".to_string(),
        }
    }

    #[test]
    fn deposit_approve_withdraw_round_trip() {
        let mut r = replay();
        r.apply(deposit("alice", 1, dec!(100))).unwrap();
        r.apply(approve("alice", 2, 1)).unwrap();
        r.apply(withdraw("alice", 3, dec!(30))).unwrap();

        let balances = r.balances();
        assert_eq!(balances.len(), 1);
        let (client, total, available, pending) = &balances[0];
        assert_eq!(client, "alice");
        assert_eq!(*total, Money::new(dec!(70), Currency::USD));
        assert_eq!(*available, Money::new(dec!(70), Currency::USD));
        assert_eq!(*pending, Money::new(dec!(0), Currency::USD));
    }

    #[test]
    fn reject_references_the_originating_row() {
        let mut r = replay();
        r.apply(deposit("alice", 1, dec!(100))).unwrap();
        r.apply(Operation::Reject {
            client: "alice".to_string(),
            op: 2,
            target: 1,
            actor: "compliance".to_string(),
            reason: "kyc hold".to_string(),
        })
        .unwrap();

        let (_, total, available, _) = r.balances().remove(0);
        assert_eq!(total, Money::new(dec!(0), Currency::USD));
        assert_eq!(available, Money::new(dec!(0), Currency::USD));
    }

    #[test]
    fn reserve_then_complete() {
        let mut r = replay();
        r.apply(deposit("bob", 1, dec!(1000))).unwrap();
        r.apply(approve("bob", 2, 1)).unwrap();
        r.apply(reserve("bob", 3, dec!(600), dec!(50))).unwrap();
        r.apply(Operation::Complete {
            client: "bob".to_string(),
            op: 4,
            target: 3,
            actor: "ops".to_string(),
        })
        .unwrap();

        let (_, total, available, pending) = r.balances().remove(0);
        assert_eq!(total, Money::new(dec!(350), Currency::USD));
        assert_eq!(available, Money::new(dec!(350), Currency::USD));
        assert_eq!(pending, Money::new(dec!(0), Currency::USD));
    }

    #[test]
    fn reserve_then_cancel_restores_available() {
        let mut r = replay();
        r.apply(deposit("bob", 1, dec!(1000))).unwrap();
        r.apply(approve("bob", 2, 1)).unwrap();
        r.apply(reserve("bob", 3, dec!(600), dec!(50))).unwrap();
        r.apply(Operation::Cancel {
            client: "bob".to_string(),
            op: 4,
            target: 3,
            actor: "ops".to_string(),
            reason: "supplier declined".to_string(),
        })
        .unwrap();

        let (_, total, available, _) = r.balances().remove(0);
        assert_eq!(total, Money::new(dec!(1000), Currency::USD));
        assert_eq!(available, Money::new(dec!(1000), Currency::USD));
    }

    #[test]
    fn unknown_target_row_is_an_error() {
        let mut r = replay();
        r.apply(deposit("alice", 1, dec!(100))).unwrap();

        let result = r.apply(approve("alice", 2, 99));
        assert!(matches!(result, Err(ReplayError::UnknownEntryRef(99))));

        let result = r.apply(Operation::Complete {
            client: "alice".to_string(),
            op: 3,
            target: 99,
            actor: "ops".to_string(),
        });
        assert!(matches!(
            result,
            Err(ReplayError::UnknownReservationRef(99))
        ));
    }

    #[test]
    fn domain_failure_leaves_store_unchanged() {
        let mut r = replay();
        r.apply(deposit("alice", 1, dec!(100))).unwrap();
        r.apply(approve("alice", 2, 1)).unwrap();

        let before = r.store().load(r.wallets["alice"]).unwrap();
        let result = r.apply(withdraw("alice", 3, dec!(500)));
        assert!(matches!(result, Err(ReplayError::Wallet(_))));

        let after = r.store().load(r.wallets["alice"]).unwrap();
        // No save happened: version and balances are untouched.
        assert_eq!(after.version, before.version);
        assert_eq!(after.value.total_balance(), before.value.total_balance());
    }

    #[tokio::test]
    async fn run_skips_failed_operations_and_continues() {
        let mut r = replay();
        let operations = vec![
            deposit("alice", 1, dec!(100)),
            approve("alice", 2, 1),
            withdraw("alice", 3, dec!(500)), // insufficient, skipped
            withdraw("alice", 4, dec!(25)),
        ];

        r.run(tokio_stream::iter(operations)).await;

        let (_, total, available, _) = r.balances().remove(0);
        assert_eq!(total, Money::new(dec!(75), Currency::USD));
        assert_eq!(available, Money::new(dec!(75), Currency::USD));
    }

    #[tokio::test]
    async fn run_handles_multiple_clients() {
        let mut r = replay();
        let operations = vec![
            deposit("alice", 1, dec!(100)),
            deposit("bob", 2, dec!(200)),
            approve("alice", 3, 1),
            approve("bob", 4, 2),
            withdraw("bob", 5, dec!(50)),
        ];

        r.run(tokio_stream::iter(operations)).await;

        let balances = r.balances();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].0, "alice");
        assert_eq!(balances[0].1, Money::new(dec!(100), Currency::USD));
        assert_eq!(balances[1].0, "bob");
        assert_eq!(balances[1].1, Money::new(dec!(150), Currency::USD));
    }
}
