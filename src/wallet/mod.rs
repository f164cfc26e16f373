//! The wallet aggregate.
//!
//! A [`Wallet`] is the sole authority over balance math for one client. It
//! owns its ledger entries and purchase reservations, and every mutating
//! operation validates fully before touching any state, so a failed call
//! leaves the aggregate exactly as it was.
//!
//! Two staging directions keep the balance pair meaningful at all times:
//! deposits credit `balance` immediately and `available_balance` only on
//! approval, while reservations debit `available_balance` immediately and
//! `balance` only on settlement. `available_balance` therefore always means
//! "spendable right now" and `balance` "total funds attributed, holds
//! included".

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::ledger::{LedgerEntry, LedgerEntryType, LedgerStatus};
use crate::model::{ClientId, LedgerId, ReservationId, WalletId};
use crate::money::{Currency, Money, MoneyError};
use crate::reservation::{PurchaseReservation, ReservationStatus};

mod error;
pub use error::WalletError;

/// Ids handed back by [`Wallet::reserve_for_purchase`]: the reservation and
/// the two pending ledger entries it pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationTicket {
    pub reservation: ReservationId,
    pub purchase_entry: LedgerId,
    pub service_fee_entry: LedgerId,
}

/// The aggregate root: one currency-denominated balance pair plus the
/// ledger entries and reservations belonging to it.
#[derive(Debug, Clone)]
pub struct Wallet {
    id: WalletId,
    client_id: ClientId,
    base_currency: Currency,
    balance: Money,
    available_balance: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    entries: Vec<LedgerEntry>,
    reservations: Vec<PurchaseReservation>,
}

/// Public API
impl Wallet {
    /// Create an empty wallet for a client. Done once at onboarding.
    pub fn new(client_id: ClientId, base_currency: Currency) -> Self {
        let now = Utc::now();
        Wallet {
            id: Uuid::new_v4(),
            client_id,
            base_currency,
            balance: Money::zero(base_currency),
            available_balance: Money::zero(base_currency),
            created_at: now,
            updated_at: now,
            entries: Vec::new(),
            reservations: Vec::new(),
        }
    }

    pub fn id(&self) -> WalletId {
        self.id
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn base_currency(&self) -> Currency {
        self.base_currency
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Total funds attributed to this wallet, holds included.
    pub fn total_balance(&self) -> Money {
        self.balance
    }

    /// Funds free to withdraw or spend right now.
    pub fn available_balance(&self) -> Money {
        self.available_balance
    }

    /// Funds pending release or reserved: balance minus available.
    pub fn pending_balance(&self) -> Money {
        Money::new(
            self.balance.amount() - self.available_balance.amount(),
            self.base_currency,
        )
    }

    pub fn has_sufficient_balance(&self, amount: Money) -> bool {
        amount.currency() == self.base_currency && self.available_balance >= amount
    }

    pub fn has_sufficient_balance_for_purchase(&self, purchase: Money, fee: Money) -> bool {
        match purchase.checked_add(fee) {
            Ok(total) => self.has_sufficient_balance(total),
            Err(_) => false,
        }
    }

    /// All ledger entries, in creation order.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// All reservations, in creation order.
    pub fn reservations(&self) -> &[PurchaseReservation] {
        &self.reservations
    }

    pub fn entry(&self, id: LedgerId) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    pub fn reservation(&self, id: ReservationId) -> Option<&PurchaseReservation> {
        self.reservations.iter().find(|r| r.id() == id)
    }

    /// Deposit entries still awaiting approval.
    pub fn pending_deposits(&self) -> impl Iterator<Item = &LedgerEntry> + '_ {
        self.entries
            .iter()
            .filter(|e| e.entry_type() == LedgerEntryType::Deposit && e.is_pending())
    }

    /// Record an incoming deposit.
    ///
    /// Credits `balance` immediately; the funds become spendable only once
    /// [`approve_deposit`](Self::approve_deposit) runs.
    pub fn deposit(
        &mut self,
        amount: Money,
        reference: Option<String>,
        description: Option<String>,
    ) -> Result<LedgerId, WalletError> {
        self.check_amount(amount)?;

        let entry = LedgerEntry::new(
            self.id,
            LedgerEntryType::Deposit,
            amount,
            LedgerStatus::Pending,
            reference,
            description,
        )?;
        let id = entry.id();

        self.balance = self.balance.checked_add(amount)?;
        self.entries.push(entry);
        self.touch();
        Ok(id)
    }

    /// Approve a pending deposit: the entry completes and the funds become
    /// spendable. `balance` was already credited at deposit time.
    pub fn approve_deposit(&mut self, entry_id: LedgerId, approver: &str) -> Result<(), WalletError> {
        let idx = self.pending_deposit_index(entry_id)?;
        let amount = self.entries[idx].amount();

        let available = self.available_balance.checked_add(amount)?;
        self.entries[idx].mark_completed(approver)?;
        self.available_balance = available;
        self.touch();
        Ok(())
    }

    /// Reject a pending deposit: the entry fails and the earlier `balance`
    /// credit is reversed. `available_balance` was never credited.
    pub fn reject_deposit(
        &mut self,
        entry_id: LedgerId,
        reason: &str,
        rejecter: &str,
    ) -> Result<(), WalletError> {
        let idx = self.pending_deposit_index(entry_id)?;
        let amount = self.entries[idx].amount();

        let balance = self.balance.checked_sub(amount)?;
        self.entries[idx].mark_failed(reason, rejecter)?;
        self.balance = balance;
        self.touch();
        Ok(())
    }

    /// Withdraw spendable funds. Not staged: the entry is created Completed
    /// and both balances drop in one step. The engine trusts the caller's
    /// upstream approval gate.
    pub fn withdraw(
        &mut self,
        amount: Money,
        description: Option<String>,
    ) -> Result<LedgerId, WalletError> {
        self.spend(LedgerEntryType::Withdrawal, amount, None, description)
    }

    /// Instant (non-reserved) purchase against spendable funds.
    pub fn purchase(
        &mut self,
        amount: Money,
        description: &str,
        supplier_details: &str,
    ) -> Result<LedgerId, WalletError> {
        self.spend(
            LedgerEntryType::Purchase,
            amount,
            Some(supplier_details.to_string()),
            Some(description.to_string()),
        )
    }

    /// Charge a platform service fee against spendable funds.
    pub fn charge_service_fee(
        &mut self,
        amount: Money,
        description: &str,
    ) -> Result<LedgerId, WalletError> {
        self.spend(
            LedgerEntryType::ServiceFee,
            amount,
            None,
            Some(description.to_string()),
        )
    }

    /// Earmark funds for a purchase whose outcome is not yet known.
    ///
    /// Creates two pending entries (purchase + service fee) and one pending
    /// reservation, and debits `available_balance` by the total. `balance`
    /// is untouched until settlement: the money is still owned, only its
    /// spendability is restricted.
    pub fn reserve_for_purchase(
        &mut self,
        purchase_amount: Money,
        service_fee: Money,
        description: &str,
        supplier_details: &str,
        payment_method: &str,
    ) -> Result<ReservationTicket, WalletError> {
        self.check_amount(purchase_amount)?;
        if service_fee.currency() != self.base_currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.base_currency,
                right: service_fee.currency(),
            }
            .into());
        }
        if service_fee.is_negative() {
            return Err(WalletError::InvalidAmount(service_fee));
        }

        let total = purchase_amount.checked_add(service_fee)?;
        if self.available_balance < total {
            return Err(WalletError::InsufficientFunds {
                available: self.available_balance,
                requested: total,
            });
        }

        let purchase_entry = LedgerEntry::new(
            self.id,
            LedgerEntryType::Purchase,
            purchase_amount,
            LedgerStatus::Pending,
            Some(supplier_details.to_string()),
            Some(description.to_string()),
        )?;
        let fee_entry = LedgerEntry::new(
            self.id,
            LedgerEntryType::ServiceFee,
            service_fee,
            LedgerStatus::Pending,
            None,
            Some(format!("service fee: {description}")),
        )?;
        let reservation = PurchaseReservation::new(
            self.client_id,
            self.id,
            purchase_entry.id(),
            fee_entry.id(),
            purchase_amount,
            service_fee,
            description,
            supplier_details,
            payment_method,
        )?;

        let ticket = ReservationTicket {
            reservation: reservation.id(),
            purchase_entry: purchase_entry.id(),
            service_fee_entry: fee_entry.id(),
        };

        self.available_balance = self.available_balance.checked_sub(total)?;
        self.entries.push(purchase_entry);
        self.entries.push(fee_entry);
        self.reservations.push(reservation);
        self.touch();
        Ok(ticket)
    }

    /// Settle a pending reservation: both entries complete and `balance`
    /// drops by the total. `available_balance` already dropped at
    /// reservation time.
    pub fn complete_purchase(
        &mut self,
        reservation_id: ReservationId,
        processed_by: &str,
    ) -> Result<(), WalletError> {
        let idx = self.pending_reservation_index(reservation_id)?;
        let total = self.reservations[idx].total_amount();
        let purchase_idx = self.entry_index(self.reservations[idx].purchase_entry())?;
        let fee_idx = self.entry_index(self.reservations[idx].service_fee_entry())?;

        let balance = self.balance.checked_sub(total)?;
        self.entries[purchase_idx].mark_completed(processed_by)?;
        self.entries[fee_idx].mark_completed(processed_by)?;
        self.reservations[idx].complete(processed_by)?;
        self.balance = balance;
        self.touch();
        Ok(())
    }

    /// Release a pending reservation: both entries fail and the hold on
    /// `available_balance` is restored. `balance` was never debited.
    pub fn cancel_purchase(
        &mut self,
        reservation_id: ReservationId,
        reason: &str,
        cancelled_by: &str,
    ) -> Result<(), WalletError> {
        let idx = self.pending_reservation_index(reservation_id)?;
        let total = self.reservations[idx].total_amount();
        let purchase_idx = self.entry_index(self.reservations[idx].purchase_entry())?;
        let fee_idx = self.entry_index(self.reservations[idx].service_fee_entry())?;

        let available = self.available_balance.checked_add(total)?;
        self.entries[purchase_idx].mark_failed(reason, cancelled_by)?;
        self.entries[fee_idx].mark_failed(reason, cancelled_by)?;
        self.reservations[idx].cancel(reason, cancelled_by)?;
        self.available_balance = available;
        self.touch();
        Ok(())
    }
}

/// Private API
impl Wallet {
    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Reject foreign currencies and non-positive amounts up front.
    fn check_amount(&self, amount: Money) -> Result<(), WalletError> {
        if amount.currency() != self.base_currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.base_currency,
                right: amount.currency(),
            }
            .into());
        }
        if !amount.is_positive() {
            return Err(WalletError::InvalidAmount(amount));
        }
        Ok(())
    }

    fn entry_index(&self, id: LedgerId) -> Result<usize, WalletError> {
        self.entries
            .iter()
            .position(|e| e.id() == id)
            .ok_or(WalletError::EntryNotFound(id))
    }

    /// Find a deposit entry that is still pending approval.
    fn pending_deposit_index(&self, id: LedgerId) -> Result<usize, WalletError> {
        let idx = self.entry_index(id)?;
        let entry = &self.entries[idx];
        if entry.entry_type() != LedgerEntryType::Deposit || !entry.is_pending() {
            return Err(WalletError::NotPendingDeposit {
                id,
                status: entry.status(),
            });
        }
        Ok(idx)
    }

    fn pending_reservation_index(&self, id: ReservationId) -> Result<usize, WalletError> {
        let idx = self
            .reservations
            .iter()
            .position(|r| r.id() == id)
            .ok_or(WalletError::ReservationNotFound(id))?;
        let reservation = &self.reservations[idx];
        if reservation.status() != ReservationStatus::Pending {
            return Err(WalletError::ReservationNotPending {
                id,
                status: reservation.status(),
            });
        }
        Ok(idx)
    }

    /// Common path for the instant (non-staged) debits: withdrawal,
    /// purchase, service fee. Entry is created Completed and both balances
    /// drop together.
    fn spend(
        &mut self,
        entry_type: LedgerEntryType,
        amount: Money,
        reference: Option<String>,
        description: Option<String>,
    ) -> Result<LedgerId, WalletError> {
        self.check_amount(amount)?;
        if self.available_balance < amount {
            return Err(WalletError::InsufficientFunds {
                available: self.available_balance,
                requested: amount,
            });
        }

        let entry = LedgerEntry::new(
            self.id,
            entry_type,
            amount,
            LedgerStatus::Completed,
            reference,
            description,
        )?;
        let id = entry.id();

        self.balance = self.balance.checked_sub(amount)?;
        self.available_balance = self.available_balance.checked_sub(amount)?;
        self.entries.push(entry);
        self.touch();
        Ok(id)
    }
}
