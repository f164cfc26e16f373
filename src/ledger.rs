//! Append-only ledger entries.
//!
//! A [`LedgerEntry`] records one monetary movement on a wallet. Entries are
//! immutable apart from their status state machine: Pending may become
//! Completed or Failed, and both of those are terminal.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{LedgerId, WalletId};
use crate::money::Money;

/// Error from ledger entry creation or transitions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid amount {0}: ledger amounts must be positive")]
    InvalidAmount(Money),

    #[error("{0:?} is not a valid initial status")]
    InvalidInitialStatus(LedgerStatus),

    #[error("invalid transition: entry is already {0:?}")]
    InvalidTransition(LedgerStatus),

    #[error("entry is {0:?}; only pending entries can be edited")]
    NotEditable(LedgerStatus),
}

/// The kind of monetary movement an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEntryType {
    Deposit,
    Withdrawal,
    Purchase,
    ServiceFee,
}

/// Lifecycle of a ledger entry. Completed and Failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedgerStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

/// One immutable record of a monetary movement.
///
/// Created only by the owning wallet; never deleted, never re-amounted.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    id: LedgerId,
    wallet_id: WalletId,
    entry_type: LedgerEntryType,
    amount: Money,
    status: LedgerStatus,
    created_at: DateTime<Utc>,
    reference: Option<String>,
    description: Option<String>,
    failure_reason: Option<String>,
    approved_by: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    rejected_by: Option<String>,
    rejected_at: Option<DateTime<Utc>>,
}

impl LedgerEntry {
    /// Create a new entry with a fresh id and timestamp.
    ///
    /// Amounts must be positive, except that a zero-amount service fee is
    /// allowed (a reservation always carries a fee leg, fee or no fee).
    /// Entries may start Pending or Completed, never Failed.
    pub fn new(
        wallet_id: WalletId,
        entry_type: LedgerEntryType,
        amount: Money,
        status: LedgerStatus,
        reference: Option<String>,
        description: Option<String>,
    ) -> Result<Self, LedgerError> {
        let zero_allowed = entry_type == LedgerEntryType::ServiceFee;
        if amount.is_negative() || (amount.is_zero() && !zero_allowed) {
            return Err(LedgerError::InvalidAmount(amount));
        }
        if status == LedgerStatus::Failed {
            return Err(LedgerError::InvalidInitialStatus(status));
        }

        Ok(LedgerEntry {
            id: Uuid::new_v4(),
            wallet_id,
            entry_type,
            amount,
            status,
            created_at: Utc::now(),
            reference,
            description,
            failure_reason: None,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
        })
    }

    pub fn id(&self) -> LedgerId {
        self.id
    }

    pub fn wallet_id(&self) -> WalletId {
        self.wallet_id
    }

    pub fn entry_type(&self) -> LedgerEntryType {
        self.entry_type
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn status(&self) -> LedgerStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn approved_by(&self) -> Option<&str> {
        self.approved_by.as_deref()
    }

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    pub fn rejected_by(&self) -> Option<&str> {
        self.rejected_by.as_deref()
    }

    pub fn rejected_at(&self) -> Option<DateTime<Utc>> {
        self.rejected_at
    }

    pub fn is_pending(&self) -> bool {
        self.status == LedgerStatus::Pending
    }

    /// Transition to Completed, stamping the approver.
    ///
    /// A no-op when already Completed; fails from Failed.
    pub fn mark_completed(&mut self, approver: &str) -> Result<(), LedgerError> {
        match self.status {
            LedgerStatus::Completed => Ok(()),
            LedgerStatus::Failed => Err(LedgerError::InvalidTransition(self.status)),
            LedgerStatus::Pending => {
                self.status = LedgerStatus::Completed;
                self.approved_by = Some(approver.to_string());
                self.approved_at = Some(Utc::now());
                Ok(())
            }
        }
    }

    /// Transition to Failed, stamping the reason and rejecter.
    ///
    /// A no-op when already Failed; fails from Completed.
    pub fn mark_failed(&mut self, reason: &str, rejecter: &str) -> Result<(), LedgerError> {
        match self.status {
            LedgerStatus::Failed => Ok(()),
            LedgerStatus::Completed => Err(LedgerError::InvalidTransition(self.status)),
            LedgerStatus::Pending => {
                self.status = LedgerStatus::Failed;
                self.failure_reason = Some(reason.to_string());
                self.rejected_by = Some(rejecter.to_string());
                self.rejected_at = Some(Utc::now());
                Ok(())
            }
        }
    }

    /// Replace the external reference. Only pending entries can be edited.
    pub fn update_reference(&mut self, reference: &str) -> Result<(), LedgerError> {
        if self.status != LedgerStatus::Pending {
            return Err(LedgerError::NotEditable(self.status));
        }
        self.reference = Some(reference.to_string());
        Ok(())
    }

    /// Replace the description. Only pending entries can be edited.
    pub fn update_description(&mut self, description: &str) -> Result<(), LedgerError> {
        if self.status != LedgerStatus::Pending {
            return Err(LedgerError::NotEditable(self.status));
        }
        self.description = Some(description.to_string());
        Ok(())
    }
}
