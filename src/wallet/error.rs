//! Error types for wallet operations.

use thiserror::Error;

use crate::ledger::{LedgerError, LedgerStatus};
use crate::model::{LedgerId, ReservationId};
use crate::money::{Money, MoneyError};
use crate::reservation::{ReservationError, ReservationStatus};

/// Top-level error returned by [`Wallet`](super::Wallet) operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error(transparent)]
    Money(#[from] MoneyError),

    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("reservation: {0}")]
    Reservation(#[from] ReservationError),

    #[error("invalid amount {0}: must be positive")]
    InvalidAmount(Money),

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: Money, requested: Money },

    #[error("ledger entry {0} not found on this wallet")]
    EntryNotFound(LedgerId),

    #[error("reservation {0} not found on this wallet")]
    ReservationNotFound(ReservationId),

    #[error("ledger entry {id} is not a pending deposit (status {status:?})")]
    NotPendingDeposit { id: LedgerId, status: LedgerStatus },

    #[error("reservation {id} is {status:?}, not pending")]
    ReservationNotPending {
        id: ReservationId,
        status: ReservationStatus,
    },
}
