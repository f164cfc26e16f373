//! Shared identifiers for the wallet domain.

use uuid::Uuid;

/// Client identifier.
pub type ClientId = Uuid;

/// Wallet identifier.
pub type WalletId = Uuid;

/// Ledger entry identifier.
pub type LedgerId = Uuid;

/// Purchase reservation identifier.
pub type ReservationId = Uuid;
