pub mod csv;
pub mod ledger;
pub mod model;
pub mod money;
pub mod replay;
pub mod reservation;
pub mod store;
pub mod wallet;

pub use ledger::{LedgerEntry, LedgerEntryType, LedgerStatus};
pub use model::{ClientId, LedgerId, ReservationId, WalletId};
pub use money::{Currency, Money};
pub use replay::{Operation, Replay};
pub use reservation::{PurchaseReservation, ReservationStatus};
pub use store::{MemoryStore, Versioned, WalletStore};
pub use wallet::{ReservationTicket, Wallet, WalletError};
