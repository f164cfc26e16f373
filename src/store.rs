//! Persistence boundary for wallet aggregates.
//!
//! Wallet methods are pure in-memory transitions; all I/O and all
//! concurrency control live behind [`WalletStore`]. Each mutating operation
//! is a load-mutate-save against one versioned row: a save with a stale
//! version fails with [`StoreError::Conflict`] and the caller retries from
//! a fresh load. Nothing here retries automatically.

use std::collections::HashMap;

use thiserror::Error;

use crate::model::{ClientId, WalletId};
use crate::wallet::Wallet;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("wallet {0} not found")]
    NotFound(WalletId),

    #[error("wallet {0} already exists")]
    AlreadyExists(WalletId),

    #[error("wallet {id} was modified concurrently (snapshot version {snapshot}, stored {stored})")]
    Conflict {
        id: WalletId,
        snapshot: u64,
        stored: u64,
    },
}

/// A value together with the row version it was read at.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

/// Transactional load-mutate-save boundary around the wallet aggregate.
pub trait WalletStore {
    /// Insert a freshly created wallet at version 0.
    fn insert(&mut self, wallet: Wallet) -> Result<(), StoreError>;

    /// Load a snapshot of a wallet with its current version.
    fn load(&self, id: WalletId) -> Result<Versioned<Wallet>, StoreError>;

    /// Save a snapshot back. Succeeds only if the stored version still
    /// matches the snapshot's; returns the new version.
    fn save(&mut self, snapshot: Versioned<Wallet>) -> Result<u64, StoreError>;

    /// Look up the wallet belonging to a client.
    fn find_by_client(&self, client: ClientId) -> Option<WalletId>;
}

/// In-memory reference implementation, used by tests and the replay
/// binary.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: HashMap<WalletId, Versioned<Wallet>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wallet_ids(&self) -> impl Iterator<Item = WalletId> + '_ {
        self.rows.keys().copied()
    }
}

impl WalletStore for MemoryStore {
    fn insert(&mut self, wallet: Wallet) -> Result<(), StoreError> {
        let id = wallet.id();
        if self.rows.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }
        self.rows.insert(
            id,
            Versioned {
                version: 0,
                value: wallet,
            },
        );
        Ok(())
    }

    fn load(&self, id: WalletId) -> Result<Versioned<Wallet>, StoreError> {
        self.rows
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn save(&mut self, snapshot: Versioned<Wallet>) -> Result<u64, StoreError> {
        let id = snapshot.value.id();
        let row = self.rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if row.version != snapshot.version {
            return Err(StoreError::Conflict {
                id,
                snapshot: snapshot.version,
                stored: row.version,
            });
        }

        row.version += 1;
        row.value = snapshot.value;
        Ok(row.version)
    }

    fn find_by_client(&self, client: ClientId) -> Option<WalletId> {
        self.rows
            .values()
            .find(|row| row.value.client_id() == client)
            .map(|row| row.value.id())
    }
}
