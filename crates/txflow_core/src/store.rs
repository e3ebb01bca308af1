//! Scope-carried storage of the active transaction handle.

use crate::database::Database;
use crate::scope::{Scope, Slot};
use crate::tx::Tx;
use crate::types::SessionKey;
use std::sync::Arc;

/// Looks up and binds the active handle of one manager in a [`Scope`].
///
/// Both operations are pure: [`TxStore::set`] returns an extended scope and
/// never changes the one it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxStore {
    key: SessionKey,
}

impl TxStore {
    /// Creates a store with a fresh session key.
    #[must_use]
    pub fn new() -> Self {
        Self {
            key: SessionKey::generate(),
        }
    }

    /// Creates a store over an existing key.
    #[must_use]
    pub const fn with_key(key: SessionKey) -> Self {
        Self { key }
    }

    /// The session key.
    #[must_use]
    pub const fn key(&self) -> SessionKey {
        self.key
    }

    /// Returns the handle bound under this store's key.
    ///
    /// A binding of a different handle type under the same key is treated as
    /// absent.
    #[must_use]
    pub fn get<D: Database>(&self, scope: &Scope) -> Option<Arc<Tx<D>>> {
        let slot = Arc::clone(scope.lookup(&self.key)?);
        slot.downcast::<Tx<D>>().ok()
    }

    /// Returns a scope with `tx` bound under this store's key.
    #[must_use]
    pub fn set<D: Database>(&self, scope: &Scope, tx: Arc<Tx<D>>) -> Scope {
        let slot: Slot = tx;
        scope.bind(self.key, slot)
    }
}

impl Default for TxStore {
    fn default() -> Self {
        Self::new()
    }
}
