//! Test fixtures.
//!
//! Provides a manager wired to a recording database, plus the counters most
//! tests assert on.

use txflow_core::memory::{Event, MemoryDatabase};
use txflow_core::{Config, Manager, Propagation, Setting};

/// A manager over an in-memory recording database.
pub struct TestManager {
    /// The database; clones share its event log.
    pub db: MemoryDatabase,
    /// The manager under test.
    pub manager: Manager<MemoryDatabase>,
}

impl TestManager {
    /// Creates a manager with the default configuration.
    pub fn new() -> Self {
        let db = MemoryDatabase::new();
        Self {
            manager: Manager::new(db.clone()),
            db,
        }
    }

    /// Creates a manager with `config`.
    ///
    /// # Panics
    ///
    /// Panics if `config` is invalid.
    pub fn with_config(config: Config) -> Self {
        let db = MemoryDatabase::new();
        let manager = Manager::with_config(db.clone(), config).expect("invalid test config");
        Self { db, manager }
    }

    /// Number of transactions begun.
    pub fn begins(&self) -> usize {
        self.db.count(|e| matches!(e, Event::Begin { .. }))
    }

    /// Number of real commits.
    pub fn commits(&self) -> usize {
        self.db.count(|e| matches!(e, Event::Commit { .. }))
    }

    /// Number of real rollbacks.
    pub fn rollbacks(&self) -> usize {
        self.db.count(|e| matches!(e, Event::Rollback { .. }))
    }

    /// Savepoint statements issued, in order.
    pub fn savepoint_statements(&self) -> Vec<String> {
        self.db
            .statements()
            .into_iter()
            .filter(|s| s.contains("SAVEPOINT"))
            .collect()
    }
}

impl Default for TestManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Call-site options selecting `mode`.
pub fn mode(mode: Propagation) -> [Setting; 1] {
    [Setting::Propagation(mode)]
}
