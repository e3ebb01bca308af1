//! Savepoint naming and allocation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default prefix of savepoint names.
pub const DEFAULT_SAVEPOINT_PREFIX: &str = "sp_";

/// Issues savepoint ids for one root transaction.
///
/// Ids start at 0 and increase for every nested block opened anywhere in the
/// root's tree, so overlapping nested blocks never share a savepoint.
#[derive(Debug, Default)]
pub struct SavepointAllocator {
    next: AtomicU64,
}

impl SavepointAllocator {
    /// Creates an allocator whose first id is 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next savepoint.
    pub fn allocate(&self, prefix: &str) -> Savepoint {
        let id = self.next.fetch_add(1, Ordering::SeqCst);
        Savepoint::new(id, prefix)
    }

    /// Number of savepoints issued so far.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

/// A named rollback point inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Savepoint {
    id: u64,
    name: String,
}

impl Savepoint {
    /// Creates a savepoint named `<prefix><id>`.
    #[must_use]
    pub fn new(id: u64, prefix: &str) -> Self {
        Self {
            id,
            name: format!("{prefix}{id}"),
        }
    }

    /// Savepoint id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Savepoint name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Statement creating the savepoint.
    #[must_use]
    pub fn create_sql(&self) -> String {
        format!("SAVEPOINT {}", self.name)
    }

    /// Statement releasing the savepoint.
    #[must_use]
    pub fn release_sql(&self) -> String {
        format!("RELEASE SAVEPOINT {}", self.name)
    }

    /// Statement rolling back to the savepoint.
    #[must_use]
    pub fn rollback_sql(&self) -> String {
        format!("ROLLBACK TO SAVEPOINT {}", self.name)
    }
}

impl fmt::Display for Savepoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Returns true if `prefix` yields valid unquoted SQL identifiers.
#[must_use]
pub fn is_valid_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn ids_start_at_zero() {
        let allocator = SavepointAllocator::new();
        assert_eq!(allocator.allocate("sp_").id(), 0);
        assert_eq!(allocator.allocate("sp_").id(), 1);
        assert_eq!(allocator.issued(), 2);
    }

    #[test]
    fn statements() {
        let sp = Savepoint::new(3, DEFAULT_SAVEPOINT_PREFIX);
        assert_eq!(sp.name(), "sp_3");
        assert_eq!(sp.create_sql(), "SAVEPOINT sp_3");
        assert_eq!(sp.release_sql(), "RELEASE SAVEPOINT sp_3");
        assert_eq!(sp.rollback_sql(), "ROLLBACK TO SAVEPOINT sp_3");
    }

    #[test]
    fn concurrent_allocation_is_unique() {
        let allocator = Arc::new(SavepointAllocator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                thread::spawn(move || {
                    (0..100)
                        .map(|_| allocator.allocate("sp_").id())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..800).collect::<Vec<_>>());
    }

    #[test]
    fn prefix_validation() {
        assert!(is_valid_prefix("sp_"));
        assert!(is_valid_prefix("_nested"));
        assert!(!is_valid_prefix(""));
        assert!(!is_valid_prefix("1sp"));
        assert!(!is_valid_prefix("sp-"));
        assert!(!is_valid_prefix("sp; DROP"));
    }
}
