//! Core type definitions for txflow.

use crate::setting::ValueChain;
use std::fmt;
use uuid::Uuid;

/// Transaction isolation level.
///
/// Levels are ordered from weakest to strictest. [`IsolationLevel::Default`]
/// stands for whatever the underlying engine uses when no level is requested;
/// its real strictness is engine specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum IsolationLevel {
    /// The engine's default level.
    #[default]
    Default,
    /// Read uncommitted.
    ReadUncommitted,
    /// Read committed.
    ReadCommitted,
    /// Write committed.
    WriteCommitted,
    /// Repeatable read.
    RepeatableRead,
    /// Snapshot.
    Snapshot,
    /// Serializable.
    Serializable,
    /// Linearizable.
    Linearizable,
}

impl IsolationLevel {
    /// All levels, weakest first.
    pub const ALL: [Self; 8] = [
        Self::Default,
        Self::ReadUncommitted,
        Self::ReadCommitted,
        Self::WriteCommitted,
        Self::RepeatableRead,
        Self::Snapshot,
        Self::Serializable,
        Self::Linearizable,
    ];

    /// SQL spelling of the level, `None` for [`IsolationLevel::Default`].
    #[must_use]
    pub const fn as_sql(self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::ReadUncommitted => Some("READ UNCOMMITTED"),
            Self::ReadCommitted => Some("READ COMMITTED"),
            Self::WriteCommitted => Some("WRITE COMMITTED"),
            Self::RepeatableRead => Some("REPEATABLE READ"),
            Self::Snapshot => Some("SNAPSHOT"),
            Self::Serializable => Some("SERIALIZABLE"),
            Self::Linearizable => Some("LINEARIZABLE"),
        }
    }

    /// Returns true if a transaction opened at `self` can serve a request
    /// for `requested`.
    ///
    /// `Default` satisfies any request.
    #[must_use]
    pub fn satisfies(self, requested: Self) -> bool {
        self == Self::Default || requested <= self
    }

    /// Parses a level from its snake-case or SQL spelling.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|level| level.name() == normalized)
    }

    /// Snake-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::ReadUncommitted => "read_uncommitted",
            Self::ReadCommitted => "read_committed",
            Self::WriteCommitted => "write_committed",
            Self::RepeatableRead => "repeatable_read",
            Self::Snapshot => "snapshot",
            Self::Serializable => "serializable",
            Self::Linearizable => "linearizable",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Settings a real transaction was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxOptions {
    /// Isolation level.
    pub isolation: IsolationLevel,
    /// Whether the transaction is read-only.
    pub read_only: bool,
}

impl TxOptions {
    /// Extracts the options from a settings chain.
    #[must_use]
    pub fn from_settings(settings: &ValueChain) -> Self {
        Self {
            isolation: settings.isolation(),
            read_only: settings.read_only(),
        }
    }
}

/// Per-manager key under which the active handle is stored in a
/// [`Scope`](crate::Scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey(Uuid);

impl SessionKey {
    /// Generates a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session:{}", self.0.simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolation_ordering() {
        assert!(IsolationLevel::ReadCommitted < IsolationLevel::Serializable);
        assert!(IsolationLevel::Default < IsolationLevel::ReadUncommitted);
    }

    #[test]
    fn default_satisfies_everything() {
        for level in IsolationLevel::ALL {
            assert!(IsolationLevel::Default.satisfies(level));
        }
    }

    #[test]
    fn stricter_request_is_not_satisfied() {
        assert!(!IsolationLevel::ReadCommitted.satisfies(IsolationLevel::Serializable));
        assert!(IsolationLevel::Serializable.satisfies(IsolationLevel::ReadCommitted));
        assert!(IsolationLevel::Serializable.satisfies(IsolationLevel::Serializable));
        assert!(IsolationLevel::ReadCommitted.satisfies(IsolationLevel::Default));
    }

    #[test]
    fn parse_levels() {
        assert_eq!(
            IsolationLevel::parse("serializable"),
            Some(IsolationLevel::Serializable)
        );
        assert_eq!(
            IsolationLevel::parse("READ COMMITTED"),
            Some(IsolationLevel::ReadCommitted)
        );
        assert_eq!(
            IsolationLevel::parse("repeatable-read"),
            Some(IsolationLevel::RepeatableRead)
        );
        assert_eq!(IsolationLevel::parse("bogus"), None);
    }

    #[test]
    fn session_keys_are_unique() {
        assert_ne!(SessionKey::generate(), SessionKey::generate());
    }

    #[test]
    fn session_key_display() {
        let key = SessionKey::generate();
        assert!(key.to_string().starts_with("session:"));
    }
}
