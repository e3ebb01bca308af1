//! Transaction handles.

use crate::database::{Database, Executor, RawTransaction};
use crate::error::DriverResult;
use crate::savepoint::{Savepoint, SavepointAllocator};
use crate::scope::Scope;
use crate::types::TxOptions;
use std::fmt;
use std::sync::Arc;

/// The kind of a [`Tx`] handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxKind {
    /// A real transaction opened by the database.
    Root,
    /// Participates in its parent; commit and rollback do nothing.
    Joined,
    /// A savepoint inside its parent.
    Savepoint,
}

/// Handle representing "inside this transaction".
///
/// Handles form a tree rooted at a real transaction. Wrapping handles
/// ([`TxKind::Joined`], [`TxKind::Savepoint`]) never commit or roll back the
/// root; only the frame that opened a handle finishes it, exactly once.
pub struct Tx<D: Database> {
    origin: Arc<Origin<D>>,
    kind: Kind<D>,
}

struct Origin<D: Database> {
    raw: D::Transaction,
    options: TxOptions,
    savepoints: SavepointAllocator,
}

enum Kind<D: Database> {
    Root,
    Joined {
        parent: Arc<Tx<D>>,
    },
    Savepoint {
        parent: Arc<Tx<D>>,
        savepoint: Savepoint,
    },
}

impl<D: Database> Tx<D> {
    /// Wraps a freshly opened raw transaction.
    pub(crate) fn open(raw: D::Transaction, options: TxOptions) -> Arc<Self> {
        Arc::new(Self {
            origin: Arc::new(Origin {
                raw,
                options,
                savepoints: SavepointAllocator::new(),
            }),
            kind: Kind::Root,
        })
    }

    /// Joins `parent` without owning it.
    pub(crate) fn join(parent: &Arc<Self>) -> Arc<Self> {
        Arc::new(Self {
            origin: Arc::clone(&parent.origin),
            kind: Kind::Joined {
                parent: Arc::clone(parent),
            },
        })
    }

    /// Wraps `parent` in an already created savepoint.
    pub(crate) fn nest(parent: &Arc<Self>, savepoint: Savepoint) -> Arc<Self> {
        Arc::new(Self {
            origin: Arc::clone(&parent.origin),
            kind: Kind::Savepoint {
                parent: Arc::clone(parent),
                savepoint,
            },
        })
    }

    /// Kind of this handle.
    #[must_use]
    pub fn kind(&self) -> TxKind {
        match self.kind {
            Kind::Root => TxKind::Root,
            Kind::Joined { .. } => TxKind::Joined,
            Kind::Savepoint { .. } => TxKind::Savepoint,
        }
    }

    /// The handle this one wraps, `None` for a root.
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<Self>> {
        match &self.kind {
            Kind::Root => None,
            Kind::Joined { parent } | Kind::Savepoint { parent, .. } => Some(parent),
        }
    }

    /// Iterates over this handle and its ancestors, ending at the root.
    pub fn ancestors(&self) -> Ancestors<'_, D> {
        Ancestors { next: Some(self) }
    }

    /// The root handle of this tree.
    #[must_use]
    pub fn root(&self) -> &Self {
        let mut tx = self;
        while let Some(parent) = tx.parent() {
            tx = parent;
        }
        tx
    }

    /// Number of wraps between this handle and the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.ancestors().count() - 1
    }

    /// Returns true if both handles belong to the same real transaction.
    #[must_use]
    pub fn same_transaction(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.origin, &other.origin)
    }

    /// Settings the root transaction was opened with.
    #[must_use]
    pub fn options(&self) -> TxOptions {
        self.origin.options
    }

    /// The savepoint this handle created, if it is a savepoint.
    #[must_use]
    pub fn savepoint(&self) -> Option<&Savepoint> {
        match &self.kind {
            Kind::Savepoint { savepoint, .. } => Some(savepoint),
            Kind::Root | Kind::Joined { .. } => None,
        }
    }

    /// Number of savepoints issued in this handle's tree.
    #[must_use]
    pub fn savepoints_issued(&self) -> u64 {
        self.origin.savepoints.issued()
    }

    pub(crate) fn allocator(&self) -> &SavepointAllocator {
        &self.origin.savepoints
    }

    /// The driver transaction at the root.
    #[must_use]
    pub fn raw(&self) -> &D::Transaction {
        &self.origin.raw
    }

    /// Executor of the root transaction.
    #[must_use]
    pub fn executor(&self) -> D::Executor {
        self.origin.raw.executor()
    }

    /// Finishes this handle successfully.
    pub(crate) fn commit(&self, scope: &Scope) -> DriverResult<()> {
        match &self.kind {
            Kind::Root => self.origin.raw.commit(scope),
            Kind::Joined { .. } => Ok(()),
            Kind::Savepoint { savepoint, .. } => self
                .executor()
                .exec(scope, &savepoint.release_sql(), &[])
                .map(drop),
        }
    }

    /// Undoes this handle's work.
    pub(crate) fn rollback(&self, scope: &Scope) -> DriverResult<()> {
        match &self.kind {
            Kind::Root => self.origin.raw.rollback(scope),
            Kind::Joined { .. } => Ok(()),
            Kind::Savepoint { savepoint, .. } => self
                .executor()
                .exec(scope, &savepoint.rollback_sql(), &[])
                .map(drop),
        }
    }
}

impl<D: Database> fmt::Debug for Tx<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Tx");
        s.field("kind", &self.kind()).field("depth", &self.depth());
        if let Some(savepoint) = self.savepoint() {
            s.field("savepoint", &savepoint.name());
        }
        s.field("options", &self.options()).finish_non_exhaustive()
    }
}

/// Iterator returned by [`Tx::ancestors`].
pub struct Ancestors<'a, D: Database> {
    next: Option<&'a Tx<D>>,
}

impl<'a, D: Database> Iterator for Ancestors<'a, D> {
    type Item = &'a Tx<D>;

    fn next(&mut self) -> Option<Self::Item> {
        let tx = self.next?;
        self.next = tx.parent().map(|parent| &**parent);
        Some(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Event, MemoryDatabase};
    use crate::setting::ValueChain;
    use crate::types::IsolationLevel;

    fn open(db: &MemoryDatabase, options: TxOptions) -> Arc<Tx<MemoryDatabase>> {
        let settings = ValueChain::new()
            .with(crate::Setting::Isolation(options.isolation))
            .with(crate::Setting::ReadOnly(options.read_only));
        let raw = db.begin(&Scope::new(), &settings).unwrap();
        Tx::open(raw, options)
    }

    #[test]
    fn root_reports_its_options() {
        let db = MemoryDatabase::new();
        let options = TxOptions {
            isolation: IsolationLevel::RepeatableRead,
            read_only: true,
        };
        let root = open(&db, options);
        assert_eq!(root.kind(), TxKind::Root);
        assert_eq!(root.depth(), 0);
        assert_eq!(root.options(), options);
        assert!(root.parent().is_none());
    }

    #[test]
    fn wrappers_walk_to_root() {
        let db = MemoryDatabase::new();
        let options = TxOptions {
            isolation: IsolationLevel::Serializable,
            read_only: false,
        };
        let root = open(&db, options);
        let joined = Tx::join(&root);
        let nested = Tx::nest(&joined, Savepoint::new(0, "sp_"));

        assert_eq!(nested.depth(), 2);
        assert_eq!(nested.options(), options);
        assert!(std::ptr::eq(nested.root(), &*root));
        assert!(nested.same_transaction(&root));
        let kinds: Vec<_> = nested.ancestors().map(Tx::kind).collect();
        assert_eq!(kinds, vec![TxKind::Savepoint, TxKind::Joined, TxKind::Root]);
    }

    #[test]
    fn joined_finish_is_noop() {
        let db = MemoryDatabase::new();
        let root = open(&db, TxOptions::default());
        let joined = Tx::join(&root);
        let scope = Scope::new();

        joined.commit(&scope).unwrap();
        joined.rollback(&scope).unwrap();
        assert_eq!(db.count(|e| matches!(e, Event::Commit { .. } | Event::Rollback { .. })), 0);
    }

    #[test]
    fn savepoint_finish_emits_statements() {
        let db = MemoryDatabase::new();
        let root = open(&db, TxOptions::default());
        let scope = Scope::new();

        let first = Tx::nest(&root, Savepoint::new(0, "sp_"));
        let second = Tx::nest(&root, Savepoint::new(1, "sp_"));
        first.commit(&scope).unwrap();
        second.rollback(&scope).unwrap();

        assert_eq!(
            db.statements(),
            vec![
                "RELEASE SAVEPOINT sp_0".to_string(),
                "ROLLBACK TO SAVEPOINT sp_1".to_string(),
            ]
        );
        assert_eq!(db.count(|e| matches!(e, Event::Commit { .. })), 0);
    }

    #[test]
    fn wrappers_share_root_executor() {
        let db = MemoryDatabase::new();
        let root = open(&db, TxOptions::default());
        let joined = Tx::join(&root);
        assert_eq!(joined.executor().tag(), root.executor().tag());
        assert_ne!(joined.executor().tag(), "db");
    }

    #[test]
    fn allocator_lives_on_root() {
        let db = MemoryDatabase::new();
        let root = open(&db, TxOptions::default());
        let joined = Tx::join(&root);
        joined.allocator().allocate("sp_");
        assert_eq!(root.savepoints_issued(), 1);
        assert_eq!(joined.savepoints_issued(), 1);
    }
}
