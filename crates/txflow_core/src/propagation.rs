//! Propagation strategies.
//!
//! A strategy decides, given the active handle (if any), whether a call opens
//! a new transaction, joins the active one, branches a savepoint, runs
//! without a transaction, or is rejected.
//!
//! | Mode      | No active tx      | Active tx                 |
//! |-----------|-------------------|---------------------------|
//! | Required  | begin             | join                      |
//! | Supports  | none              | join                      |
//! | Mandatory | `TransactionRequired` | join                  |
//! | Never     | none              | `TransactionNotExpected`  |
//! | Nested    | begin             | savepoint                 |
//!
//! With an active transaction, the requested isolation level is checked
//! against the level the root was opened with before the table applies.

use crate::database::{Database, Executor};
use crate::error::{PropagationError, ResolveResult};
use crate::scope::Scope;
use crate::setting::ValueChain;
use crate::tx::Tx;
use crate::types::TxOptions;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Propagation policy of a transactional call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Propagation {
    /// Join the active transaction or begin a new one.
    #[default]
    Required,
    /// Join the active transaction or run without one.
    Supports,
    /// Join the active transaction; fail without one.
    Mandatory,
    /// Run without a transaction; fail inside one.
    Never,
    /// Open a savepoint in the active transaction or begin a new one.
    Nested,
}

impl Propagation {
    /// All modes.
    pub const ALL: [Self; 5] = [
        Self::Required,
        Self::Supports,
        Self::Mandatory,
        Self::Never,
        Self::Nested,
    ];

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Supports => "supports",
            Self::Mandatory => "mandatory",
            Self::Never => "never",
            Self::Nested => "nested",
        }
    }

    /// Parses a mode from its name, ignoring case.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(s))
    }

    /// Resolves the handle a call runs with.
    ///
    /// Returns `Ok(None)` when the call runs without a transaction.
    ///
    /// # Errors
    ///
    /// Returns a policy violation, or the driver failure that prevented a
    /// transaction or savepoint from being opened.
    pub fn resolve<D: Database>(
        self,
        resolver: &Resolver<'_, D>,
        active: Option<&Arc<Tx<D>>>,
        settings: &ValueChain,
    ) -> ResolveResult<Option<Arc<Tx<D>>>> {
        let Some(active) = active else {
            return match self {
                Self::Required | Self::Nested => resolver.begin(settings).map(Some),
                Self::Supports | Self::Never => Ok(None),
                Self::Mandatory => Err(PropagationError::TransactionRequired),
            };
        };

        check_isolation(active, settings)?;

        match self {
            Self::Required | Self::Supports | Self::Mandatory => {
                debug!(mode = self.name(), depth = active.depth() + 1, "joining transaction");
                Ok(Some(Tx::join(active)))
            }
            Self::Never => Err(PropagationError::TransactionNotExpected),
            Self::Nested => resolver.savepoint(active).map(Some),
        }
    }
}

impl fmt::Display for Propagation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rejects a request for a stricter isolation level than the active
/// transaction's root was opened with.
fn check_isolation<D: Database>(active: &Tx<D>, settings: &ValueChain) -> ResolveResult<()> {
    let opened = active.root().options().isolation;
    let requested = settings.isolation();
    if opened.satisfies(requested) {
        Ok(())
    } else {
        Err(PropagationError::isolation_too_low(requested, opened))
    }
}

/// Everything a strategy needs besides the active handle.
pub struct Resolver<'a, D: Database> {
    scope: &'a Scope,
    db: &'a D,
    savepoint_prefix: &'a str,
}

impl<'a, D: Database> Resolver<'a, D> {
    /// Creates a resolver.
    pub fn new(scope: &'a Scope, db: &'a D, savepoint_prefix: &'a str) -> Self {
        Self {
            scope,
            db,
            savepoint_prefix,
        }
    }

    /// Scope forwarded to every driver call.
    #[must_use]
    pub fn scope(&self) -> &'a Scope {
        self.scope
    }

    /// Begins a real transaction with `settings`.
    fn begin(&self, settings: &ValueChain) -> ResolveResult<Arc<Tx<D>>> {
        let options = TxOptions::from_settings(settings);
        let raw = self.db.begin(self.scope, settings)?;
        debug!(
            isolation = %options.isolation,
            read_only = options.read_only,
            "transaction started"
        );
        Ok(Tx::open(raw, options))
    }

    /// Creates the next savepoint of `active`'s tree.
    fn savepoint(&self, active: &Arc<Tx<D>>) -> ResolveResult<Arc<Tx<D>>> {
        let savepoint = active.allocator().allocate(self.savepoint_prefix);
        active
            .executor()
            .exec(self.scope, &savepoint.create_sql(), &[])
            .map_err(|e| PropagationError::savepoint(savepoint.name(), e))?;
        debug!(savepoint = savepoint.name(), "savepoint created");
        Ok(Tx::nest(active, savepoint))
    }
}

impl<D: Database> fmt::Debug for Resolver<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("scope", self.scope)
            .field("savepoint_prefix", &self.savepoint_prefix)
            .finish_non_exhaustive()
    }
}
