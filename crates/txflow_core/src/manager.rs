//! Transaction manager.

use crate::config::{Config, ConfigError};
use crate::database::Database;
use crate::error::TxError;
use crate::pipeline::Pipeline;
use crate::propagation::Resolver;
use crate::scope::Scope;
use crate::setting::Setting;
use crate::store::TxStore;
use crate::tx::Tx;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// Runs units of work under a propagation policy.
///
/// The manager decides, per call, whether the unit of work starts a new
/// transaction, joins the one already in scope, opens a savepoint, or runs
/// without a transaction. Whatever it opened it finishes exactly once:
/// commit on `Ok`, rollback on `Err`, and rollback when the unit of work
/// panics.
///
/// Clones share the database, the configuration, and the session key, so a
/// clone sees the transactions opened by the original.
///
/// # Example
///
/// ```rust
/// use txflow_core::memory::MemoryDatabase;
/// use txflow_core::{Manager, Propagation, Scope, Setting};
///
/// let manager = Manager::new(MemoryDatabase::new());
/// let outer = manager.transactional(&Scope::new(), |scope| {
///     manager.transactional_with(scope, &[Setting::Propagation(Propagation::Nested)], |scope| {
///         let tx = manager.current(scope).unwrap();
///         Ok::<_, std::io::Error>(tx.savepoint().map(|sp| sp.id()))
///     })
/// });
/// assert_eq!(outer.unwrap(), Some(0));
/// ```
pub struct Manager<D: Database> {
    db: Arc<D>,
    store: TxStore,
    config: Arc<Config>,
}

impl<D: Database> Manager<D> {
    /// Creates a manager with the default configuration.
    pub fn new(db: D) -> Self {
        Self {
            db: Arc::new(db),
            store: TxStore::new(),
            config: Arc::new(Config::default()),
        }
    }

    /// Creates a manager with `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid.
    pub fn with_config(db: D, config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            db: Arc::new(db),
            store: TxStore::new(),
            config: Arc::new(config),
        })
    }

    /// The database.
    #[must_use]
    pub fn db(&self) -> &D {
        &self.db
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The store binding this manager's handles in scopes.
    #[must_use]
    pub const fn store(&self) -> TxStore {
        self.store
    }

    /// Runs `f` with the manager's default options.
    ///
    /// # Errors
    ///
    /// See [`Manager::transactional_with`].
    pub fn transactional<F, T, E>(&self, scope: &Scope, f: F) -> Result<T, TxError<E>>
    where
        F: FnOnce(&Scope) -> Result<T, E>,
    {
        self.transactional_with(scope, &[], f)
    }

    /// Runs `f` with the manager's default options overridden by `options`.
    ///
    /// `f` receives the scope it must thread through to nested calls; it
    /// carries the handle resolved for this call.
    ///
    /// # Errors
    ///
    /// - [`TxError::Begin`] if no handle could be resolved; `f` did not run
    /// - [`TxError::Application`] if `f` failed and its work was rolled back
    /// - [`TxError::Rollback`] if `f` failed and so did the rollback
    /// - [`TxError::Commit`] if `f` succeeded but the commit failed
    ///
    /// # Panics
    ///
    /// Resumes any panic raised by `f` after rolling back. Panics on a
    /// propagation violation under
    /// [`LogicalErrorPolicy::Panic`](crate::LogicalErrorPolicy::Panic).
    pub fn transactional_with<F, T, E>(
        &self,
        scope: &Scope,
        options: &[Setting],
        f: F,
    ) -> Result<T, TxError<E>>
    where
        F: FnOnce(&Scope) -> Result<T, E>,
    {
        let active = self.store.get::<D>(scope);
        let pipeline = Pipeline::compose(&self.config.options, options);
        let resolver = Resolver::new(scope, &*self.db, &self.config.savepoint_prefix);

        let tx = match pipeline.resolve(&resolver, active.as_ref()) {
            Ok(tx) => tx,
            Err(cause) => {
                self.config.logical_errors.report(&cause);
                return Err(TxError::Begin(cause));
            }
        };

        let Some(tx) = tx else {
            return f(scope).map_err(TxError::Application);
        };

        let inner = self.store.set(scope, Arc::clone(&tx));
        // Finishing ignores the caller's cancel signal and deadline.
        let cleanup = scope.detached();
        let guard = RollbackGuard {
            tx: Some(&*tx),
            scope: cleanup.clone(),
            store: self.store,
        };
        let result = f(&inner);
        guard.disarm();

        match result {
            Ok(value) => {
                tx.commit(&cleanup).map_err(TxError::Commit)?;
                debug!(
                    session = %self.store.key(),
                    kind = ?tx.kind(),
                    savepoint = tx.savepoint().map(|sp| sp.name()),
                    "committed"
                );
                Ok(value)
            }
            Err(application) => match tx.rollback(&cleanup) {
                Ok(()) => {
                    debug!(
                        session = %self.store.key(),
                        kind = ?tx.kind(),
                        savepoint = tx.savepoint().map(|sp| sp.name()),
                        "rolled back"
                    );
                    Err(TxError::Application(application))
                }
                Err(rollback) => Err(TxError::Rollback {
                    rollback,
                    application,
                }),
            },
        }
    }

    /// Executor for statements issued from `scope`.
    ///
    /// Returns the active handle's executor, or the database's own executor
    /// when no handle is in scope.
    #[must_use]
    pub fn executor(&self, scope: &Scope) -> D::Executor {
        match self.store.get::<D>(scope) {
            Some(tx) => tx.executor(),
            None => self.db.executor(),
        }
    }

    /// The handle active in `scope`, if any.
    #[must_use]
    pub fn current(&self, scope: &Scope) -> Option<Arc<Tx<D>>> {
        self.store.get(scope)
    }
}

impl<D: Database> Clone for Manager<D> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            store: self.store,
            config: Arc::clone(&self.config),
        }
    }
}

impl<D: Database> fmt::Debug for Manager<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("session", &self.store.key())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Rolls back a handle if the unit of work unwinds.
struct RollbackGuard<'a, D: Database> {
    tx: Option<&'a Tx<D>>,
    scope: Scope,
    store: TxStore,
}

impl<D: Database> RollbackGuard<'_, D> {
    fn disarm(mut self) {
        self.tx = None;
    }
}

impl<D: Database> Drop for RollbackGuard<'_, D> {
    fn drop(&mut self) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        match tx.rollback(&self.scope) {
            Ok(()) => debug!(
                session = %self.store.key(),
                kind = ?tx.kind(),
                "rolled back after panic"
            ),
            Err(rollback) => error!(
                session = %self.store.key(),
                kind = ?tx.kind(),
                error = %rollback,
                "rollback after panic failed"
            ),
        }
    }
}
