//! Driver-facing capability traits.
//!
//! txflow does not talk to a database itself. A driver exposes three small
//! capabilities and the [`Manager`](crate::Manager) composes them:
//!
//! - [`Executor`] runs statements, either on the database directly or inside
//!   a transaction
//! - [`RawTransaction`] is one real, driver-level transaction
//! - [`Database`] begins raw transactions and hands out its top-level
//!   executor
//!
//! Every call receives the caller's [`Scope`] so drivers can honor its
//! cancellation signal.

use crate::error::DriverResult;
use crate::scope::Scope;
use crate::setting::ValueChain;
use crate::value::Value;

/// Capability to run statements.
///
/// Statement and row representations are the driver's own; txflow only
/// needs to run plain statements such as `SAVEPOINT sp_0`.
pub trait Executor: Send + Sync {
    /// Result of [`Executor::exec`].
    type Outcome;
    /// Result of [`Executor::query`].
    type Rows;

    /// Executes a statement with positional arguments.
    ///
    /// # Errors
    ///
    /// Returns the driver's failure, or an interruption if the scope's
    /// signal fired.
    fn exec(&self, scope: &Scope, statement: &str, args: &[Value]) -> DriverResult<Self::Outcome>;

    /// Runs a query with positional arguments.
    ///
    /// # Errors
    ///
    /// Returns the driver's failure, or an interruption if the scope's
    /// signal fired.
    fn query(&self, scope: &Scope, statement: &str, args: &[Value]) -> DriverResult<Self::Rows>;
}

/// One real transaction opened by a [`Database`].
///
/// Commit and rollback take `&self` because the handle wrapping a raw
/// transaction is shared between scopes.
pub trait RawTransaction: Send + Sync + 'static {
    /// Executor bound to this transaction.
    type Executor: Executor;

    /// Returns the executor bound to this transaction.
    fn executor(&self) -> Self::Executor;

    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// Returns the driver's failure.
    fn commit(&self, scope: &Scope) -> DriverResult<()>;

    /// Rolls the transaction back.
    ///
    /// # Errors
    ///
    /// Returns the driver's failure.
    fn rollback(&self, scope: &Scope) -> DriverResult<()>;
}

/// A database that can begin transactions.
pub trait Database: Send + Sync + 'static {
    /// Executor type shared by the database and its transactions.
    type Executor: Executor + Clone + Send + Sync + 'static;
    /// Raw transaction type.
    type Transaction: RawTransaction<Executor = Self::Executor>;

    /// Begins a new transaction.
    ///
    /// `settings` carries the isolation level, read-only flag, and any named
    /// values decided by the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the driver's failure, or an interruption if the scope's
    /// signal fired.
    fn begin(&self, scope: &Scope, settings: &ValueChain) -> DriverResult<Self::Transaction>;

    /// Returns the non-transactional executor.
    fn executor(&self) -> Self::Executor;
}
