//! Error types for txflow core.

use crate::types::IsolationLevel;
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Result type for calls into a database driver.
pub type DriverResult<T> = Result<T, DriverError>;

/// Result type for propagation decisions.
pub type ResolveResult<T> = Result<T, PropagationError>;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A failure reported by the underlying database driver.
///
/// The driver's own error is kept as the source; txflow never inspects it.
pub struct DriverError {
    inner: BoxError,
}

impl DriverError {
    /// Wraps a driver error.
    pub fn new(error: impl Into<BoxError>) -> Self {
        Self {
            inner: error.into(),
        }
    }

    /// Creates a driver error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            inner: message.into().into(),
        }
    }

    /// Returns the wrapped driver error.
    #[must_use]
    pub fn get_ref(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.inner
    }

    /// Attempts to downcast the wrapped error to a concrete type.
    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// Returns true if the driver call was cut short by the scope's signal.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.downcast_ref::<Interrupted>().is_some()
    }
}

impl fmt::Debug for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DriverError").field(&self.inner).finish()
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl StdError for DriverError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source()
    }
}

impl From<Interrupted> for DriverError {
    fn from(interrupted: Interrupted) -> Self {
        Self::new(interrupted)
    }
}

/// The scope's cancellation signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    /// A cancel token attached to the scope was triggered.
    #[error("operation cancelled")]
    Cancelled,
    /// The scope's deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Failure to resolve which transaction a call should run in.
#[derive(Debug, Error)]
pub enum PropagationError {
    /// `Mandatory` propagation without an active transaction.
    #[error("transaction is required")]
    TransactionRequired,

    /// `Never` propagation inside an active transaction.
    #[error("transaction is not expected")]
    TransactionNotExpected,

    /// The active transaction was opened with a weaker isolation level than
    /// the call requests.
    #[error("isolation level {requested} is too strict for active transaction opened at {active}")]
    IsolationTooLow {
        /// Level requested by the call.
        requested: IsolationLevel,
        /// Level the active transaction was opened with.
        active: IsolationLevel,
    },

    /// Creating a savepoint failed.
    #[error("savepoint {name}: {source}")]
    Savepoint {
        /// Savepoint name.
        name: String,
        /// Driver failure.
        #[source]
        source: DriverError,
    },

    /// Beginning a new transaction failed.
    #[error("driver: {0}")]
    Driver(#[from] DriverError),
}

impl PropagationError {
    /// Creates an isolation error.
    pub fn isolation_too_low(requested: IsolationLevel, active: IsolationLevel) -> Self {
        Self::IsolationTooLow { requested, active }
    }

    /// Creates a savepoint error.
    pub fn savepoint(name: impl Into<String>, source: DriverError) -> Self {
        Self::Savepoint {
            name: name.into(),
            source,
        }
    }

    /// Returns true for deterministic policy violations, as opposed to
    /// driver failures.
    #[must_use]
    pub const fn is_policy_violation(&self) -> bool {
        matches!(
            self,
            Self::TransactionRequired
                | Self::TransactionNotExpected
                | Self::IsolationTooLow { .. }
        )
    }
}

/// Error returned by [`Manager::transactional`](crate::Manager::transactional).
///
/// `E` is the error type of the unit of work.
#[derive(Debug, Error)]
pub enum TxError<E> {
    /// No transaction could be resolved; the unit of work never ran.
    #[error("begin: {0}")]
    Begin(#[source] PropagationError),

    /// The unit of work succeeded but the commit failed.
    #[error("commit: {0}")]
    Commit(#[source] DriverError),

    /// The unit of work failed and so did the rollback.
    #[error("rollback: {rollback} (after: {application})")]
    Rollback {
        /// Rollback failure.
        #[source]
        rollback: DriverError,
        /// Error returned by the unit of work.
        application: E,
    },

    /// The unit of work failed and the transaction was rolled back.
    #[error(transparent)]
    Application(E),
}

impl<E> TxError<E> {
    /// Error returned by the unit of work, if it ran and failed.
    #[must_use]
    pub fn application(&self) -> Option<&E> {
        match self {
            Self::Rollback { application, .. } | Self::Application(application) => {
                Some(application)
            }
            Self::Begin(_) | Self::Commit(_) => None,
        }
    }

    /// Consumes the error, returning the unit of work's error if present.
    pub fn into_application(self) -> Option<E> {
        match self {
            Self::Rollback { application, .. } | Self::Application(application) => {
                Some(application)
            }
            Self::Begin(_) | Self::Commit(_) => None,
        }
    }

    /// Returns the propagation failure for [`TxError::Begin`].
    #[must_use]
    pub fn begin_cause(&self) -> Option<&PropagationError> {
        match self {
            Self::Begin(cause) => Some(cause),
            _ => None,
        }
    }

    /// Returns true for [`TxError::Begin`].
    #[must_use]
    pub const fn is_begin(&self) -> bool {
        matches!(self, Self::Begin(_))
    }

    /// Returns true for [`TxError::Commit`].
    #[must_use]
    pub const fn is_commit(&self) -> bool {
        matches!(self, Self::Commit(_))
    }

    /// Returns true for [`TxError::Rollback`].
    #[must_use]
    pub const fn is_rollback(&self) -> bool {
        matches!(self, Self::Rollback { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error, PartialEq)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn driver_error_display_and_downcast() {
        let err = DriverError::new(Boom);
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.downcast_ref::<Boom>(), Some(&Boom));
        assert!(!err.is_interrupted());

        let err = DriverError::msg("connection reset");
        assert_eq!(err.to_string(), "connection reset");
    }

    #[test]
    fn interrupted_converts() {
        let err = DriverError::from(Interrupted::DeadlineExceeded);
        assert!(err.is_interrupted());
        assert_eq!(err.to_string(), "deadline exceeded");
    }

    #[test]
    fn policy_violations() {
        assert!(PropagationError::TransactionRequired.is_policy_violation());
        assert!(PropagationError::TransactionNotExpected.is_policy_violation());
        assert!(PropagationError::isolation_too_low(
            IsolationLevel::Serializable,
            IsolationLevel::ReadCommitted
        )
        .is_policy_violation());
        assert!(!PropagationError::Driver(DriverError::msg("x")).is_policy_violation());
        assert!(!PropagationError::savepoint("sp_0", DriverError::msg("x")).is_policy_violation());
    }

    #[test]
    fn tx_error_messages() {
        let err: TxError<Boom> = TxError::Begin(PropagationError::TransactionRequired);
        assert_eq!(err.to_string(), "begin: transaction is required");

        let err: TxError<Boom> = TxError::Commit(DriverError::msg("disk full"));
        assert_eq!(err.to_string(), "commit: disk full");

        let err = TxError::Rollback {
            rollback: DriverError::msg("conn lost"),
            application: Boom,
        };
        assert_eq!(err.to_string(), "rollback: conn lost (after: boom)");
        assert_eq!(err.application(), Some(&Boom));

        let err = TxError::Application(Boom);
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.into_application(), Some(Boom));
    }

    #[test]
    fn tx_error_sources() {
        let err: TxError<Boom> = TxError::Begin(PropagationError::TransactionNotExpected);
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("transaction is not expected"));
        assert!(err.is_begin());
        assert!(err.begin_cause().is_some());

        let err = TxError::Rollback {
            rollback: DriverError::msg("conn lost"),
            application: Boom,
        };
        assert!(err.is_rollback());
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("conn lost"));
    }
}
