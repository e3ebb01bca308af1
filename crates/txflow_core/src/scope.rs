//! Request-scoped carrier for transaction handles and cancellation.
//!
//! A [`Scope`] is the immutable value a caller threads through its call
//! chain. Extending it returns a new scope and leaves the original
//! untouched, which is what keeps concurrent calls that share a parent scope
//! from seeing each other's transactions.

use crate::chain::Chain;
use crate::error::Interrupted;
use crate::types::SessionKey;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Type-erased value bound in a scope.
pub(crate) type Slot = Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
struct Binding {
    key: SessionKey,
    value: Slot,
}

/// Immutable request-scoped carrier.
///
/// Holds the active transaction handle of every [`TxStore`](crate::TxStore)
/// that bound one, plus an optional deadline and any number of cancel
/// tokens.
#[derive(Clone, Default)]
pub struct Scope {
    bindings: Chain<Binding>,
    deadline: Option<Instant>,
    cancels: Chain<CancelToken>,
}

impl Scope {
    /// Creates an empty scope with no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a scope with `deadline`, keeping the earlier one if this
    /// scope already has a deadline.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current <= deadline => current,
            _ => deadline,
        };
        Self {
            deadline: Some(deadline),
            ..self.clone()
        }
    }

    /// Returns a scope whose deadline is `timeout` from now.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns a scope that is also cancelled by `token`.
    #[must_use]
    pub fn with_cancel(&self, token: CancelToken) -> Self {
        Self {
            cancels: self.cancels.push(token),
            ..self.clone()
        }
    }

    /// The effective deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline, zero once it has passed.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Returns true if any attached token was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancels.iter().any(CancelToken::is_cancelled)
    }

    /// Checks the cancellation signal.
    ///
    /// # Errors
    ///
    /// Returns [`Interrupted::Cancelled`] if a token fired, or
    /// [`Interrupted::DeadlineExceeded`] if the deadline passed.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Interrupted::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Returns this scope without its deadline and cancel tokens.
    ///
    /// The manager finishes handles with a detached scope, so commit and
    /// rollback statements still reach the driver after the caller's scope
    /// was cancelled or timed out.
    #[must_use]
    pub fn detached(&self) -> Self {
        Self {
            bindings: self.bindings.clone(),
            deadline: None,
            cancels: Chain::new(),
        }
    }

    pub(crate) fn lookup(&self, key: &SessionKey) -> Option<&Slot> {
        self.bindings
            .find(|binding| binding.key == *key)
            .map(|binding| &binding.value)
    }

    pub(crate) fn bind(&self, key: SessionKey, value: Slot) -> Self {
        Self {
            bindings: self.bindings.push(Binding { key, value }),
            ..self.clone()
        }
    }

    /// Number of bindings made along this scope's path.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.bindings.len()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("bindings", &self.bindings.len())
            .field("deadline", &self.deadline)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// A cloneable cancellation flag.
///
/// Clones share the flag; cancelling any clone cancels every scope the token
/// was attached to.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that has not fired.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`CancelToken::cancel`] was called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
