//! Error types for statement rewriting.

use thiserror::Error;

/// Result type for strict rewriting.
pub type RewriteResult<T> = Result<T, RewriteError>;

/// Failure to rewrite a statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    /// The statement references a name with no bound value.
    #[error("unbound parameter :{0}")]
    Unbound(String),
}
