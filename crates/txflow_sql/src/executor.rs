//! Named-parameter calls on any [`Executor`].

use crate::params::Params;
use crate::rewrite::Rewriter;
use tracing::trace;
use txflow_core::{DriverResult, Executor, Scope};

/// Runs statements with `:name` parameters.
///
/// Implemented for every [`Executor`], so it works the same on the database
/// executor and on a transaction's.
///
/// ```rust
/// use txflow_core::memory::MemoryDatabase;
/// use txflow_core::{Manager, Scope, Value};
/// use txflow_sql::{NamedExecutor, Params, Rewriter};
///
/// let manager = Manager::new(MemoryDatabase::new());
/// let scope = Scope::new();
/// let params = Params::new().with("id", 7);
/// let rows = manager
///     .executor(&scope)
///     .named_query(&scope, &Rewriter::default(), "SELECT * FROM t WHERE id = :id", &params)
///     .unwrap();
/// assert_eq!(rows, vec![vec![Value::Int(7)]]);
/// ```
pub trait NamedExecutor: Executor {
    /// Rewrites `statement` with `rewriter` and executes it.
    ///
    /// # Errors
    ///
    /// Returns the executor's failure.
    fn named_exec(
        &self,
        scope: &Scope,
        rewriter: &Rewriter,
        statement: &str,
        params: &Params,
    ) -> DriverResult<Self::Outcome>;

    /// Rewrites `statement` with `rewriter` and runs it as a query.
    ///
    /// # Errors
    ///
    /// Returns the executor's failure.
    fn named_query(
        &self,
        scope: &Scope,
        rewriter: &Rewriter,
        statement: &str,
        params: &Params,
    ) -> DriverResult<Self::Rows>;
}

impl<E: Executor + ?Sized> NamedExecutor for E {
    fn named_exec(
        &self,
        scope: &Scope,
        rewriter: &Rewriter,
        statement: &str,
        params: &Params,
    ) -> DriverResult<Self::Outcome> {
        let rewritten = rewriter.rewrite(statement, params);
        trace!(statement = %rewritten.statement, args = rewritten.args.len(), "exec");
        self.exec(scope, &rewritten.statement, &rewritten.args)
    }

    fn named_query(
        &self,
        scope: &Scope,
        rewriter: &Rewriter,
        statement: &str,
        params: &Params,
    ) -> DriverResult<Self::Rows> {
        let rewritten = rewriter.rewrite(statement, params);
        trace!(statement = %rewritten.statement, args = rewritten.args.len(), "query");
        self.query(scope, &rewritten.statement, &rewritten.args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder::Placeholder;
    use txflow_core::memory::{Event, MemoryDatabase};
    use txflow_core::{Database, Value};

    #[test]
    fn named_exec_passes_positional_args() {
        let db = MemoryDatabase::new();
        let rewriter = Rewriter::new(Placeholder::Question);
        let params = Params::new().with("name", "ada").with("age", 36);

        db.executor()
            .named_exec(
                &Scope::new(),
                &rewriter,
                "INSERT INTO people VALUES (:name, :age)",
                &params,
            )
            .unwrap();

        assert_eq!(
            db.events(),
            vec![Event::Exec {
                target: txflow_core::memory::Target::Database,
                statement: "INSERT INTO people VALUES (?, ?)".into(),
                args: vec![Value::from("ada"), Value::Int(36)],
            }]
        );
    }

    #[test]
    fn named_query_failure_propagates() {
        let db = MemoryDatabase::new();
        db.fail_statements("SELECT");
        let err = db
            .executor()
            .named_query(&Scope::new(), &Rewriter::default(), "SELECT :a", &Params::new())
            .unwrap_err();
        assert!(err.to_string().contains("SELECT"));
    }
}
