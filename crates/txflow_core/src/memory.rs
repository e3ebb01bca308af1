//! In-memory recording database for testing.

use crate::database::{Database, Executor, RawTransaction};
use crate::error::{DriverError, DriverResult};
use crate::scope::Scope;
use crate::setting::{Setting, ValueChain};
use crate::types::IsolationLevel;
use crate::value::Value;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Where a statement ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Directly on the database.
    Database,
    /// Inside the transaction with this id.
    Tx(u64),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database => f.write_str("db"),
            Self::Tx(id) => write!(f, "tx:{id}"),
        }
    }
}

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A transaction was opened.
    Begin {
        /// Transaction id.
        tx: u64,
        /// Isolation level requested.
        isolation: IsolationLevel,
        /// Read-only flag requested.
        read_only: bool,
        /// Named values handed to begin, oldest first.
        values: Vec<(String, Value)>,
    },
    /// A statement was executed.
    Exec {
        /// Where it ran.
        target: Target,
        /// Statement text.
        statement: String,
        /// Positional arguments.
        args: Vec<Value>,
    },
    /// A query was run.
    Query {
        /// Where it ran.
        target: Target,
        /// Statement text.
        statement: String,
        /// Positional arguments.
        args: Vec<Value>,
    },
    /// A transaction was committed.
    Commit {
        /// Transaction id.
        tx: u64,
    },
    /// A transaction was rolled back.
    Rollback {
        /// Transaction id.
        tx: u64,
    },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Begin {
                tx,
                isolation,
                read_only,
                ..
            } => write!(f, "begin tx:{tx} isolation={isolation} readonly={read_only}"),
            Self::Exec {
                target, statement, ..
            } => write!(f, "exec {target} {statement}"),
            Self::Query {
                target, statement, ..
            } => write!(f, "query {target} {statement}"),
            Self::Commit { tx } => write!(f, "commit tx:{tx}"),
            Self::Rollback { tx } => write!(f, "rollback tx:{tx}"),
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    begin: bool,
    commit: bool,
    rollback: bool,
    statements: Vec<String>,
}

#[derive(Debug, Default)]
struct Inner {
    events: Mutex<Vec<Event>>,
    faults: Mutex<Faults>,
    next_tx: AtomicU64,
}

impl Inner {
    fn record(&self, event: Event) {
        self.events.lock().push(event);
    }

    fn statement_fault(&self, statement: &str) -> Option<DriverError> {
        let faults = self.faults.lock();
        faults
            .statements
            .iter()
            .find(|prefix| statement.starts_with(prefix.as_str()))
            .map(|prefix| DriverError::msg(format!("injected failure for {prefix:?}")))
    }
}

/// A database that records every call instead of storing data.
///
/// Clones share the event log and fault settings. Statements honor the
/// scope's cancellation signal; commit and rollback of a root handle ignore
/// it. Savepoint release and rollback are statements, so the manager issues
/// them under a detached scope.
///
/// # Example
///
/// ```rust
/// use txflow_core::memory::{Event, MemoryDatabase};
/// use txflow_core::{Manager, Scope};
///
/// let db = MemoryDatabase::new();
/// let manager = Manager::new(db.clone());
/// manager
///     .transactional(&Scope::new(), |_| Ok::<_, std::io::Error>(()))
///     .unwrap();
/// assert_eq!(db.count(|e| matches!(e, Event::Commit { .. })), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    inner: Arc<Inner>,
}

impl MemoryDatabase {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the event log.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.inner.events.lock().clone()
    }

    /// Counts events matching `pred`.
    pub fn count<P>(&self, mut pred: P) -> usize
    where
        P: FnMut(&Event) -> bool,
    {
        self.inner.events.lock().iter().filter(|e| pred(e)).count()
    }

    /// Statements executed or queried, in order.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.inner
            .events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Event::Exec { statement, .. } | Event::Query { statement, .. } => {
                    Some(statement.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Number of transactions begun so far.
    #[must_use]
    pub fn transactions_started(&self) -> u64 {
        self.inner.next_tx.load(Ordering::SeqCst)
    }

    /// Clears the event log.
    pub fn clear(&self) {
        self.inner.events.lock().clear();
    }

    /// Makes every following begin fail.
    pub fn fail_begin(&self) {
        self.inner.faults.lock().begin = true;
    }

    /// Makes every following commit fail.
    pub fn fail_commit(&self) {
        self.inner.faults.lock().commit = true;
    }

    /// Makes every following rollback fail.
    pub fn fail_rollback(&self) {
        self.inner.faults.lock().rollback = true;
    }

    /// Makes statements starting with `prefix` fail.
    pub fn fail_statements(&self, prefix: impl Into<String>) {
        self.inner.faults.lock().statements.push(prefix.into());
    }

    /// Removes every injected fault.
    pub fn clear_faults(&self) {
        *self.inner.faults.lock() = Faults::default();
    }
}

impl Database for MemoryDatabase {
    type Executor = MemoryExecutor;
    type Transaction = MemoryTx;

    fn begin(&self, scope: &Scope, settings: &ValueChain) -> DriverResult<MemoryTx> {
        scope.check()?;
        if self.inner.faults.lock().begin {
            return Err(DriverError::msg("injected begin failure"));
        }

        let id = self.inner.next_tx.fetch_add(1, Ordering::SeqCst);
        let mut values: Vec<(String, Value)> = settings
            .iter()
            .filter_map(|setting| match setting {
                Setting::Named(key, value) => Some((key.clone(), value.clone())),
                _ => None,
            })
            .collect();
        values.reverse();

        self.inner.record(Event::Begin {
            tx: id,
            isolation: settings.isolation(),
            read_only: settings.read_only(),
            values,
        });
        Ok(MemoryTx {
            id,
            done: Arc::new(AtomicBool::new(false)),
            inner: Arc::clone(&self.inner),
        })
    }

    fn executor(&self) -> MemoryExecutor {
        MemoryExecutor {
            target: Target::Database,
            done: None,
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Transaction of a [`MemoryDatabase`].
#[derive(Debug)]
pub struct MemoryTx {
    id: u64,
    done: Arc<AtomicBool>,
    inner: Arc<Inner>,
}

impl MemoryTx {
    /// Transaction id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Returns true once committed or rolled back.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    fn finish(&self) -> DriverResult<()> {
        if self.done.swap(true, Ordering::SeqCst) {
            return Err(DriverError::msg("transaction already done"));
        }
        Ok(())
    }
}

impl RawTransaction for MemoryTx {
    type Executor = MemoryExecutor;

    fn executor(&self) -> MemoryExecutor {
        MemoryExecutor {
            target: Target::Tx(self.id),
            done: Some(Arc::clone(&self.done)),
            inner: Arc::clone(&self.inner),
        }
    }

    fn commit(&self, _scope: &Scope) -> DriverResult<()> {
        self.finish()?;
        if self.inner.faults.lock().commit {
            return Err(DriverError::msg("injected commit failure"));
        }
        self.inner.record(Event::Commit { tx: self.id });
        Ok(())
    }

    fn rollback(&self, _scope: &Scope) -> DriverResult<()> {
        self.finish()?;
        if self.inner.faults.lock().rollback {
            return Err(DriverError::msg("injected rollback failure"));
        }
        self.inner.record(Event::Rollback { tx: self.id });
        Ok(())
    }
}

/// Executor of a [`MemoryDatabase`] or one of its transactions.
#[derive(Debug, Clone)]
pub struct MemoryExecutor {
    target: Target,
    done: Option<Arc<AtomicBool>>,
    inner: Arc<Inner>,
}

impl MemoryExecutor {
    /// Where statements run.
    #[must_use]
    pub const fn target(&self) -> Target {
        self.target
    }

    /// `"db"` for the database executor, `"tx:<id>"` inside a transaction.
    #[must_use]
    pub fn tag(&self) -> String {
        self.target.to_string()
    }

    fn prepare(&self, scope: &Scope, statement: &str) -> DriverResult<()> {
        scope.check()?;
        if self
            .done
            .as_ref()
            .is_some_and(|done| done.load(Ordering::SeqCst))
        {
            return Err(DriverError::msg("transaction already done"));
        }
        match self.inner.statement_fault(statement) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Executor for MemoryExecutor {
    /// Rows affected; always 0.
    type Outcome = u64;
    /// One row echoing the arguments.
    type Rows = Vec<Vec<Value>>;

    fn exec(&self, scope: &Scope, statement: &str, args: &[Value]) -> DriverResult<u64> {
        self.prepare(scope, statement)?;
        self.inner.record(Event::Exec {
            target: self.target,
            statement: statement.to_string(),
            args: args.to_vec(),
        });
        Ok(0)
    }

    fn query(&self, scope: &Scope, statement: &str, args: &[Value]) -> DriverResult<Vec<Vec<Value>>> {
        self.prepare(scope, statement)?;
        self.inner.record(Event::Query {
            target: self.target,
            statement: statement.to_string(),
            args: args.to_vec(),
        });
        Ok(vec![args.to_vec()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Interrupted;
    use crate::scope::CancelToken;

    #[test]
    fn begin_records_settings() {
        let db = MemoryDatabase::new();
        let settings = ValueChain::new()
            .with(Setting::Isolation(IsolationLevel::Serializable))
            .with(Setting::value("a", 1))
            .with(Setting::value("b", "two"));
        let tx = db.begin(&Scope::new(), &settings).unwrap();

        assert_eq!(tx.id(), 0);
        assert_eq!(
            db.events(),
            vec![Event::Begin {
                tx: 0,
                isolation: IsolationLevel::Serializable,
                read_only: false,
                values: vec![("a".into(), Value::Int(1)), ("b".into(), Value::from("two"))],
            }]
        );
    }

    #[test]
    fn finish_only_once() {
        let db = MemoryDatabase::new();
        let scope = Scope::new();
        let tx = db.begin(&scope, &ValueChain::new()).unwrap();

        tx.commit(&scope).unwrap();
        assert!(tx.is_done());
        assert!(tx.commit(&scope).is_err());
        assert!(tx.rollback(&scope).is_err());
        assert_eq!(db.count(|e| matches!(e, Event::Commit { .. })), 1);
        assert_eq!(db.count(|e| matches!(e, Event::Rollback { .. })), 0);
    }

    #[test]
    fn executor_targets() {
        let db = MemoryDatabase::new();
        let scope = Scope::new();
        let tx = db.begin(&scope, &ValueChain::new()).unwrap();

        db.executor().exec(&scope, "SELECT 1", &[]).unwrap();
        tx.executor().exec(&scope, "SELECT 2", &[]).unwrap();

        assert_eq!(db.executor().tag(), "db");
        assert_eq!(tx.executor().tag(), "tx:0");
        let targets: Vec<_> = db
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Exec { target, .. } => Some(target),
                _ => None,
            })
            .collect();
        assert_eq!(targets, vec![Target::Database, Target::Tx(0)]);
    }

    #[test]
    fn executor_of_finished_transaction_fails() {
        let db = MemoryDatabase::new();
        let scope = Scope::new();
        let tx = db.begin(&scope, &ValueChain::new()).unwrap();
        let executor = tx.executor();
        tx.rollback(&scope).unwrap();
        assert!(executor.exec(&scope, "SELECT 1", &[]).is_err());
    }

    #[test]
    fn query_echoes_arguments() {
        let db = MemoryDatabase::new();
        let rows = db
            .executor()
            .query(&Scope::new(), "SELECT $1, $2", &[Value::Int(1), Value::from("x")])
            .unwrap();
        assert_eq!(rows, vec![vec![Value::Int(1), Value::from("x")]]);
    }

    #[test]
    fn injected_faults() {
        let db = MemoryDatabase::new();
        let scope = Scope::new();

        db.fail_statements("DELETE");
        assert!(db.executor().exec(&scope, "DELETE FROM t", &[]).is_err());
        assert!(db.executor().exec(&scope, "UPDATE t SET a = 1", &[]).is_ok());

        db.fail_begin();
        assert!(db.begin(&scope, &ValueChain::new()).is_err());

        db.clear_faults();
        let tx = db.begin(&scope, &ValueChain::new()).unwrap();
        db.fail_commit();
        assert!(tx.commit(&scope).is_err());
        assert_eq!(db.count(|e| matches!(e, Event::Commit { .. })), 0);
    }

    #[test]
    fn honors_cancellation() {
        let db = MemoryDatabase::new();
        let token = CancelToken::new();
        let scope = Scope::new().with_cancel(token.clone());
        let tx = db.begin(&scope, &ValueChain::new()).unwrap();

        token.cancel();
        let err = tx.executor().exec(&scope, "SELECT 1", &[]).unwrap_err();
        assert_eq!(err.downcast_ref::<Interrupted>(), Some(&Interrupted::Cancelled));
        assert!(db.begin(&scope, &ValueChain::new()).unwrap_err().is_interrupted());

        tx.rollback(&scope).unwrap();
    }

    #[test]
    fn statements_in_order() {
        let db = MemoryDatabase::new();
        let scope = Scope::new();
        db.executor().exec(&scope, "A", &[]).unwrap();
        db.executor().query(&scope, "B", &[]).unwrap();
        assert_eq!(db.statements(), vec!["A", "B"]);

        db.clear();
        assert!(db.events().is_empty());
    }
}
