//! Concurrent stress helpers.
//!
//! Runs many transactional calls from one parent scope on several threads
//! and checks that every call saw only its own transaction.

use crate::fixtures::{mode, TestManager};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;
use txflow_core::{Executor, Propagation, Scope};

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Calls per thread.
    pub operations: usize,
    /// Number of threads.
    pub threads: usize,
    /// Nested savepoints opened inside every call.
    pub nesting: usize,
    /// Every n-th call fails and rolls back; 0 disables failures.
    pub fail_every: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 200,
            threads: 4,
            nesting: 2,
            fail_every: 5,
        }
    }
}

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Calls that committed.
    pub committed: usize,
    /// Calls that rolled back.
    pub rolled_back: usize,
    /// Calls that observed a handle other than their own.
    pub leaks: usize,
    /// Nested savepoint blocks that returned an error.
    pub nested_failures: usize,
    /// Total duration.
    pub duration: Duration,
    /// Calls per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    fn new(
        committed: usize,
        rolled_back: usize,
        leaks: usize,
        nested_failures: usize,
        duration: Duration,
    ) -> Self {
        let total = committed + rolled_back;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };
        Self {
            committed,
            rolled_back,
            leaks,
            nested_failures,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {name} ===");
        println!("Committed: {}", self.committed);
        println!("Rolled back: {}", self.rolled_back);
        println!("Leaks: {}", self.leaks);
        println!("Nested failures: {}", self.nested_failures);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Runs `config.threads` threads of transactional calls sharing one parent
/// scope.
pub fn concurrent_transactions(env: &TestManager, config: &StressConfig) -> StressTestResult {
    let parent = Scope::new();
    let committed = AtomicUsize::new(0);
    let rolled_back = AtomicUsize::new(0);
    let leaks = AtomicUsize::new(0);
    let nested_failures = AtomicUsize::new(0);
    let counters = Counters {
        leaks: &leaks,
        nested_failures: &nested_failures,
    };
    let start = Instant::now();

    thread::scope(|s| {
        for t in 0..config.threads {
            let (parent, committed, rolled_back, counters) = (&parent, &committed, &rolled_back, &counters);
            s.spawn(move || {
                for op in 0..config.operations {
                    let call = t * config.operations + op;
                    let fail = config.fail_every > 0 && call % config.fail_every == 0;
                    let result = env.manager.transactional(parent, |scope| {
                        let mine = env.manager.executor(scope).tag();
                        nest(env, scope, config.nesting, &mine, counters);
                        if env.manager.current(parent).is_some() {
                            counters.leaks.fetch_add(1, Ordering::Relaxed);
                        }
                        if fail {
                            Err(())
                        } else {
                            Ok(())
                        }
                    });
                    match result {
                        Ok(()) => committed.fetch_add(1, Ordering::Relaxed),
                        Err(_) => rolled_back.fetch_add(1, Ordering::Relaxed),
                    };
                }
            });
        }
    });

    StressTestResult::new(
        committed.into_inner(),
        rolled_back.into_inner(),
        leaks.into_inner(),
        nested_failures.into_inner(),
        start.elapsed(),
    )
}

#[derive(Clone, Copy)]
struct Counters<'a> {
    leaks: &'a AtomicUsize,
    nested_failures: &'a AtomicUsize,
}

fn nest(env: &TestManager, scope: &Scope, depth: usize, tag: &str, counters: &Counters<'_>) {
    if depth == 0 {
        return;
    }
    let result = env
        .manager
        .transactional_with(scope, &mode(Propagation::Nested), |scope| {
            let executor = env.manager.executor(scope);
            if executor.tag() != tag {
                counters.leaks.fetch_add(1, Ordering::Relaxed);
            }
            executor.exec(scope, "UPDATE counters SET n = n + 1", &[])?;
            nest(env, scope, depth - 1, tag, counters);
            Ok::<_, txflow_core::DriverError>(())
        });
    if let Err(err) = result {
        counters.nested_failures.fetch_add(1, Ordering::Relaxed);
        debug!(depth, error = %err, "nested block failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_run_has_no_leaks() {
        let env = TestManager::new();
        let config = StressConfig {
            operations: 20,
            threads: 4,
            nesting: 2,
            fail_every: 3,
        };
        let result = concurrent_transactions(&env, &config);

        assert_eq!(result.leaks, 0);
        assert_eq!(result.nested_failures, 0);
        assert_eq!(result.committed + result.rolled_back, 80);
        assert_eq!(env.commits(), result.committed);
        assert_eq!(env.rollbacks(), result.rolled_back);
    }

    #[test]
    fn failing_nested_blocks_are_counted() {
        let env = TestManager::new();
        env.db.fail_statements("UPDATE");
        let config = StressConfig {
            operations: 10,
            threads: 2,
            nesting: 2,
            fail_every: 0,
        };
        let result = concurrent_transactions(&env, &config);

        assert_eq!(result.leaks, 0);
        assert_eq!(result.nested_failures, 20);
        assert_eq!(result.committed, 20);
        assert_eq!(env.rollbacks(), 0);
    }
}
