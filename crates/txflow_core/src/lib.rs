//! # txflow Core
//!
//! Declarative transaction propagation for relational database access.
//!
//! A caller marks a unit of work as transactional and picks a
//! [`Propagation`] mode. The [`Manager`] then decides whether the work
//! starts a new transaction, joins the one already in scope, opens a
//! savepoint, runs without a transaction, or is rejected, and it commits or
//! rolls back whatever it opened on every exit path, panics included.
//!
//! This crate provides:
//! - [`Manager`], the orchestrator
//! - [`Propagation`] strategies and the option [`Pipeline`]
//! - [`Scope`] and [`TxStore`] for carrying the active [`Tx`] handle
//! - [`Database`], [`RawTransaction`], and [`Executor`], the traits a driver
//!   implements
//! - [`memory::MemoryDatabase`], a recording database for tests
//!
//! ## Example
//!
//! ```rust
//! use txflow_core::memory::{Event, MemoryDatabase};
//! use txflow_core::{Executor, Manager, Propagation, Scope, Setting};
//!
//! let db = MemoryDatabase::new();
//! let manager = Manager::new(db.clone());
//!
//! manager
//!     .transactional(&Scope::new(), |scope| {
//!         manager.executor(scope).exec(scope, "INSERT INTO audit VALUES (1)", &[])?;
//!         manager.transactional_with(scope, &[Setting::from(Propagation::Nested)], |scope| {
//!             manager.executor(scope).exec(scope, "DELETE FROM audit", &[])
//!         })
//!         .map_err(|e| txflow_core::DriverError::msg(e.to_string()))
//!     })
//!     .unwrap();
//!
//! assert_eq!(
//!     db.statements(),
//!     vec![
//!         "INSERT INTO audit VALUES (1)",
//!         "SAVEPOINT sp_0",
//!         "DELETE FROM audit",
//!         "RELEASE SAVEPOINT sp_0",
//!     ]
//! );
//! assert_eq!(db.count(|e| matches!(e, Event::Commit { .. })), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod chain;
mod config;
mod database;
mod error;
mod manager;
pub mod memory;
mod pipeline;
mod propagation;
mod savepoint;
mod scope;
mod setting;
mod store;
mod tx;
mod types;
mod value;

pub use chain::{Chain, Iter as ChainIter};
pub use config::{Config, ConfigError, LogicalErrorPolicy};
pub use database::{Database, Executor, RawTransaction};
pub use error::{DriverError, DriverResult, Interrupted, PropagationError, ResolveResult, TxError};
pub use manager::Manager;
pub use pipeline::Pipeline;
pub use propagation::{Propagation, Resolver};
pub use savepoint::{is_valid_prefix, Savepoint, SavepointAllocator, DEFAULT_SAVEPOINT_PREFIX};
pub use scope::{CancelToken, Scope};
pub use setting::{Setting, SettingKey, ValueChain};
pub use store::TxStore;
pub use tx::{Ancestors, Tx, TxKind};
pub use types::{IsolationLevel, SessionKey, TxOptions};
pub use value::Value;
