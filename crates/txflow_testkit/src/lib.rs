//! # txflow Testkit
//!
//! Test utilities for txflow.
//!
//! This crate provides:
//! - Fixtures wiring a manager to the recording database
//! - Scripted propagation scenarios
//! - Property-based test generators using proptest
//! - Concurrent stress helpers
//!
//! ## Usage
//!
//! ```rust
//! use txflow_testkit::prelude::*;
//!
//! let env = TestManager::new();
//! let report = Scenario::parse("required,nested:fail").unwrap().run(&env);
//! assert_eq!(report.commits, 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod scenario;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::scenario::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use scenario::*;
pub use stress::*;
