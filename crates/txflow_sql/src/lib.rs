//! # txflow SQL
//!
//! Statement helpers for txflow executors.
//!
//! - [`Rewriter`] turns `:name` parameters into positional placeholders in
//!   one of the [`Placeholder`] dialects
//! - [`template`] fills `{name}` fields
//! - [`NamedExecutor`] adds named-parameter calls to every
//!   [`Executor`](txflow_core::Executor)

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod executor;
mod lexer;
mod params;
mod placeholder;
mod rewrite;
pub mod template;

pub use error::{RewriteError, RewriteResult};
pub use executor::NamedExecutor;
pub use params::Params;
pub use placeholder::Placeholder;
pub use rewrite::{Rewriter, Rewritten};
