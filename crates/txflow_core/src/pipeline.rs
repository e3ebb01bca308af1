//! Ordered composition of transaction options.
//!
//! Manager defaults and call-site options are merged into one list of
//! stages. Stages with the same [name](Setting::name) are de-duplicated, the
//! last one winning, and the survivors are ordered by descending
//! [priority](Setting::priority). Resolving folds the stages into a
//! [`ValueChain`]; the propagation stage is terminal and decides the handle.

use crate::database::Database;
use crate::error::ResolveResult;
use crate::propagation::{Propagation, Resolver};
use crate::setting::{Setting, ValueChain};
use crate::tx::Tx;
use std::sync::Arc;

/// Composed option stages of one transactional call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Setting>,
}

impl Pipeline {
    /// Composes `defaults` followed by `overrides`.
    #[must_use]
    pub fn compose(defaults: &[Setting], overrides: &[Setting]) -> Self {
        let mut stages: Vec<Setting> = Vec::with_capacity(defaults.len() + overrides.len());
        for setting in defaults.iter().chain(overrides) {
            match stages.iter().position(|s| s.name() == setting.name()) {
                Some(index) => {
                    stages.remove(index);
                    stages.push(setting.clone());
                }
                None => stages.push(setting.clone()),
            }
        }
        // Stable, so equal priorities keep their merge order.
        stages.sort_by(|a, b| b.priority().cmp(&a.priority()));
        Self { stages }
    }

    /// Stages, outermost first.
    #[must_use]
    pub fn stages(&self) -> &[Setting] {
        &self.stages
    }

    /// The terminal propagation mode, [`Propagation::Required`] if no stage
    /// sets one.
    #[must_use]
    pub fn propagation(&self) -> Propagation {
        self.stages
            .iter()
            .find_map(|stage| match stage {
                Setting::Propagation(mode) => Some(*mode),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Folds every non-propagation stage into a chain.
    #[must_use]
    pub fn settings(&self) -> ValueChain {
        self.stages
            .iter()
            .filter(|stage| !matches!(stage, Setting::Propagation(_)))
            .cloned()
            .collect()
    }

    /// Resolves the handle the call runs with.
    ///
    /// # Errors
    ///
    /// Returns the propagation failure of the terminal stage.
    pub fn resolve<D: Database>(
        &self,
        resolver: &Resolver<'_, D>,
        active: Option<&Arc<Tx<D>>>,
    ) -> ResolveResult<Option<Arc<Tx<D>>>> {
        let mut chain = ValueChain::new();
        for stage in &self.stages {
            match stage {
                Setting::Propagation(mode) => return mode.resolve(resolver, active, &chain),
                other => chain = chain.with(other.clone()),
            }
        }
        Propagation::Required.resolve(resolver, active, &chain)
    }
}
