//! Manager configuration.

use crate::error::PropagationError;
use crate::propagation::Propagation;
use crate::savepoint::{is_valid_prefix, DEFAULT_SAVEPOINT_PREFIX};
use crate::setting::Setting;
use crate::types::IsolationLevel;
use crate::value::Value;
use thiserror::Error;
use tracing::warn;

/// Configuration of a [`Manager`](crate::Manager).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Options applied to every transactional call before call-site options.
    pub options: Vec<Setting>,

    /// Prefix of savepoint names.
    pub savepoint_prefix: String,

    /// What to do with propagation policy violations.
    pub logical_errors: LogicalErrorPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            options: vec![Setting::Propagation(Propagation::Required)],
            savepoint_prefix: DEFAULT_SAVEPOINT_PREFIX.to_string(),
            logical_errors: LogicalErrorPolicy::Log,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default propagation mode.
    #[must_use]
    pub fn propagation(self, mode: Propagation) -> Self {
        self.option(Setting::Propagation(mode))
    }

    /// Sets the default isolation level.
    #[must_use]
    pub fn isolation(self, level: IsolationLevel) -> Self {
        self.option(Setting::Isolation(level))
    }

    /// Sets the default read-only flag.
    #[must_use]
    pub fn read_only(self, value: bool) -> Self {
        self.option(Setting::ReadOnly(value))
    }

    /// Adds a default named value.
    #[must_use]
    pub fn value(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.option(Setting::value(key, value))
    }

    /// Adds a default option, replacing an earlier one with the same name.
    #[must_use]
    pub fn option(mut self, setting: Setting) -> Self {
        self.options.retain(|s| s.name() != setting.name());
        self.options.push(setting);
        self
    }

    /// Sets the savepoint name prefix.
    #[must_use]
    pub fn savepoint_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.savepoint_prefix = prefix.into();
        self
    }

    /// Sets the policy for propagation violations.
    #[must_use]
    pub const fn logical_errors(mut self, policy: LogicalErrorPolicy) -> Self {
        self.logical_errors = policy;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the savepoint prefix would not form a valid SQL
    /// identifier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if is_valid_prefix(&self.savepoint_prefix) {
            Ok(())
        } else {
            Err(ConfigError::InvalidSavepointPrefix(
                self.savepoint_prefix.clone(),
            ))
        }
    }
}

/// Handling of propagation policy violations.
///
/// Violations (`Mandatory` outside a transaction, `Never` inside one, a
/// stricter isolation request) point at a logic error in the calling code.
/// They are always returned to the caller; the policy decides what else
/// happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogicalErrorPolicy {
    /// Emit a warning event.
    #[default]
    Log,
    /// Panic with the violation.
    Panic,
}

impl LogicalErrorPolicy {
    /// Reports `error` if it is a policy violation.
    ///
    /// # Panics
    ///
    /// Panics under [`LogicalErrorPolicy::Panic`] when `error` is a policy
    /// violation.
    pub fn report(self, error: &PropagationError) {
        if !error.is_policy_violation() {
            return;
        }
        match self {
            Self::Log => warn!(%error, "transaction propagation violated"),
            Self::Panic => panic!("transaction propagation violated: {error}"),
        }
    }
}

/// Invalid [`Config`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The savepoint prefix is not an identifier.
    #[error("invalid savepoint prefix: {0:?}")]
    InvalidSavepointPrefix(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(
            config.options,
            vec![Setting::Propagation(Propagation::Required)]
        );
        assert_eq!(config.savepoint_prefix, "sp_");
        assert_eq!(config.logical_errors, LogicalErrorPolicy::Log);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .propagation(Propagation::Nested)
            .isolation(IsolationLevel::Serializable)
            .read_only(true)
            .value("tenant", "acme")
            .savepoint_prefix("nested_")
            .logical_errors(LogicalErrorPolicy::Panic);

        assert_eq!(
            config.options,
            vec![
                Setting::Propagation(Propagation::Nested),
                Setting::Isolation(IsolationLevel::Serializable),
                Setting::ReadOnly(true),
                Setting::value("tenant", "acme"),
            ]
        );
        assert_eq!(config.savepoint_prefix, "nested_");
        assert_eq!(config.logical_errors, LogicalErrorPolicy::Panic);
    }

    #[test]
    fn invalid_prefix() {
        let config = Config::new().savepoint_prefix("sp-");
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidSavepointPrefix("sp-".into()))
        );
    }

    #[test]
    fn log_policy_does_not_panic() {
        LogicalErrorPolicy::Log.report(&PropagationError::TransactionRequired);
    }

    #[test]
    #[should_panic(expected = "transaction is not expected")]
    fn panic_policy_panics_on_violation() {
        LogicalErrorPolicy::Panic.report(&PropagationError::TransactionNotExpected);
    }

    #[test]
    fn panic_policy_ignores_driver_failures() {
        let error = PropagationError::Driver(crate::DriverError::msg("connection lost"));
        LogicalErrorPolicy::Panic.report(&error);
    }
}
