//! Transaction settings and the chain that carries them.

use crate::chain::{self, Chain};
use crate::propagation::Propagation;
use crate::types::IsolationLevel;
use crate::value::Value;
use std::borrow::Cow;
use std::fmt;

/// A single transaction option.
///
/// Settings double as pipeline stages: every setting has a
/// [name](Setting::name) used for de-duplication and a
/// [priority](Setting::priority) that orders the stages.
#[derive(Debug, Clone, PartialEq)]
pub enum Setting {
    /// Requested isolation level.
    Isolation(IsolationLevel),
    /// Read-only flag.
    ReadOnly(bool),
    /// Propagation policy.
    Propagation(Propagation),
    /// Arbitrary named value handed through to the database.
    Named(String, Value),
}

impl Setting {
    /// Priority of propagation stages.
    pub const PROPAGATION_PRIORITY: u8 = 0;
    /// Priority of isolation and read-only stages.
    pub const TRANSACTION_PRIORITY: u8 = 5;
    /// Priority of named value stages.
    pub const VALUE_PRIORITY: u8 = 10;

    /// Creates a named value setting.
    pub fn value(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Named(key.into(), value.into())
    }

    /// Lookup key of this setting.
    #[must_use]
    pub fn key(&self) -> SettingKey<'_> {
        match self {
            Self::Isolation(_) => SettingKey::Isolation,
            Self::ReadOnly(_) => SettingKey::ReadOnly,
            Self::Propagation(_) => SettingKey::Propagation,
            Self::Named(key, _) => SettingKey::Named(key),
        }
    }

    /// De-duplication name.
    #[must_use]
    pub fn name(&self) -> Cow<'_, str> {
        match self {
            Self::Isolation(_) => Cow::Borrowed("isolation"),
            Self::ReadOnly(_) => Cow::Borrowed("readonly"),
            Self::Propagation(_) => Cow::Borrowed("propagation"),
            Self::Named(key, _) => Cow::Owned(format!("value:{key}")),
        }
    }

    /// Stage priority; higher priorities wrap lower ones.
    #[must_use]
    pub const fn priority(&self) -> u8 {
        match self {
            Self::Propagation(_) => Self::PROPAGATION_PRIORITY,
            Self::Isolation(_) | Self::ReadOnly(_) => Self::TRANSACTION_PRIORITY,
            Self::Named(..) => Self::VALUE_PRIORITY,
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Isolation(level) => write!(f, "isolation={level}"),
            Self::ReadOnly(read_only) => write!(f, "readonly={read_only}"),
            Self::Propagation(mode) => write!(f, "propagation={mode}"),
            Self::Named(key, value) => write!(f, "{key}={value}"),
        }
    }
}

impl From<Propagation> for Setting {
    fn from(mode: Propagation) -> Self {
        Self::Propagation(mode)
    }
}

impl From<IsolationLevel> for Setting {
    fn from(level: IsolationLevel) -> Self {
        Self::Isolation(level)
    }
}

/// Lookup key into a [`ValueChain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey<'a> {
    /// [`Setting::Isolation`].
    Isolation,
    /// [`Setting::ReadOnly`].
    ReadOnly,
    /// [`Setting::Propagation`].
    Propagation,
    /// [`Setting::Named`] with the given key.
    Named(&'a str),
}

/// Immutable chain of settings accumulated while resolving a transaction.
///
/// Later settings shadow earlier ones with the same key. Extending a chain
/// never changes the chain it was derived from.
#[derive(Debug, Clone, Default)]
pub struct ValueChain {
    chain: Chain<Setting>,
}

impl ValueChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new chain with `setting` on top.
    #[must_use]
    pub fn with(&self, setting: Setting) -> Self {
        Self {
            chain: self.chain.push(setting),
        }
    }

    /// Looks up the newest setting stored under `key`.
    #[must_use]
    pub fn lookup(&self, key: SettingKey<'_>) -> Option<&Setting> {
        self.chain.find(|setting| setting.key() == key)
    }

    /// Requested isolation level, [`IsolationLevel::Default`] if unset.
    #[must_use]
    pub fn isolation(&self) -> IsolationLevel {
        match self.lookup(SettingKey::Isolation) {
            Some(Setting::Isolation(level)) => *level,
            _ => IsolationLevel::Default,
        }
    }

    /// Requested read-only flag, `false` if unset.
    #[must_use]
    pub fn read_only(&self) -> bool {
        matches!(
            self.lookup(SettingKey::ReadOnly),
            Some(Setting::ReadOnly(true))
        )
    }

    /// Requested propagation mode, if any stage recorded one.
    #[must_use]
    pub fn propagation(&self) -> Option<Propagation> {
        match self.lookup(SettingKey::Propagation) {
            Some(Setting::Propagation(mode)) => Some(*mode),
            _ => None,
        }
    }

    /// Named value stored under `key`.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&Value> {
        match self.lookup(SettingKey::Named(key)) {
            Some(Setting::Named(_, value)) => Some(value),
            _ => None,
        }
    }

    /// Iterates over all settings, newest first, including shadowed ones.
    pub fn iter(&self) -> chain::Iter<'_, Setting> {
        self.chain.iter()
    }

    /// Number of settings in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Returns true if the chain holds no settings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

impl FromIterator<Setting> for ValueChain {
    fn from_iter<I: IntoIterator<Item = Setting>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |chain, setting| chain.with(setting))
    }
}
