//! Property-based test generators using proptest.

use crate::scenario::{Action, Scenario, Step};
use proptest::prelude::*;
use txflow_core::{IsolationLevel, Propagation, Setting, Value};
use txflow_sql::Params;

/// Strategy for propagation modes.
pub fn propagation_strategy() -> impl Strategy<Value = Propagation> {
    prop::sample::select(Propagation::ALL.to_vec())
}

/// Strategy for isolation levels.
pub fn isolation_strategy() -> impl Strategy<Value = IsolationLevel> {
    prop::sample::select(IsolationLevel::ALL.to_vec())
}

/// Strategy for scalar values.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        "[a-z ]{0,12}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
    ]
}

/// Strategy for settings of every kind.
pub fn setting_strategy() -> impl Strategy<Value = Setting> {
    prop_oneof![
        propagation_strategy().prop_map(Setting::Propagation),
        isolation_strategy().prop_map(Setting::Isolation),
        any::<bool>().prop_map(Setting::ReadOnly),
        (parameter_name_strategy(), value_strategy()).prop_map(|(k, v)| Setting::value(k, v)),
    ]
}

/// Strategy for parameter names.
pub fn parameter_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z_][a-z0-9_]{0,7}").expect("Invalid regex")
}

/// Strategy for named argument sets.
pub fn params_strategy() -> impl Strategy<Value = Params> {
    prop::collection::vec((parameter_name_strategy(), value_strategy()), 0..6)
        .prop_map(|pairs| pairs.into_iter().collect())
}

/// Strategy for scenario steps that never panic.
pub fn step_strategy() -> impl Strategy<Value = Step> {
    (
        propagation_strategy(),
        prop::option::of(isolation_strategy()),
        prop_oneof![Just(Action::Succeed), Just(Action::Fail)],
    )
        .prop_map(|(mode, isolation, action)| Step {
            mode,
            isolation,
            action,
        })
}

/// Strategy for scenarios of one to `max` steps that never panic.
pub fn scenario_strategy(max: usize) -> impl Strategy<Value = Scenario> {
    prop::collection::vec(step_strategy(), 1..=max.max(1)).prop_map(Scenario::new)
}
