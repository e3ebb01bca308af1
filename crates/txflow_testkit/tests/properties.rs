//! Cross-crate property tests.

use proptest::prelude::*;
use std::collections::HashMap;
use txflow_core::memory::Event;
use txflow_core::{IsolationLevel, Propagation};
use txflow_sql::{template, Params, Rewriter};
use txflow_testkit::prelude::*;

fn savepoint_name(statement: &str, verb: &str) -> Option<String> {
    statement.strip_prefix(verb).map(str::to_string)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn every_transaction_finishes_once(scenario in scenario_strategy(6)) {
        let env = TestManager::new();
        let report = scenario.run(&env);

        prop_assert!(!report.panicked);
        prop_assert!(env.begins() <= 1);
        prop_assert_eq!(env.begins(), env.commits() + env.rollbacks());
    }

    #[test]
    fn every_savepoint_finishes_once(scenario in scenario_strategy(6)) {
        let env = TestManager::new();
        scenario.run(&env);

        let mut open: HashMap<String, usize> = HashMap::new();
        let mut created = Vec::new();
        for statement in env.db.statements() {
            if let Some(name) = savepoint_name(&statement, "SAVEPOINT ") {
                created.push(name.clone());
                *open.entry(name).or_default() += 1;
            } else if let Some(name) = savepoint_name(&statement, "RELEASE SAVEPOINT ")
                .or_else(|| savepoint_name(&statement, "ROLLBACK TO SAVEPOINT "))
            {
                let count = open.entry(name).or_default();
                prop_assert_eq!(*count, 1);
                *count -= 1;
            }
        }
        prop_assert!(open.values().all(|&n| n == 0));

        let expected: Vec<String> = (0..created.len()).map(|i| format!("sp_{i}")).collect();
        prop_assert_eq!(created, expected);
    }

    #[test]
    fn required_and_nested_agree_without_transaction(action in prop_oneof![Just(Action::Succeed), Just(Action::Fail)]) {
        let required = TestManager::new();
        let nested = TestManager::new();
        Scenario::new(vec![Step::new(Propagation::Required).action(action)]).run(&required);
        Scenario::new(vec![Step::new(Propagation::Nested).action(action)]).run(&nested);
        prop_assert_eq!(required.db.events(), nested.db.events());
    }

    #[test]
    fn supports_and_never_agree_without_transaction(action in prop_oneof![Just(Action::Succeed), Just(Action::Fail)]) {
        let supports = TestManager::new();
        let never = TestManager::new();
        let a = Scenario::new(vec![Step::new(Propagation::Supports).action(action)]).run(&supports);
        let b = Scenario::new(vec![Step::new(Propagation::Never).action(action)]).run(&never);
        prop_assert_eq!(supports.db.events(), never.db.events());
        prop_assert_eq!(&a.steps[0].result, &b.steps[0].result);
        let began = supports.db.events().iter().any(|e| matches!(e, Event::Begin { .. }));
        prop_assert!(!began);
    }

    #[test]
    fn isolation_escalation(opened in isolation_strategy(), requested in isolation_strategy()) {
        let env = TestManager::new();
        let scenario = Scenario::new(vec![
            Step::new(Propagation::Required).isolation(opened),
            Step::new(Propagation::Required).isolation(requested),
        ]);
        let report = scenario.run(&env);

        let allowed = opened == IsolationLevel::Default || requested <= opened;
        let rejected = matches!(report.steps[1].result, StepResult::Rejected(_));
        prop_assert_eq!(rejected, !allowed);
    }

    #[test]
    fn rewrite_binds_every_bound_reference(params in params_strategy()) {
        let names: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        let statement = names
            .iter()
            .map(|n| format!("c_{n} = :{n}"))
            .collect::<Vec<_>>()
            .join(" AND ");

        let out = Rewriter::default().rewrite(&statement, &params);
        prop_assert_eq!(out.args.len(), names.len());
        prop_assert!(!out.statement.contains(':'));
        prop_assert_eq!(Rewriter::names(&statement).len(), names.len());
    }

    #[test]
    fn template_fills_every_known_field(params in params_strategy()) {
        let fields: Vec<String> = params.iter().map(|(k, _)| format!("{{{k}}}")).collect();
        let filled = template::format(&fields.join("|"), &params);
        let expected: Vec<String> = params.iter().map(|(_, v)| v.to_string()).collect();
        prop_assert_eq!(filled, expected.join("|"));
    }
}

#[test]
fn template_keeps_unknown_fields() {
    assert_eq!(template::format("{missing}", &Params::new()), "{missing}");
}
