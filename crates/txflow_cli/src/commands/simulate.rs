//! Simulate command - runs a propagation script against the recording
//! database and shows what each step did.

use super::{CliError, Format};
use std::panic;
use txflow_core::{Config, IsolationLevel};
use txflow_testkit::{Scenario, ScenarioReport, StepResult, TestManager};

/// Options of the simulate command.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Isolation level of the outermost step, unless the script sets one.
    pub isolation: Option<String>,
    /// Savepoint name prefix.
    pub savepoint_prefix: String,
    /// Faults to inject.
    pub faults: Vec<String>,
}

/// Runs the simulate command.
pub fn run(script: &str, options: &Options, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let format = Format::parse(format)?;

    // Panicking steps are reported, not printed.
    let hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let output = render(script, options, format);
    panic::set_hook(hook);

    println!("{}", output?);
    Ok(())
}

fn render(
    script: &str,
    options: &Options,
    format: Format,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut steps = Scenario::parse(script)?.steps().to_vec();
    if let Some(level) = &options.isolation {
        let level = IsolationLevel::parse(level)
            .ok_or_else(|| CliError::UnknownIsolation(level.clone()))?;
        if let Some(first) = steps.first_mut() {
            first.isolation.get_or_insert(level);
        }
    }
    let scenario = Scenario::new(steps);

    let config = Config::new().savepoint_prefix(options.savepoint_prefix.as_str());
    config.validate()?;
    let env = TestManager::with_config(config);
    for fault in &options.faults {
        inject(&env, fault)?;
    }

    tracing::debug!(%scenario, "running scenario");
    let report = scenario.run(&env);

    Ok(match format {
        Format::Json => report.to_json()?,
        Format::Text => text(&scenario, &report),
    })
}

fn inject(env: &TestManager, fault: &str) -> Result<(), CliError> {
    match fault.to_lowercase().as_str() {
        "begin" => env.db.fail_begin(),
        "commit" => env.db.fail_commit(),
        "rollback" => env.db.fail_rollback(),
        "savepoint" => env.db.fail_statements("SAVEPOINT"),
        _ => return Err(CliError::UnknownFault(fault.to_string())),
    }
    Ok(())
}

fn text(scenario: &Scenario, report: &ScenarioReport) -> String {
    let mut out = format!("Scenario: {scenario}\n\n");
    out.push_str(&format!(
        "  {:<4} {:<28} {:<12} {:<10} {}\n",
        "STEP", "MODE", "HANDLE", "SAVEPOINT", "RESULT"
    ));
    for step in &report.steps {
        out.push_str(&format!(
            "  {:<4} {:<28} {:<12} {:<10} {}\n",
            step.index,
            step.step,
            step.handle.as_deref().unwrap_or("-"),
            step.savepoint.as_deref().unwrap_or("-"),
            result(&step.result),
        ));
    }

    out.push_str("\nEvents:\n");
    if report.log.is_empty() {
        out.push_str("  (none)\n");
    }
    for line in &report.log {
        out.push_str(&format!("  {line}\n"));
    }

    out.push_str(&format!(
        "\nCommits: {}  Rollbacks: {}",
        report.commits, report.rollbacks
    ));
    if report.panicked {
        out.push_str("  (panicked)");
    }
    out
}

fn result(result: &StepResult) -> String {
    match result {
        StepResult::NotRun => "not run".to_string(),
        StepResult::Running => "running".to_string(),
        StepResult::Succeeded => "succeeded".to_string(),
        StepResult::Rejected(why) => format!("rejected: {why}"),
        StepResult::Failed(why) => format!("failed: {why}"),
        StepResult::Unwound => "unwound".to_string(),
    }
}
