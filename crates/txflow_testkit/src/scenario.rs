//! Scripted propagation scenarios.
//!
//! A scenario is a list of steps, each running inside the unit of work of
//! the step before it. A script spells one step per comma:
//!
//! ```text
//! mode[@isolation][:fail|:panic]
//! ```
//!
//! `required,nested:fail,nested` opens a transaction, a savepoint that fails
//! after its inner savepoint commits, and reports what happened to each step
//! together with the recorded database events.
//!
//! A failing step does not fail the step around it; its error is recorded
//! and the outer step carries on. A panicking step unwinds every step.

use crate::fixtures::TestManager;
use serde::Serialize;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use txflow_core::memory::Event;
use txflow_core::{Executor, IsolationLevel, Propagation, Scope, Setting, TxError};

/// What a step does after its inner steps ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Return `Ok`.
    #[default]
    Succeed,
    /// Return an error.
    Fail,
    /// Panic.
    Panic,
}

/// One step of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Step {
    /// Propagation mode of the step.
    pub mode: Propagation,
    /// Isolation level the step requests, if any.
    pub isolation: Option<IsolationLevel>,
    /// What the step does.
    pub action: Action,
}

impl Step {
    /// A succeeding step.
    #[must_use]
    pub const fn new(mode: Propagation) -> Self {
        Self {
            mode,
            isolation: None,
            action: Action::Succeed,
        }
    }

    /// Sets the requested isolation level.
    #[must_use]
    pub const fn isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = Some(level);
        self
    }

    /// Sets the action.
    #[must_use]
    pub const fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    /// Parses `mode[@isolation][:fail|:panic]`.
    ///
    /// # Errors
    ///
    /// Returns an error naming the part that could not be parsed.
    pub fn parse(s: &str) -> Result<Self, ScriptError> {
        let s = s.trim();
        let (head, action) = match s.split_once(':') {
            Some((head, "fail")) => (head, Action::Fail),
            Some((head, "panic")) => (head, Action::Panic),
            Some((_, other)) => return Err(ScriptError::UnknownAction(other.to_string())),
            None => (s, Action::Succeed),
        };
        let (mode, isolation) = match head.split_once('@') {
            Some((mode, level)) => {
                let level = IsolationLevel::parse(level)
                    .ok_or_else(|| ScriptError::UnknownIsolation(level.to_string()))?;
                (mode, Some(level))
            }
            None => (head, None),
        };
        let mode = Propagation::parse(mode).ok_or_else(|| ScriptError::UnknownMode(mode.to_string()))?;
        Ok(Self {
            mode,
            isolation,
            action,
        })
    }

    fn options(&self) -> Vec<Setting> {
        let mut options = vec![Setting::Propagation(self.mode)];
        options.extend(self.isolation.map(Setting::Isolation));
        options
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mode)?;
        if let Some(level) = self.isolation {
            write!(f, "@{level}")?;
        }
        match self.action {
            Action::Succeed => Ok(()),
            Action::Fail => f.write_str(":fail"),
            Action::Panic => f.write_str(":panic"),
        }
    }
}

/// Invalid scenario script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// The script has no steps.
    #[error("script is empty")]
    Empty,
    /// Unknown propagation mode.
    #[error("unknown propagation mode: {0:?}")]
    UnknownMode(String),
    /// Unknown isolation level.
    #[error("unknown isolation level: {0:?}")]
    UnknownIsolation(String),
    /// Unknown action suffix.
    #[error("unknown action: {0:?}")]
    UnknownAction(String),
}

/// Error returned by a failing step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("step {0} failed")]
pub struct StepFailed(pub usize);

/// Steps nested inside each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scenario {
    steps: Vec<Step>,
}

impl Scenario {
    /// Creates a scenario from steps, outermost first.
    #[must_use]
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Parses a comma-separated script.
    ///
    /// # Errors
    ///
    /// Returns an error if the script is empty or a step is invalid.
    pub fn parse(script: &str) -> Result<Self, ScriptError> {
        let steps = script
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(Step::parse)
            .collect::<Result<Vec<_>, _>>()?;
        if steps.is_empty() {
            return Err(ScriptError::Empty);
        }
        Ok(Self { steps })
    }

    /// Steps, outermost first.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Runs the scenario on `env`, starting from an empty scope.
    ///
    /// Panics raised by steps are caught and reported.
    pub fn run(&self, env: &TestManager) -> ScenarioReport {
        let mut steps: Vec<StepReport> = self
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| StepReport::pending(index, step))
            .collect();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_step(env, &Scope::new(), 0, &mut steps);
        }));
        let panicked = outcome.is_err();
        if panicked {
            for step in steps.iter_mut().filter(|s| s.result == StepResult::Running) {
                step.result = StepResult::Unwound;
            }
        }

        let events = env.db.events();
        ScenarioReport {
            steps,
            log: events.iter().map(ToString::to_string).collect(),
            commits: env.commits(),
            rollbacks: env.rollbacks(),
            panicked,
            events,
        }
    }

    fn run_step(&self, env: &TestManager, scope: &Scope, index: usize, reports: &mut [StepReport]) {
        let Some(step) = self.steps.get(index) else {
            return;
        };
        let manager = &env.manager;

        let result = manager.transactional_with(scope, &step.options(), |scope| {
            let handle = manager.current(scope);
            let report = &mut reports[index];
            report.result = StepResult::Running;
            report.handle = handle.as_ref().map(|tx| format!("{:?}", tx.kind()).to_lowercase());
            report.savepoint = handle
                .as_ref()
                .and_then(|tx| tx.savepoint().map(|sp| sp.name().to_string()));

            manager
                .executor(scope)
                .exec(scope, &format!("-- step {index}"), &[])
                .map_err(|_| StepFailed(index))?;
            self.run_step(env, scope, index + 1, reports);

            match step.action {
                Action::Succeed => Ok(()),
                Action::Fail => Err(StepFailed(index)),
                Action::Panic => panic!("step {index} panicked"),
            }
        });

        reports[index].result = match result {
            Ok(()) => StepResult::Succeeded,
            Err(TxError::Begin(cause)) => StepResult::Rejected(cause.to_string()),
            Err(other) => StepResult::Failed(other.to_string()),
        };
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

/// How a step ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepResult {
    /// An outer step ended before this one ran.
    NotRun,
    /// The unit of work started but has not returned.
    Running,
    /// The step returned `Ok` and its handle was finished successfully.
    Succeeded,
    /// Propagation rejected the step; its unit of work never ran.
    Rejected(String),
    /// The step or its finish failed.
    Failed(String),
    /// The step was unwound by a panic.
    Unwound,
}

/// What happened to one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// Position in the scenario, outermost 0.
    pub index: usize,
    /// The step as written in a script.
    pub step: String,
    /// Kind of handle the step ran with, `None` without a transaction.
    pub handle: Option<String>,
    /// Savepoint the step created.
    pub savepoint: Option<String>,
    /// Outcome.
    pub result: StepResult,
}

impl StepReport {
    fn pending(index: usize, step: &Step) -> Self {
        Self {
            index,
            step: step.to_string(),
            handle: None,
            savepoint: None,
            result: StepResult::NotRun,
        }
    }
}

/// Result of [`Scenario::run`].
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Per-step outcomes, outermost first.
    pub steps: Vec<StepReport>,
    /// Recorded database events, rendered.
    pub log: Vec<String>,
    /// Number of real commits.
    pub commits: usize,
    /// Number of real rollbacks.
    pub rollbacks: usize,
    /// Whether a step panicked.
    pub panicked: bool,
    /// Recorded database events.
    #[serde(skip)]
    pub events: Vec<Event>,
}

impl ScenarioReport {
    /// Serializes the report as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer's failure.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
