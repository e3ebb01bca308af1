//! CLI command implementations.

pub mod rewrite;
pub mod simulate;
pub mod template;

use thiserror::Error;
use txflow_core::Value;
use txflow_sql::Params;

/// Errors raised while reading command arguments.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    /// A `-p` argument without `=` or with an empty name.
    #[error("invalid parameter '{0}', expected name=value")]
    InvalidParam(String),

    /// Unknown placeholder dialect.
    #[error("unknown placeholder '{0}', expected one of: dollar, question, colon, atp")]
    UnknownPlaceholder(String),

    /// Unknown isolation level.
    #[error("unknown isolation level '{0}'")]
    UnknownIsolation(String),

    /// Unknown fault name.
    #[error("unknown fault '{0}', expected one of: begin, commit, rollback, savepoint")]
    UnknownFault(String),

    /// Unknown output format.
    #[error("unknown format '{0}', expected text or json")]
    UnknownFormat(String),
}

/// Output format shared by the commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

impl Format {
    pub fn parse(s: &str) -> Result<Self, CliError> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(CliError::UnknownFormat(s.to_string())),
        }
    }
}

/// Parses `name=value` arguments into a parameter set.
///
/// Later bindings of a name replace earlier ones.
pub fn parse_params(args: &[String]) -> Result<Params, CliError> {
    let mut params = Params::new();
    for arg in args {
        let (name, value) = arg
            .split_once('=')
            .filter(|(name, _)| !name.trim().is_empty())
            .ok_or_else(|| CliError::InvalidParam(arg.clone()))?;
        params.insert(name.trim(), parse_value(value));
    }
    Ok(params)
}

/// Reads a command-line value: integers, floats, `true`, `false` and
/// `null` are typed, anything else is text. Quoting with `'` forces text.
pub fn parse_value(s: &str) -> Value {
    if let Some(text) = s
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        return Value::Text(text.to_string());
    }
    match s {
        "null" | "NULL" => return Value::Null,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = s.parse::<i64>() {
        return Value::Int(n);
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::Float(f),
        _ => Value::Text(s.to_string()),
    }
}
