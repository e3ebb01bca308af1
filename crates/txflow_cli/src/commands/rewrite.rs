//! Rewrite command - previews how a statement with named parameters is
//! sent to the database.

use super::{parse_params, CliError, Format};
use serde::Serialize;
use txflow_sql::{Placeholder, Rewriter};

/// Rewrite output.
#[derive(Debug, Serialize)]
struct RewriteOutput {
    placeholder: String,
    statement: String,
    args: Vec<String>,
    unbound: Vec<String>,
}

/// Runs the rewrite command.
pub fn run(
    statement: &str,
    params: &[String],
    placeholder: &str,
    strict: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = render(statement, params, placeholder, strict, Format::parse(format)?)?;
    println!("{output}");
    Ok(())
}

fn render(
    statement: &str,
    params: &[String],
    placeholder: &str,
    strict: bool,
    format: Format,
) -> Result<String, Box<dyn std::error::Error>> {
    let placeholder = Placeholder::parse(placeholder)
        .ok_or_else(|| CliError::UnknownPlaceholder(placeholder.to_string()))?;
    let params = parse_params(params)?;
    let rewriter = Rewriter::new(placeholder);

    let rewritten = if strict {
        rewriter.rewrite_strict(statement, &params)?
    } else {
        rewriter.rewrite(statement, &params)
    };

    let mut unbound: Vec<String> = Vec::new();
    for name in Rewriter::names(statement) {
        if !params.contains(&name) && !unbound.contains(&name) {
            unbound.push(name);
        }
    }

    let output = RewriteOutput {
        placeholder: placeholder.to_string(),
        statement: rewritten.statement,
        args: rewritten.args.iter().map(ToString::to_string).collect(),
        unbound,
    };

    Ok(match format {
        Format::Json => serde_json::to_string_pretty(&output)?,
        Format::Text => text(&output),
    })
}

fn text(output: &RewriteOutput) -> String {
    let mut out = format!("{}\n", output.statement);
    for (i, arg) in output.args.iter().enumerate() {
        out.push_str(&format!("  {}: {}\n", i + 1, arg));
    }
    if !output.unbound.is_empty() {
        out.push_str(&format!("unbound: {}\n", output.unbound.join(", ")));
    }
    out.pop();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn text_lists_arguments() {
        let out = render(
            "SELECT * FROM t WHERE kind = :kind LIMIT :limit",
            &params(&["kind=test", "limit=10"]),
            "dollar",
            false,
            Format::Text,
        )
        .unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "SELECT * FROM t WHERE kind = $1 LIMIT $2");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("  1: "));
    }

    #[test]
    fn text_reports_unbound_names() {
        let out = render("a = :a, b = :b", &[], "question", false, Format::Text).unwrap();
        assert_eq!(out, "a = :a, b = :b\nunbound: a, b");
    }

    #[test]
    fn strict_fails_on_unbound() {
        let err = render("a = :a", &[], "dollar", true, Format::Text).unwrap_err();
        assert_eq!(err.to_string(), "unbound parameter :a");
    }

    #[test]
    fn unknown_placeholder() {
        let err = render("a", &[], "percent", false, Format::Text).unwrap_err();
        assert!(err.to_string().contains("percent"));
    }

    #[test]
    fn json_output() {
        let out = render("x = :x", &params(&["x=1"]), "atp", false, Format::Json).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["placeholder"], "atp");
        assert_eq!(json["statement"], "x = @p1");
        assert_eq!(json["args"].as_array().map(Vec::len), Some(1));
        assert_eq!(json["unbound"].as_array().map(Vec::len), Some(0));
    }
}
