//! Template command - fills `{name}` fields.

use super::parse_params;

/// Runs the template command.
pub fn run(template: &str, params: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let params = parse_params(params)?;
    let missing: Vec<String> = txflow_sql::template::params(template)
        .into_iter()
        .filter(|name| !params.contains(name))
        .collect();
    if !missing.is_empty() {
        tracing::warn!(fields = ?missing, "unbound template fields kept as written");
    }
    println!("{}", txflow_sql::template::format(template, &params));
    Ok(())
}
