//! Brace templates.
//!
//! `{name}` is replaced with the display form of the value bound to `name`.
//! Unknown names stay as `{name}`, an unclosed or empty `{` is literal, and a
//! backslash makes the next character literal.

use crate::lexer::{Lexer, Mode, Token};
use crate::params::Params;

/// Fills `template` with `values`.
///
/// ```rust
/// use txflow_sql::{template, Params};
///
/// let values = Params::new().with("table", "orders");
/// assert_eq!(template::format("DELETE FROM {table}", &values), "DELETE FROM orders");
/// ```
#[must_use]
pub fn format(template: &str, values: &Params) -> String {
    let mut out = String::with_capacity(template.len());
    for token in Lexer::new(template, Mode::Template) {
        match token {
            Token::Field(name) => match values.get(&name) {
                Some(value) => out.push_str(&value.to_string()),
                None => {
                    out.push('{');
                    out.push_str(&name);
                    out.push('}');
                }
            },
            Token::Char(c) => out.push(c),
            Token::Param(name) => {
                out.push(':');
                out.push_str(name);
            }
            Token::Cast => out.push_str("::"),
        }
    }
    out
}

/// Field names referenced by `template`, in order of appearance.
#[must_use]
pub fn params(template: &str) -> Vec<String> {
    Lexer::new(template, Mode::Template)
        .filter_map(|token| match token {
            Token::Field(name) => Some(name),
            _ => None,
        })
        .collect()
}
