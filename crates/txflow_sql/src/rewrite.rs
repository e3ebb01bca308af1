//! Named parameter rewriting.

use crate::error::{RewriteError, RewriteResult};
use crate::lexer::{Lexer, Mode, Token};
use crate::params::Params;
use crate::placeholder::Placeholder;
use txflow_core::Value;

/// A statement with positional placeholders and its arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rewritten {
    /// Statement text.
    pub statement: String,
    /// Arguments, one per placeholder.
    pub args: Vec<Value>,
}

/// Turns `:name` parameters into positional placeholders.
///
/// Bound names become the next placeholder and their value is appended to
/// the arguments; a name used twice binds twice. Unbound names stay as
/// written. A lone `:` and `::` casts are kept, and a backslash makes the
/// next character literal.
///
/// # Example
///
/// ```rust
/// use txflow_sql::{Params, Placeholder, Rewriter};
///
/// let params = Params::new().with("kind", "test").with("limit", 10);
/// let out = Rewriter::new(Placeholder::Dollar)
///     .rewrite("SELECT id FROM t WHERE kind = :kind LIMIT :limit", &params);
/// assert_eq!(out.statement, "SELECT id FROM t WHERE kind = $1 LIMIT $2");
/// assert_eq!(out.args.len(), 2);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rewriter {
    placeholder: Placeholder,
}

impl Rewriter {
    /// Creates a rewriter for `placeholder`.
    #[must_use]
    pub const fn new(placeholder: Placeholder) -> Self {
        Self { placeholder }
    }

    /// Placeholder dialect.
    #[must_use]
    pub const fn placeholder(&self) -> Placeholder {
        self.placeholder
    }

    /// Rewrites `statement`, leaving unbound names in place.
    #[must_use]
    pub fn rewrite(&self, statement: &str, params: &Params) -> Rewritten {
        let mut out = Rewritten {
            statement: String::with_capacity(statement.len()),
            args: Vec::with_capacity(params.len()),
        };
        for token in Lexer::new(statement, Mode::Params) {
            match token {
                Token::Param(name) => match params.get(name) {
                    Some(value) => {
                        out.statement
                            .push_str(&self.placeholder.render(out.args.len()));
                        out.args.push(value.clone());
                    }
                    None => {
                        out.statement.push(':');
                        out.statement.push_str(name);
                    }
                },
                Token::Cast => out.statement.push_str("::"),
                Token::Char(c) => out.statement.push(c),
                Token::Field(name) => {
                    out.statement.push('{');
                    out.statement.push_str(&name);
                    out.statement.push('}');
                }
            }
        }
        out
    }

    /// Rewrites `statement`, requiring every name to be bound.
    ///
    /// # Errors
    ///
    /// Returns [`RewriteError::Unbound`] for the first unbound name.
    pub fn rewrite_strict(&self, statement: &str, params: &Params) -> RewriteResult<Rewritten> {
        if let Some(name) = Self::names(statement)
            .into_iter()
            .find(|name| !params.contains(name))
        {
            return Err(RewriteError::Unbound(name));
        }
        Ok(self.rewrite(statement, params))
    }

    /// Names referenced by `statement`, in order of appearance.
    #[must_use]
    pub fn names(statement: &str) -> Vec<String> {
        Lexer::new(statement, Mode::Params)
            .filter_map(|token| match token {
                Token::Param(name) => Some(name.to_string()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dollar(statement: &str, params: &Params) -> Rewritten {
        Rewriter::new(Placeholder::Dollar).rewrite(statement, params)
    }

    #[test]
    fn rewrites_bound_names_in_order() {
        let params = Params::new().with("type", "test").with("now", 1_700_000_000_i64);
        let out = dollar(
            "select id, name from table where type = :type and created_at < :now",
            &params,
        );
        assert_eq!(
            out.statement,
            "select id, name from table where type = $1 and created_at < $2"
        );
        assert_eq!(
            out.args,
            vec![Value::from("test"), Value::Int(1_700_000_000)]
        );
    }

    #[test]
    fn repeated_name_binds_twice() {
        let params = Params::new().with("id", 7);
        let out = dollar("a = :id OR b = :id", &params);
        assert_eq!(out.statement, "a = $1 OR b = $2");
        assert_eq!(out.args, vec![Value::Int(7), Value::Int(7)]);
    }

    #[test]
    fn unbound_names_are_kept() {
        let params = Params::new().with("a", 1);
        let out = dollar("x = :a AND y = :b", &params);
        assert_eq!(out.statement, "x = $1 AND y = :b");
        assert_eq!(out.args.len(), 1);
    }

    #[test]
    fn casts_and_lone_colons_survive() {
        let params = Params::new().with("int", 1).with("v", "x");
        let out = dollar("SELECT :v::int, 'a : b'", &params);
        assert_eq!(out.statement, "SELECT $1::int, 'a : b'");
        assert_eq!(out.args, vec![Value::from("x")]);
    }

    #[test]
    fn escaped_colon_is_literal() {
        let params = Params::new().with("id", 1);
        let out = dollar(r"SELECT '\:id', :id", &params);
        assert_eq!(out.statement, "SELECT ':id', $1");
        assert_eq!(out.args.len(), 1);
    }

    #[test]
    fn dialects() {
        let params = Params::new().with("a", 1).with("b", 2);
        let cases = [
            (Placeholder::Dollar, "$1, $2"),
            (Placeholder::Question, "?, ?"),
            (Placeholder::Colon, ":1, :2"),
            (Placeholder::AtP, "@p1, @p2"),
        ];
        for (placeholder, expected) in cases {
            let out = Rewriter::new(placeholder).rewrite(":a, :b", &params);
            assert_eq!(out.statement, expected);
        }
    }

    #[test]
    fn names_in_order() {
        assert_eq!(
            Rewriter::names("x = :a AND y = :b::text OR z = :a"),
            vec!["a", "b", "a"]
        );
        assert!(Rewriter::names("SELECT 1").is_empty());
    }

    #[test]
    fn strict_reports_unbound() {
        let rewriter = Rewriter::default();
        let params = Params::new().with("a", 1);
        assert_eq!(
            rewriter.rewrite_strict(":a, :missing", &params),
            Err(RewriteError::Unbound("missing".into()))
        );
        assert!(rewriter.rewrite_strict(":a", &params).is_ok());
    }

    #[test]
    fn statement_without_params_is_unchanged() {
        let out = dollar("SELECT now()", &Params::new());
        assert_eq!(out.statement, "SELECT now()");
        assert!(out.args.is_empty());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn text_without_specials_is_unchanged(s in "[^:\\\\]*") {
                let out = dollar(&s, &Params::new().with("x", 1));
                prop_assert_eq!(out.statement, s);
                prop_assert!(out.args.is_empty());
            }

            #[test]
            fn one_arg_per_bound_reference(names in prop::collection::vec("[a-c]", 0..10)) {
                let statement: Vec<String> = names.iter().map(|n| format!(":{n}")).collect();
                let statement = statement.join(" ");
                let params = Params::new().with("a", 1).with("b", 2);
                let out = dollar(&statement, &params);
                let bound = names.iter().filter(|n| *n != "c").count();
                prop_assert_eq!(out.args.len(), bound);
                prop_assert_eq!(Rewriter::names(&statement), names);
            }
        }
    }
}
