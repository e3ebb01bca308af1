//! Positional placeholder dialects.

use std::fmt;

/// Spelling of positional placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Placeholder {
    /// `$1`, `$2`, ... (PostgreSQL).
    #[default]
    Dollar,
    /// `?` (MySQL, SQLite).
    Question,
    /// `:1`, `:2`, ... (Oracle).
    Colon,
    /// `@p1`, `@p2`, ... (SQL Server).
    AtP,
}

impl Placeholder {
    /// All dialects.
    pub const ALL: [Self; 4] = [Self::Dollar, Self::Question, Self::Colon, Self::AtP];

    /// Placeholder for the argument at zero-based `index`.
    #[must_use]
    pub fn render(self, index: usize) -> String {
        let n = index + 1;
        match self {
            Self::Dollar => format!("${n}"),
            Self::Question => "?".to_string(),
            Self::Colon => format!(":{n}"),
            Self::AtP => format!("@p{n}"),
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dollar => "dollar",
            Self::Question => "question",
            Self::Colon => "colon",
            Self::AtP => "atp",
        }
    }

    /// Parses a dialect from its name, ignoring case.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
