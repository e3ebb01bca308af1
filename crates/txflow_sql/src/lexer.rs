//! Tokenizer shared by the parameter rewriter and templates.
//!
//! A backslash makes the next character literal and is itself dropped; a
//! trailing backslash is dropped. Everything that is not a parameter or a
//! field comes out one character at a time.

use std::iter::Peekable;
use std::str::CharIndices;

/// What the lexer looks for besides plain characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// `:name` parameters and `::` casts.
    Params,
    /// `{name}` fields.
    Template,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    /// A literal character.
    Char(char),
    /// `:name`.
    Param(&'a str),
    /// `::`, kept verbatim so casts never become parameters.
    Cast,
    /// `{name}`.
    Field(String),
}

pub(crate) struct Lexer<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
    mode: Mode,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(src: &'a str, mode: Mode) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
            mode,
        }
    }

    /// Lexes what follows a `:` at byte offset `pos`.
    fn colon(&mut self, pos: usize) -> Token<'a> {
        if self.chars.next_if(|&(_, c)| c == ':').is_some() {
            return Token::Cast;
        }
        let start = pos + 1;
        let mut end = start;
        while let Some((i, c)) = self.chars.next_if(|&(_, c)| is_name_char(c)) {
            end = i + c.len_utf8();
        }
        if end == start {
            Token::Char(':')
        } else {
            Token::Param(&self.src[start..end])
        }
    }

    /// Lexes what follows a `{`. An unclosed or empty field is a literal
    /// brace and lexing resumes right after it.
    fn field(&mut self) -> Token<'a> {
        let mut probe = self.chars.clone();
        let mut name = String::new();
        loop {
            match probe.next() {
                None | Some((_, '{')) => return Token::Char('{'),
                Some((_, '}')) if name.is_empty() => return Token::Char('{'),
                Some((_, '}')) => break,
                Some((_, '\\')) => match probe.next() {
                    Some((_, c)) => name.push(c),
                    None => return Token::Char('{'),
                },
                Some((_, c)) => name.push(c),
            }
        }
        self.chars = probe;
        Token::Field(name)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let (pos, c) = self.chars.next()?;
        let token = match c {
            '\\' => Token::Char(self.chars.next()?.1),
            ':' if self.mode == Mode::Params => self.colon(pos),
            '{' if self.mode == Mode::Template => self.field(),
            c => Token::Char(c),
        };
        Some(token)
    }
}

/// Returns true for characters allowed in parameter names.
pub(crate) fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
