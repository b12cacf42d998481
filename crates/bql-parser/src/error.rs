//! BQL error types.

use std::fmt;

use ariadne::{Config, IndexType, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::lexer::{Keyword, Symbol};
use crate::span::{Location, Span};

/// Error returned when parsing a BQL query fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The query text could not be tokenized.
    #[error(transparent)]
    Lex(#[from] LexError),
    /// The tokens do not form a valid statement.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

impl ParseError {
    /// Byte span of the offending input.
    pub const fn span(&self) -> Span {
        match self {
            Self::Lex(err) => err.span,
            Self::Syntax(err) => err.span,
        }
    }

    /// Line and column of the offending input.
    pub const fn location(&self) -> Location {
        match self {
            Self::Lex(err) => err.location,
            Self::Syntax(err) => err.location,
        }
    }

    /// The error message without position information.
    pub fn message(&self) -> String {
        match self {
            Self::Lex(err) => err.kind.to_string(),
            Self::Syntax(err) => err.kind.to_string(),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Lex(err) => match err.kind {
                LexErrorKind::UnexpectedChar(_) => "not valid in a query",
                LexErrorKind::UnterminatedString => "string starts here",
                LexErrorKind::UnterminatedComment => "comment starts here",
            },
            Self::Syntax(err) => match err.kind {
                SyntaxErrorKind::Unexpected { .. } => "unexpected token",
                SyntaxErrorKind::ChainedComparison => "second comparison",
                SyntaxErrorKind::PivotArity => "PIVOT BY needs two keys",
                SyntaxErrorKind::InvalidDate(_) => "not a calendar date",
                SyntaxErrorKind::InvalidNumber(_) => "out of range",
                SyntaxErrorKind::TooDeep(_) => "nesting limit reached here",
            },
        }
    }

    /// Render a diagnostic with the offending span labelled in `source`.
    ///
    /// `name` identifies the query in the report header, e.g. `"<query>"`.
    /// The output carries no terminal colour codes.
    pub fn report(&self, source: &str, name: &str) -> String {
        let span = self.span();
        let config = Config::default()
            .with_color(false)
            .with_compact(false)
            .with_index_type(IndexType::Byte);
        let mut builder = Report::build(ReportKind::Error, (name, span.into_range()))
            .with_message(self.message())
            .with_config(config);
        if span.is_empty() {
            builder = builder.with_note(format!("at {}", self.location()));
        } else {
            builder = builder.with_label(Label::new((name, span.into_range())).with_message(self.label()));
        }

        let mut out = Vec::new();
        if builder
            .finish()
            .write((name, Source::from(source)), &mut out)
            .is_err()
        {
            return self.to_string();
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}

/// A failure to tokenize the query text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at line {}, column {}", .location.line, .location.column)]
pub struct LexError {
    /// What went wrong.
    pub kind: LexErrorKind,
    /// Byte span of the offending input.
    pub span: Span,
    /// Line and column of the span start.
    pub location: Location,
}

impl LexError {
    /// Create a lex error, computing its location in `source`.
    pub fn new(kind: LexErrorKind, span: Span, source: &str) -> Self {
        Self {
            kind,
            span,
            location: Location::of(source, span.start),
        }
    }
}

/// The kind of lex error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    /// A character that starts no token.
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),
    /// A string literal without its closing quote.
    #[error("unterminated string literal")]
    UnterminatedString,
    /// A `/*` comment without its closing `*/`.
    #[error("unterminated block comment")]
    UnterminatedComment,
}

/// A token sequence that does not match the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at line {}, column {}", .location.line, .location.column)]
pub struct SyntaxError {
    /// What went wrong.
    pub kind: SyntaxErrorKind,
    /// Byte span of the offending token.
    pub span: Span,
    /// Line and column of the span start.
    pub location: Location,
}

impl SyntaxError {
    /// Create a syntax error, computing its location in `source`.
    pub fn new(kind: SyntaxErrorKind, span: Span, source: &str) -> Self {
        Self {
            kind,
            span,
            location: Location::of(source, span.start),
        }
    }
}

/// The kind of syntax error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxErrorKind {
    /// The token found matches none of the items the grammar allows here.
    #[error("expected {}, got {found}", format_expected(.expected))]
    Unexpected {
        /// Everything that would have been accepted, sorted.
        expected: Vec<Expected>,
        /// Description of the token actually found.
        found: String,
    },
    /// `a < b < c` and similar.
    #[error("comparison operators cannot be chained")]
    ChainedComparison,
    /// `PIVOT BY` with fewer or more than two keys.
    #[error("PIVOT BY takes exactly two columns")]
    PivotArity,
    /// A date literal that is not a valid calendar date.
    #[error("invalid date {0}")]
    InvalidDate(String),
    /// A number literal that does not fit its type.
    #[error("number {0} is out of range")]
    InvalidNumber(String),
    /// Expressions or subselects nested past the configured limit.
    #[error("query nested deeper than {0} levels")]
    TooDeep(usize),
}

/// An item the parser would have accepted at an error position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Expected {
    /// A specific keyword.
    Keyword(Keyword),
    /// A specific operator or punctuation symbol.
    Symbol(Symbol),
    /// Any expression.
    Expression,
    /// A column, function or alias name.
    Identifier,
    /// An integer literal.
    Integer,
    /// A date literal.
    Date,
    /// A string literal.
    String,
    /// A constant inside a literal list.
    Literal,
    /// A `#table` reference.
    Table,
    /// The end of the query.
    EndOfInput,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keyword(kw) => write!(f, "`{}`", kw.as_str()),
            Self::Symbol(sym) => write!(f, "`{}`", sym.as_str()),
            Self::Expression => f.write_str("expression"),
            Self::Identifier => f.write_str("identifier"),
            Self::Integer => f.write_str("integer"),
            Self::Date => f.write_str("date"),
            Self::String => f.write_str("string"),
            Self::Literal => f.write_str("literal"),
            Self::Table => f.write_str("table"),
            Self::EndOfInput => f.write_str("end of input"),
        }
    }
}

fn format_expected(expected: &[Expected]) -> String {
    let items: Vec<String> = expected.iter().map(ToString::to_string).collect();
    match items.split_last() {
        None => "nothing".to_string(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} or {last}", rest.join(", ")),
    }
}
