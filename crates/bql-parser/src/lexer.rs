//! BQL tokenizer built on Logos.
//!
//! Logos produces raw tokens which [`tokenize`] then classifies: words
//! become keywords or identifiers through a static case-insensitive keyword
//! table, digit runs become integers, decimals or dates, and `%` becomes
//! either the modulo operator or a query placeholder.

use logos::{Logos, Skip};
use std::fmt;

use crate::error::{LexError, LexErrorKind};
use crate::span::Span;

/// A BQL keyword.
///
/// Keywords match case-insensitively. The contextual ones (see
/// [`Keyword::is_reserved`]) may also be used as identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Keyword {
    /// `SELECT`
    Select,
    /// `DISTINCT`
    Distinct,
    /// `FROM`
    From,
    /// `WHERE`
    Where,
    /// `GROUP`
    Group,
    /// `BY`
    By,
    /// `HAVING`
    Having,
    /// `ORDER`
    Order,
    /// `ASC`
    Asc,
    /// `DESC`
    Desc,
    /// `PIVOT`
    Pivot,
    /// `LIMIT`
    Limit,
    /// `AS`
    As,
    /// `AND`
    And,
    /// `OR`
    Or,
    /// `NOT`
    Not,
    /// `IN`
    In,
    /// `IS`
    Is,
    /// `NULL`
    Null,
    /// `TRUE`
    True,
    /// `FALSE`
    False,
    /// `BALANCES`
    Balances,
    /// `JOURNAL`
    Journal,
    /// `PRINT`
    Print,
    /// `BETWEEN`
    Between,
    /// `AT`
    At,
    /// `OPEN`
    Open,
    /// `CLOSE`
    Close,
    /// `CLEAR`
    Clear,
    /// `ON`
    On,
}

impl Keyword {
    /// Every keyword, in declaration order.
    pub const ALL: [Self; 30] = [
        Self::Select,
        Self::Distinct,
        Self::From,
        Self::Where,
        Self::Group,
        Self::By,
        Self::Having,
        Self::Order,
        Self::Asc,
        Self::Desc,
        Self::Pivot,
        Self::Limit,
        Self::As,
        Self::And,
        Self::Or,
        Self::Not,
        Self::In,
        Self::Is,
        Self::Null,
        Self::True,
        Self::False,
        Self::Balances,
        Self::Journal,
        Self::Print,
        Self::Between,
        Self::At,
        Self::Open,
        Self::Close,
        Self::Clear,
        Self::On,
    ];

    /// The canonical upper-case spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Distinct => "DISTINCT",
            Self::From => "FROM",
            Self::Where => "WHERE",
            Self::Group => "GROUP",
            Self::By => "BY",
            Self::Having => "HAVING",
            Self::Order => "ORDER",
            Self::Asc => "ASC",
            Self::Desc => "DESC",
            Self::Pivot => "PIVOT",
            Self::Limit => "LIMIT",
            Self::As => "AS",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::In => "IN",
            Self::Is => "IS",
            Self::Null => "NULL",
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::Balances => "BALANCES",
            Self::Journal => "JOURNAL",
            Self::Print => "PRINT",
            Self::Between => "BETWEEN",
            Self::At => "AT",
            Self::Open => "OPEN",
            Self::Close => "CLOSE",
            Self::Clear => "CLEAR",
            Self::On => "ON",
        }
    }

    /// Look up a word in the keyword table, ignoring case.
    pub fn lookup(word: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kw| kw.as_str().eq_ignore_ascii_case(word))
    }

    /// Whether the keyword can never be used as an identifier.
    ///
    /// `OPEN`, `CLOSE`, `CLEAR`, `ON`, `AT` and `BETWEEN` are only keywords
    /// where the grammar asks for them.
    pub const fn is_reserved(self) -> bool {
        !matches!(
            self,
            Self::Between | Self::At | Self::Open | Self::Close | Self::Clear | Self::On
        )
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operators and punctuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symbol {
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `~`
    Tilde,
    /// `!~`
    NotTilde,
}

impl Symbol {
    /// The symbol as written in a query.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Comma => ",",
            Self::Dot => ".",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Tilde => "~",
            Self::NotTilde => "!~",
        }
    }
}

/// A classified BQL token.
///
/// Literal variants borrow their source text unchanged; strings keep their
/// quotes and table references keep their `#`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'src> {
    /// A keyword such as `SELECT` or `open`.
    Keyword(Keyword),
    /// A column, function or alias name.
    Ident(&'src str),
    /// An integer literal like `42`.
    Integer(&'src str),
    /// A decimal literal like `17.`, `.345` or `1.5`.
    Decimal(&'src str),
    /// A date literal like `2014-01-01`.
    Date(&'src str),
    /// A single- or double-quoted string, quotes included.
    String(&'src str),
    /// A table reference `#name`, or `#` for the default table.
    Table(&'src str),
    /// `%s` (no name) or `%(name)s`.
    Placeholder(Option<&'src str>),
    /// An operator or punctuation symbol.
    Symbol(Symbol),
    /// End of the query text.
    Eof,
}

impl Token<'_> {
    /// Whether this token can start a literal constant.
    pub const fn is_literal(&self) -> bool {
        matches!(
            self,
            Self::Integer(_)
                | Self::Decimal(_)
                | Self::Date(_)
                | Self::String(_)
                | Self::Keyword(Keyword::Null | Keyword::True | Keyword::False)
        )
    }

    /// Whether this token can be used as a name.
    pub const fn is_identifier(&self) -> bool {
        match self {
            Self::Ident(_) => true,
            Self::Keyword(kw) => !kw.is_reserved(),
            _ => false,
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keyword(kw) => write!(f, "`{kw}`"),
            Self::Ident(s)
            | Self::Integer(s)
            | Self::Decimal(s)
            | Self::Date(s)
            | Self::String(s)
            | Self::Table(s) => write!(f, "`{s}`"),
            Self::Placeholder(None) => f.write_str("`%s`"),
            Self::Placeholder(Some(name)) => write!(f, "`%({name})s`"),
            Self::Symbol(sym) => write!(f, "`{}`", sym.as_str()),
            Self::Eof => f.write_str("end of input"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Numeric {
    Integer,
    Decimal,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum RawError {
    #[default]
    Unrecognized,
    UnterminatedString,
    UnterminatedComment,
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(error = RawError)]
enum RawToken<'src> {
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Word(&'src str),

    #[regex(r"[0-9]+", number)]
    Number(Numeric),

    #[regex(r"\.[0-9]+")]
    Fraction(&'src str),

    #[token("'", |lex| quoted(lex, '\''))]
    #[token("\"", |lex| quoted(lex, '"'))]
    Quoted(&'src str),

    #[regex(r"#([a-zA-Z_][a-zA-Z0-9_]*)?")]
    Table(&'src str),

    #[token("%")]
    Percent,

    #[token("/*", block_comment)]
    BlockComment,

    // `;` starts a comment that runs to the end of the line.
    #[regex(r";[^\n]*", logos::skip)]
    LineComment,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("=")]
    Eq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("~")]
    Tilde,
    #[token("!~")]
    NotTilde,
}

/// Extend a digit run into a date (`YYYY-MM-DD`) or a decimal (`17.`, `1.5`).
fn number<'src>(lex: &mut logos::Lexer<'src, RawToken<'src>>) -> Numeric {
    let rest = lex.remainder().as_bytes();
    if lex.slice().len() == 4 && is_date_tail(rest) {
        lex.bump(6);
        return Numeric::Date;
    }
    if rest.first() == Some(&b'.') {
        let fraction = rest[1..].iter().take_while(|b| b.is_ascii_digit()).count();
        lex.bump(1 + fraction);
        return Numeric::Decimal;
    }
    Numeric::Integer
}

fn is_date_tail(rest: &[u8]) -> bool {
    matches!(
        rest,
        [b'-', m1, m2, b'-', d1, d2, ..]
            if [m1, m2, d1, d2].iter().all(|b| b.is_ascii_digit())
    )
}

fn quoted<'src>(
    lex: &mut logos::Lexer<'src, RawToken<'src>>,
    quote: char,
) -> Result<&'src str, RawError> {
    let rest = lex.remainder();
    match rest.find(quote) {
        Some(end) => {
            lex.bump(end + 1);
            Ok(lex.slice())
        }
        None => {
            lex.bump(rest.len());
            Err(RawError::UnterminatedString)
        }
    }
}

/// Match the rest of a `%s` or `%(name)s` placeholder after its `%`.
///
/// Returns the number of bytes to consume and the name, if any.
fn placeholder(rest: &str) -> Option<(usize, Option<&str>)> {
    if let Some(after) = rest.strip_prefix('s') {
        if !after.starts_with(is_word_char) {
            return Some((1, None));
        }
    }
    let inner = rest.strip_prefix('(')?;
    let len = word_len(inner);
    (len > 0 && inner[len..].starts_with(")s")).then(|| (len + 3, Some(&inner[..len])))
}

fn block_comment<'src>(lex: &mut logos::Lexer<'src, RawToken<'src>>) -> Result<Skip, RawError> {
    let rest = lex.remainder();
    match rest.find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            Ok(Skip)
        }
        None => {
            lex.bump(rest.len());
            Err(RawError::UnterminatedComment)
        }
    }
}

const fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Length of the identifier at the start of `text`, or 0 if there is none.
fn word_len(text: &str) -> usize {
    if !text.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        return 0;
    }
    text.find(|c: char| !is_word_char(c)).unwrap_or(text.len())
}

fn classify<'src>(raw: RawToken<'src>, slice: &'src str) -> Option<Token<'src>> {
    let token = match raw {
        RawToken::Word(word) => Keyword::lookup(word).map_or(Token::Ident(word), Token::Keyword),
        RawToken::Number(Numeric::Integer) => Token::Integer(slice),
        RawToken::Number(Numeric::Decimal) | RawToken::Fraction(_) => Token::Decimal(slice),
        RawToken::Number(Numeric::Date) => Token::Date(slice),
        RawToken::Quoted(text) => Token::String(text),
        RawToken::Table(text) => Token::Table(text),
        RawToken::Percent => Token::Symbol(Symbol::Percent),
        RawToken::BlockComment | RawToken::LineComment => return None,
        RawToken::LParen => Token::Symbol(Symbol::LParen),
        RawToken::RParen => Token::Symbol(Symbol::RParen),
        RawToken::LBracket => Token::Symbol(Symbol::LBracket),
        RawToken::RBracket => Token::Symbol(Symbol::RBracket),
        RawToken::Comma => Token::Symbol(Symbol::Comma),
        RawToken::Dot => Token::Symbol(Symbol::Dot),
        RawToken::Star => Token::Symbol(Symbol::Star),
        RawToken::Slash => Token::Symbol(Symbol::Slash),
        RawToken::Plus => Token::Symbol(Symbol::Plus),
        RawToken::Minus => Token::Symbol(Symbol::Minus),
        RawToken::Eq => Token::Symbol(Symbol::Eq),
        RawToken::NotEq => Token::Symbol(Symbol::NotEq),
        RawToken::Lt => Token::Symbol(Symbol::Lt),
        RawToken::LtEq => Token::Symbol(Symbol::LtEq),
        RawToken::Gt => Token::Symbol(Symbol::Gt),
        RawToken::GtEq => Token::Symbol(Symbol::GtEq),
        RawToken::Tilde => Token::Symbol(Symbol::Tilde),
        RawToken::NotTilde => Token::Symbol(Symbol::NotTilde),
    };
    Some(token)
}

/// Whether a `%` right after `token` can only be the modulo operator.
const fn ends_operand(token: &Token<'_>) -> bool {
    matches!(
        token,
        Token::Ident(_)
            | Token::Integer(_)
            | Token::Decimal(_)
            | Token::Date(_)
            | Token::String(_)
            | Token::Table(_)
            | Token::Placeholder(_)
            | Token::Keyword(Keyword::Null | Keyword::True | Keyword::False)
            | Token::Symbol(Symbol::RParen | Symbol::RBracket)
    )
}

/// Tokenize a query into `(Token, Span)` pairs.
///
/// Whitespace and comments are dropped. `%s` and `%(name)s` are
/// placeholders wherever an operand may start and `%` is modulo elsewhere.
/// The returned vector always ends
/// with a [`Token::Eof`] whose span is empty and sits at the end of the
/// source.
pub fn tokenize(source: &str) -> Result<Vec<(Token<'_>, Span)>, LexError> {
    let mut tokens: Vec<(Token<'_>, Span)> = Vec::new();
    let mut lexer = RawToken::lexer(source);

    while let Some(result) = lexer.next() {
        let span = Span::from(lexer.span());
        match result {
            // After an operand `%` is the modulo operator, so `a %s` is `a % s`.
            Ok(RawToken::Percent) if !tokens.last().is_some_and(|(t, _)| ends_operand(t)) => {
                if let Some((len, name)) = placeholder(lexer.remainder()) {
                    lexer.bump(len);
                    tokens.push((Token::Placeholder(name), Span::from(lexer.span())));
                } else {
                    tokens.push((Token::Symbol(Symbol::Percent), span));
                }
            }
            Ok(raw) => tokens.extend(classify(raw, lexer.slice()).map(|token| (token, span))),
            Err(err) => {
                let kind = match err {
                    RawError::UnterminatedString => LexErrorKind::UnterminatedString,
                    RawError::UnterminatedComment => LexErrorKind::UnterminatedComment,
                    RawError::Unrecognized => {
                        let c = span.text(source).chars().next().unwrap_or('\0');
                        return Err(LexError::new(
                            LexErrorKind::UnexpectedChar(c),
                            Span::new(span.start, span.start + c.len_utf8()),
                            source,
                        ));
                    }
                };
                return Err(LexError::new(kind, span, source));
            }
        }
    }

    tokens.push((Token::Eof, Span::new(source.len(), source.len())));
    Ok(tokens)
}
