//! BQL parser.
//!
//! A hand-written recursive descent parser over the tokens produced by
//! [`crate::lexer::tokenize`]. Each precedence level loops over its own
//! operators and descends to the next tighter level for operands. Optional
//! clauses are chosen on at most three tokens of lookahead and the parser
//! never backtracks: once a clause keyword or an operator has been consumed,
//! the rest of the production is required.
//!
//! On failure the error reports every item that would have been accepted at
//! the position where parsing stopped.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::ast::{
    Balances, BinaryOperator, Boundary, ColumnKey, Expr, FromClause, FromFilter,
    GroupBy, Journal, Literal, OrderBy, PivotBy, PivotKey, Placeholder, Print, QuoteStyle, Select,
    SortDirection, Statement, StringLiteral, Table, Target, Targets, UnaryOperator,
};
use crate::error::{Expected, ParseError, SyntaxError, SyntaxErrorKind};
use crate::lexer::{tokenize, Keyword, Symbol, Token};
use crate::span::{Span, Spanned};

/// Default limit on expression and subselect nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Options controlling how queries are parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum nesting of expressions and subselects before parsing fails
    /// with [`SyntaxErrorKind::TooDeep`].
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParseOptions {
    /// Create options with the default nesting limit.
    pub const fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Create options with a custom nesting limit.
    pub const fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

/// Parse a BQL query string.
///
/// # Errors
///
/// Returns a `ParseError` if the query text cannot be tokenized or does not
/// form exactly one statement.
pub fn parse(source: &str) -> Result<Statement, ParseError> {
    parse_with_options(source, &ParseOptions::default())
}

/// Parse a BQL query string with explicit options.
///
/// # Errors
///
/// Same as [`parse`].
pub fn parse_with_options(source: &str, options: &ParseOptions) -> Result<Statement, ParseError> {
    parse_spanned_with_options(source, options).map(Spanned::into_inner)
}

/// Parse a BQL query string, keeping the span of the statement.
///
/// The span runs from the first to the last token of the statement, so
/// surrounding whitespace and comments are not part of it.
///
/// # Errors
///
/// Same as [`parse`].
pub fn parse_spanned(source: &str) -> Result<Spanned<Statement>, ParseError> {
    parse_spanned_with_options(source, &ParseOptions::default())
}

fn parse_spanned_with_options(
    source: &str,
    options: &ParseOptions,
) -> Result<Spanned<Statement>, ParseError> {
    tracing::debug!("Parsing BQL query ({} bytes)", source.len());
    let tokens = match tokenize(source) {
        Ok(tokens) => tokens,
        Err(err) => {
            tracing::debug!("Failed to tokenize BQL query: {}", err);
            return Err(err.into());
        }
    };
    tracing::trace!("Tokenized BQL query into {} tokens", tokens.len());

    let mut parser = Parser::new(source, &tokens, options);
    match parser.parse_query() {
        Ok(statement) => {
            tracing::debug!("Parsed {} statement at {}", statement.value.kind(), statement.span);
            Ok(statement)
        }
        Err(err) => {
            tracing::debug!("Failed to parse BQL query: {}", err);
            Err(err.into())
        }
    }
}

type PResult<T> = Result<T, SyntaxError>;

enum Comparison {
    Binary(BinaryOperator),
    Null(UnaryOperator),
    Between,
}

struct Parser<'src, 't> {
    source: &'src str,
    tokens: &'t [(Token<'src>, Span)],
    pos: usize,
    depth: usize,
    max_depth: usize,
    /// Position of the furthest expectation recorded so far.
    furthest: usize,
    /// Everything that was tried at `furthest`.
    expected: BTreeSet<Expected>,
}

impl<'src, 't> Parser<'src, 't> {
    fn new(source: &'src str, tokens: &'t [(Token<'src>, Span)], options: &ParseOptions) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            depth: 0,
            max_depth: options.max_depth,
            furthest: 0,
            expected: BTreeSet::new(),
        }
    }

    // ===== Token access =====

    fn nth(&self, n: usize) -> (Token<'src>, Span) {
        self.tokens
            .get(self.pos + n)
            .or_else(|| self.tokens.last())
            .copied()
            .unwrap_or((Token::Eof, Span::new(self.source.len(), self.source.len())))
    }

    fn peek(&self) -> Token<'src> {
        self.nth(0).0
    }

    fn peek_nth(&self, n: usize) -> Token<'src> {
        self.nth(n).0
    }

    fn span(&self) -> Span {
        self.nth(0).1
    }

    /// Span of the last consumed token.
    fn prev_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or_else(|| self.span(), |&(_, span)| span)
    }

    fn bump(&mut self) {
        if self.peek() != Token::Eof {
            self.pos += 1;
        }
    }

    fn at(&self, symbol: Symbol) -> bool {
        self.peek() == Token::Symbol(symbol)
    }

    fn at_keyword(&self, keyword: Keyword) -> bool {
        self.peek() == Token::Keyword(keyword)
    }

    /// Record that `item` would be accepted at the current position.
    fn expect_here(&mut self, item: Expected) {
        match self.pos.cmp(&self.furthest) {
            Ordering::Greater => {
                self.furthest = self.pos;
                self.expected.clear();
                self.expected.insert(item);
            }
            Ordering::Equal => {
                self.expected.insert(item);
            }
            Ordering::Less => {}
        }
    }

    fn eat(&mut self, symbol: Symbol) -> bool {
        if self.at(symbol) {
            self.bump();
            true
        } else {
            self.expect_here(Expected::Symbol(symbol));
            false
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.at_keyword(keyword) {
            self.bump();
            true
        } else {
            self.expect_here(Expected::Keyword(keyword));
            false
        }
    }

    fn expect(&mut self, symbol: Symbol) -> PResult<()> {
        if self.eat(symbol) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> PResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    // ===== Errors =====

    /// An "unexpected token" error listing everything tried at the current
    /// position.
    fn unexpected(&self) -> SyntaxError {
        let (token, span) = self.nth(0);
        let expected = if self.furthest == self.pos {
            self.expected.iter().copied().collect()
        } else {
            Vec::new()
        };
        SyntaxError::new(
            SyntaxErrorKind::Unexpected {
                expected,
                found: token.to_string(),
            },
            span,
            self.source,
        )
    }

    fn fail(&mut self, item: Expected) -> SyntaxError {
        self.expect_here(item);
        self.unexpected()
    }

    fn error_at(&self, kind: SyntaxErrorKind, span: Span) -> SyntaxError {
        SyntaxError::new(kind, span, self.source)
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= self.max_depth {
            return Err(self.error_at(SyntaxErrorKind::TooDeep(self.max_depth), self.span()));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // ===== Statements =====

    fn parse_query(&mut self) -> PResult<Spanned<Statement>> {
        let start = self.span();
        let statement = self.parse_statement()?;
        let span = start.merge(&self.prev_span());
        if self.peek() != Token::Eof {
            return Err(self.fail(Expected::EndOfInput));
        }
        Ok(Spanned::new(statement, span))
    }

    fn parse_statement(&mut self) -> PResult<Statement> {
        match self.peek() {
            Token::Keyword(Keyword::Select) => self.parse_select().map(Statement::Select),
            Token::Keyword(Keyword::Balances) => self.parse_balances().map(Statement::Balances),
            Token::Keyword(Keyword::Journal) => self.parse_journal().map(Statement::Journal),
            Token::Keyword(Keyword::Print) => self.parse_print().map(Statement::Print),
            _ => {
                for keyword in [
                    Keyword::Select,
                    Keyword::Balances,
                    Keyword::Journal,
                    Keyword::Print,
                ] {
                    self.expect_here(Expected::Keyword(keyword));
                }
                Err(self.unexpected())
            }
        }
    }

    fn parse_select(&mut self) -> PResult<Select> {
        self.nested(|p| {
            p.expect_keyword(Keyword::Select)?;
            let distinct = p.eat_keyword(Keyword::Distinct);

            let targets = if p.eat(Symbol::Star) {
                Targets::Wildcard
            } else {
                Targets::List(p.parse_targets()?)
            };

            let from_clause = if p.eat_keyword(Keyword::From) {
                Some(p.parse_from_source()?)
            } else {
                None
            };

            let where_clause = if p.eat_keyword(Keyword::Where) {
                Some(p.parse_expr()?)
            } else {
                None
            };

            let group_by = if p.eat_keyword(Keyword::Group) {
                p.expect_keyword(Keyword::By)?;
                Some(p.parse_group_by()?)
            } else {
                None
            };

            let order_by = if p.eat_keyword(Keyword::Order) {
                p.expect_keyword(Keyword::By)?;
                Some(p.parse_order_by()?)
            } else {
                None
            };

            let pivot_by = if p.eat_keyword(Keyword::Pivot) {
                p.expect_keyword(Keyword::By)?;
                Some(p.parse_pivot_by()?)
            } else {
                None
            };

            let limit = if p.eat_keyword(Keyword::Limit) {
                Some(p.parse_limit()?)
            } else {
                None
            };

            Ok(Select {
                targets,
                distinct,
                from_clause,
                where_clause,
                group_by,
                order_by,
                pivot_by,
                limit,
            })
        })
    }

    fn parse_targets(&mut self) -> PResult<Vec<Target>> {
        let mut targets = vec![self.parse_target()?];
        while self.eat(Symbol::Comma) {
            targets.push(self.parse_target()?);
        }
        Ok(targets)
    }

    fn parse_target(&mut self) -> PResult<Target> {
        let start = self.span();
        let expr = self.parse_expr()?;
        let name = if self.eat_keyword(Keyword::As) {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        Ok(Target {
            expr,
            name,
            span: Some(start.merge(&self.prev_span())),
        })
    }

    fn parse_from_source(&mut self) -> PResult<FromClause> {
        match self.peek() {
            Token::Table(text) => {
                self.bump();
                let name = text.strip_prefix('#').unwrap_or(text);
                Ok(FromClause::Table(Table::new(name)))
            }
            Token::Symbol(Symbol::LParen)
                if self.peek_nth(1) == Token::Keyword(Keyword::Select) =>
            {
                self.bump();
                let select = self.parse_select()?;
                self.expect(Symbol::RParen)?;
                Ok(FromClause::Subselect(Box::new(select)))
            }
            _ => {
                self.expect_here(Expected::Table);
                self.parse_from_filter().map(FromClause::Filter)
            }
        }
    }

    /// `OPEN ON date [CLOSE [ON date]] [CLEAR]`, `CLOSE [ON date] [CLEAR]`,
    /// `CLEAR`, or `expr [OPEN ON date] [CLOSE [ON date]] [CLEAR]`.
    fn parse_from_filter(&mut self) -> PResult<FromFilter> {
        if self.eat_keyword(Keyword::Open) {
            let open = Some(self.parse_open_date()?);
            let close = self.parse_close()?;
            let clear = self.eat_keyword(Keyword::Clear);
            return Ok(FromFilter {
                expression: None,
                open,
                close,
                clear,
            });
        }
        if self.at_keyword(Keyword::Close) {
            let close = self.parse_close()?;
            let clear = self.eat_keyword(Keyword::Clear);
            return Ok(FromFilter {
                expression: None,
                open: None,
                close,
                clear,
            });
        }
        if self.eat_keyword(Keyword::Clear) {
            return Ok(FromFilter {
                clear: true,
                ..FromFilter::default()
            });
        }
        self.expect_here(Expected::Keyword(Keyword::Close));

        let expression = Some(self.parse_expr()?);
        let open = if self.eat_keyword(Keyword::Open) {
            Some(self.parse_open_date()?)
        } else {
            None
        };
        let close = self.parse_close()?;
        let clear = self.eat_keyword(Keyword::Clear);
        Ok(FromFilter {
            expression,
            open,
            close,
            clear,
        })
    }

    /// The `ON date` following `OPEN`.
    fn parse_open_date(&mut self) -> PResult<NaiveDate> {
        self.expect_keyword(Keyword::On)?;
        self.parse_date()
    }

    fn parse_close(&mut self) -> PResult<Option<Boundary>> {
        if !self.eat_keyword(Keyword::Close) {
            return Ok(None);
        }
        if self.eat_keyword(Keyword::On) {
            Ok(Some(Boundary::On(self.parse_date()?)))
        } else {
            Ok(Some(Boundary::Default))
        }
    }

    fn parse_group_by(&mut self) -> PResult<GroupBy> {
        let mut columns = vec![self.parse_column_key()?];
        while self.eat(Symbol::Comma) {
            columns.push(self.parse_column_key()?);
        }
        let having = if self.eat_keyword(Keyword::Having) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(GroupBy { columns, having })
    }

    fn parse_order_by(&mut self) -> PResult<Vec<OrderBy>> {
        let mut keys = Vec::new();
        loop {
            let column = self.parse_column_key()?;
            let direction = if self.eat_keyword(Keyword::Desc) {
                SortDirection::Desc
            } else {
                self.eat_keyword(Keyword::Asc);
                SortDirection::Asc
            };
            keys.push(OrderBy { column, direction });
            if !self.eat(Symbol::Comma) {
                break;
            }
        }
        Ok(keys)
    }

    /// A GROUP BY or ORDER BY key: a lone integer is a column index, anything
    /// else is an expression.
    fn parse_column_key(&mut self) -> PResult<ColumnKey> {
        if let Token::Integer(text) = self.peek() {
            if !continues_expression(self.peek_nth(1)) {
                let span = self.span();
                self.bump();
                return self.parse_index(text, span).map(ColumnKey::Index);
            }
        }
        self.parse_expr().map(ColumnKey::Expr)
    }

    fn parse_pivot_by(&mut self) -> PResult<PivotBy> {
        let first = self.parse_pivot_key()?;
        if !self.at(Symbol::Comma) {
            return Err(self.error_at(SyntaxErrorKind::PivotArity, self.span()));
        }
        self.bump();
        let second = self.parse_pivot_key()?;
        if self.at(Symbol::Comma) {
            return Err(self.error_at(SyntaxErrorKind::PivotArity, self.span()));
        }
        Ok(PivotBy {
            columns: [first, second],
        })
    }

    fn parse_pivot_key(&mut self) -> PResult<PivotKey> {
        if let Token::Integer(text) = self.peek() {
            let span = self.span();
            self.bump();
            return self.parse_index(text, span).map(PivotKey::Index);
        }
        self.expect_here(Expected::Integer);
        self.parse_identifier().map(PivotKey::Column)
    }

    fn parse_limit(&mut self) -> PResult<u64> {
        match self.peek() {
            Token::Integer(text) => {
                let span = self.span();
                self.bump();
                text.parse()
                    .map_err(|_| self.error_at(SyntaxErrorKind::InvalidNumber(text.to_string()), span))
            }
            _ => Err(self.fail(Expected::Integer)),
        }
    }

    fn parse_balances(&mut self) -> PResult<Balances> {
        self.expect_keyword(Keyword::Balances)?;
        let summary_func = self.parse_summary_func()?;
        let from_clause = self.parse_optional_from()?;
        let where_clause = if self.eat_keyword(Keyword::Where) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Balances {
            summary_func,
            from_clause,
            where_clause,
        })
    }

    fn parse_journal(&mut self) -> PResult<Journal> {
        self.expect_keyword(Keyword::Journal)?;
        let account = if let Token::String(text) = self.peek() {
            self.bump();
            Some(unquote(text).value)
        } else {
            self.expect_here(Expected::String);
            None
        };
        let summary_func = self.parse_summary_func()?;
        let from_clause = self.parse_optional_from()?;
        Ok(Journal {
            account,
            summary_func,
            from_clause,
        })
    }

    fn parse_print(&mut self) -> PResult<Print> {
        self.expect_keyword(Keyword::Print)?;
        let from_clause = self.parse_optional_from()?;
        Ok(Print { from_clause })
    }

    fn parse_summary_func(&mut self) -> PResult<Option<String>> {
        if self.eat_keyword(Keyword::At) {
            Ok(Some(self.parse_identifier()?))
        } else {
            Ok(None)
        }
    }

    fn parse_optional_from(&mut self) -> PResult<Option<FromFilter>> {
        if self.eat_keyword(Keyword::From) {
            Ok(Some(self.parse_from_filter()?))
        } else {
            Ok(None)
        }
    }

    // ===== Expressions =====

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.nested(Self::parse_disjunction)
    }

    fn parse_disjunction(&mut self) -> PResult<Expr> {
        let first = self.parse_conjunction()?;
        if !self.at_keyword(Keyword::Or) {
            return Ok(first);
        }
        let mut args = vec![first];
        while self.at_keyword(Keyword::Or) {
            self.bump();
            args.push(self.parse_conjunction()?);
        }
        Ok(Expr::or(args))
    }

    fn parse_conjunction(&mut self) -> PResult<Expr> {
        let first = self.parse_inversion()?;
        if !self.at_keyword(Keyword::And) {
            return Ok(first);
        }
        let mut args = vec![first];
        while self.at_keyword(Keyword::And) {
            self.bump();
            args.push(self.parse_inversion()?);
        }
        Ok(Expr::and(args))
    }

    fn parse_inversion(&mut self) -> PResult<Expr> {
        if self.at_keyword(Keyword::Not) {
            self.bump();
            let operand = self.nested(Self::parse_inversion)?;
            return Ok(Expr::unary(UnaryOperator::Not, operand));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let left = self.parse_sum()?;
        let expr = match self.parse_comparison_operator()? {
            None => return Ok(left),
            Some(Comparison::Binary(op)) => {
                let right = self.parse_sum()?;
                Expr::binary(left, op, right)
            }
            Some(Comparison::Null(op)) => Expr::unary(op, left),
            Some(Comparison::Between) => {
                let lower = self.parse_sum()?;
                self.expect_keyword(Keyword::And)?;
                let upper = self.parse_sum()?;
                Expr::between(left, lower, upper)
            }
        };
        if self.at_comparison_operator() {
            return Err(self.error_at(SyntaxErrorKind::ChainedComparison, self.span()));
        }
        Ok(expr)
    }

    fn at_comparison_operator(&self) -> bool {
        match self.peek() {
            Token::Symbol(symbol) => comparison_symbol(symbol).is_some(),
            Token::Keyword(Keyword::In | Keyword::Is | Keyword::Between) => true,
            Token::Keyword(Keyword::Not) => self.peek_nth(1) == Token::Keyword(Keyword::In),
            _ => false,
        }
    }

    fn parse_comparison_operator(&mut self) -> PResult<Option<Comparison>> {
        let op = match self.peek() {
            Token::Symbol(symbol) => match comparison_symbol(symbol) {
                Some(op) => op,
                None => return Ok(None),
            },
            Token::Keyword(Keyword::In) => BinaryOperator::In,
            Token::Keyword(Keyword::Not) if self.peek_nth(1) == Token::Keyword(Keyword::In) => {
                self.bump();
                BinaryOperator::NotIn
            }
            Token::Keyword(Keyword::Is) => {
                self.bump();
                let op = if self.eat_keyword(Keyword::Not) {
                    UnaryOperator::IsNotNull
                } else {
                    UnaryOperator::IsNull
                };
                self.expect_keyword(Keyword::Null)?;
                return Ok(Some(Comparison::Null(op)));
            }
            Token::Keyword(Keyword::Between) => {
                self.bump();
                return Ok(Some(Comparison::Between));
            }
            _ => return Ok(None),
        };
        self.bump();
        Ok(Some(Comparison::Binary(op)))
    }

    fn parse_sum(&mut self) -> PResult<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Token::Symbol(Symbol::Plus) => BinaryOperator::Add,
                Token::Symbol(Symbol::Minus) => BinaryOperator::Sub,
                _ => break,
            };
            self.bump();
            let right = self.parse_term()?;
            left = Expr::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> PResult<Expr> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek() {
                Token::Symbol(Symbol::Star) => BinaryOperator::Mul,
                Token::Symbol(Symbol::Slash) => BinaryOperator::Div,
                Token::Symbol(Symbol::Percent) => BinaryOperator::Mod,
                _ => break,
            };
            self.bump();
            let right = self.parse_factor()?;
            left = Expr::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> PResult<Expr> {
        match self.peek() {
            Token::Symbol(Symbol::LParen) if !self.at_list() => {
                self.bump();
                let expr = self.parse_expr()?;
                self.expect(Symbol::RParen)?;
                Ok(expr)
            }
            Token::Symbol(Symbol::Minus) => {
                self.bump();
                let operand = self.nested(Self::parse_factor)?;
                Ok(Expr::unary(UnaryOperator::Neg, operand))
            }
            // Unary `+` is the identity on any factor and builds no node.
            Token::Symbol(Symbol::Plus) => {
                self.bump();
                self.nested(Self::parse_factor)
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.at(Symbol::Dot) {
                self.bump();
                let name = self.parse_identifier()?;
                expr = Expr::attribute(expr, name);
            } else if self.at(Symbol::LBracket) {
                self.bump();
                let key = match self.peek() {
                    Token::String(text) => {
                        self.bump();
                        unquote(text).value
                    }
                    _ => return Err(self.fail(Expected::String)),
                };
                self.expect(Symbol::RBracket)?;
                expr = Expr::subscript(expr, key);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_atom(&mut self) -> PResult<Expr> {
        let token = self.peek();
        match token {
            Token::Keyword(Keyword::Select) => self.parse_select().map(Expr::subselect),
            _ if token.is_identifier() => {
                if self.peek_nth(1) == Token::Symbol(Symbol::LParen) {
                    self.parse_function()
                } else {
                    self.parse_identifier().map(Expr::Column)
                }
            }
            Token::Placeholder(name) => {
                self.bump();
                Ok(Expr::Placeholder(match name {
                    Some(name) => Placeholder::Named(name.to_string()),
                    None => Placeholder::Positional,
                }))
            }
            Token::Symbol(Symbol::LParen) => self.parse_list(),
            _ => match self.parse_literal()? {
                Some(literal) => Ok(Expr::literal(literal)),
                None => Err(self.fail(Expected::Expression)),
            },
        }
    }

    fn parse_function(&mut self) -> PResult<Expr> {
        let name = self.parse_identifier()?;
        self.expect(Symbol::LParen)?;
        if self.eat(Symbol::Star) {
            self.expect(Symbol::RParen)?;
            return Ok(Expr::function(name, vec![Expr::Wildcard]));
        }
        let mut args = Vec::new();
        if !self.eat(Symbol::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.eat(Symbol::Comma) {
                    break;
                }
            }
            self.expect(Symbol::RParen)?;
        }
        Ok(Expr::function(name, args))
    }

    /// `(` literal `,` starts a list; anything else in parentheses is
    /// grouping.
    fn at_list(&self) -> bool {
        self.at(Symbol::LParen)
            && self.peek_nth(1).is_literal()
            && self.peek_nth(2) == Token::Symbol(Symbol::Comma)
    }

    fn parse_list(&mut self) -> PResult<Expr> {
        self.expect(Symbol::LParen)?;
        let mut items = Vec::new();
        loop {
            // Empty elements, as in `(1, )`, are skipped.
            match self.parse_literal()? {
                Some(literal) => items.push(literal),
                None => self.expect_here(Expected::Literal),
            }
            if !self.eat(Symbol::Comma) {
                break;
            }
        }
        self.expect(Symbol::RParen)?;
        if items.is_empty() {
            return Err(self.fail(Expected::Literal));
        }
        Ok(Expr::list(items))
    }

    /// Consume a literal if one is next.
    fn parse_literal(&mut self) -> PResult<Option<Literal>> {
        let span = self.span();
        let literal = match self.peek() {
            Token::Integer(text) => Literal::Integer(
                text.parse()
                    .map_err(|_| self.error_at(SyntaxErrorKind::InvalidNumber(text.to_string()), span))?,
            ),
            Token::Decimal(text) => Literal::Decimal(self.parse_decimal(text, span)?),
            Token::Date(text) => Literal::Date(self.date_value(text, span)?),
            Token::String(text) => Literal::String(unquote(text)),
            Token::Keyword(Keyword::Null) => Literal::Null,
            Token::Keyword(Keyword::True) => Literal::Boolean(true),
            Token::Keyword(Keyword::False) => Literal::Boolean(false),
            _ => return Ok(None),
        };
        self.bump();
        Ok(Some(literal))
    }

    /// Decimal literals must fit exactly; digits past 28 decimal places are
    /// an error, not rounded away.
    fn parse_decimal(&self, text: &str, span: Span) -> PResult<Decimal> {
        let trimmed = text.strip_suffix('.').unwrap_or(text);
        let result = if trimmed.starts_with('.') {
            Decimal::from_str_exact(&format!("0{trimmed}"))
        } else {
            Decimal::from_str_exact(trimmed)
        };
        result.map_err(|_| self.error_at(SyntaxErrorKind::InvalidNumber(text.to_string()), span))
    }

    fn parse_date(&mut self) -> PResult<NaiveDate> {
        match self.peek() {
            Token::Date(text) => {
                let span = self.span();
                let date = self.date_value(text, span)?;
                self.bump();
                Ok(date)
            }
            _ => Err(self.fail(Expected::Date)),
        }
    }

    fn date_value(&self, text: &str, span: Span) -> PResult<NaiveDate> {
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map_err(|_| self.error_at(SyntaxErrorKind::InvalidDate(text.to_string()), span))
    }

    fn parse_index(&self, text: &str, span: Span) -> PResult<usize> {
        text.parse()
            .map_err(|_| self.error_at(SyntaxErrorKind::InvalidNumber(text.to_string()), span))
    }

    fn parse_identifier(&mut self) -> PResult<String> {
        let token = self.peek();
        if token.is_identifier() {
            let text = self.span().text(self.source).to_string();
            self.bump();
            Ok(text)
        } else {
            Err(self.fail(Expected::Identifier))
        }
    }
}

const fn comparison_symbol(symbol: Symbol) -> Option<BinaryOperator> {
    match symbol {
        Symbol::Lt => Some(BinaryOperator::Less),
        Symbol::LtEq => Some(BinaryOperator::LessEq),
        Symbol::Gt => Some(BinaryOperator::Greater),
        Symbol::GtEq => Some(BinaryOperator::GreaterEq),
        Symbol::Eq => Some(BinaryOperator::Equal),
        Symbol::NotEq => Some(BinaryOperator::NotEqual),
        Symbol::Tilde => Some(BinaryOperator::Match),
        Symbol::NotTilde => Some(BinaryOperator::NotMatch),
        _ => None,
    }
}

/// Whether `token`, following an integer, makes the integer part of a larger
/// expression.
fn continues_expression(token: Token<'_>) -> bool {
    match token {
        Token::Symbol(symbol) => {
            comparison_symbol(symbol).is_some()
                || matches!(
                    symbol,
                    Symbol::Plus
                        | Symbol::Minus
                        | Symbol::Star
                        | Symbol::Slash
                        | Symbol::Percent
                        | Symbol::Dot
                        | Symbol::LBracket
                )
        }
        Token::Keyword(kw) => matches!(
            kw,
            Keyword::And | Keyword::Or | Keyword::In | Keyword::Not | Keyword::Is | Keyword::Between
        ),
        _ => false,
    }
}

/// Split a quoted string token into its content and quote style.
fn unquote(text: &str) -> StringLiteral {
    let quote = if text.starts_with('"') {
        QuoteStyle::Double
    } else {
        QuoteStyle::Single
    };
    let inner = text
        .strip_prefix(quote.as_char())
        .and_then(|rest| rest.strip_suffix(quote.as_char()))
        .unwrap_or(text);
    StringLiteral::quoted(inner, quote)
}
