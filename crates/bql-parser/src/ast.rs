//! BQL Abstract Syntax Tree types.
//!
//! This module defines the AST for the Beancount Query Language (BQL), a
//! SQL-like query language over tabular financial data. Nodes are plain
//! owned data with structural equality. Only targets record where they were
//! parsed from; [`crate::parse_spanned`] gives the span of the statement.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::span::Span;

/// A complete BQL statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statement {
    /// SELECT query.
    Select(Select),
    /// BALANCES shorthand query.
    Balances(Balances),
    /// JOURNAL shorthand query.
    Journal(Journal),
    /// PRINT shorthand query.
    Print(Print),
}

impl Statement {
    /// Lower-case name of the statement kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Select(_) => "select",
            Self::Balances(_) => "balances",
            Self::Journal(_) => "journal",
            Self::Print(_) => "print",
        }
    }
}

/// A SELECT query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Select {
    /// Target columns/expressions.
    pub targets: Targets,
    /// Whether DISTINCT was specified.
    pub distinct: bool,
    /// FROM clause.
    pub from_clause: Option<FromClause>,
    /// WHERE clause.
    pub where_clause: Option<Expr>,
    /// GROUP BY clause, with its optional HAVING.
    pub group_by: Option<GroupBy>,
    /// ORDER BY clause.
    pub order_by: Option<Vec<OrderBy>>,
    /// PIVOT BY clause.
    pub pivot_by: Option<PivotBy>,
    /// LIMIT clause.
    pub limit: Option<u64>,
}

impl Select {
    /// Create a new SELECT query with the given targets.
    pub const fn new(targets: Targets) -> Self {
        Self {
            targets,
            distinct: false,
            from_clause: None,
            where_clause: None,
            group_by: None,
            order_by: None,
            pivot_by: None,
            limit: None,
        }
    }

    /// Set the DISTINCT flag.
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Set the FROM clause.
    pub fn from(mut self, from: FromClause) -> Self {
        self.from_clause = Some(from);
        self
    }

    /// Set the WHERE clause.
    pub fn where_clause(mut self, expr: Expr) -> Self {
        self.where_clause = Some(expr);
        self
    }

    /// Set the GROUP BY clause.
    pub fn group_by(mut self, group_by: GroupBy) -> Self {
        self.group_by = Some(group_by);
        self
    }

    /// Set the ORDER BY clause.
    pub fn order_by(mut self, keys: Vec<OrderBy>) -> Self {
        self.order_by = Some(keys);
        self
    }

    /// Set the PIVOT BY clause.
    pub fn pivot_by(mut self, pivot_by: PivotBy) -> Self {
        self.pivot_by = Some(pivot_by);
        self
    }

    /// Set the LIMIT.
    pub const fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }
}

/// The target list of a SELECT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Targets {
    /// `SELECT *`
    Wildcard,
    /// Explicit targets, in order.
    List(Vec<Target>),
}

/// A target in the SELECT clause.
///
/// The span is ignored when comparing targets, so a parsed target equals
/// the same target built in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// The expression to select.
    pub expr: Expr,
    /// Optional output name (AS name).
    pub name: Option<String>,
    /// Query text of the whole target, alias included. `None` for targets
    /// built in code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Target {
    /// Create a new target without a name.
    pub const fn new(expr: Expr) -> Self {
        Self {
            expr,
            name: None,
            span: None,
        }
    }

    /// Create a new target with an output name.
    pub fn with_name(expr: Expr, name: impl Into<String>) -> Self {
        Self {
            expr,
            name: Some(name.into()),
            span: None,
        }
    }

    /// Attach the span the target was parsed from.
    #[must_use]
    pub const fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr && self.name == other.name
    }
}

impl Eq for Target {}

/// The data source of a SELECT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FromClause {
    /// `#name`, or `#` for the default table.
    Table(Table),
    /// `( SELECT ... )`
    Subselect(Box<Select>),
    /// Entry filter with OPEN/CLOSE/CLEAR modifiers.
    Filter(FromFilter),
}

/// A table reference.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Table {
    /// Table name without the `#`; empty for the default table.
    pub name: String,
}

impl Table {
    /// Create a table reference.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Whether this refers to the default table.
    pub fn is_default(&self) -> bool {
        self.name.is_empty()
    }
}

/// FROM filter with entry-level modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FromFilter {
    /// Filter expression.
    pub expression: Option<Expr>,
    /// OPEN ON date: summarize entries before this date.
    pub open: Option<NaiveDate>,
    /// CLOSE [ON date]: truncate entries after the boundary.
    pub close: Option<Boundary>,
    /// CLEAR: transfer income and expenses to equity.
    pub clear: bool,
}

impl FromFilter {
    /// Create an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter expression.
    pub fn filter(mut self, expr: Expr) -> Self {
        self.expression = Some(expr);
        self
    }

    /// Set the OPEN ON date.
    pub const fn open_on(mut self, date: NaiveDate) -> Self {
        self.open = Some(date);
        self
    }

    /// Set CLOSE without a date.
    pub const fn close(mut self) -> Self {
        self.close = Some(Boundary::Default);
        self
    }

    /// Set the CLOSE ON date.
    pub const fn close_on(mut self, date: NaiveDate) -> Self {
        self.close = Some(Boundary::On(date));
        self
    }

    /// Set the CLEAR flag.
    pub const fn clear(mut self) -> Self {
        self.clear = true;
        self
    }
}

/// The date given to CLOSE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Boundary {
    /// `CLOSE` alone: the default closing date chosen by the executor.
    Default,
    /// `CLOSE ON date`
    On(NaiveDate),
}

/// GROUP BY clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBy {
    /// Grouping keys, in order.
    pub columns: Vec<ColumnKey>,
    /// HAVING condition.
    pub having: Option<Expr>,
}

impl GroupBy {
    /// Create a GROUP BY without HAVING.
    pub const fn new(columns: Vec<ColumnKey>) -> Self {
        Self {
            columns,
            having: None,
        }
    }

    /// Set the HAVING condition.
    pub fn having(mut self, expr: Expr) -> Self {
        self.having = Some(expr);
        self
    }
}

/// A GROUP BY or ORDER BY key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKey {
    /// 1-based index into the target list.
    Index(usize),
    /// Any expression.
    Expr(Expr),
}

/// An ORDER BY key with its direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    /// The sort key.
    pub column: ColumnKey,
    /// Sort direction.
    pub direction: SortDirection,
}

impl OrderBy {
    /// Create an ascending sort key.
    pub const fn asc(column: ColumnKey) -> Self {
        Self {
            column,
            direction: SortDirection::Asc,
        }
    }

    /// Create a descending sort key.
    pub const fn desc(column: ColumnKey) -> Self {
        Self {
            column,
            direction: SortDirection::Desc,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    /// Ascending (default).
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// PIVOT BY clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotBy {
    /// Row key and column key.
    pub columns: [PivotKey; 2],
}

/// A PIVOT BY key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PivotKey {
    /// 1-based index into the target list.
    Index(usize),
    /// Column name.
    Column(String),
}

/// BALANCES shorthand query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Balances {
    /// Summary function applied to positions (AT name).
    pub summary_func: Option<String>,
    /// FROM filter.
    pub from_clause: Option<FromFilter>,
    /// WHERE clause.
    pub where_clause: Option<Expr>,
}

/// JOURNAL shorthand query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Journal {
    /// Account pattern to filter by.
    pub account: Option<String>,
    /// Summary function applied to positions (AT name).
    pub summary_func: Option<String>,
    /// FROM filter.
    pub from_clause: Option<FromFilter>,
}

/// PRINT shorthand query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Print {
    /// FROM filter.
    pub from_clause: Option<FromFilter>,
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    /// `*` as the sole argument of a function call, as in `count(*)`.
    Wildcard,
    /// Column reference.
    Column(String),
    /// Literal constant or literal list.
    Constant(Constant),
    /// Query parameter placeholder.
    Placeholder(Placeholder),
    /// Function call.
    Function(Function),
    /// Attribute access (`operand.name`).
    Attribute(Box<Attribute>),
    /// Subscript (`operand['key']`).
    Subscript(Box<Subscript>),
    /// Unary operation.
    UnaryOp(Box<UnaryOp>),
    /// Binary operation.
    BinaryOp(Box<BinaryOp>),
    /// n-ary AND/OR.
    BoolOp(BoolOp),
    /// `operand BETWEEN lower AND upper`.
    Between(Box<Between>),
    /// Scalar subquery.
    Subselect(Box<Select>),
}

impl Expr {
    /// Create a column reference.
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    /// Create a constant from a literal.
    pub const fn literal(literal: Literal) -> Self {
        Self::Constant(Constant::Literal(literal))
    }

    /// Create an integer literal.
    pub const fn integer(n: i64) -> Self {
        Self::literal(Literal::Integer(n))
    }

    /// Create a decimal literal.
    pub const fn decimal(n: Decimal) -> Self {
        Self::literal(Literal::Decimal(n))
    }

    /// Create a single-quoted string literal.
    pub fn string(s: impl Into<String>) -> Self {
        Self::literal(Literal::string(s))
    }

    /// Create a date literal.
    pub const fn date(d: NaiveDate) -> Self {
        Self::literal(Literal::Date(d))
    }

    /// Create a boolean literal.
    pub const fn boolean(b: bool) -> Self {
        Self::literal(Literal::Boolean(b))
    }

    /// Create a NULL literal.
    pub const fn null() -> Self {
        Self::literal(Literal::Null)
    }

    /// Create a literal list.
    pub const fn list(items: Vec<Literal>) -> Self {
        Self::Constant(Constant::List(items))
    }

    /// Create a function call.
    pub fn function(name: impl Into<String>, args: Vec<Self>) -> Self {
        Self::Function(Function {
            name: name.into(),
            args,
        })
    }

    /// Create an attribute access.
    pub fn attribute(operand: Self, name: impl Into<String>) -> Self {
        Self::Attribute(Box::new(Attribute {
            operand,
            name: name.into(),
        }))
    }

    /// Create a subscript.
    pub fn subscript(operand: Self, key: impl Into<String>) -> Self {
        Self::Subscript(Box::new(Subscript {
            operand,
            key: key.into(),
        }))
    }

    /// Create a unary operation.
    pub fn unary(op: UnaryOperator, operand: Self) -> Self {
        Self::UnaryOp(Box::new(UnaryOp { op, operand }))
    }

    /// Create a binary operation.
    pub fn binary(left: Self, op: BinaryOperator, right: Self) -> Self {
        Self::BinaryOp(Box::new(BinaryOp { left, op, right }))
    }

    /// Create an n-ary AND.
    pub const fn and(args: Vec<Self>) -> Self {
        Self::BoolOp(BoolOp {
            op: BoolOperator::And,
            args,
        })
    }

    /// Create an n-ary OR.
    pub const fn or(args: Vec<Self>) -> Self {
        Self::BoolOp(BoolOp {
            op: BoolOperator::Or,
            args,
        })
    }

    /// Create a BETWEEN test.
    pub fn between(operand: Self, lower: Self, upper: Self) -> Self {
        Self::Between(Box::new(Between {
            operand,
            lower,
            upper,
        }))
    }

    /// Create a scalar subquery.
    pub fn subselect(select: Select) -> Self {
        Self::Subselect(Box::new(select))
    }
}

/// A constant value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constant {
    /// A single literal.
    Literal(Literal),
    /// A parenthesized list such as `(1, 2, 3)`; never empty.
    List(Vec<Literal>),
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Literal {
    /// `NULL`
    Null,
    /// `TRUE` or `FALSE`.
    Boolean(bool),
    /// Integer literal.
    Integer(i64),
    /// Decimal literal.
    Decimal(Decimal),
    /// Date literal.
    Date(NaiveDate),
    /// String literal.
    String(StringLiteral),
}

impl Literal {
    /// Create a single-quoted string literal.
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(StringLiteral::new(value))
    }
}

/// A string literal and the quotes it was written with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringLiteral {
    /// Content between the quotes, unprocessed.
    pub value: String,
    /// Quote style.
    pub quote: QuoteStyle,
}

impl StringLiteral {
    /// Create a single-quoted string.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quote: QuoteStyle::Single,
        }
    }

    /// Create a string with an explicit quote style.
    pub fn quoted(value: impl Into<String>, quote: QuoteStyle) -> Self {
        Self {
            value: value.into(),
            quote,
        }
    }
}

/// String quote style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QuoteStyle {
    /// `'...'`
    #[default]
    Single,
    /// `"..."`
    Double,
}

impl QuoteStyle {
    /// The quote character.
    pub const fn as_char(self) -> char {
        match self {
            Self::Single => '\'',
            Self::Double => '"',
        }
    }
}

/// A query parameter placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placeholder {
    /// `%s`
    Positional,
    /// `%(name)s`
    Named(String),
}

/// A function call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// Function name, as written.
    pub name: String,
    /// Arguments; `[Expr::Wildcard]` for `name(*)`.
    pub args: Vec<Expr>,
}

/// Attribute access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Expression whose attribute is taken.
    pub operand: Expr,
    /// Attribute name.
    pub name: String,
}

/// Subscript with a string key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscript {
    /// Expression being indexed.
    pub operand: Expr,
    /// Key string, without quotes.
    pub key: String,
}

/// A unary operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnaryOp {
    /// Operator.
    pub op: UnaryOperator,
    /// Operand.
    pub operand: Expr,
}

/// A binary operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryOp {
    /// Left operand.
    pub left: Expr,
    /// Operator.
    pub op: BinaryOperator,
    /// Right operand.
    pub right: Expr,
}

/// An n-ary boolean operation; always at least two arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoolOp {
    /// Operator.
    pub op: BoolOperator,
    /// Arguments, in source order.
    pub args: Vec<Expr>,
}

/// An inclusive range test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Between {
    /// Tested value.
    pub operand: Expr,
    /// Lower bound.
    pub lower: Expr,
    /// Upper bound.
    pub upper: Expr,
}

/// Number of operands an operator takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// One operand.
    Unary,
    /// Two operands.
    Binary,
    /// Two or more operands.
    Variadic,
}

/// Behavior shared by the operator families.
pub trait Operator: Copy {
    /// Number of operands.
    fn arity(self) -> Arity;

    /// Lower-case node name, e.g. `"greatereq"`.
    fn name(self) -> &'static str;

    /// Surface syntax, e.g. `">="` or `"IS NOT NULL"`.
    fn symbol(self) -> &'static str;
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// Logical NOT.
    Not,
    /// Arithmetic negation.
    Neg,
    /// `IS NULL`
    IsNull,
    /// `IS NOT NULL`
    IsNotNull,
}

impl UnaryOperator {
    /// Whether the operator is written after its operand.
    pub const fn is_postfix(self) -> bool {
        matches!(self, Self::IsNull | Self::IsNotNull)
    }
}

impl Operator for UnaryOperator {
    fn arity(self) -> Arity {
        Arity::Unary
    }

    fn name(self) -> &'static str {
        match self {
            Self::Not => "not",
            Self::Neg => "neg",
            Self::IsNull => "isnull",
            Self::IsNotNull => "isnotnull",
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Not => "NOT",
            Self::Neg => "-",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    /// `<`
    Less,
    /// `<=`
    LessEq,
    /// `>`
    Greater,
    /// `>=`
    GreaterEq,
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `IN`
    In,
    /// `NOT IN`
    NotIn,
    /// `~` regular expression match.
    Match,
    /// `!~` negated regular expression match.
    NotMatch,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
}

impl BinaryOperator {
    /// Whether this is a comparison (non-associative) operator.
    pub const fn is_comparison(self) -> bool {
        !matches!(
            self,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod
        )
    }
}

impl Operator for BinaryOperator {
    fn arity(self) -> Arity {
        Arity::Binary
    }

    fn name(self) -> &'static str {
        match self {
            Self::Less => "less",
            Self::LessEq => "lesseq",
            Self::Greater => "greater",
            Self::GreaterEq => "greatereq",
            Self::Equal => "equal",
            Self::NotEqual => "notequal",
            Self::In => "in",
            Self::NotIn => "notin",
            Self::Match => "match",
            Self::NotMatch => "notmatch",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Mod => "mod",
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Match => "~",
            Self::NotMatch => "!~",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
        }
    }
}

/// Boolean connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoolOperator {
    /// `AND`
    And,
    /// `OR`
    Or,
}

impl Operator for BoolOperator {
    fn arity(self) -> Arity {
        Arity::Variadic
    }

    fn name(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}
