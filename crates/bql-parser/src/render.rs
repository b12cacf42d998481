//! Rendering of AST nodes.
//!
//! `Display` writes BQL text that parses back to the same tree: operands are
//! parenthesized whenever their precedence is lower than their position
//! requires. `to_sexp` writes an indented s-expression dump in which every
//! node is `(name` followed by one `field: value` line per present field.

use std::fmt::{self, Display, Write as _};

use crate::ast::{
    Balances, Between, BinaryOp, BinaryOperator, BoolOperator, Boundary, ColumnKey, Constant,
    Expr, FromClause, FromFilter, GroupBy, Journal, Literal, Operator, OrderBy, PivotBy, PivotKey,
    Placeholder, Print, Select, SortDirection, Statement, StringLiteral, Target, Targets,
    UnaryOperator,
};

// Binding strength, loosest first.
const PREC_OR: u8 = 1;
const PREC_AND: u8 = 2;
const PREC_NOT: u8 = 3;
const PREC_COMPARISON: u8 = 4;
const PREC_SUM: u8 = 5;
const PREC_TERM: u8 = 6;
const PREC_UNARY: u8 = 7;
const PREC_PRIMARY: u8 = 8;

impl Expr {
    fn precedence(&self) -> u8 {
        match self {
            Self::BoolOp(op) => match op.op {
                BoolOperator::Or => PREC_OR,
                BoolOperator::And => PREC_AND,
            },
            Self::UnaryOp(op) => match op.op {
                UnaryOperator::Not => PREC_NOT,
                UnaryOperator::Neg => PREC_UNARY,
                UnaryOperator::IsNull | UnaryOperator::IsNotNull => PREC_COMPARISON,
            },
            Self::BinaryOp(op) if op.op.is_comparison() => PREC_COMPARISON,
            Self::BinaryOp(op) => match op.op {
                BinaryOperator::Add | BinaryOperator::Sub => PREC_SUM,
                _ => PREC_TERM,
            },
            Self::Between(_) => PREC_COMPARISON,
            Self::Wildcard
            | Self::Column(_)
            | Self::Constant(_)
            | Self::Placeholder(_)
            | Self::Function(_)
            | Self::Attribute(_)
            | Self::Subscript(_)
            | Self::Subselect(_) => PREC_PRIMARY,
        }
    }

    /// Render as an indented s-expression.
    pub fn to_sexp(&self) -> String {
        self.sexp().render()
    }

    fn sexp(&self) -> Sexp {
        match self {
            Self::Wildcard => Sexp::atom("*"),
            Self::Column(name) => Sexp::node("column").field("name", Sexp::string(name)),
            Self::Constant(constant) => {
                Sexp::node("constant").field("value", Sexp::atom(constant))
            }
            Self::Placeholder(Placeholder::Positional) => Sexp::node("placeholder"),
            Self::Placeholder(Placeholder::Named(name)) => {
                Sexp::node("placeholder").field("name", Sexp::string(name))
            }
            Self::Function(function) => Sexp::node("function")
                .field("name", Sexp::string(&function.name))
                .field("args", Sexp::list(function.args.iter().map(Self::sexp))),
            Self::Attribute(attribute) => Sexp::node("attribute")
                .field("operand", attribute.operand.sexp())
                .field("name", Sexp::string(&attribute.name)),
            Self::Subscript(subscript) => Sexp::node("subscript")
                .field("operand", subscript.operand.sexp())
                .field("key", Sexp::string(&subscript.key)),
            Self::UnaryOp(unary) => Sexp::node(unary.op.name()).field("operand", unary.operand.sexp()),
            Self::BinaryOp(binary) => Sexp::node(binary.op.name())
                .field("left", binary.left.sexp())
                .field("right", binary.right.sexp()),
            Self::BoolOp(bool_op) => Sexp::node(bool_op.op.name())
                .field("args", Sexp::list(bool_op.args.iter().map(Self::sexp))),
            Self::Between(between) => Sexp::node("between")
                .field("operand", between.operand.sexp())
                .field("lower", between.lower.sexp())
                .field("upper", between.upper.sexp()),
            Self::Subselect(select) => select.sexp(),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard => f.write_str("*"),
            Self::Column(name) => f.write_str(name),
            Self::Constant(constant) => write!(f, "{constant}"),
            Self::Placeholder(Placeholder::Positional) => f.write_str("%s"),
            Self::Placeholder(Placeholder::Named(name)) => write!(f, "%({name})s"),
            Self::Function(function) => {
                write!(f, "{}(", function.name)?;
                write_separated(f, &function.args, ", ")?;
                f.write_str(")")
            }
            Self::Attribute(attribute) => {
                write_operand(f, &attribute.operand, PREC_PRIMARY)?;
                write!(f, ".{}", attribute.name)
            }
            Self::Subscript(subscript) => {
                write_operand(f, &subscript.operand, PREC_PRIMARY)?;
                write!(f, "[{}]", quote(&subscript.key))
            }
            Self::UnaryOp(unary) => match unary.op {
                UnaryOperator::Not => {
                    f.write_str("NOT ")?;
                    write_operand(f, &unary.operand, PREC_NOT)
                }
                UnaryOperator::Neg => {
                    f.write_str("-")?;
                    write_operand(f, &unary.operand, PREC_UNARY)
                }
                UnaryOperator::IsNull | UnaryOperator::IsNotNull => {
                    write_operand(f, &unary.operand, PREC_SUM)?;
                    write!(f, " {}", unary.op.symbol())
                }
            },
            Self::BinaryOp(binary) => write_binary(f, binary, self.precedence()),
            Self::BoolOp(bool_op) => {
                let separator = format!(" {} ", bool_op.op.symbol());
                let min = self.precedence() + 1;
                for (i, arg) in bool_op.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(&separator)?;
                    }
                    write_operand(f, arg, min)?;
                }
                Ok(())
            }
            Self::Between(between) => write_between(f, between),
            Self::Subselect(select) => write!(f, "({select})"),
        }
    }
}

fn write_binary(f: &mut fmt::Formatter<'_>, binary: &BinaryOp, precedence: u8) -> fmt::Result {
    // Comparisons do not chain, so both sides must bind tighter; arithmetic
    // is left-associative, so only the right side must.
    let (left_min, right_min) = if precedence == PREC_COMPARISON {
        (PREC_SUM, PREC_SUM)
    } else {
        (precedence, precedence + 1)
    };
    write_operand(f, &binary.left, left_min)?;
    write!(f, " {} ", binary.op.symbol())?;
    write_operand(f, &binary.right, right_min)
}

fn write_between(f: &mut fmt::Formatter<'_>, between: &Between) -> fmt::Result {
    write_operand(f, &between.operand, PREC_SUM)?;
    f.write_str(" BETWEEN ")?;
    write_operand(f, &between.lower, PREC_SUM)?;
    f.write_str(" AND ")?;
    write_operand(f, &between.upper, PREC_SUM)
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, min: u8) -> fmt::Result {
    if expr.precedence() < min {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

fn write_separated<T: Display>(f: &mut fmt::Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Quote a plain string, preferring single quotes.
fn quote(value: &str) -> String {
    if value.contains('\'') {
        format!("\"{value}\"")
    } else {
        format!("'{value}'")
    }
}

impl Display for StringLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let q = self.quote.as_char();
        write!(f, "{q}{}{q}", self.value)
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Boolean(true) => f.write_str("TRUE"),
            Self::Boolean(false) => f.write_str("FALSE"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Decimal(d) => {
                let text = d.to_string();
                // Keep the point so the value lexes as a decimal again.
                if text.contains('.') {
                    f.write_str(&text)
                } else {
                    write!(f, "{text}.")
                }
            }
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(literal) => write!(f, "{literal}"),
            Self::List(items) if items.len() == 1 => write!(f, "({},)", items[0]),
            Self::List(items) => {
                f.write_str("(")?;
                write_separated(f, items, ", ")?;
                f.write_str(")")
            }
        }
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if let Some(name) = &self.name {
            write!(f, " AS {name}")?;
        }
        Ok(())
    }
}

impl Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            // A bare integer would read back as an index.
            Self::Expr(expr @ Expr::Constant(Constant::Literal(Literal::Integer(_)))) => {
                write!(f, "({expr})")
            }
            Self::Expr(expr) => write!(f, "{expr}"),
        }
    }
}

impl Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column)?;
        if self.direction == SortDirection::Desc {
            f.write_str(" DESC")?;
        }
        Ok(())
    }
}

impl Display for PivotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Column(name) => f.write_str(name),
        }
    }
}

impl Display for PivotBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [row, column] = &self.columns;
        write!(f, "{row}, {column}")
    }
}

impl Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_separated(f, &self.columns, ", ")?;
        if let Some(having) = &self.having {
            write!(f, " HAVING {having}")?;
        }
        Ok(())
    }
}

impl Display for FromFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let Some(expr) = &self.expression {
            parts.push(expr.to_string());
        }
        if let Some(open) = self.open {
            parts.push(format!("OPEN ON {}", open.format("%Y-%m-%d")));
        }
        match self.close {
            Some(Boundary::Default) => parts.push("CLOSE".to_string()),
            Some(Boundary::On(date)) => parts.push(format!("CLOSE ON {}", date.format("%Y-%m-%d"))),
            None => {}
        }
        if self.clear {
            parts.push("CLEAR".to_string());
        }
        f.write_str(&parts.join(" "))
    }
}

impl Display for FromClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(table) => write!(f, "#{}", table.name),
            Self::Subselect(select) => write!(f, "({select})"),
            Self::Filter(filter) => write!(f, "{filter}"),
        }
    }
}

impl Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        match &self.targets {
            Targets::Wildcard => f.write_str("*")?,
            Targets::List(targets) => write_separated(f, targets, ", ")?,
        }
        if let Some(from) = &self.from_clause {
            write!(f, " FROM {from}")?;
        }
        if let Some(expr) = &self.where_clause {
            write!(f, " WHERE {expr}")?;
        }
        if let Some(group_by) = &self.group_by {
            write!(f, " GROUP BY {group_by}")?;
        }
        if let Some(order_by) = &self.order_by {
            f.write_str(" ORDER BY ")?;
            write_separated(f, order_by, ", ")?;
        }
        if let Some(pivot_by) = &self.pivot_by {
            write!(f, " PIVOT BY {pivot_by}")?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }
        Ok(())
    }
}

impl Display for Balances {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BALANCES")?;
        if let Some(func) = &self.summary_func {
            write!(f, " AT {func}")?;
        }
        if let Some(from) = &self.from_clause {
            write!(f, " FROM {from}")?;
        }
        if let Some(expr) = &self.where_clause {
            write!(f, " WHERE {expr}")?;
        }
        Ok(())
    }
}

impl Display for Journal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JOURNAL")?;
        if let Some(account) = &self.account {
            write!(f, " {}", quote(account))?;
        }
        if let Some(func) = &self.summary_func {
            write!(f, " AT {func}")?;
        }
        if let Some(from) = &self.from_clause {
            write!(f, " FROM {from}")?;
        }
        Ok(())
    }
}

impl Display for Print {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PRINT")?;
        if let Some(from) = &self.from_clause {
            write!(f, " FROM {from}")?;
        }
        Ok(())
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select(select) => write!(f, "{select}"),
            Self::Balances(balances) => write!(f, "{balances}"),
            Self::Journal(journal) => write!(f, "{journal}"),
            Self::Print(print) => write!(f, "{print}"),
        }
    }
}

impl Statement {
    /// Render as an indented s-expression.
    pub fn to_sexp(&self) -> String {
        let sexp = match self {
            Self::Select(select) => select.sexp(),
            Self::Balances(balances) => Sexp::node("balances")
                .opt("summary-func", balances.summary_func.as_deref().map(Sexp::string))
                .opt("from-clause", balances.from_clause.as_ref().map(FromFilter::sexp))
                .opt("where-clause", balances.where_clause.as_ref().map(Expr::sexp)),
            Self::Journal(journal) => Sexp::node("journal")
                .opt("account", journal.account.as_deref().map(Sexp::string))
                .opt("summary-func", journal.summary_func.as_deref().map(Sexp::string))
                .opt("from-clause", journal.from_clause.as_ref().map(FromFilter::sexp)),
            Self::Print(print) => Sexp::node("print")
                .opt("from-clause", print.from_clause.as_ref().map(FromFilter::sexp)),
        };
        sexp.render()
    }
}

impl Select {
    fn sexp(&self) -> Sexp {
        let targets = match &self.targets {
            Targets::Wildcard => Sexp::atom("*"),
            Targets::List(targets) => Sexp::list(targets.iter().map(|target| {
                Sexp::node("target")
                    .field("expr", target.expr.sexp())
                    .opt("name", target.name.as_deref().map(Sexp::string))
            })),
        };
        let from = self.from_clause.as_ref().map(|from| match from {
            FromClause::Table(table) => Sexp::node("table").field("name", Sexp::string(&table.name)),
            FromClause::Subselect(select) => select.sexp(),
            FromClause::Filter(filter) => filter.sexp(),
        });
        let group_by = self.group_by.as_ref().map(|group_by| {
            Sexp::node("groupby")
                .field("columns", Sexp::list(group_by.columns.iter().map(ColumnKey::sexp)))
                .opt("having", group_by.having.as_ref().map(Expr::sexp))
        });
        let order_by = self.order_by.as_ref().map(|keys| {
            Sexp::list(keys.iter().map(|key| {
                let direction = match key.direction {
                    SortDirection::Asc => "asc",
                    SortDirection::Desc => "desc",
                };
                Sexp::node("orderby")
                    .field("column", key.column.sexp())
                    .field("direction", Sexp::atom(direction))
            }))
        });
        let pivot_by = self.pivot_by.as_ref().map(|pivot_by| {
            Sexp::node("pivotby").field(
                "columns",
                Sexp::list(pivot_by.columns.iter().map(|key| match key {
                    PivotKey::Index(i) => Sexp::atom(i),
                    PivotKey::Column(name) => Sexp::node("column").field("name", Sexp::string(name)),
                })),
            )
        });

        Sexp::node("select")
            .field("targets", targets)
            .opt("distinct", self.distinct.then(|| Sexp::atom("true")))
            .opt("from-clause", from)
            .opt("where-clause", self.where_clause.as_ref().map(Expr::sexp))
            .opt("group-by", group_by)
            .opt("order-by", order_by)
            .opt("pivot-by", pivot_by)
            .opt("limit", self.limit.map(Sexp::atom))
    }
}

impl FromFilter {
    fn sexp(&self) -> Sexp {
        Sexp::node("from")
            .opt("expression", self.expression.as_ref().map(Expr::sexp))
            .opt("open", self.open.map(|d| Sexp::atom(d.format("%Y-%m-%d"))))
            .opt(
                "close",
                self.close.map(|close| match close {
                    Boundary::Default => Sexp::atom("default"),
                    Boundary::On(d) => Sexp::atom(d.format("%Y-%m-%d")),
                }),
            )
            .opt("clear", self.clear.then(|| Sexp::atom("true")))
    }
}

impl ColumnKey {
    fn sexp(&self) -> Sexp {
        match self {
            Self::Index(i) => Sexp::atom(i),
            Self::Expr(expr) => expr.sexp(),
        }
    }
}

enum Sexp {
    Atom(String),
    List(Vec<Sexp>),
    Node(&'static str, Vec<(&'static str, Sexp)>),
}

impl Sexp {
    fn atom(value: impl Display) -> Self {
        Self::Atom(value.to_string())
    }

    fn string(value: &str) -> Self {
        Self::Atom(format!("'{value}'"))
    }

    fn list(items: impl Iterator<Item = Self>) -> Self {
        Self::List(items.collect())
    }

    const fn node(name: &'static str) -> Self {
        Self::Node(name, Vec::new())
    }

    fn field(mut self, name: &'static str, value: Self) -> Self {
        if let Self::Node(_, fields) = &mut self {
            fields.push((name, value));
        }
        self
    }

    fn opt(self, name: &'static str, value: Option<Self>) -> Self {
        match value {
            Some(value) => self.field(name, value),
            None => self,
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Atom(text) => text.clone(),
            Self::List(items) if items.is_empty() => "()".to_string(),
            Self::List(items) => {
                let body: Vec<String> = items.iter().map(Self::render).collect();
                format!("(\n{})", indent(&body.join("\n")))
            }
            Self::Node(name, fields) if fields.is_empty() => format!("({name})"),
            Self::Node(name, fields) => {
                let mut body = String::new();
                for (i, (field, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        body.push('\n');
                    }
                    let _ = write!(body, "{field}: {}", value.render());
                }
                format!("({name}\n{})", indent(&body))
            }
        }
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
