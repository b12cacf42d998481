//! Post-order traversal over expression nodes.
//!
//! Children are visited left to right before their parent, so the visit
//! order of leaves matches their order in the query text.

use crate::ast::{
    Balances, ColumnKey, Expr, FromClause, FromFilter, Journal, Placeholder, Print, Select,
    Statement, Targets,
};

impl Expr {
    /// Visit this expression and every expression nested in it, children
    /// first. Subselects are descended into.
    pub fn walk<'a, F: FnMut(&'a Self)>(&'a self, visit: &mut F) {
        match self {
            Self::Wildcard | Self::Column(_) | Self::Constant(_) | Self::Placeholder(_) => {}
            Self::Function(function) => {
                for arg in &function.args {
                    arg.walk(visit);
                }
            }
            Self::Attribute(attribute) => attribute.operand.walk(visit),
            Self::Subscript(subscript) => subscript.operand.walk(visit),
            Self::UnaryOp(unary) => unary.operand.walk(visit),
            Self::BinaryOp(binary) => {
                binary.left.walk(visit);
                binary.right.walk(visit);
            }
            Self::BoolOp(bool_op) => {
                for arg in &bool_op.args {
                    arg.walk(visit);
                }
            }
            Self::Between(between) => {
                between.operand.walk(visit);
                between.lower.walk(visit);
                between.upper.walk(visit);
            }
            Self::Subselect(select) => select.walk_exprs(visit),
        }
        visit(self);
    }
}

impl Select {
    /// Visit every expression in the query, clause by clause in source order.
    pub fn walk_exprs<'a, F: FnMut(&'a Expr)>(&'a self, visit: &mut F) {
        if let Targets::List(targets) = &self.targets {
            for target in targets {
                target.expr.walk(visit);
            }
        }
        match &self.from_clause {
            Some(FromClause::Subselect(select)) => select.walk_exprs(visit),
            Some(FromClause::Filter(filter)) => filter.walk_exprs(visit),
            Some(FromClause::Table(_)) | None => {}
        }
        if let Some(expr) = &self.where_clause {
            expr.walk(visit);
        }
        if let Some(group_by) = &self.group_by {
            walk_keys(&group_by.columns, visit);
            if let Some(having) = &group_by.having {
                having.walk(visit);
            }
        }
        if let Some(order_by) = &self.order_by {
            for key in order_by {
                if let ColumnKey::Expr(expr) = &key.column {
                    expr.walk(visit);
                }
            }
        }
    }
}

impl FromFilter {
    /// Visit the filter expression, if any.
    pub fn walk_exprs<'a, F: FnMut(&'a Expr)>(&'a self, visit: &mut F) {
        if let Some(expr) = &self.expression {
            expr.walk(visit);
        }
    }
}

impl Statement {
    /// Visit every expression in the statement, children first.
    pub fn walk_exprs<'a, F: FnMut(&'a Expr)>(&'a self, visit: &mut F) {
        match self {
            Self::Select(select) => select.walk_exprs(visit),
            Self::Balances(Balances {
                from_clause,
                where_clause,
                ..
            }) => {
                if let Some(filter) = from_clause {
                    filter.walk_exprs(visit);
                }
                if let Some(expr) = where_clause {
                    expr.walk(visit);
                }
            }
            Self::Journal(Journal { from_clause, .. }) | Self::Print(Print { from_clause }) => {
                if let Some(filter) = from_clause {
                    filter.walk_exprs(visit);
                }
            }
        }
    }

    /// All placeholders in the statement, in source order.
    pub fn placeholders(&self) -> Vec<&Placeholder> {
        let mut found = Vec::new();
        self.walk_exprs(&mut |expr| {
            if let Expr::Placeholder(placeholder) = expr {
                found.push(placeholder);
            }
        });
        found
    }
}

fn walk_keys<'a, F: FnMut(&'a Expr)>(keys: &'a [ColumnKey], visit: &mut F) {
    for key in keys {
        if let ColumnKey::Expr(expr) = key {
            expr.walk(visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOperator, Target, UnaryOperator};

    fn names(expr: &Expr) -> Vec<String> {
        let mut out = Vec::new();
        expr.walk(&mut |e| {
            out.push(match e {
                Expr::Column(name) => name.clone(),
                Expr::BinaryOp(op) => format!("{:?}", op.op),
                Expr::UnaryOp(op) => format!("{:?}", op.op),
                other => format!("{other:?}"),
            });
        });
        out
    }

    #[test]
    fn test_walk_is_post_order() {
        let expr = Expr::binary(
            Expr::unary(UnaryOperator::Neg, Expr::column("a")),
            BinaryOperator::Add,
            Expr::column("b"),
        );
        assert_eq!(names(&expr), vec!["a", "Neg", "b", "Add"]);
    }

    #[test]
    fn test_walk_descends_into_subselect() {
        let inner = Select::new(Targets::List(vec![Target::new(Expr::column("x"))]))
            .where_clause(Expr::column("y"));
        let expr = Expr::subselect(inner);
        let mut columns = Vec::new();
        expr.walk(&mut |e| {
            if let Expr::Column(name) = e {
                columns.push(name.as_str());
            }
        });
        assert_eq!(columns, vec!["x", "y"]);
    }

    #[test]
    fn test_placeholders_in_order() {
        let select = Select::new(Targets::List(vec![Target::new(Expr::Placeholder(
            Placeholder::Named("first".to_string()),
        ))]))
        .where_clause(Expr::binary(
            Expr::column("a"),
            BinaryOperator::Equal,
            Expr::Placeholder(Placeholder::Positional),
        ));
        let statement = Statement::Select(select);
        assert_eq!(
            statement.placeholders(),
            vec![
                &Placeholder::Named("first".to_string()),
                &Placeholder::Positional
            ]
        );
    }
}
