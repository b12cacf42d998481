//! Integration tests for the BQL parser.
//!
//! Tests cover complete statements, error reporting, rendering back to query
//! text, and serialization of the syntax tree.

use bql_parser::{
    parse, parse_spanned, parse_with_options, BinaryOperator, Boundary, ColumnKey, Expected, Expr, FromClause,
    FromFilter, LexErrorKind, Literal, OrderBy, ParseError, ParseOptions, Placeholder, Select,
    SortDirection, Statement, SyntaxErrorKind, Table, Targets, UnaryOperator,
};
use bql_parser::lexer::{Keyword, Symbol};
use chrono::NaiveDate;
use rust_decimal_macros::dec;

// ============================================================================
// Helper Functions
// ============================================================================

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn select(query: &str) -> Select {
    match parse(query) {
        Ok(Statement::Select(select)) => select,
        other => panic!("Expected SELECT for {query:?}, got {other:?}"),
    }
}

fn targets(query: &str) -> Vec<Expr> {
    match select(query).targets {
        Targets::List(targets) => targets.into_iter().map(|t| t.expr).collect(),
        Targets::Wildcard => panic!("Expected target list for {query:?}"),
    }
}

fn syntax_kind(query: &str) -> SyntaxErrorKind {
    match parse(query) {
        Err(ParseError::Syntax(err)) => err.kind,
        other => panic!("Expected syntax error for {query:?}, got {other:?}"),
    }
}

fn assert_reparses(query: &str) {
    let first = parse(query).unwrap();
    let rendered = first.to_string();
    let second = parse(&rendered)
        .unwrap_or_else(|err| panic!("Rendered {rendered:?} failed to parse: {err}"));
    assert_eq!(first, second, "rendered as {rendered:?}");
}

// ============================================================================
// Statement Tests
// ============================================================================

#[test]
fn test_parse_is_deterministic() {
    let query = "SELECT date, account, sum(position) FROM year = 2024 \
                 WHERE account ~ 'Expenses' GROUP BY 1, 2 ORDER BY date DESC LIMIT 5";
    assert_eq!(parse(query).unwrap(), parse(query).unwrap());
    assert_eq!(
        format!("{:?}", parse("SELECT FROM")),
        format!("{:?}", parse("SELECT FROM"))
    );
}

#[test]
fn test_wildcard_from_default_table() {
    let select = select("SELECT * FROM #");
    assert_eq!(select.targets, Targets::Wildcard);
    match select.from_clause {
        Some(FromClause::Table(table)) => assert!(table.is_default()),
        other => panic!("Expected table, got {other:?}"),
    }
}

#[test]
fn test_named_table() {
    assert_eq!(
        select("SELECT a FROM #postings").from_clause,
        Some(FromClause::Table(Table::new("postings")))
    );
}

#[test]
fn test_order_by_directions() {
    let select = select("SELECT a, b AS c ORDER BY a, b DESC");
    assert_eq!(
        select.order_by,
        Some(vec![
            OrderBy::asc(ColumnKey::Expr(Expr::column("a"))),
            OrderBy::desc(ColumnKey::Expr(Expr::column("b"))),
        ])
    );
    let Targets::List(targets) = select.targets else {
        panic!("Expected target list");
    };
    assert_eq!(targets[1].name.as_deref(), Some("c"));
}

#[test]
fn test_between_is_single_node() {
    let where_clause = select("SELECT 1 WHERE a BETWEEN 1 AND 10").where_clause;
    assert_eq!(
        where_clause,
        Some(Expr::between(
            Expr::column("a"),
            Expr::integer(1),
            Expr::integer(10)
        ))
    );
}

#[test]
fn test_unary_minus_binds_tighter_than_add() {
    assert_eq!(
        targets("SELECT -2 + 3"),
        vec![Expr::binary(
            Expr::unary(UnaryOperator::Neg, Expr::integer(2)),
            BinaryOperator::Add,
            Expr::integer(3),
        )]
    );
}

#[test]
fn test_count_arguments() {
    assert_eq!(
        targets("SELECT count(*), count(a)"),
        vec![
            Expr::function("count", vec![Expr::Wildcard]),
            Expr::function("count", vec![Expr::column("a")]),
        ]
    );
}

#[test]
fn test_balances_with_from_modifiers() {
    let statement = parse("BALANCES AT cost FROM OPEN ON 2020-01-01 CLOSE CLEAR").unwrap();
    let Statement::Balances(balances) = statement else {
        panic!("Expected BALANCES");
    };
    assert_eq!(balances.summary_func.as_deref(), Some("cost"));
    let from = balances.from_clause.unwrap();
    assert_eq!(from.expression, None);
    assert_eq!(from.open, Some(date(2020, 1, 1)));
    assert_eq!(from.close, Some(Boundary::Default));
    assert!(from.clear);
}

#[test]
fn test_list_and_parenthesized_column() {
    assert_eq!(
        select("SELECT a WHERE (1,2,3)").where_clause,
        Some(Expr::list(vec![
            Literal::Integer(1),
            Literal::Integer(2),
            Literal::Integer(3),
        ]))
    );
    assert_eq!(targets("SELECT (a)"), vec![Expr::column("a")]);
}

#[test]
fn test_in_list() {
    let where_clause = select("SELECT a WHERE currency NOT IN ('USD', 'EUR')").where_clause;
    assert_eq!(
        where_clause,
        Some(Expr::binary(
            Expr::column("currency"),
            BinaryOperator::NotIn,
            Expr::list(vec![Literal::string("USD"), Literal::string("EUR")]),
        ))
    );
}

#[test]
fn test_full_select() {
    let select = select(
        "SELECT DISTINCT account, sum(number) AS total \
         FROM has_account('Assets') OPEN ON 2024-01-01 CLOSE ON 2025-01-01 \
         WHERE number > 0.50 AND NOT account ~ 'Cash' \
         GROUP BY account HAVING sum(number) >= 100 \
         ORDER BY 2 DESC \
         PIVOT BY account, 2 \
         LIMIT 20;",
    );
    assert!(select.distinct);
    match select.from_clause {
        Some(FromClause::Filter(filter)) => {
            assert_eq!(
                filter.expression,
                Some(Expr::function("has_account", vec![Expr::string("Assets")]))
            );
            assert_eq!(filter.open, Some(date(2024, 1, 1)));
            assert_eq!(filter.close, Some(Boundary::On(date(2025, 1, 1))));
            assert!(!filter.clear);
        }
        other => panic!("Expected FROM filter, got {other:?}"),
    }
    assert_eq!(
        select.where_clause,
        Some(Expr::and(vec![
            Expr::binary(
                Expr::column("number"),
                BinaryOperator::Greater,
                Expr::decimal(dec!(0.50)),
            ),
            Expr::unary(
                UnaryOperator::Not,
                Expr::binary(
                    Expr::column("account"),
                    BinaryOperator::Match,
                    Expr::string("Cash"),
                ),
            ),
        ]))
    );
    let group_by = select.group_by.unwrap();
    assert_eq!(group_by.columns, vec![ColumnKey::Expr(Expr::column("account"))]);
    assert!(group_by.having.is_some());
    let order_by = select.order_by.unwrap();
    assert_eq!(order_by[0].column, ColumnKey::Index(2));
    assert_eq!(order_by[0].direction, SortDirection::Desc);
    assert!(select.pivot_by.is_some());
    assert_eq!(select.limit, Some(20));
}

#[test]
fn test_nested_from_subselect() {
    let outer = select("SELECT account FROM (SELECT account, position FROM #postings WHERE year = 2024)");
    let Some(FromClause::Subselect(inner)) = outer.from_clause else {
        panic!("Expected subselect");
    };
    assert_eq!(inner.from_clause, Some(FromClause::Table(Table::new("postings"))));
    assert!(inner.where_clause.is_some());
}

#[test]
fn test_journal_and_print() {
    let Statement::Journal(journal) = parse("JOURNAL \"Assets:Checking\" AT cost").unwrap() else {
        panic!("Expected JOURNAL");
    };
    assert_eq!(journal.account.as_deref(), Some("Assets:Checking"));
    assert_eq!(journal.summary_func.as_deref(), Some("cost"));
    assert_eq!(journal.from_clause, None);

    let Statement::Print(print) = parse("PRINT FROM year = 2024 CLEAR").unwrap() else {
        panic!("Expected PRINT");
    };
    assert_eq!(
        print.from_clause,
        Some(
            FromFilter::new()
                .filter(Expr::binary(
                    Expr::column("year"),
                    BinaryOperator::Equal,
                    Expr::integer(2024)
                ))
                .clear()
        )
    );
}

#[test]
fn test_comments_and_case() {
    let query = "select /* columns */ account\n  from #postings ; trailing comment";
    let select = select(query);
    assert_eq!(select.from_clause, Some(FromClause::Table(Table::new("postings"))));
}

#[test]
fn test_semicolon_comments_between_clauses() {
    let query = "SELECT account, ; the account\n  sum(position) ; and its total\nWHERE year = 2024 ;\nGROUP BY 1";
    assert_eq!(
        select(query),
        select("SELECT account, sum(position) WHERE year = 2024 GROUP BY 1")
    );
}

#[test]
fn test_statement_and_target_text() {
    let source = "SELECT date + 1";
    let statement = parse_spanned(source).unwrap();
    assert_eq!(statement.text(source), "SELECT date + 1");
    let Statement::Select(select) = statement.value else {
        panic!("Expected SELECT");
    };
    let Targets::List(targets) = select.targets else {
        panic!("Expected target list");
    };
    assert_eq!(targets[0].span.map(|span| span.text(source)), Some("date + 1"));

    // Targets built in code have no text.
    assert_eq!(bql_parser::Target::new(Expr::column("date")).span, None);
}

#[test]
fn test_placeholders_in_source_order() {
    let statement = parse("SELECT a WHERE date > %(start)s AND account ~ %s").unwrap();
    assert_eq!(
        statement.placeholders(),
        vec![
            &Placeholder::Named("start".to_string()),
            &Placeholder::Positional
        ]
    );
}

#[test]
fn test_walk_visits_subselects() {
    let statement = parse("SELECT a WHERE b IN (SELECT c FROM #t WHERE d)").unwrap();
    let mut columns = Vec::new();
    statement.walk_exprs(&mut |expr| {
        if let Expr::Column(name) = expr {
            columns.push(name.clone());
        }
    });
    assert_eq!(columns, vec!["a", "b", "c", "d"]);
}

// ============================================================================
// Error Tests
// ============================================================================

#[test]
fn test_select_from_error_location() {
    let err = parse("SELECT FROM").unwrap_err();
    assert_eq!(err.span().start, 7);
    assert_eq!(err.span().end, 11);
    assert_eq!(err.location().line, 1);
    assert_eq!(err.location().column, 8);
    let ParseError::Syntax(syntax) = &err else {
        panic!("Expected syntax error");
    };
    let SyntaxErrorKind::Unexpected { expected, found } = &syntax.kind else {
        panic!("Expected unexpected-token error");
    };
    assert_eq!(found, "`FROM`");
    assert!(expected.contains(&Expected::Expression));
    assert!(expected.contains(&Expected::Keyword(Keyword::Distinct)));
    assert!(expected.contains(&Expected::Symbol(Symbol::Star)));
}

#[test]
fn test_incomplete_clauses_are_errors() {
    for query in [
        "SELECT a, b FROM;",
        "SELECT a GROUP BY;",
        "SELECT a ORDER BY;",
        "SELECT a LIMIT;",
        "SELECT a WHERE;",
        "SELECT a GROUP a",
        "SELECT",
        "",
        "DELETE FROM #postings",
    ] {
        assert!(
            matches!(
                parse(query),
                Err(ParseError::Syntax(ref err))
                    if matches!(err.kind, SyntaxErrorKind::Unexpected { .. })
            ),
            "{query:?} should be a syntax error"
        );
    }
}

#[test]
fn test_pivot_arity_errors() {
    assert_eq!(syntax_kind("SELECT a PIVOT BY a;"), SyntaxErrorKind::PivotArity);
    assert_eq!(
        syntax_kind("SELECT a PIVOT BY a, b, c"),
        SyntaxErrorKind::PivotArity
    );
}

#[test]
fn test_chained_comparison_error() {
    assert_eq!(syntax_kind("SELECT a WHERE 1 < a < 3"), SyntaxErrorKind::ChainedComparison);
    assert_eq!(
        syntax_kind("SELECT a WHERE a = b IS NULL"),
        SyntaxErrorKind::ChainedComparison
    );
}

#[test]
fn test_invalid_date_error() {
    assert_eq!(
        syntax_kind("SELECT a WHERE date > 2024-13-01"),
        SyntaxErrorKind::InvalidDate("2024-13-01".to_string())
    );
}

#[test]
fn test_lex_errors() {
    let cases = [
        ("SELECT 'abc", LexErrorKind::UnterminatedString),
        ("SELECT a /* never closed", LexErrorKind::UnterminatedComment),
        ("SELECT a\nWHERE b = $", LexErrorKind::UnexpectedChar('$')),
    ];
    for (query, kind) in cases {
        match parse(query) {
            Err(ParseError::Lex(err)) => assert_eq!(err.kind, kind, "{query:?}"),
            other => panic!("Expected lex error for {query:?}, got {other:?}"),
        }
    }

    let err = parse("SELECT a\nWHERE b = $").unwrap_err();
    assert_eq!(err.location().line, 2);
    assert_eq!(err.location().column, 11);
}

#[test]
fn test_nesting_limit() {
    let deep = format!("SELECT a WHERE {}b", "NOT ".repeat(200));
    assert!(matches!(
        parse(&deep),
        Err(ParseError::Syntax(ref err)) if matches!(err.kind, SyntaxErrorKind::TooDeep(_))
    ));

    let options = ParseOptions::with_max_depth(4);
    assert!(parse_with_options("SELECT a", &options).is_ok());
    assert!(parse_with_options("SELECT ((((a))))", &options).is_err());
}

#[test]
fn test_error_report_rendering() {
    let source = "SELECT FROM";
    let err = parse(source).unwrap_err();
    let report = err.report(source, "query.bql");
    assert!(report.contains("got `FROM`"), "{report}");
    assert!(report.contains("query.bql"), "{report}");
    assert!(report.contains("unexpected token"), "{report}");

    let source = "SELECT a WHERE";
    let err = parse(source).unwrap_err();
    let report = err.report(source, "query.bql");
    assert!(report.contains("expected expression, got end of input"), "{report}");
}

#[test]
fn test_error_display() {
    let err = parse("SELECT FROM").unwrap_err();
    assert_eq!(
        err.to_string(),
        "expected `DISTINCT`, `*` or expression, got `FROM` at line 1, column 8"
    );
}

// ============================================================================
// Rendering and Serialization Tests
// ============================================================================

#[test]
fn test_display_round_trip() {
    for query in [
        "SELECT * FROM #",
        "SELECT DISTINCT a AS x, b + 1 FROM #postings",
        "SELECT a WHERE (a OR b) AND NOT c",
        "SELECT a WHERE a - (b - c) = 2 * (3 + 4)",
        "SELECT a WHERE a IS NOT NULL AND b !~ 'x' AND c NOT IN (1, 2.5, 2024-01-01)",
        "SELECT a WHERE a BETWEEN -1 AND 17. OR b IN ('x',)",
        "SELECT meta['key'].name, f(), g(*), h(1, \"two\") GROUP BY 1, (2) HAVING sum(x) > 0",
        "SELECT a ORDER BY a DESC, 2 PIVOT BY 1, b LIMIT 3",
        "SELECT a FROM year = 2024 OPEN ON 2024-01-01 CLOSE CLEAR WHERE x = %s",
        "SELECT a FROM (SELECT b FROM #t) WHERE a = (SELECT max(b))",
        "BALANCES AT cost FROM OPEN ON 2020-01-01 CLOSE ON 2021-01-01 CLEAR WHERE a",
        "JOURNAL 'Assets:Bank' AT units FROM CLOSE",
        "PRINT FROM CLEAR",
        "PRINT",
    ] {
        assert_reparses(query);
    }
}

#[test]
fn test_display_normalizes_query_text() {
    let statement = parse("select  a,b   from #t where (a)=1").unwrap();
    assert_eq!(statement.to_string(), "SELECT a, b FROM #t WHERE a = 1");
}

#[test]
fn test_serde_json_round_trip() {
    let statement = parse(
        "SELECT a, sum(b) AS total FROM year = 2024 CLOSE WHERE c > 1.5 \
         GROUP BY a ORDER BY total DESC LIMIT 1",
    )
    .unwrap();
    let json = serde_json::to_string(&statement).unwrap();
    let decoded: Statement = serde_json::from_str(&json).unwrap();
    assert_eq!(statement, decoded);
}

#[test]
fn test_statement_kind() {
    assert_eq!(parse("SELECT 1").unwrap().kind(), "select");
    assert_eq!(parse("BALANCES").unwrap().kind(), "balances");
    assert_eq!(parse("JOURNAL").unwrap().kind(), "journal");
    assert_eq!(parse("PRINT").unwrap().kind(), "print");
}

#[test]
fn test_parse_from_many_threads() {
    let query = "SELECT account, sum(position) WHERE year = 2024 GROUP BY 1";
    let expected = parse(query).unwrap();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4).map(|_| scope.spawn(|| parse(query))).collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), expected);
        }
    });
}
