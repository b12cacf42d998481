//! Snapshot tests for the s-expression dump of parsed queries.

use bql_parser::parse;

fn sexp(query: &str) -> String {
    parse(query).unwrap().to_sexp()
}

#[test]
fn test_select_sexp() {
    insta::assert_snapshot!(
        sexp("SELECT a, sum(b) AS total FROM #postings WHERE a = 'x' GROUP BY 1 ORDER BY 2 DESC LIMIT 10"),
        @r"
    (select
      targets: (
        (target
          expr: (column
            name: 'a'))
        (target
          expr: (function
            name: 'sum'
            args: (
              (column
                name: 'b')))
          name: 'total'))
      from-clause: (table
        name: 'postings')
      where-clause: (equal
        left: (column
          name: 'a')
        right: (constant
          value: 'x'))
      group-by: (groupby
        columns: (
          1))
      order-by: (
        (orderby
          column: 2
          direction: desc))
      limit: 10)
    "
    );
}

#[test]
fn test_wildcard_sexp() {
    insta::assert_snapshot!(sexp("SELECT DISTINCT * FROM #"), @r"
    (select
      targets: *
      distinct: true
      from-clause: (table
        name: ''))
    ");
}

#[test]
fn test_expression_sexp() {
    insta::assert_snapshot!(
        sexp("SELECT a WHERE NOT b IS NULL OR c BETWEEN 1 AND 2.5 OR d NOT IN (1, 2)"),
        @r"
    (select
      targets: (
        (target
          expr: (column
            name: 'a')))
      where-clause: (or
        args: (
          (not
            operand: (isnull
              operand: (column
                name: 'b')))
          (between
            operand: (column
              name: 'c')
            lower: (constant
              value: 1)
            upper: (constant
              value: 2.5))
          (notin
            left: (column
              name: 'd')
            right: (constant
              value: (1, 2))))))
    "
    );
}

#[test]
fn test_balances_sexp() {
    insta::assert_snapshot!(
        sexp("BALANCES AT cost FROM OPEN ON 2020-01-01 CLOSE CLEAR"),
        @r"
    (balances
      summary-func: 'cost'
      from-clause: (from
        open: 2020-01-01
        close: default
        clear: true))
    "
    );
}

#[test]
fn test_journal_sexp() {
    insta::assert_snapshot!(sexp("JOURNAL 'Assets:Bank' FROM year = 2024"), @r"
    (journal
      account: 'Assets:Bank'
      from-clause: (from
        expression: (equal
          left: (column
            name: 'year')
          right: (constant
            value: 2024))))
    ");
}

#[test]
fn test_print_sexp() {
    insta::assert_snapshot!(sexp("PRINT"), @"(print)");
}

#[test]
fn test_postfix_and_placeholder_sexp() {
    insta::assert_snapshot!(
        parse("SELECT meta['k'].v + %(x)s").unwrap().to_sexp(),
        @r"
    (select
      targets: (
        (target
          expr: (add
            left: (attribute
              operand: (subscript
                operand: (column
                  name: 'meta')
                key: 'k')
              name: 'v')
            right: (placeholder
              name: 'x')))))
    "
    );
}
