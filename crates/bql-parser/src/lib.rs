//! Beancount Query Language (BQL) parser.
//!
//! This crate turns BQL query text into a typed syntax tree.
//!
//! # Overview
//!
//! BQL is a SQL-like language for querying the postings of a Beancount
//! ledger. The parser accepts exactly one statement per call and reports
//! the first error with its location and the tokens that would have been
//! accepted there. `;` starts a comment that runs to the end of the line.
//!
//! # Statement Types
//!
//! - `SELECT` - General purpose queries with filtering, grouping, ordering and pivoting
//! - `BALANCES` - Shorthand for account balance tables
//! - `JOURNAL` - Shorthand for account statements
//! - `PRINT` - Output filtered entries in Beancount syntax
//!
//! # Example
//!
//! ```
//! use bql_parser::{parse, Statement};
//!
//! let query = parse("SELECT account, sum(position) WHERE account ~ 'Expenses:' GROUP BY account").unwrap();
//! assert!(matches!(query, Statement::Select(_)));
//! println!("{}", query.to_sexp());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
mod render;
mod span;
mod walk;

pub use ast::*;
pub use error::{
    Expected, LexError, LexErrorKind, ParseError, SyntaxError, SyntaxErrorKind,
};
pub use parser::{parse, parse_spanned, parse_with_options, ParseOptions, DEFAULT_MAX_DEPTH};
pub use span::{Location, Span, Spanned};
