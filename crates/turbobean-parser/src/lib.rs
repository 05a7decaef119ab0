//! Hand-written recursive-descent parser for Beancount source text.
//!
//! This crate tokenizes with a `logos`-generated lexer ([`lexer`], private)
//! and parses the token stream directly, without a combinator library. It
//! produces a stream of [`Directive`]s from source text, along with parse
//! errors and the option/include/plugin/pushtag/pushmeta side-tables a
//! directive list alone can't carry.
//!
//! # Features
//!
//! - Full Beancount syntax support (all 12 directive types plus `pnl`)
//! - Error recovery: a syntax error discards tokens up to the next
//!   column-0 newline and parsing resumes at the next entry
//! - Precise source locations for error reporting
//! - Support for includes, options, plugins, tag/meta stacks
//!
//! # Example
//!
//! ```
//! use turbobean_parser::parse;
//!
//! let source = r#"
//! 2024-01-15 * "Coffee Shop" "Morning coffee"
//!   Expenses:Food:Coffee  5.00 USD
//!   Assets:Cash
//! "#;
//!
//! let result = turbobean_parser::parse(source);
//! assert!(result.errors.is_empty());
//! assert_eq!(result.directives.len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod lexer;
mod parser;
mod span;

pub use error::{ParseError, ParseErrorKind};
pub use span::{Span, Spanned};

use turbobean_core::{Directive, PostingTable};

/// Result of parsing a beancount file.
#[derive(Debug)]
pub struct ParseResult {
    /// Successfully parsed directives.
    pub directives: Vec<Spanned<Directive>>,
    /// The postings referenced by every [`turbobean_core::Transaction`] in
    /// `directives`, shared across the whole file.
    pub postings: PostingTable,
    /// Options found in the file (`option "key" "value"`).
    pub options: Vec<(String, String, Span)>,
    /// Include directives found (`include "path"`).
    pub includes: Vec<(String, Span)>,
    /// Plugin directives found (`plugin "name" "config"?`).
    pub plugins: Vec<(String, Option<String>, Span)>,
    /// Parse errors encountered.
    pub errors: Vec<ParseError>,
}

/// Parse beancount source code.
///
/// The parser recovers from syntax errors by discarding tokens up to the
/// next newline at column 0 and resuming at the next entry, so `errors`
/// and `directives` may both be non-empty.
///
/// # Arguments
///
/// * `source` - The beancount source code to parse
///
/// # Returns
///
/// A `ParseResult` containing directives, postings, options, includes,
/// plugins, and errors.
pub fn parse(source: &str) -> ParseResult {
    parser::parse(source)
}

/// Parse beancount source code, returning only directives, their shared
/// posting table, and errors.
///
/// This is a simpler interface when the caller doesn't need
/// options/includes/plugins.
pub fn parse_directives(source: &str) -> (Vec<Spanned<Directive>>, PostingTable, Vec<ParseError>) {
    let result = parse(source);
    (result.directives, result.postings, result.errors)
}
