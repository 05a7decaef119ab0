//! Core data model for TurboBean's Beancount pipeline.
//!
//! This crate provides the fundamental types shared by the lexer, parser,
//! booking engine, and project solver:
//!
//! - [`Amount`] / [`Number`] — a decimal number with (for `Amount`) a currency.
//! - [`Cost`] / [`CostSpec`] — acquisition cost of a lot, and a pattern used
//!   to match or create one.
//! - [`Position`] — units held at an optional cost.
//! - [`Inventory`] — the two inventory kinds ([`InventoryKind::Plain`] and
//!   [`InventoryKind::Lots`]) with FIFO/LIFO/STRICT booking.
//! - [`Directive`] — all directive variants (Transaction, Balance, Open, ...).
//! - [`PostingTable`] — the columnar per-file posting storage.
//! - [`AccountTree`] — the hierarchical account graph with per-node inventory.
//! - [`PriceTable`] — direct currency-pair conversion.
//! - [`Diagnostic`] / [`DiagnosticKind`] — the unified error/warning taxonomy.
//!
//! ```
//! use turbobean_core::{Amount, Cost, Position, Inventory, InventoryKind, BookingMethod};
//! use rust_decimal_macros::dec;
//! use chrono::NaiveDate;
//!
//! let mut inv = Inventory::new(InventoryKind::Lots);
//!
//! let cost = Cost::new(dec!(150.00), "USD")
//!     .with_date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
//! inv.add(Position::with_cost(Amount::new(dec!(10), "AAPL"), cost));
//! assert_eq!(inv.units("AAPL"), dec!(10));
//!
//! let result = inv
//!     .reduce(&Amount::new(dec!(-5), "AAPL"), None, BookingMethod::Fifo)
//!     .unwrap();
//! assert_eq!(inv.units("AAPL"), dec!(5));
//! assert_eq!(result.cost_basis.unwrap().number, dec!(750.00));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod account_tree;
pub mod amount;
pub mod cost;
pub mod date;
pub mod diagnostic;
pub mod directive;
pub mod intern;
pub mod inventory;
pub mod position;
pub mod prices;
pub mod span;

pub use account_tree::{AccountNode, AccountTree};
pub use amount::{Amount, IncompleteAmount};
pub use cost::{Cost, CostSpec};
pub use date::DateExt;
pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use directive::{
    sort_directives, Balance, Close, Commodity, Custom, Directive, DirectivePriority, Document,
    Event, LotSpec, MetaValue, Metadata, Note, Open, Pad, Pnl, PostingRange, PostingRef,
    PostingRow, PostingTable, Price as PriceDirective, PriceAnnotation, PriceKind, Query,
    Transaction, TransactionBuilder,
};
pub use intern::{AccountInterner, CurrencyInterner, InternedStr, StringInterner};
pub use inventory::{BookingError, BookingMethod, BookingResult, Inventory, InventoryKind};
pub use position::Position;
pub use prices::PriceTable;
pub use span::{Span, Spanned};

// Re-export commonly used external types: use the ecosystem's decimal/date
// crates directly rather than hand-rolled equivalents.
pub use chrono::NaiveDate;
pub use rust_decimal::Decimal;

/// A signed decimal with explicit precision. Alias for [`rust_decimal::Decimal`].
pub type Number = Decimal;

/// A calendar date. Alias for [`chrono::NaiveDate`].
pub type Date = NaiveDate;
