//! Beancount booking engine: interpolation, balancing, and lot dispatch.
//!
//! A transaction is booked in three passes, in order:
//!
//! 1. [`interpolate::interpolate`] fills in the single posting allowed to
//!    omit its amount.
//! 2. [`balance::weight_sums`]/[`balance::currency_tolerances`] decide
//!    whether the transaction balances; an out-of-tolerance residual is a
//!    [`turbobean_core::DiagnosticKind::TransactionDoesNotBalance`] and the
//!    entry must not affect the account tree.
//! 3. [`dispatch::post_one`] posts each already-complete posting into the
//!    tree, matching against held lots and realizing gain/loss where a
//!    `pnl` rule applies.
//!
//! [`pad::compute_pad`] is a separate, narrower calculation used by the
//! project solver when realizing a `pad` directive against a later
//! `balance` assertion.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod balance;
pub mod dispatch;
pub mod interpolate;
pub mod pad;

pub use balance::{currency_tolerances, is_balanced, weight, weight_sums};
pub use dispatch::{is_ancestor, post_one, PnlRule};
pub use interpolate::{interpolate, Interpolated};
pub use pad::{compute_pad, PadFill};

use turbobean_core::{IncompleteAmount, InternedStr, LotSpec, PostingRef, PriceAnnotation};

/// A posting's booking-relevant fields, detached from the file's
/// [`turbobean_core::PostingTable`] so interpolation, balancing, and
/// dispatch can all operate on an owned, mutable copy without re-borrowing
/// it for every pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingSnapshot {
    /// Index into the file's posting table this snapshot was taken from.
    pub idx: usize,
    /// This posting's account.
    pub account: InternedStr,
    /// The posting's amount, possibly incomplete before interpolation.
    pub units: Option<IncompleteAmount>,
    /// `@`/`@@` price annotation, if any.
    pub price: Option<PriceAnnotation>,
    /// `{...}` lot spec, if any.
    pub lot_spec: Option<LotSpec>,
    /// Per-posting flag, if any.
    pub flag: Option<char>,
}

impl PostingSnapshot {
    /// Build a snapshot from one row of a posting table.
    #[must_use]
    pub fn from_ref(idx: usize, posting: PostingRef<'_>) -> Self {
        Self {
            idx,
            account: posting.account().clone(),
            units: posting.units(),
            price: posting.price(),
            lot_spec: posting.lot_spec().cloned(),
            flag: posting.flag(),
        }
    }
}
