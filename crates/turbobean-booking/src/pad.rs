//! Pad directive amount calculation.
//!
//! A `pad` directive does not post anything by itself: it defers until the
//! next `balance` assertion seen on the same account, at which point the
//! difference between the account's actual balance and the asserted one is
//! realized as a synthetic two-posting transaction moving that difference
//! from the pad's source account. This module computes that difference; the
//! project solver owns deciding which `balance` a pending `pad` matches,
//! constructing and indexing the synthetic transaction, and flagging a pad
//! that never reaches a matching `balance` as unused.

use rust_decimal::Decimal;
use turbobean_core::{Amount, InternedStr};

/// The posting pair a realized pad produces: `amount` is credited to
/// `account` and its negation debited from `pad_from`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PadFill {
    /// Account being padded.
    pub account: InternedStr,
    /// Source account the difference is drawn from.
    pub pad_from: InternedStr,
    /// The amount credited to `account`.
    pub amount: Amount,
}

/// Compute the padding fill needed to bring `account`'s current balance in
/// `target`'s currency up to `target`, or `None` if the two already match
/// exactly (an exact match realizes no synthetic transaction at all).
#[must_use]
pub fn compute_pad(
    account: impl Into<InternedStr>,
    pad_from: impl Into<InternedStr>,
    current: Decimal,
    target: &Amount,
) -> Option<PadFill> {
    let difference = target.number - current;
    if difference.is_zero() {
        return None;
    }
    Some(PadFill {
        account: account.into(),
        pad_from: pad_from.into(),
        amount: Amount::new(difference, target.currency.clone()),
    })
}
