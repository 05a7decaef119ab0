//! Posting one leg of a transaction into the account tree.

use rust_decimal::Decimal;
use turbobean_core::{
    Amount, AccountTree, BookingError, BookingMethod, DiagnosticKind, InternedStr, NaiveDate,
    Position,
};

use crate::balance::annotation_unit_price;
use crate::PostingSnapshot;

/// Registers that reduces against `from_account` (or any descendant) realize
/// their gain or loss into `to_account`, per a `pnl` directive.
#[derive(Debug, Clone)]
pub struct PnlRule {
    /// The account (or ancestor of it) whose reduces are tracked.
    pub from_account: InternedStr,
    /// Where the realized gain/loss is posted.
    pub to_account: InternedStr,
}

/// True if `account` is `ancestor` itself or one of its colon-separated
/// descendants.
#[must_use]
pub fn is_ancestor(ancestor: &str, account: &str) -> bool {
    account == ancestor || account.starts_with(ancestor) && account[ancestor.len()..].starts_with(':')
}

/// Post one already-interpolated posting into the tree, returning any
/// diagnostics raised along the way.
///
/// A posting is lot-path only when it carries a price or lot-spec
/// annotation *and* targets a booked (non-plain) account; otherwise it's
/// plain-path, even if it happens to carry an annotation (the annotation
/// then affects balancing only, never lot matching).
pub fn post_one(
    tree: &mut AccountTree,
    posting: &PostingSnapshot,
    date: NaiveDate,
    pnl_rules: &[PnlRule],
) -> Vec<DiagnosticKind> {
    let Some(amount) = posting.units.as_ref().and_then(|u| u.as_amount()).cloned() else {
        return Vec::new();
    };

    let Some(node) = tree.get(posting.account.as_str()) else {
        return vec![DiagnosticKind::AccountNotOpen {
            account: posting.account.clone(),
        }];
    };
    if !node.is_open() {
        return vec![DiagnosticKind::AccountNotOpen {
            account: posting.account.clone(),
        }];
    }
    if !node.allows_currency(&amount.currency) {
        return vec![DiagnosticKind::DoesNotHoldCurrency {
            account: posting.account.clone(),
            currency: amount.currency,
        }];
    }

    let booking = node.booking;
    if booking == BookingMethod::Plain && posting.lot_spec.as_ref().is_some_and(|spec| !spec.is_empty()) {
        // A `{...}` lot spec names cost/date/label fields that only mean
        // something against a booked inventory; a plain account has nowhere
        // to store them. A bare `@`/`@@` price with no `{}` is fine here
        // (scenario: plain currency conversion) and stays plain-path below.
        return vec![DiagnosticKind::RequiresBookedAccount {
            account: posting.account.clone(),
        }];
    }

    let has_annotation = posting.price.is_some() || posting.lot_spec.is_some();
    let is_lot_path = has_annotation && booking != BookingMethod::Plain;

    if is_lot_path {
        book_lot_posting(tree, posting, &amount, date, booking, pnl_rules)
    } else {
        tree.post(posting.account.as_str(), Position::simple(amount));
        Vec::new()
    }
}

fn booking_error_to_diagnostic(error: BookingError, method: BookingMethod) -> DiagnosticKind {
    match error {
        BookingError::AmbiguousMatch { currency, .. } if method == BookingMethod::Strict => {
            DiagnosticKind::AmbiguousStrictBooking { currency }
        }
        BookingError::AmbiguousMatch { currency, .. } => {
            DiagnosticKind::LotSpecAmbiguousMatch { currency }
        }
        BookingError::NoMatchingLot { currency, .. } => DiagnosticKind::LotSpecNoMatch { currency },
        BookingError::CurrencyMismatch { expected, .. } => {
            DiagnosticKind::LotSpecNoMatch { currency: expected }
        }
    }
}

fn book_lot_posting(
    tree: &mut AccountTree,
    posting: &PostingSnapshot,
    amount: &Amount,
    date: NaiveDate,
    booking: BookingMethod,
    pnl_rules: &[PnlRule],
) -> Vec<DiagnosticKind> {
    let Some(node) = tree.get_mut(posting.account.as_str()) else {
        return vec![DiagnosticKind::AccountNotOpen {
            account: posting.account.clone(),
        }];
    };

    // `match_spec` carries only the components an explicit `{...}` lot spec
    // names: it narrows which *existing* lot this reduces, so it must never
    // fold in the price annotation (a sale price isn't a property of the
    // lot being sold, and filtering matches by it would make a crossing
    // reduce against lots from an earlier price invisible to matching).
    let match_spec = posting
        .lot_spec
        .as_ref()
        .map(turbobean_core::LotSpec::to_cost_spec)
        .unwrap_or_default();

    // Any units with no opposite-sign lot to match against — a pure
    // augment, or the remainder once a crossing reduce has consumed every
    // opposite lot — open a new lot in the posting's own direction. That
    // new lot's cost defaults from the price annotation and the
    // transaction date whenever the lot spec didn't already pin them down.
    let new_lot_cost = resolve_new_lot_cost(&match_spec, posting, amount, date);

    let result = match node
        .inventory_mut()
        .reduce_with_new_lot_cost(amount, Some(&match_spec), new_lot_cost.as_ref(), booking)
    {
        Ok(result) => result,
        // `LotSpecMatchTooSmall` is never produced here: the engine always
        // completes a short match by crossing (see `Inventory::reduce`),
        // never by rejecting it outright.
        Err(err) => return vec![booking_error_to_diagnostic(err, booking)],
    };

    let Some(cost_basis) = result.cost_basis else {
        return Vec::new();
    };

    realize_pnl(tree, posting, amount, &result.matched, &cost_basis, pnl_rules)
}

/// Resolve the cost default a newly opened lot falls back to when the lot
/// spec itself doesn't pin a given field down: price and currency from the
/// `@`/`@@` annotation, date from the transaction. `Inventory`'s crossing
/// logic merges this field-by-field against the lot spec's own components,
/// which always take priority where present.
///
/// Returns `None` when there is no price annotation to fall back to (a
/// lot spec with its own complete cost doesn't need this at all; one with
/// no cost information anywhere yields a legitimately costless lot, e.g.
/// an uncosted short).
fn resolve_new_lot_cost(
    match_spec: &turbobean_core::CostSpec,
    posting: &PostingSnapshot,
    amount: &Amount,
    date: NaiveDate,
) -> Option<turbobean_core::Cost> {
    let (price, currency) = posting
        .price
        .as_ref()
        .and_then(|annotation| annotation_unit_price(annotation, amount.number))?;

    Some(turbobean_core::Cost {
        number: price,
        currency,
        date: Some(match_spec.date.unwrap_or(date)),
        label: match_spec.label.clone(),
    })
}

fn realize_pnl(
    tree: &mut AccountTree,
    posting: &PostingSnapshot,
    amount: &Amount,
    matched: &[turbobean_core::Position],
    cost_basis: &Amount,
    pnl_rules: &[PnlRule],
) -> Vec<DiagnosticKind> {
    let Some(rule) = pnl_rules
        .iter()
        .find(|rule| is_ancestor(&rule.from_account, posting.account.as_str()))
    else {
        return Vec::new();
    };
    let Some(annotation) = &posting.price else {
        return Vec::new();
    };
    let Some((sale_price, sale_currency)) = annotation_unit_price(annotation, amount.number) else {
        return Vec::new();
    };
    if sale_currency != cost_basis.currency {
        return Vec::new();
    }

    let consumed: Decimal = matched.iter().map(|pos| pos.units.number.abs()).sum();
    if consumed.is_zero() {
        return Vec::new();
    }
    let gain = consumed * sale_price - cost_basis.number;
    if gain.is_zero() {
        return Vec::new();
    }

    let gain_position = Position::simple(Amount::new(-gain, sale_currency));
    match tree.get_mut(rule.to_account.as_str()) {
        Some(to_node) if to_node.is_open() => {
            to_node.inventory_mut().add(gain_position);
            Vec::new()
        }
        _ => vec![DiagnosticKind::AccountNotOpen {
            account: rule.to_account.clone(),
        }],
    }
}
