//! Transaction balancing: per-currency weight sums and tolerances.
//!
//! A transaction balances when the signed "weight" of its postings sums to
//! (approximately) zero in every currency it touches. Weight is not always
//! the posting's own units: a price annotation or lot-spec cost converts a
//! posting into the currency it actually affects for balancing purposes.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::Signed;
use turbobean_core::{Amount, InternedStr, NaiveDate};

use crate::PostingSnapshot;

/// The per-unit price implied by a price annotation, in the annotation's
/// currency. `units` is the posting's signed amount, needed to turn a total
/// price into a per-unit one.
pub(crate) fn annotation_unit_price(
    annotation: &turbobean_core::PriceAnnotation,
    units: Decimal,
) -> Option<(Decimal, InternedStr)> {
    use turbobean_core::PriceAnnotation::{Total, TotalEmpty, TotalIncomplete, Unit, UnitEmpty, UnitIncomplete};

    match annotation {
        Unit(price) => Some((price.number, price.currency.clone())),
        Total(price) => {
            if units.is_zero() {
                None
            } else {
                Some((price.number / units.abs(), price.currency.clone()))
            }
        }
        UnitIncomplete(inc) => inc.as_amount().map(|p| (p.number, p.currency.clone())),
        TotalIncomplete(inc) => inc.as_amount().and_then(|p| {
            if units.is_zero() {
                None
            } else {
                Some((p.number / units.abs(), p.currency.clone()))
            }
        }),
        UnitEmpty | TotalEmpty => None,
    }
}

/// The weight a posting contributes to its transaction's balance, or `None`
/// if its amount isn't known yet (the auto-leg before interpolation).
///
/// - Plain posting: weight is the units themselves.
/// - `@`/`@@` price: weight is converted into the price's currency.
/// - Lot spec with a cost but no price: the implied cost acts as the price.
#[must_use]
pub fn weight(posting: &PostingSnapshot, date: NaiveDate) -> Option<Amount> {
    let units = posting.units.as_ref()?.as_amount()?.clone();

    if let Some(annotation) = &posting.price {
        if let Some((price, currency)) = annotation_unit_price(annotation, units.number) {
            return Some(Amount::new(units.number * price, currency));
        }
        return Some(units);
    }

    if let Some(lot_spec) = &posting.lot_spec {
        let cost_spec = lot_spec.to_cost_spec();
        if let Some(cost) = cost_spec.resolve(units.number, date) {
            return Some(Amount::new(units.number * cost.number, cost.currency));
        }
    }

    Some(units)
}

/// The per-currency sum of every posting's [`weight`] that is already known.
/// This *is* the residual: a balanced transaction has every entry at (or
/// within tolerance of) zero.
#[must_use]
pub fn weight_sums(postings: &[PostingSnapshot], date: NaiveDate) -> HashMap<InternedStr, Decimal> {
    let mut sums = HashMap::new();
    for posting in postings {
        if let Some(amount) = weight(posting, date) {
            *sums.entry(amount.currency).or_insert(Decimal::ZERO) += amount.number;
        }
    }
    sums
}

/// Per-currency tolerance: `0.5 × 10^(-scale)` of the most precise weight
/// posted in that currency, maximized across postings (generalizes
/// `Amount::inferred_tolerance` from a single amount to the whole
/// transaction).
#[must_use]
pub fn currency_tolerances(
    postings: &[PostingSnapshot],
    date: NaiveDate,
) -> HashMap<InternedStr, Decimal> {
    let mut tolerances: HashMap<InternedStr, Decimal> = HashMap::new();
    for posting in postings {
        if let Some(amount) = weight(posting, date) {
            let tol = amount.inferred_tolerance();
            tolerances
                .entry(amount.currency)
                .and_modify(|t| *t = (*t).max(tol))
                .or_insert(tol);
        }
    }
    tolerances
}

/// Whether every currency's weight sum is within its tolerance of zero.
#[must_use]
#[allow(clippy::implicit_hasher)]
pub fn is_balanced(
    sums: &HashMap<InternedStr, Decimal>,
    tolerances: &HashMap<InternedStr, Decimal>,
) -> bool {
    sums.iter().all(|(currency, residual)| {
        let tolerance = tolerances.get(currency).copied().unwrap_or(Decimal::ZERO);
        residual.abs() <= tolerance
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use turbobean_core::{IncompleteAmount, LotSpec, PriceAnnotation};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn plain(account: &str, number: Decimal, currency: &str) -> PostingSnapshot {
        PostingSnapshot {
            idx: 0,
            account: account.into(),
            units: Some(IncompleteAmount::Complete(Amount::new(number, currency))),
            price: None,
            lot_spec: None,
            flag: None,
        }
    }

    #[test]
    fn plain_postings_balance() {
        let postings = vec![
            plain("Expenses:Food", dec!(50.00), "USD"),
            plain("Assets:Cash", dec!(-50.00), "USD"),
        ];
        let sums = weight_sums(&postings, date());
        assert_eq!(sums.get("USD"), Some(&Decimal::ZERO));
    }

    #[test]
    fn unit_price_converts_into_price_currency() {
        let mut usd = plain("Assets:USD", dec!(-100.00), "USD");
        usd.price = Some(PriceAnnotation::Unit(Amount::new(dec!(0.85), "EUR")));
        let eur = plain("Assets:EUR", dec!(85.00), "EUR");

        let sums = weight_sums(&[usd, eur], date());
        assert_eq!(sums.get("EUR"), Some(&Decimal::ZERO));
        assert!(sums.get("USD").is_none());
    }

    #[test]
    fn total_price_flips_sign_to_match_units() {
        let mut usd = plain("Assets:USD", dec!(-100.00), "USD");
        usd.price = Some(PriceAnnotation::Total(Amount::new(dec!(85.00), "EUR")));
        let eur = plain("Assets:EUR", dec!(85.00), "EUR");

        let sums = weight_sums(&[usd, eur], date());
        assert_eq!(sums.get("EUR"), Some(&Decimal::ZERO));
    }

    #[test]
    fn lot_spec_cost_acts_as_inferred_price() {
        let mut stock = plain("Assets:Stock", dec!(10), "AAPL");
        stock.lot_spec = Some(LotSpec {
            cost: Some((dec!(150.00), "USD".into())),
            ..LotSpec::empty()
        });
        let cash = plain("Assets:Cash", dec!(-1500.00), "USD");

        let sums = weight_sums(&[stock, cash], date());
        assert_eq!(sums.get("USD"), Some(&Decimal::ZERO));
    }

    #[test]
    fn auto_leg_contributes_nothing_until_filled() {
        let auto = PostingSnapshot {
            idx: 1,
            account: "Assets:Cash".into(),
            units: None,
            price: None,
            lot_spec: None,
            flag: None,
        };
        let known = plain("Expenses:Food", dec!(50.00), "USD");

        let sums = weight_sums(&[known, auto], date());
        assert_eq!(sums.get("USD"), Some(&dec!(50.00)));
    }

    #[test]
    fn tolerance_scales_with_precision() {
        let postings = vec![
            plain("Expenses:Food", dec!(50.00), "USD"),
            plain("Assets:Cash", dec!(-50.000), "USD"),
        ];
        let tolerances = currency_tolerances(&postings, date());
        // max(scale 2, scale 3) -> the finer precision wins, tolerance 0.0005
        assert_eq!(tolerances.get("USD"), Some(&dec!(0.0005)));
    }

    #[test]
    fn is_balanced_respects_tolerance() {
        let mut sums = HashMap::new();
        sums.insert(InternedStr::new("USD"), dec!(0.004));
        let mut tolerances = HashMap::new();
        tolerances.insert(InternedStr::new("USD"), dec!(0.005));
        assert!(is_balanced(&sums, &tolerances));

        sums.insert(InternedStr::new("USD"), dec!(0.01));
        assert!(!is_balanced(&sums, &tolerances));
    }
}
