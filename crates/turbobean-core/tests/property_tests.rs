//! Property-based tests for the lots [`Inventory`]'s booking invariants.
//!
//! These check the universal properties from the booking design note
//! (sign invariant, crossing equivalence) hold for arbitrary sequences of
//! augment/reduce operations, not just the handful of worked examples in
//! the unit tests.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use turbobean_core::{Amount, BookingMethod, Cost, CostSpec, Inventory, InventoryKind, Position};

fn arb_decimal() -> impl Strategy<Value = Decimal> {
    (-10_000i64..10_000i64).prop_map(|n| Decimal::new(n, 2))
}

fn arb_nonzero_decimal() -> impl Strategy<Value = Decimal> {
    (1i64..10_000i64).prop_map(|n| Decimal::new(n, 2))
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (2020i32..2025i32, 1u32..13u32, 1u32..28u32)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn arb_method() -> impl Strategy<Value = BookingMethod> {
    prop_oneof![
        Just(BookingMethod::Fifo),
        Just(BookingMethod::Lifo),
        Just(BookingMethod::Strict),
    ]
}

/// All lots of one currency in a [`InventoryKind::Lots`] inventory carry
/// the same sign, at every step of an arbitrary augment/reduce sequence.
///
/// Corresponds to the "Sign invariant" universal property: a lots
/// inventory holds either longs or shorts for a commodity, never both.
fn same_sign_after_each_step(method: BookingMethod, steps: Vec<(Decimal, Decimal, NaiveDate)>) {
    let mut inv = Inventory::new(InventoryKind::Lots);

    for (signed_units, cost_price, date) in steps {
        if signed_units.is_zero() {
            continue;
        }
        let cost = Cost::new(cost_price, "USD").with_date(date);
        let held_sign = inv.units("AAPL").signum();
        let posting_sign = signed_units.signum();

        if held_sign.is_zero() || held_sign == posting_sign {
            inv.add(Position::with_cost(Amount::new(signed_units, "AAPL"), cost));
        } else {
            let spec = CostSpec::empty();
            inv.reduce(&Amount::new(signed_units, "AAPL"), Some(&spec), method)
                .unwrap();
        }

        let signs: Vec<Decimal> = inv
            .positions()
            .iter()
            .filter(|p| !p.is_empty() && p.units.currency == "AAPL")
            .map(|p| p.units.number.signum())
            .collect();
        if let Some(first) = signs.first() {
            for s in &signs {
                assert_eq!(s, first, "lots of one currency must share a sign");
            }
        }
    }
}

proptest! {
    #[test]
    fn sign_invariant_holds_under_fifo(
        steps in prop::collection::vec((arb_nonzero_decimal(), arb_nonzero_decimal(), arb_date()), 1..12)
    ) {
        // A third of the steps flip sign to exercise crossing as well as
        // plain augment/reduce in the same direction.
        let steps: Vec<_> = steps
            .into_iter()
            .enumerate()
            .map(|(i, (units, price, date))| {
                let units = if i % 3 == 0 { -units } else { units };
                (units, price, date)
            })
            .collect();
        same_sign_after_each_step(BookingMethod::Fifo, steps);
    }

    #[test]
    fn sign_invariant_holds_under_any_method(
        method in arb_method(),
        steps in prop::collection::vec((arb_nonzero_decimal(), arb_nonzero_decimal(), arb_date()), 1..12)
    ) {
        let steps: Vec<_> = steps
            .into_iter()
            .enumerate()
            .map(|(i, (units, price, date))| {
                let units = if i % 2 == 0 { -units } else { units };
                (units, price, date)
            })
            .collect();
        same_sign_after_each_step(method, steps);
    }

    /// Reducing past every held unit of the opposite side is equivalent to
    /// reducing to zero and then augmenting with the remainder: the
    /// post-crossing inventory holds exactly the remainder, at the
    /// crossing posting's own cost, and nothing of the original sign.
    ///
    /// The reduction's own price must never narrow which existing lot it
    /// matches (a sale price isn't a property of the lot being sold) — so
    /// matching uses an empty spec here, and the crossing price is passed
    /// separately as the new lot's default cost, the same split
    /// `Inventory::reduce_with_new_lot_cost` makes for real postings.
    #[test]
    fn crossing_leaves_only_the_remainder_at_the_new_cost(
        held in arb_nonzero_decimal(),
        excess in arb_nonzero_decimal(),
        held_price in arb_nonzero_decimal(),
        cross_price in arb_nonzero_decimal(),
        date in arb_date(),
    ) {
        let mut inv = Inventory::new(InventoryKind::Lots);
        inv.add(Position::with_cost(
            Amount::new(held, "AAPL"),
            Cost::new(held_price, "USD").with_date(date),
        ));

        let reduction = held + excess; // strictly more than held
        let new_lot_cost = Cost::new(cross_price, "USD").with_date(date);
        inv.reduce_with_new_lot_cost(
            &Amount::new(-reduction, "AAPL"),
            None,
            Some(&new_lot_cost),
            BookingMethod::Fifo,
        )
        .unwrap();

        prop_assert_eq!(inv.units("AAPL"), -excess);
        for pos in inv.positions() {
            if !pos.is_empty() {
                prop_assert!(pos.units.number.is_sign_negative());
            }
        }
    }

    /// An `Amount`'s rendered string always round-trips through the
    /// decimal parser to the same numeric value (Number §3: render with
    /// precision must be lossless for the digits it keeps).
    #[test]
    fn amount_display_round_trips_through_parse(n in arb_decimal()) {
        let amount = Amount::new(n, "USD");
        let rendered = amount.number.to_string();
        let parsed: Decimal = rendered.parse().unwrap();
        prop_assert_eq!(parsed, n);
    }
}
