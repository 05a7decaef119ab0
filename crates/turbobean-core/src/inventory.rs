//! Inventory type representing a collection of positions.
//!
//! An [`Inventory`] tracks the holdings of an account. It comes in two
//! kinds ([`InventoryKind`]):
//!
//! - [`InventoryKind::Plain`] — a single running balance per currency, no
//!   lot tracking. Used for accounts that never need cost basis (cash).
//! - [`InventoryKind::Lots`] — a set of [`Position`]s, each an independent
//!   lot with its own optional [`Cost`](crate::Cost). Supports
//!   FIFO/LIFO/STRICT booking.
//!
//! Reducing past what a matching lot (or the whole inventory, for `Plain`)
//! holds does not error: it *crosses* through zero, consuming every
//! matching lot and opening a new one in the reduction's direction for the
//! remainder. This mirrors a short sale or a cash account going negative.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::cost::Cost;
use crate::intern::InternedStr;
use crate::{Amount, CostSpec, Position};

/// Which storage discipline an [`Inventory`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InventoryKind {
    /// Single running balance per currency; no lots, no cost basis.
    Plain,
    /// Independent lots, each with an optional cost basis.
    Lots,
}

/// Booking method determines how lots are matched when reducing positions.
///
/// Only meaningful for [`InventoryKind::Lots`]; a `Plain` inventory always
/// merges regardless of the configured method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BookingMethod {
    /// No lot tracking: reduces merge into the single running balance.
    #[default]
    Plain,
    /// Lots must match exactly (unambiguous), with a total-match exception:
    /// if the reduction equals the sum of every candidate lot, it is
    /// accepted unambiguously (reduced in insertion order).
    Strict,
    /// First In, First Out. Earliest-inserted lots are reduced first.
    Fifo,
    /// Last In, First Out. Most-recently-inserted lots are reduced first.
    Lifo,
}

impl FromStr for BookingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PLAIN" => Ok(Self::Plain),
            "STRICT" => Ok(Self::Strict),
            "FIFO" => Ok(Self::Fifo),
            "LIFO" => Ok(Self::Lifo),
            _ => Err(format!("unknown booking method: {s}")),
        }
    }
}

impl fmt::Display for BookingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "PLAIN"),
            Self::Strict => write!(f, "STRICT"),
            Self::Fifo => write!(f, "FIFO"),
            Self::Lifo => write!(f, "LIFO"),
        }
    }
}

/// Result of a booking operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingResult {
    /// The lots (or lot fragments) that were actually matched and reduced.
    /// Empty when the operation was a pure augmentation.
    pub matched: Vec<Position>,
    /// The cost basis of the matched positions (for capital gains). `None`
    /// when nothing with a cost was reduced.
    pub cost_basis: Option<Amount>,
}

/// Error that can occur during booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Multiple lots match but booking method requires unambiguous match.
    AmbiguousMatch {
        /// Number of lots that matched.
        num_matches: usize,
        /// The currency being reduced.
        currency: InternedStr,
    },
    /// No lots match the cost specification.
    NoMatchingLot {
        /// The currency being reduced.
        currency: InternedStr,
        /// The cost spec that didn't match.
        cost_spec: CostSpec,
    },
    /// Currency mismatch between reduction and inventory.
    CurrencyMismatch {
        /// Expected currency.
        expected: InternedStr,
        /// Got currency.
        got: InternedStr,
    },
}

impl fmt::Display for BookingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AmbiguousMatch {
                num_matches,
                currency,
            } => write!(
                f,
                "Ambiguous match: {num_matches} lots match for {currency}"
            ),
            Self::NoMatchingLot {
                currency,
                cost_spec,
            } => {
                write!(f, "No matching lot for {currency} with cost {cost_spec}")
            }
            Self::CurrencyMismatch { expected, got } => {
                write!(f, "Currency mismatch: expected {expected}, got {got}")
            }
        }
    }
}

impl std::error::Error for BookingError {}

/// An inventory is a collection of positions held by an account.
///
/// # Examples
///
/// ```
/// use turbobean_core::{Inventory, InventoryKind, Position, Amount, Cost, BookingMethod};
/// use rust_decimal_macros::dec;
///
/// let mut inv = Inventory::new(InventoryKind::Lots);
///
/// let cost = Cost::new(dec!(150.00), "USD");
/// inv.add(Position::with_cost(Amount::new(dec!(10), "AAPL"), cost));
/// assert_eq!(inv.units("AAPL"), dec!(10));
///
/// let result = inv
///     .reduce(&Amount::new(dec!(-5), "AAPL"), None, BookingMethod::Fifo)
///     .unwrap();
/// assert_eq!(inv.units("AAPL"), dec!(5));
/// assert_eq!(result.cost_basis.unwrap().number, dec!(750.00));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    kind: InventoryKind,
    positions: Vec<Position>,
}

impl Inventory {
    /// Create an empty inventory of the given kind.
    #[must_use]
    pub const fn new(kind: InventoryKind) -> Self {
        Self {
            kind,
            positions: Vec::new(),
        }
    }

    /// Build an inventory of the given kind from an iterator of positions.
    #[must_use]
    pub fn from_positions(kind: InventoryKind, positions: impl IntoIterator<Item = Position>) -> Self {
        let mut inv = Self::new(kind);
        for pos in positions {
            inv.add(pos);
        }
        inv
    }

    /// The storage discipline this inventory uses.
    #[must_use]
    pub const fn kind(&self) -> InventoryKind {
        self.kind
    }

    /// Get all positions.
    #[must_use]
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Get mutable access to all positions.
    pub fn positions_mut(&mut self) -> &mut Vec<Position> {
        &mut self.positions
    }

    /// Check if inventory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.positions.iter().all(Position::is_empty)
    }

    /// Get the number of positions (including empty ones).
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Get total units of a currency, summed across all lots.
    #[must_use]
    pub fn units(&self, currency: &str) -> Decimal {
        self.positions
            .iter()
            .filter(|p| p.units.currency == currency)
            .map(|p| p.units.number)
            .sum()
    }

    /// Get all currencies in this inventory.
    #[must_use]
    pub fn currencies(&self) -> Vec<&str> {
        let mut currencies: Vec<&str> = self
            .positions
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| p.units.currency.as_str())
            .collect();
        currencies.sort_unstable();
        currencies.dedup();
        currencies
    }

    /// Get the total book value (cost basis) for a currency.
    #[must_use]
    pub fn book_value(&self, units_currency: &str) -> HashMap<InternedStr, Decimal> {
        let mut totals: HashMap<InternedStr, Decimal> = HashMap::new();

        for pos in &self.positions {
            if pos.units.currency == units_currency {
                if let Some(book) = pos.book_value() {
                    *totals.entry(book.currency.clone()).or_default() += book.number;
                }
            }
        }

        totals
    }

    /// Add a position to the inventory.
    ///
    /// `Plain` inventories merge regardless of cost (the cost is dropped).
    /// `Lots` inventories merge only no-cost positions of the same
    /// currency; costed positions always start a new lot.
    pub fn add(&mut self, position: Position) {
        if position.is_empty() {
            return;
        }

        match self.kind {
            InventoryKind::Plain => {
                for existing in &mut self.positions {
                    if existing.units.currency == position.units.currency {
                        existing.units += &position.units;
                        return;
                    }
                }
                self.positions.push(Position::simple(position.units));
            }
            InventoryKind::Lots => {
                if position.cost.is_none() {
                    for existing in &mut self.positions {
                        if existing.cost.is_none()
                            && existing.units.currency == position.units.currency
                        {
                            existing.units += &position.units;
                            return;
                        }
                    }
                }
                self.positions.push(position);
            }
        }
    }

    /// Reduce positions from the inventory using the specified booking
    /// method (ignored for `Plain` inventories).
    pub fn reduce(
        &mut self,
        units: &Amount,
        cost_spec: Option<&CostSpec>,
        method: BookingMethod,
    ) -> Result<BookingResult, BookingError> {
        self.reduce_with_new_lot_cost(units, cost_spec, None, method)
    }

    /// Reduce positions from the inventory, as [`Inventory::reduce`], but
    /// using `new_lot_cost` (rather than `cost_spec`) to cost any lot
    /// opened by a crossing or pure augmentation.
    ///
    /// `cost_spec` narrows which existing lots are eligible to be matched
    /// and reduced; `new_lot_cost`, when given, is the fully-resolved cost
    /// (e.g. from a `@`/`@@` price annotation) for units that have no
    /// opposite-sign lot to match against. The two serve different
    /// purposes and must not be conflated: a reduction's price is never a
    /// property of the lot being sold, so it must not narrow matching, but
    /// it does default the cost of a newly opened lot.
    pub fn reduce_with_new_lot_cost(
        &mut self,
        units: &Amount,
        cost_spec: Option<&CostSpec>,
        new_lot_cost: Option<&Cost>,
        method: BookingMethod,
    ) -> Result<BookingResult, BookingError> {
        if matches!(self.kind, InventoryKind::Plain) {
            return Ok(self.reduce_plain(units));
        }

        let spec = cost_spec.cloned().unwrap_or_default();
        match method {
            BookingMethod::Plain => Ok(self.reduce_plain(units)),
            BookingMethod::Strict => self.reduce_strict(units, &spec, new_lot_cost),
            BookingMethod::Fifo => Ok(self.reduce_ordered(units, &spec, false, new_lot_cost)),
            BookingMethod::Lifo => Ok(self.reduce_ordered(units, &spec, true, new_lot_cost)),
        }
    }

    /// Merge the reduction straight into the single running balance,
    /// crossing zero freely.
    fn reduce_plain(&mut self, units: &Amount) -> BookingResult {
        self.add(Position::simple(units.clone()));
        BookingResult {
            matched: vec![Position::simple(units.clone())],
            cost_basis: None,
        }
    }

    /// STRICT booking: require exactly one matching lot, with a
    /// total-match exception for otherwise-ambiguous reductions that
    /// exactly cover every candidate.
    fn reduce_strict(
        &mut self,
        units: &Amount,
        spec: &CostSpec,
        new_lot_cost: Option<&Cost>,
    ) -> Result<BookingResult, BookingError> {
        let matching_indices = self.matching_indices(units, spec);

        match matching_indices.len() {
            0 => Ok(self.augment_crossing(units, spec, new_lot_cost)),
            1 => Ok(self.reduce_from_indices(units, spec, &matching_indices, new_lot_cost)),
            n => {
                let total_units: Decimal = matching_indices
                    .iter()
                    .map(|&i| self.positions[i].units.number.abs())
                    .sum();
                if total_units == units.number.abs() {
                    Ok(self.reduce_from_indices(units, spec, &matching_indices, new_lot_cost))
                } else {
                    Err(BookingError::AmbiguousMatch {
                        num_matches: n,
                        currency: units.currency.clone(),
                    })
                }
            }
        }
    }

    /// FIFO/LIFO booking: reduce lots in insertion order (or its reverse).
    ///
    /// Ordering is keyed by position in `self.positions`, i.e. the order
    /// lots were added, not by `cost.date` — a lot's date can be
    /// overridden independently of when it was added (for splits and
    /// transfers), so it is not a reliable acquisition-order key.
    fn reduce_ordered(
        &mut self,
        units: &Amount,
        spec: &CostSpec,
        reverse: bool,
        new_lot_cost: Option<&Cost>,
    ) -> BookingResult {
        let mut indices = self.matching_indices(units, spec);
        if reverse {
            indices.reverse();
        }

        if indices.is_empty() {
            return self.augment_crossing(units, spec, new_lot_cost);
        }

        self.reduce_from_indices(units, spec, &indices, new_lot_cost)
    }

    /// Indices of positions eligible to be reduced by `units` under `spec`,
    /// in ascending insertion order.
    fn matching_indices(&self, units: &Amount, spec: &CostSpec) -> Vec<usize> {
        self.positions
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                p.units.currency == units.currency
                    && !p.is_empty()
                    && p.units.number.signum() != units.number.signum()
                    && p.matches_cost_spec(spec)
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Consume `indices` in order until `units` is fully reduced; any
    /// leftover (the position held less than requested) crosses zero into
    /// a new lot in the reduction's direction.
    fn reduce_from_indices(
        &mut self,
        units: &Amount,
        spec: &CostSpec,
        indices: &[usize],
        new_lot_cost: Option<&Cost>,
    ) -> BookingResult {
        let mut remaining = units.number.abs();
        let mut matched = Vec::new();
        let mut cost_basis = Decimal::ZERO;
        let mut cost_currency = None;

        for &idx in indices {
            if remaining.is_zero() {
                break;
            }

            let pos = &self.positions[idx];
            let available = pos.units.number.abs();
            let take = remaining.min(available);

            if let Some(cost) = &pos.cost {
                cost_basis += take * cost.number;
                cost_currency = Some(cost.currency.clone());
            }

            let (taken, _) = pos.split(take * pos.units.number.signum());
            matched.push(taken);

            let reduction = if units.number.is_sign_negative() {
                -take
            } else {
                take
            };
            let new_pos = Position {
                units: Amount::new(pos.units.number + reduction, pos.units.currency.clone()),
                cost: pos.cost.clone(),
            };
            self.positions[idx] = new_pos;

            remaining -= take;
        }

        if !remaining.is_zero() {
            let sign = if units.number.is_sign_negative() {
                -Decimal::ONE
            } else {
                Decimal::ONE
            };
            let crossing =
                Self::crossing_position(spec, new_lot_cost, &units.currency, remaining * sign);
            self.positions.push(crossing);
        }

        self.positions.retain(|p| !p.is_empty());

        BookingResult {
            matched,
            cost_basis: cost_currency.map(|c| Amount::new(cost_basis, c)),
        }
    }

    /// No opposite-sign lot exists at all: this "reduce" is really a pure
    /// augmentation (e.g. shorting an account with no prior position).
    fn augment_crossing(
        &mut self,
        units: &Amount,
        spec: &CostSpec,
        new_lot_cost: Option<&Cost>,
    ) -> BookingResult {
        let position = Self::crossing_position(spec, new_lot_cost, &units.currency, units.number);
        self.add(position);
        BookingResult {
            matched: Vec::new(),
            cost_basis: None,
        }
    }

    /// Build the position opened when a reduction crosses zero or
    /// augments with no existing opposite lot.
    ///
    /// `spec`'s own cost components win when present (an explicit `{...}`
    /// lot spec overrides); otherwise `new_lot_cost` supplies the default,
    /// typically resolved from the posting's `@`/`@@` price annotation and
    /// the transaction date. `spec` alone is never enough here since it
    /// doubles as the (price-agnostic) matching filter for existing lots.
    fn crossing_position(
        spec: &CostSpec,
        new_lot_cost: Option<&Cost>,
        currency: &InternedStr,
        signed_units: Decimal,
    ) -> Position {
        let cost_currency = spec
            .currency
            .clone()
            .or_else(|| new_lot_cost.map(|c| c.currency.clone()));

        let cost = cost_currency.and_then(|cost_currency| {
            let number = spec
                .number_per
                .or_else(|| spec.number_total.map(|total| total / signed_units.abs()))
                .or_else(|| new_lot_cost.map(|c| c.number))?;
            let date = spec.date.or_else(|| new_lot_cost.and_then(|c| c.date));
            let label = spec
                .label
                .clone()
                .or_else(|| new_lot_cost.and_then(|c| c.label.clone()));
            Some(Cost {
                number,
                currency: cost_currency,
                date,
                label,
            })
        });

        match cost {
            Some(cost) => Position::with_cost(Amount::new(signed_units, currency.clone()), cost),
            None => Position::simple(Amount::new(signed_units, currency.clone())),
        }
    }

    /// Remove all empty positions.
    pub fn compact(&mut self) {
        self.positions.retain(|p| !p.is_empty());
    }

    /// Merge this inventory with another. Both must share the same kind.
    pub fn merge(&mut self, other: &Self) {
        for pos in &other.positions {
            self.add(pos.clone());
        }
    }

    /// Convert inventory to cost basis.
    ///
    /// Returns a new `Lots`-discipline-independent inventory where every
    /// costed position is replaced by its book value. Positions without
    /// cost are returned as-is.
    #[must_use]
    pub fn at_cost(&self) -> Self {
        let mut result = Self::new(self.kind);

        for pos in &self.positions {
            if pos.is_empty() {
                continue;
            }

            if let Some(cost) = &pos.cost {
                let total = pos.units.number * cost.number;
                result.add(Position::simple(Amount::new(total, &cost.currency)));
            } else {
                result.add(pos.clone());
            }
        }

        result
    }

    /// Convert inventory to units only, stripping cost from every position.
    #[must_use]
    pub fn at_units(&self) -> Self {
        let mut result = Self::new(self.kind);

        for pos in &self.positions {
            if pos.is_empty() {
                continue;
            }
            result.add(Position::simple(pos.units.clone()));
        }

        result
    }
}

impl fmt::Display for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(empty)");
        }

        let non_empty: Vec<_> = self.positions.iter().filter(|p| !p.is_empty()).collect();
        for (i, pos) in non_empty.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{pos}")?;
        }
        Ok(())
    }
}
