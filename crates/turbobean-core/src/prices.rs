//! Currency-pair price table.
//!
//! Stores the latest rate for each `(from, to)` currency pair seen across
//! `price` directives and converts amounts between currencies along a
//! direct or reverse pair. No transitive search is performed: a
//! well-formed ledger is expected to post prices for every pair its
//! operating currencies actually need.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::intern::InternedStr;

/// A table of direct currency-pair conversion rates.
///
/// # Examples
///
/// ```
/// use turbobean_core::{Amount, PriceTable};
/// use rust_decimal_macros::dec;
///
/// let mut prices = PriceTable::new();
/// prices.set("AAPL", "USD", dec!(150.00));
///
/// let converted = prices.convert(&Amount::new(dec!(10), "AAPL"), "USD").unwrap();
/// assert_eq!(converted.number, dec!(1500.00));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceTable {
    rates: HashMap<(InternedStr, InternedStr), Decimal>,
}

impl PriceTable {
    /// Create an empty price table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rates: HashMap::new(),
        }
    }

    /// Record a rate for `from -> to`. Later calls for the same pair
    /// overwrite earlier ones ("latest wins").
    pub fn set(&mut self, from: impl Into<InternedStr>, to: impl Into<InternedStr>, rate: Decimal) {
        self.rates.insert((from.into(), to.into()), rate);
    }

    /// Look up the direct rate for `from -> to`, if one has been recorded.
    #[must_use]
    pub fn rate(&self, from: &str, to: &str) -> Option<Decimal> {
        self.rates
            .iter()
            .find(|((f, t), _)| f.as_str() == from && t.as_str() == to)
            .map(|(_, rate)| *rate)
    }

    /// Convert `amount` into `to`.
    ///
    /// 1. Same currency: returned unchanged.
    /// 2. A direct `(from, to)` rate exists: multiply.
    /// 3. A reverse `(to, from)` rate exists: divide.
    /// 4. Otherwise: `None`, and the caller should keep the original
    ///    currency. No transitive path is searched.
    #[must_use]
    pub fn convert(&self, amount: &Amount, to: &str) -> Option<Amount> {
        if amount.currency.as_str() == to {
            return Some(amount.clone());
        }

        if let Some(rate) = self.rate(amount.currency.as_str(), to) {
            return Some(Amount::new(amount.number * rate, to));
        }

        if let Some(rate) = self.rate(to, amount.currency.as_str()) {
            if !rate.is_zero() {
                return Some(Amount::new(amount.number / rate, to));
            }
        }

        None
    }

    /// Number of distinct currency pairs recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// True if no prices have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Remove every recorded rate. Called at the start of each full
    /// re-solve, since the price table is rebuilt from `price` directives
    /// encountered during the walk.
    pub fn clear(&mut self) {
        self.rates.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn same_currency_passes_through() {
        let prices = PriceTable::new();
        let amount = Amount::new(dec!(10), "USD");
        assert_eq!(prices.convert(&amount, "USD"), Some(amount));
    }

    #[test]
    fn direct_pair_multiplies() {
        let mut prices = PriceTable::new();
        prices.set("AAPL", "USD", dec!(150));
        let converted = prices.convert(&Amount::new(dec!(2), "AAPL"), "USD").unwrap();
        assert_eq!(converted.number, dec!(300));
        assert_eq!(converted.currency, "USD");
    }

    #[test]
    fn reverse_pair_divides() {
        let mut prices = PriceTable::new();
        prices.set("USD", "AAPL", dec!(150));
        let converted = prices.convert(&Amount::new(dec!(300), "AAPL"), "USD").unwrap();
        assert_eq!(converted.number, dec!(2));
    }

    #[test]
    fn latest_rate_wins() {
        let mut prices = PriceTable::new();
        prices.set("AAPL", "USD", dec!(150));
        prices.set("AAPL", "USD", dec!(160));
        assert_eq!(prices.rate("AAPL", "USD"), Some(dec!(160)));
    }

    #[test]
    fn unknown_pair_fails_silently() {
        let prices = PriceTable::new();
        assert_eq!(prices.convert(&Amount::new(dec!(1), "EUR"), "NZD"), None);
    }

    #[test]
    fn no_transitive_search() {
        let mut prices = PriceTable::new();
        prices.set("A", "B", dec!(2));
        prices.set("B", "C", dec!(3));
        assert_eq!(prices.convert(&Amount::new(dec!(1), "A"), "C"), None);
    }
}
