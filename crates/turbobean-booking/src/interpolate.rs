//! Filling in the one posting per transaction allowed to omit its amount.

use turbobean_core::{Amount, DiagnosticKind, NaiveDate};

use crate::balance::weight_sums;
use crate::PostingSnapshot;

/// The amount interpolation decided for one posting.
#[derive(Debug, Clone)]
pub struct Interpolated {
    /// Index into the posting table of the posting that was filled in.
    pub idx: usize,
    /// The amount it was given.
    pub amount: Amount,
}

/// Find the transaction's auto-leg (if any) and compute the amount that
/// zeroes its currency's weight sum.
///
/// At most one posting may omit its amount. Its currency must be inferable
/// from the other legs: if they touch exactly one currency, the auto-leg is
/// given that currency and the residual that balances it; any other case
/// (zero legs to infer from, or more than one candidate currency) is
/// `ambiguous_auto_amount`.
pub fn interpolate(
    postings: &[PostingSnapshot],
    date: NaiveDate,
) -> Result<Option<Interpolated>, DiagnosticKind> {
    let mut auto = postings.iter().enumerate().filter(|(_, p)| p.amount_is_missing());
    let Some((pos, first)) = auto.next() else {
        return Ok(None);
    };
    if auto.next().is_some() {
        return Err(DiagnosticKind::AmbiguousAutoAmount);
    }

    let known: Vec<PostingSnapshot> = postings
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != pos)
        .map(|(_, p)| p.clone())
        .collect();
    let sums = weight_sums(&known, date);

    let currency = match &first.units {
        Some(incomplete) if incomplete.currency().is_some() => {
            incomplete.currency().expect("checked above").to_string()
        }
        _ => {
            let mut currencies = sums.keys();
            let Some(only) = currencies.next() else {
                return Err(DiagnosticKind::AmbiguousAutoAmount);
            };
            if currencies.next().is_some() {
                return Err(DiagnosticKind::AmbiguousAutoAmount);
            }
            only.to_string()
        }
    };

    let residual = sums.get(currency.as_str()).copied().unwrap_or_default();
    Ok(Some(Interpolated {
        idx: first.idx,
        amount: Amount::new(-residual, currency.as_str()),
    }))
}

impl PostingSnapshot {
    fn amount_is_missing(&self) -> bool {
        match &self.units {
            None => true,
            Some(incomplete) => incomplete.as_amount().is_none(),
        }
    }
}
