//! Return series alignment.
//!
//! Price series from different symbols rarely share every trading date
//! (listings, halts, holidays on foreign venues). Statistics that combine two
//! or more series only use dates present in all of them.

use std::collections::BTreeMap;

use chrono::NaiveDate;

/// A date-keyed return series, sorted by date.
pub type DatedReturns = Vec<(NaiveDate, f64)>;

/// Returns the values of `a` and `b` on their common dates.
///
/// Both inputs must be sorted by date.
pub fn align_pair(a: &[(NaiveDate, f64)], b: &[(NaiveDate, f64)]) -> (Vec<f64>, Vec<f64>) {
    let mut xs = Vec::with_capacity(a.len().min(b.len()));
    let mut ys = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                xs.push(a[i].1);
                ys.push(b[j].1);
                i += 1;
                j += 1;
            }
        }
    }

    (xs, ys)
}

/// Weighted sum of several return series on the dates they all share.
///
/// Weights are used as given; callers normalize them when a
/// portfolio-level return is wanted.
pub fn weighted_returns(components: &[(f64, &[(NaiveDate, f64)])]) -> DatedReturns {
    if components.is_empty() {
        return Vec::new();
    }

    let mut acc: BTreeMap<NaiveDate, (usize, f64)> = BTreeMap::new();
    for (weight, series) in components {
        for (date, r) in series.iter() {
            let slot = acc.entry(*date).or_insert((0, 0.0));
            slot.0 += 1;
            slot.1 += weight * r;
        }
    }

    acc.into_iter()
        .filter(|(_, (count, _))| *count == components.len())
        .map(|(date, (_, value))| (date, value))
        .collect()
}
