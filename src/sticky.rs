//! # Sticky bounded selection
//! Picks up to `limit` items from a candidate pool while keeping the order
//! shown in the previous refresh. Same spirit as the alert anti-flutter
//! gate: an incumbent is only displaced by a candidate that beats it by at
//! least `margin`.
//!
//! 1. previous ids still present in the pool are *carried* (previous order,
//!    resolved to the current candidate version); the rest is dropped
//! 2. the remaining candidates are *fresh*, sorted by score descending
//! 3. nothing carried: top `limit` fresh
//! 4. otherwise only the best fresh item may be promoted in front of the
//!    carried list, and only when it beats the first carried item by
//!    `margin`; if it does not, all fresh items are appended after the
//!    carried ones
//! 5. truncate to `limit`

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Anything with a stable identity inside one snapshot.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl<T: Keyed + ?Sized> Keyed for &T {
    fn key(&self) -> &str {
        (**self).key()
    }
}

/// Score-descending comparator. Total even with NaN scores (NaN sorts first).
/// Stable sorts keep input order on ties.
fn by_score_desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

/// Sticky selection over `candidates`, using `previous` (last refresh's
/// output for the same slot) as the carry-forward basis.
pub fn sticky_select<'a, T, P, F>(
    candidates: &'a [T],
    previous: &[P],
    limit: usize,
    margin: f64,
    score: F,
) -> Vec<&'a T>
where
    T: Keyed,
    P: Keyed,
    F: Fn(&T) -> f64,
{
    // Later duplicates win, matching a plain id -> item map.
    let by_id: HashMap<&str, &'a T> = candidates.iter().map(|c| (c.key(), c)).collect();

    let mut carried_ids: HashSet<&str> = HashSet::new();
    let mut carried: Vec<&'a T> = Vec::new();
    for p in previous {
        if let Some(&c) = by_id.get(p.key()) {
            if carried_ids.insert(c.key()) {
                carried.push(c);
            }
        }
    }

    let mut fresh: Vec<&'a T> = candidates
        .iter()
        .filter(|c| !carried_ids.contains(c.key()))
        .collect();
    fresh.sort_by(|a, b| by_score_desc(score(*a), score(*b)));

    if carried.is_empty() {
        fresh.truncate(limit);
        return fresh;
    }

    let mut ordered = carried;
    if let Some(&best) = fresh.first() {
        let incumbent = score(ordered[0]);
        if score(best) - incumbent >= margin {
            tracing::debug!(
                target: "dashboard",
                promoted = best.key(),
                displaced = ordered[0].key(),
                "sticky: fresh candidate promoted"
            );
            ordered.insert(0, best);
        } else {
            ordered.extend(fresh);
        }
    }

    ordered.truncate(limit);
    ordered
}
