//! Set overlap between facet value sets
//!
//! All functions are symmetric in their arguments and return values in
//! [0.0, 1.0].

use std::collections::BTreeSet;

/// Jaccard index `|A ∩ B| / |A ∪ B|`, defined as 0.0 when both sets are empty.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Values present in both sets, in sorted order
pub fn shared_values(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Vec<String> {
    a.intersection(b).cloned().collect()
}

/// Number of integers shared by the closed ranges `[a_lo, a_hi]` and `[b_lo, b_hi]`
pub fn range_overlap(a_lo: u32, a_hi: u32, b_lo: u32, b_hi: u32) -> u32 {
    let lo = a_lo.max(b_lo);
    let hi = a_hi.min(b_hi);
    if hi < lo {
        0
    } else {
        hi - lo + 1
    }
}
