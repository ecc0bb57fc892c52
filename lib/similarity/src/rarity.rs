//! Rarity weights for facet values
//!
//! A value carried by few catalog items is a stronger signal of kinship than
//! one carried by most of them. Weights run from about 0.5 for ubiquitous
//! values up to 3.0 for vanishingly rare ones, on a log curve.

use ahash::AHashMap;
use gamerec_core::{FacetKind, FacetMap};

pub const RARITY_EPSILON: f64 = 0.001;
pub const MIN_RARITY_WEIGHT: f64 = 0.5;
pub const MAX_RARITY_WEIGHT: f64 = 3.0;

/// Weight of a value carried by `frequency` (in [0, 1]) of the catalog.
pub fn rarity_weight(frequency: f64) -> f64 {
    let frequency = frequency.clamp(0.0, 1.0);
    let raw = MIN_RARITY_WEIGHT
        + 2.5 * (1.0 / (frequency + RARITY_EPSILON) + 1.0).ln() / 1000f64.ln();
    raw.min(MAX_RARITY_WEIGHT)
}

/// Weights for every value of one facet, given per-value item counts.
pub fn rarity_weights(counts: &AHashMap<String, usize>, total_items: usize) -> AHashMap<String, f64> {
    if total_items == 0 {
        return AHashMap::new();
    }
    counts
        .iter()
        .map(|(value, &count)| {
            let frequency = count as f64 / total_items as f64;
            (value.clone(), rarity_weight(frequency))
        })
        .collect()
}

/// Per-request rarity statistics for all six facets
#[derive(Debug, Clone, Default)]
pub struct RarityTable {
    weights: FacetMap<AHashMap<String, f64>>,
}

impl RarityTable {
    pub fn from_counts(counts: FacetMap<AHashMap<String, usize>>, total_items: usize) -> Self {
        Self {
            weights: counts.map(|_, c| rarity_weights(c, total_items)),
        }
    }

    /// Weight of a value. Values without statistics (for instance ones
    /// only present through an override) are neutral.
    pub fn weight(&self, facet: FacetKind, value: &str) -> f64 {
        self.weights[facet].get(value).copied().unwrap_or(1.0)
    }

    /// Mean weight of `values`, 1.0 when empty
    pub fn mean_weight(&self, facet: FacetKind, values: &[String]) -> f64 {
        if values.is_empty() {
            return 1.0;
        }
        let sum: f64 = values.iter().map(|v| self.weight(facet, v)).sum();
        sum / values.len() as f64
    }

    pub fn facet(&self, facet: FacetKind) -> &AHashMap<String, f64> {
        &self.weights[facet]
    }

    /// The `limit` rarest values of a facet, rarest first, names breaking ties.
    pub fn rarest(&self, facet: FacetKind, limit: usize) -> Vec<(String, f64)> {
        let mut entries: Vec<(String, f64)> = self.weights[facet]
            .iter()
            .map(|(v, w)| (v.clone(), *w))
            .collect();
        entries.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        entries.truncate(limit);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_is_bounded_and_decreasing() {
        let mut previous = f64::INFINITY;
        for step in 0..=100 {
            let f = step as f64 / 100.0;
            let w = rarity_weight(f);
            assert!((MIN_RARITY_WEIGHT..=MAX_RARITY_WEIGHT).contains(&w), "f={} w={}", f, w);
            assert!(w <= previous);
            previous = w;
        }
    }

    #[test]
    fn test_weight_extremes() {
        assert_eq!(rarity_weight(0.0), MAX_RARITY_WEIGHT);
        // Ubiquitous values sit at the low end of the range.
        assert!(rarity_weight(1.0) < 0.8);
        assert!(rarity_weight(0.01) > 2.0);
    }

    #[test]
    fn test_weights_from_counts() {
        let mut counts = AHashMap::new();
        counts.insert("Dice Rolling".to_string(), 90);
        counts.insert("Trick-taking".to_string(), 1);
        let weights = rarity_weights(&counts, 100);
        assert!(weights["Trick-taking"] > weights["Dice Rolling"]);
        assert!(rarity_weights(&counts, 0).is_empty());
    }

    #[test]
    fn test_table_lookup_and_rarest() {
        let mut counts: FacetMap<AHashMap<String, usize>> = FacetMap::default();
        counts[FacetKind::Mechanics].insert("Common".to_string(), 50);
        counts[FacetKind::Mechanics].insert("Rare".to_string(), 1);
        let table = RarityTable::from_counts(counts, 100);

        assert_eq!(table.weight(FacetKind::Mechanics, "Unknown"), 1.0);
        assert_eq!(table.mean_weight(FacetKind::Mechanics, &[]), 1.0);

        let rarest = table.rarest(FacetKind::Mechanics, 1);
        assert_eq!(rarest[0].0, "Rare");
        assert!(table.rarest(FacetKind::Artists, 5).is_empty());
    }
}
