//! Meta-similarity between two feature snapshots
//!
//! Per-facet Jaccard scores are combined into one composite with fixed base
//! weights. With rarity weighting the weight of every facet whose shared
//! values are uncommon is boosted before the weights are renormalized.

use crate::overlap::{jaccard, shared_values};
use crate::rarity::RarityTable;
use gamerec_core::{value_eq, FacetKind, FacetMap, FacetSets, FeatureSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_RARITY_MULTIPLIER: f64 = 3.0;

/// Category values that describe packaging or platform rather than play.
pub const NON_GAMEPLAY_CATEGORIES: &[&str] = &[
    "Expansion for Base-game",
    "Video Game Theme",
    "Electronic",
    "Digital Implementations",
    "Print & Play",
    "Books",
    "Collectible Components",
];

/// Fixed facet weights, summing to 1.0
pub fn base_weights() -> FacetMap<f64> {
    FacetMap::from_fn(|kind| match kind {
        FacetKind::Mechanics => 0.35,
        FacetKind::Categories => 0.25,
        FacetKind::Families => 0.15,
        FacetKind::Designers => 0.10,
        FacetKind::Artists => 0.05,
        FacetKind::Publishers => 0.10,
    })
}

fn is_non_gameplay(category: &str) -> bool {
    NON_GAMEPLAY_CATEGORIES
        .iter()
        .any(|denied| value_eq(denied, category))
}

/// Result of comparing two snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaScore {
    /// Weighted composite in [0, 1]
    pub composite: f64,
    /// Values shared per facet, sorted
    pub shared: FacetMap<Vec<String>>,
    /// Jaccard score per facet
    pub jaccard: FacetMap<f64>,
}

#[derive(Debug, Clone)]
pub struct MetaScorer {
    weights: FacetMap<f64>,
    rarity_multiplier: f64,
}

impl Default for MetaScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl MetaScorer {
    pub fn new() -> Self {
        Self {
            weights: base_weights(),
            rarity_multiplier: DEFAULT_RARITY_MULTIPLIER,
        }
    }

    /// Scale applied to `(mean rarity - 1)` when boosting a facet weight
    pub fn with_rarity_multiplier(mut self, multiplier: f64) -> Self {
        self.rarity_multiplier = multiplier.max(0.0);
        self
    }

    pub fn weights(&self) -> &FacetMap<f64> {
        &self.weights
    }

    /// Compare two snapshots. Pass a rarity table to enable rarity weighting.
    pub fn score(&self, a: &FeatureSnapshot, b: &FeatureSnapshot, rarity: Option<&RarityTable>) -> MetaScore {
        let a = gameplay_facets(&a.facets);
        let b = gameplay_facets(&b.facets);

        let jaccard_scores = FacetMap::from_fn(|kind| jaccard(&a[kind], &b[kind]));
        let shared = FacetMap::from_fn(|kind| shared_values(&a[kind], &b[kind]));

        let weights = match rarity {
            Some(table) => self.rarity_adjusted_weights(table, &shared),
            None => self.weights.clone(),
        };

        let composite: f64 = FacetKind::ALL
            .iter()
            .map(|&kind| weights[kind] * jaccard_scores[kind])
            .sum();

        MetaScore {
            composite: composite.clamp(0.0, 1.0),
            shared,
            jaccard: jaccard_scores,
        }
    }

    fn rarity_adjusted_weights(&self, table: &RarityTable, shared: &FacetMap<Vec<String>>) -> FacetMap<f64> {
        let boosted = self.weights.map(|kind, &base| {
            if shared[kind].is_empty() {
                return base;
            }
            let mean = table.mean_weight(kind, &shared[kind]);
            // A strongly common shared value can drive the multiplier
            // negative; a weight never goes below zero.
            (base * (1.0 + (mean - 1.0) * self.rarity_multiplier)).max(0.0)
        });

        let total: f64 = boosted.iter().map(|(_, w)| *w).sum();
        if total > 0.0 {
            boosted.map(|_, w| w / total)
        } else {
            self.weights.clone()
        }
    }
}

/// Copy of the facet sets with non-gameplay categories removed
fn gameplay_facets(facets: &FacetSets) -> FacetSets {
    let mut cleaned = facets.clone();
    let categories: BTreeSet<String> = cleaned[FacetKind::Categories]
        .iter()
        .filter(|c| !is_non_gameplay(c))
        .cloned()
        .collect();
    cleaned[FacetKind::Categories] = categories;
    cleaned
}
