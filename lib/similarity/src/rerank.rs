//! Secondary re-ranking on top of the blended score
//!
//! Four bounded additive bonuses reward well-rated, popular, recent titles
//! and titles whose complexity is close to the reference. The caps are
//! empirical and exposed through [`RerankConfig`].

use chrono::Datelike;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    pub rating_count_cap: f64,
    /// Rating count at which the rating bonus saturates
    pub rating_count_saturation: u32,
    pub popularity_cap: f64,
    /// Popularity rank at (and beyond) which the bonus is zero
    pub popularity_floor_rank: u32,
    pub recency_cap: f64,
    pub recency_full_years: u32,
    pub recency_zero_years: u32,
    pub complexity_cap: f64,
    /// Complexity difference at which the bonus reaches zero
    pub complexity_zero_diff: f64,
    pub current_year: i32,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            rating_count_cap: 0.10,
            rating_count_saturation: 10_000,
            popularity_cap: 0.10,
            popularity_floor_rank: 10_000,
            recency_cap: 0.05,
            recency_full_years: 5,
            recency_zero_years: 20,
            complexity_cap: 0.05,
            complexity_zero_diff: 5.0,
            current_year: chrono::Utc::now().year(),
        }
    }
}

/// Attributes of a candidate that feed the bonuses
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RerankInputs {
    pub rating_count: Option<u32>,
    pub popularity_rank: Option<u32>,
    pub year: Option<i32>,
    pub complexity: Option<f64>,
}

/// Individual bonuses, each within `[0, cap]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RerankBonus {
    pub rating: f64,
    pub popularity: f64,
    pub recency: f64,
    pub complexity: f64,
}

impl RerankBonus {
    pub fn total(&self) -> f64 {
        self.rating + self.popularity + self.recency + self.complexity
    }
}

/// Anything the reranker can reorder
pub trait Rerankable {
    /// Score before bonuses
    fn base_score(&self) -> f64;
    fn rerank_inputs(&self) -> &RerankInputs;
    /// Record the adjusted score; called exactly once per candidate.
    fn set_adjusted_score(&mut self, score: f64, bonus: RerankBonus);
    fn adjusted_score(&self) -> f64;
}

#[derive(Debug, Clone, Default)]
pub struct Reranker {
    config: RerankConfig,
}

impl Reranker {
    pub fn new(config: RerankConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RerankConfig {
        &self.config
    }

    pub fn bonus(&self, inputs: &RerankInputs, reference_complexity: Option<f64>) -> RerankBonus {
        let c = &self.config;

        let rating = inputs.rating_count.map_or(0.0, |count| {
            let saturation = (1.0 + c.rating_count_saturation as f64).ln();
            if saturation <= 0.0 {
                return c.rating_count_cap;
            }
            c.rating_count_cap * ((1.0 + count as f64).ln() / saturation).min(1.0)
        });

        let popularity = inputs.popularity_rank.map_or(0.0, |rank| {
            let span = c.popularity_floor_rank.saturating_sub(1).max(1) as f64;
            let quality = 1.0 - (rank.max(1) - 1) as f64 / span;
            c.popularity_cap * quality.clamp(0.0, 1.0)
        });

        let recency = inputs.year.map_or(0.0, |year| {
            let age = c.current_year.saturating_sub(year);
            let full = c.recency_full_years as i32;
            let zero = c.recency_zero_years as i32;
            if age <= full {
                c.recency_cap
            } else if age >= zero || zero <= full {
                0.0
            } else {
                c.recency_cap * (zero - age) as f64 / (zero - full) as f64
            }
        });

        let complexity = match (inputs.complexity, reference_complexity) {
            (Some(a), Some(b)) if c.complexity_zero_diff > 0.0 => {
                c.complexity_cap * (1.0 - (a - b).abs() / c.complexity_zero_diff).max(0.0)
            }
            _ => 0.0,
        };

        RerankBonus { rating, popularity, recency, complexity }
    }

    /// Apply bonuses and sort by adjusted score, descending. The sort is
    /// stable, so ties keep their incoming order.
    pub fn rerank<C: Rerankable>(&self, candidates: &mut [C], reference_complexity: Option<f64>) {
        for candidate in candidates.iter_mut() {
            let bonus = self.bonus(candidate.rerank_inputs(), reference_complexity);
            let adjusted = candidate.base_score() + bonus.total();
            candidate.set_adjusted_score(adjusted, bonus);
        }

        candidates.sort_by(|a, b| {
            b.adjusted_score()
                .partial_cmp(&a.adjusted_score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}
