//! Human-readable overlap explanations
//!
//! Reasons are listed designers first, then mechanics, categories and
//! families; each names at most [`MAX_NAMED_VALUES`] values.

use gamerec_core::{FacetKind, FacetMap};
use serde::{Deserialize, Serialize};

pub const MAX_NAMED_VALUES: usize = 3;

/// A facet that can contribute a reason, with its clause labels
struct ReasonLabel {
    facet: FacetKind,
    singular: &'static str,
    plural: &'static str,
}

/// Presentation order. Artists and publishers never contribute a reason.
const REASON_LABELS: [ReasonLabel; 4] = [
    ReasonLabel { facet: FacetKind::Designers, singular: "same designer", plural: "same designers" },
    ReasonLabel { facet: FacetKind::Mechanics, singular: "shared mechanics", plural: "shared mechanics" },
    ReasonLabel { facet: FacetKind::Categories, singular: "similar categories", plural: "similar categories" },
    ReasonLabel { facet: FacetKind::Families, singular: "same family", plural: "same families" },
];

pub const NO_OVERLAP_SUMMARY: &str = "Similar overall feel, with no directly shared designers, mechanics, categories or families";

/// One overlap reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reason {
    pub facet: FacetKind,
    /// Up to three shared values, sorted
    pub values: Vec<String>,
    /// Total number of shared values in this facet
    pub total_shared: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub reasons: Vec<Reason>,
    pub summary: String,
}

impl Explanation {
    /// Build from per-facet shared value lists
    pub fn from_shared(shared: &FacetMap<Vec<String>>) -> Self {
        let mut reasons = Vec::new();
        let mut clauses = Vec::new();
        for label in REASON_LABELS.iter().filter(|l| !shared[l.facet].is_empty()) {
            let values: Vec<String> = shared[label.facet].iter().take(MAX_NAMED_VALUES).cloned().collect();
            let text = if values.len() > 1 { label.plural } else { label.singular };
            clauses.push(format!("{}: {}", text, join_names(&values)));
            reasons.push(Reason {
                facet: label.facet,
                values,
                total_shared: shared[label.facet].len(),
            });
        }
        let summary = if clauses.is_empty() {
            NO_OVERLAP_SUMMARY.to_string()
        } else {
            capitalize(&clauses.join("; "))
        };
        Self { reasons, summary }
    }

    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }
}

/// "A", "A and B", "A, B and C"
fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
