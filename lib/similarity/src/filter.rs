//! Required and excluded facet values
//!
//! Literal per-facet value lists compared without regard to case. These are
//! the cheapest eliminators in the pipeline and run before any scoring.

use gamerec_core::{value_eq, FacetKind, FacetMap, FeatureSnapshot};
use serde::{Deserialize, Serialize};

/// Per-facet value lists, e.g. `{"categories": ["Fantasy"]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureValueFilter {
    values: FacetMap<Vec<String>>,
}

impl FeatureValueFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, facet: FacetKind, value: impl Into<String>) -> Self {
        self.insert(facet, value);
        self
    }

    pub fn insert(&mut self, facet: FacetKind, value: impl Into<String>) {
        let value = value.into();
        let values = &mut self.values[facet];
        if !values.iter().any(|v| value_eq(v, &value)) {
            values.push(value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|(_, v)| v.is_empty())
    }

    pub fn values(&self, facet: FacetKind) -> &[String] {
        &self.values[facet]
    }

    /// True when the snapshot carries every listed value
    pub fn all_present(&self, snapshot: &FeatureSnapshot) -> bool {
        self.values
            .iter()
            .all(|(kind, values)| values.iter().all(|v| snapshot.has_value(kind, v)))
    }

    /// True when the snapshot carries none of the listed values
    pub fn none_present(&self, snapshot: &FeatureSnapshot) -> bool {
        self.values
            .iter()
            .all(|(kind, values)| !values.iter().any(|v| snapshot.has_value(kind, v)))
    }
}
