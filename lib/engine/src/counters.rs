//! Skip classification
//!
//! Every candidate that does not reach the output is counted under exactly
//! one reason.

use gamerec_core::ItemId;
use serde::{Deserialize, Serialize};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Candidate id has no catalog row
    NotFound,
    /// The vector index returned an id that is no longer in the catalog
    StaleIndexEntry,
    SelfMatch,
    OutsideAllowList,
    MissingRequired,
    HasExcluded,
    PlayerConstraint,
    PlaytimeConstraint,
    FacetConstraint,
    /// A rule needs the reference features, which could not be read
    ReferenceUnavailable,
    StoreUnavailable,
    MissingEmbedding,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::NotFound => "not_found",
            SkipReason::StaleIndexEntry => "stale_index_entry",
            SkipReason::SelfMatch => "self_match",
            SkipReason::OutsideAllowList => "outside_allow_list",
            SkipReason::MissingRequired => "missing_required",
            SkipReason::HasExcluded => "has_excluded",
            SkipReason::PlayerConstraint => "player_constraint",
            SkipReason::PlaytimeConstraint => "playtime_constraint",
            SkipReason::FacetConstraint => "facet_constraint",
            SkipReason::ReferenceUnavailable => "reference_unavailable",
            SkipReason::StoreUnavailable => "store_unavailable",
            SkipReason::MissingEmbedding => "missing_embedding",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounters {
    pub not_found: usize,
    pub stale_index_entry: usize,
    pub self_match: usize,
    pub outside_allow_list: usize,
    pub missing_required: usize,
    pub has_excluded: usize,
    pub player_constraint: usize,
    pub playtime_constraint: usize,
    pub facet_constraint: usize,
    pub reference_unavailable: usize,
    pub store_unavailable: usize,
    pub missing_embedding: usize,
}

impl SkipCounters {
    pub fn record(&mut self, id: ItemId, reason: SkipReason) {
        trace!(candidate = %id, reason = reason.as_str(), "candidate skipped");
        self.add(reason, 1);
    }

    /// Count skips that have no single candidate id (e.g. allow-listed ids
    /// that have no embedding).
    pub fn add(&mut self, reason: SkipReason, n: usize) {
        let slot = match reason {
            SkipReason::NotFound => &mut self.not_found,
            SkipReason::StaleIndexEntry => &mut self.stale_index_entry,
            SkipReason::SelfMatch => &mut self.self_match,
            SkipReason::OutsideAllowList => &mut self.outside_allow_list,
            SkipReason::MissingRequired => &mut self.missing_required,
            SkipReason::HasExcluded => &mut self.has_excluded,
            SkipReason::PlayerConstraint => &mut self.player_constraint,
            SkipReason::PlaytimeConstraint => &mut self.playtime_constraint,
            SkipReason::FacetConstraint => &mut self.facet_constraint,
            SkipReason::ReferenceUnavailable => &mut self.reference_unavailable,
            SkipReason::StoreUnavailable => &mut self.store_unavailable,
            SkipReason::MissingEmbedding => &mut self.missing_embedding,
        };
        *slot += n;
    }

    pub fn get(&self, reason: SkipReason) -> usize {
        match reason {
            SkipReason::NotFound => self.not_found,
            SkipReason::StaleIndexEntry => self.stale_index_entry,
            SkipReason::SelfMatch => self.self_match,
            SkipReason::OutsideAllowList => self.outside_allow_list,
            SkipReason::MissingRequired => self.missing_required,
            SkipReason::HasExcluded => self.has_excluded,
            SkipReason::PlayerConstraint => self.player_constraint,
            SkipReason::PlaytimeConstraint => self.playtime_constraint,
            SkipReason::FacetConstraint => self.facet_constraint,
            SkipReason::ReferenceUnavailable => self.reference_unavailable,
            SkipReason::StoreUnavailable => self.store_unavailable,
            SkipReason::MissingEmbedding => self.missing_embedding,
        }
    }

    pub fn total(&self) -> usize {
        self.not_found
            + self.stale_index_entry
            + self.self_match
            + self.outside_allow_list
            + self.missing_required
            + self.has_excluded
            + self.player_constraint
            + self.playtime_constraint
            + self.facet_constraint
            + self.reference_unavailable
            + self.store_unavailable
            + self.missing_embedding
    }
}
