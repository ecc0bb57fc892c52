//! Fallback ladder for requests that come back empty
//!
//! Each rung relaxes the previous one: drop the allow-list, then drop all
//! constraints and value filters, then stop reading per-candidate features.
//! Rungs that would not change the request are skipped.

use crate::ranker::Ranker;
use crate::request::{EscalationStage, RankOutcome, RankRequest};
use gamerec_core::Result;
use gamerec_similarity::FeatureValueFilter;
use tracing::info;

const LADDER: [EscalationStage; 3] = [
    EscalationStage::Global,
    EscalationStage::Unconstrained,
    EscalationStage::EmbeddingOnly,
];

impl Ranker {
    /// Rank, escalating through the ladder until a rung yields results.
    /// The outcome records the rung that produced it; if every rung is
    /// empty the last one's (empty) outcome is returned.
    pub fn rank_with_fallback(&self, request: &RankRequest) -> Result<RankOutcome> {
        request.validate()?;
        let mut outcome = self.run(request, EscalationStage::Requested)?;
        let mut current = request.clone();

        for stage in LADDER {
            if !outcome.is_empty() {
                break;
            }
            if !relax(&mut current, stage) {
                continue;
            }
            info!(stage = %stage, reference = %request.reference, "no results, escalating");
            outcome = self.run(&current, stage)?;
        }
        Ok(outcome)
    }
}

/// Apply one rung to the request; false when it changes nothing.
fn relax(request: &mut RankRequest, stage: EscalationStage) -> bool {
    match stage {
        EscalationStage::Requested => false,
        EscalationStage::Global => request.allowed.take().is_some(),
        EscalationStage::Unconstrained => {
            let had_filters = request.has_filters();
            request.constraints = None;
            request.required = FeatureValueFilter::default();
            request.excluded = FeatureValueFilter::default();
            had_filters
        }
        EscalationStage::EmbeddingOnly => true,
    }
}
