//! Ranking requests and their results

use gamerec_core::{Error, ItemId, Result};
use gamerec_similarity::{ConstraintSpec, Explanation, FeatureValueFilter, MetaScore, RerankBonus, RerankInputs, Rerankable};
use serde::{Deserialize, Serialize};

fn default_top_k() -> usize {
    10
}

/// One call to the ranking engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankRequest {
    pub reference: ItemId,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub include_self: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<ConstraintSpec>,
    /// Restrict results to these ids (a collection scope)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<ItemId>>,
    #[serde(default)]
    pub explain: bool,
    #[serde(default)]
    pub required: FeatureValueFilter,
    #[serde(default)]
    pub excluded: FeatureValueFilter,
    #[serde(default)]
    pub use_rarity: bool,
}

impl RankRequest {
    pub fn new(reference: impl Into<ItemId>) -> Self {
        Self {
            reference: reference.into(),
            top_k: default_top_k(),
            include_self: false,
            constraints: None,
            allowed: None,
            explain: false,
            required: FeatureValueFilter::default(),
            excluded: FeatureValueFilter::default(),
            use_rarity: false,
        }
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn include_self(mut self, include: bool) -> Self {
        self.include_self = include;
        self
    }

    pub fn constraints(mut self, spec: ConstraintSpec) -> Self {
        self.constraints = Some(spec);
        self
    }

    pub fn allowed(mut self, ids: impl IntoIterator<Item = ItemId>) -> Self {
        self.allowed = Some(ids.into_iter().collect());
        self
    }

    pub fn explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    pub fn required(mut self, filter: FeatureValueFilter) -> Self {
        self.required = filter;
        self
    }

    pub fn excluded(mut self, filter: FeatureValueFilter) -> Self {
        self.excluded = filter;
        self
    }

    pub fn use_rarity(mut self, enabled: bool) -> Self {
        self.use_rarity = enabled;
        self
    }

    /// Reject requests that cannot run, before any I/O
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::InvalidRequest("top_k must be at least 1".to_string()));
        }
        if let Some(spec) = &self.constraints {
            spec.validate()?;
        }
        Ok(())
    }

    pub(crate) fn has_filters(&self) -> bool {
        self.constraints.as_ref().map_or(false, |c| !c.is_empty())
            || !self.required.is_empty()
            || !self.excluded.is_empty()
    }
}

/// How final scores were computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Embedding similarity blended with meta-similarity
    Blended,
    /// Reference features were unavailable; embedding similarity only
    EmbeddingOnly,
}

/// Where the raw candidates came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Every allow-listed item scored directly
    ExactScan,
    /// Top-N query against the vector index
    Index { requested: usize },
}

/// Rung of the fallback ladder that produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStage {
    /// The request as given
    Requested,
    /// Allow-list dropped
    Global,
    /// Constraints and value filters dropped as well
    Unconstrained,
    /// No per-candidate feature reads; embedding similarity only
    EmbeddingOnly,
}

impl std::fmt::Display for EscalationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EscalationStage::Requested => "requested",
            EscalationStage::Global => "global",
            EscalationStage::Unconstrained => "unconstrained",
            EscalationStage::EmbeddingOnly => "embedding_only",
        };
        f.write_str(name)
    }
}

/// One ranked result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub id: ItemId,
    pub name: String,
    pub embedding_similarity: f64,
    /// Absent when meta-similarity was not computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaScore>,
    /// Blended score before re-ranking bonuses
    pub final_score: f64,
    /// Score after re-ranking bonuses; the sort key
    pub adjusted_score: f64,
    pub bonus: RerankBonus,
    pub inputs: RerankInputs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,
}

impl Rerankable for ScoredCandidate {
    fn base_score(&self) -> f64 {
        self.final_score
    }

    fn rerank_inputs(&self) -> &RerankInputs {
        &self.inputs
    }

    fn set_adjusted_score(&mut self, score: f64, bonus: RerankBonus) {
        self.adjusted_score = score;
        self.bonus = bonus;
    }

    fn adjusted_score(&self) -> f64 {
        self.adjusted_score
    }
}

/// Ranked list plus how it was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankOutcome {
    pub reference: ItemId,
    pub candidates: Vec<ScoredCandidate>,
    pub mode: ScoringMode,
    pub stage: EscalationStage,
    pub source: CandidateSource,
    /// Raw candidates examined
    pub considered: usize,
    pub skipped: crate::SkipCounters,
}

impl RankOutcome {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.candidates.iter().map(|c| c.id).collect()
    }
}
