//! Ranking orchestrator
//!
//! One request runs strictly in order:
//! `Init → CandidatesReady → Filtered → Scored → Reranked → Done`.
//! Failures local to one candidate are classified and counted; failures in
//! shared setup (reference embedding, index query) abort the request.

use crate::candidates::CandidateGenerator;
use crate::config::EngineConfig;
use crate::counters::{SkipCounters, SkipReason};
use crate::request::{CandidateSource, EscalationStage, RankOutcome, RankRequest, ScoredCandidate, ScoringMode};
use ahash::AHashSet;
use gamerec_core::{Error, FacetKind, FacetMap, FeatureSnapshot, Item, ItemId, Result, VectorIndex};
use gamerec_similarity::{
    ConstraintSpec, Explanation, MetaScore, MetaScorer, RarityTable, RerankBonus, RerankInputs, Reranker,
};
use gamerec_storage::{CatalogStore, FeatureAccessor, ItemFeatures, ResilientStore};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

/// Pipeline position, used in logs and to report where a request failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Init,
    CandidatesReady,
    Filtered,
    Scored,
    Reranked,
    Done,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Init => "init",
            PipelineStage::CandidatesReady => "candidates_ready",
            PipelineStage::Filtered => "filtered",
            PipelineStage::Scored => "scored",
            PipelineStage::Reranked => "reranked",
            PipelineStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// A candidate that passed every cheap check
struct Survivor {
    item: Item,
    similarity: f32,
    snapshot: Option<FeatureSnapshot>,
}

pub struct Ranker {
    store: ResilientStore,
    index: Arc<dyn VectorIndex>,
    config: EngineConfig,
    scorer: MetaScorer,
    reranker: Reranker,
}

impl Ranker {
    pub fn new(store: Arc<dyn CatalogStore>, index: Arc<dyn VectorIndex>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: ResilientStore::with_retries(store, config.store.max_retries),
            index,
            scorer: MetaScorer::new().with_rarity_multiplier(config.rarity.multiplier),
            reranker: Reranker::new(config.rerank.clone()),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &ResilientStore {
        &self.store
    }

    /// Rank candidates for one request.
    ///
    /// Returns an empty list, not an error, when nothing passes the filters.
    pub fn rank(&self, request: &RankRequest) -> Result<RankOutcome> {
        self.run(request, EscalationStage::Requested)
    }

    /// Rarity weights for every facet, from current catalog counts
    pub fn rarity_table(&self) -> Result<RarityTable> {
        let total = self.store.read("item_count", |s| s.item_count())?;
        let mut counts: FacetMap<_> = FacetMap::default();
        for kind in FacetKind::ALL {
            counts[kind] = self.store.read("facet_value_counts", |s| s.facet_value_counts(kind))?;
        }
        Ok(RarityTable::from_counts(counts, total))
    }

    /// Run the pipeline for one rung of the escalation ladder. The
    /// `EmbeddingOnly` rung skips feature reads entirely and is only ever
    /// given a request without filters.
    pub(crate) fn run(&self, request: &RankRequest, stage: EscalationStage) -> Result<RankOutcome> {
        request.validate()?;
        let span = info_span!("rank", reference = %request.reference, top_k = request.top_k, stage = %stage);
        let _enter = span.enter();

        let mut state = PipelineStage::Init;
        let result = self.pipeline(request, stage, &mut state);
        if let Err(e) = &result {
            warn!(state = %state, error = %e, "ranking aborted");
        }
        result
    }

    fn pipeline(&self, request: &RankRequest, stage: EscalationStage, state: &mut PipelineStage) -> Result<RankOutcome> {
        if let Err(e) = self.store.ensure_healthy() {
            warn!(error = %e, "catalog health check failed, relying on per-read retries");
        }

        let accessor = FeatureAccessor::new(&self.store);
        let read_features = stage != EscalationStage::EmbeddingOnly;

        let reference = if read_features {
            self.reference_features(&accessor, request.reference)?
        } else {
            None
        };
        let mode = if reference.is_some() {
            ScoringMode::Blended
        } else {
            ScoringMode::EmbeddingOnly
        };
        let rarity = if request.use_rarity && reference.is_some() {
            match self.rarity_table() {
                Ok(table) => Some(table),
                Err(e) => {
                    warn!(error = %e, "rarity statistics unavailable, using base weights");
                    None
                }
            }
        } else {
            None
        };

        *state = PipelineStage::CandidatesReady;
        let generator = CandidateGenerator::new(&self.store, self.index.as_ref(), &self.config.candidates);
        let query = generator.reference_embedding(request.reference)?;
        let set = generator.generate(
            &query,
            request.allowed.as_deref(),
            request.top_k,
            !request.excluded.is_empty(),
        )?;
        debug!(state = %state, candidates = set.candidates.len(), source = ?set.source, "candidates ready");

        let mut skipped = SkipCounters::default();
        skipped.add(SkipReason::MissingEmbedding, set.missing_embeddings);

        let allowed: Option<AHashSet<ItemId>> = request.allowed.as_ref().map(|ids| ids.iter().copied().collect());
        let constraints = request.constraints.clone().unwrap_or_default();
        let reference_snapshot = reference.as_ref().map(|r| &r.snapshot);
        let needs_missing_reference = reference.is_none() && constraints.needs_reference();
        // An index hit without a catalog row means the index is out of date.
        let missing_row = match set.source {
            CandidateSource::Index { .. } => SkipReason::StaleIndexEntry,
            CandidateSource::ExactScan => SkipReason::NotFound,
        };

        *state = PipelineStage::Filtered;
        let mut survivors = Vec::new();
        for &(id, similarity) in &set.candidates {
            if !request.include_self && id == request.reference {
                skipped.record(id, SkipReason::SelfMatch);
                continue;
            }
            if let Some(allowed) = &allowed {
                if !allowed.contains(&id) {
                    skipped.record(id, SkipReason::OutsideAllowList);
                    continue;
                }
            }

            let fetched = if read_features {
                accessor.features(id).map(|f| (f.item, Some(f.snapshot)))
            } else {
                self.store.read("item", |s| s.item(id)).map(|item| (item, None))
            };
            let (item, snapshot) = match fetched {
                Ok(found) => found,
                Err(Error::NotFound(_)) => {
                    skipped.record(id, missing_row);
                    continue;
                }
                Err(e) => {
                    debug!(candidate = %id, error = %e, "candidate fetch failed");
                    skipped.record(id, SkipReason::StoreUnavailable);
                    continue;
                }
            };

            let rejection = self.cheap_rejection(
                request,
                &constraints,
                reference_snapshot,
                &item,
                snapshot.as_ref(),
                needs_missing_reference,
            );
            if let Some(reason) = rejection {
                skipped.record(id, reason);
                continue;
            }
            survivors.push(Survivor { item, similarity, snapshot });
        }
        debug!(state = %state, survivors = survivors.len(), skipped = skipped.total(), "candidates filtered");

        *state = PipelineStage::Scored;
        let mut scored = Vec::with_capacity(survivors.len());
        for survivor in survivors {
            let meta = match (reference_snapshot, survivor.snapshot.as_ref()) {
                (Some(r), Some(c)) => Some(self.scorer.score(r, c, rarity.as_ref())),
                _ => None,
            };
            if let Some(meta) = &meta {
                if !constraints.satisfies_generic(meta) {
                    skipped.record(survivor.item.id, SkipReason::FacetConstraint);
                    continue;
                }
            }
            scored.push(self.build_candidate(request, survivor, meta));
        }
        debug!(state = %state, scored = scored.len(), "candidates scored");

        *state = PipelineStage::Reranked;
        let reference_complexity = reference.as_ref().and_then(|r| r.item.complexity);
        self.reranker.rerank(&mut scored, reference_complexity);

        *state = PipelineStage::Done;
        scored.truncate(request.top_k);
        info!(
            returned = scored.len(),
            considered = set.candidates.len(),
            skipped = skipped.total(),
            mode = ?mode,
            "ranking complete"
        );

        Ok(RankOutcome {
            reference: request.reference,
            candidates: scored,
            mode,
            stage,
            source: set.source,
            considered: set.candidates.len(),
            skipped,
        })
    }

    /// Reference features, or `None` when they cannot be read. A missing
    /// reference row or a store that stays down after the retry degrades the
    /// request to embedding-only scoring.
    fn reference_features(&self, accessor: &FeatureAccessor<'_>, reference: ItemId) -> Result<Option<ItemFeatures>> {
        match accessor.features(reference) {
            Ok(features) => Ok(Some(features)),
            Err(e @ (Error::NotFound(_) | Error::StoreUnavailable(_))) => {
                warn!(error = %e, "reference features unavailable, ranking by embedding only");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Required/excluded values first, then player and playtime rules.
    fn cheap_rejection(
        &self,
        request: &RankRequest,
        constraints: &ConstraintSpec,
        reference: Option<&FeatureSnapshot>,
        item: &Item,
        snapshot: Option<&FeatureSnapshot>,
        needs_missing_reference: bool,
    ) -> Option<SkipReason> {
        if let Some(snapshot) = snapshot {
            if !request.required.all_present(snapshot) {
                return Some(SkipReason::MissingRequired);
            }
            if !request.excluded.none_present(snapshot) {
                return Some(SkipReason::HasExcluded);
            }
        }
        if needs_missing_reference {
            return Some(SkipReason::ReferenceUnavailable);
        }
        if let Some(snapshot) = snapshot {
            if !constraints.satisfies_players(reference, snapshot) {
                return Some(SkipReason::PlayerConstraint);
            }
        }
        if !constraints.satisfies_playtime(item.playtime_estimate()) {
            return Some(SkipReason::PlaytimeConstraint);
        }
        None
    }

    fn build_candidate(&self, request: &RankRequest, survivor: Survivor, meta: Option<MetaScore>) -> ScoredCandidate {
        let embedding_similarity = survivor.similarity as f64;
        let blend = &self.config.blend;
        let final_score = match &meta {
            Some(m) => blend.embedding_weight * embedding_similarity + blend.meta_weight * m.composite,
            None => embedding_similarity,
        };
        let explanation = if request.explain {
            meta.as_ref().map(|m| Explanation::from_shared(&m.shared))
        } else {
            None
        };
        let item = survivor.item;

        ScoredCandidate {
            id: item.id,
            inputs: RerankInputs {
                rating_count: item.rating_count,
                popularity_rank: item.popularity_rank,
                year: item.year,
                complexity: item.complexity,
            },
            name: item.name,
            embedding_similarity,
            meta,
            final_score,
            adjusted_score: final_score,
            bonus: RerankBonus::default(),
            explanation,
        }
    }
}

impl std::fmt::Debug for Ranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ranker")
            .field("store", &self.store)
            .field("indexed", &self.index.len())
            .field("config", &self.config)
            .finish()
    }
}
