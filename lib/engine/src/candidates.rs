//! Candidate generation
//!
//! Small allow-lists are scored exhaustively against the reference
//! embedding, so a collection's true neighbours are never lost outside the
//! index's global top-N. Everything else goes through the vector index with
//! an over-fetch factor sized to the expected filter losses.

use crate::config::CandidateConfig;
use crate::request::CandidateSource;
use ahash::AHashSet;
use gamerec_core::index::sort_by_similarity;
use gamerec_core::{Error, ItemId, Result, Vector, VectorIndex};
use gamerec_storage::ResilientStore;
use tracing::{debug, warn};

/// Raw candidates ordered by descending embedding similarity
#[derive(Debug, Clone)]
pub struct CandidateSet {
    pub candidates: Vec<(ItemId, f32)>,
    pub source: CandidateSource,
    /// Allow-listed ids skipped because they have no embedding
    pub missing_embeddings: usize,
}

pub struct CandidateGenerator<'a> {
    store: &'a ResilientStore,
    index: &'a dyn VectorIndex,
    config: &'a CandidateConfig,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(store: &'a ResilientStore, index: &'a dyn VectorIndex, config: &'a CandidateConfig) -> Self {
        Self { store, index, config }
    }

    /// Unit embedding of the reference item; `NotFound` when it has none.
    pub fn reference_embedding(&self, reference: ItemId) -> Result<Vector> {
        let found = self.store.read("embeddings", |s| s.embeddings(&[reference]))?;
        found
            .into_iter()
            .find(|(id, _)| *id == reference)
            .map(|(_, v)| v.normalized())
            .ok_or(Error::NotFound(reference))
    }

    /// Generate candidates for `query`.
    ///
    /// `exclusions_active` widens the index over-fetch because excluded
    /// values are expected to reject much of the raw list.
    pub fn generate(
        &self,
        query: &Vector,
        allowed: Option<&[ItemId]>,
        top_k: usize,
        exclusions_active: bool,
    ) -> Result<CandidateSet> {
        if let Some(allowed) = allowed {
            if allowed.len() <= self.config.exact_scan_limit {
                match self.exact_scan(query, allowed) {
                    Ok(set) => return Ok(set),
                    Err(e) if e.is_transient() => {
                        warn!(error = %e, "allow-list embedding fetch failed, using the index");
                        return self.from_index(query, top_k, self.config.restrictive_overfetch);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let factor = if allowed.is_some() || exclusions_active {
            self.config.restrictive_overfetch
        } else {
            self.config.default_overfetch
        };
        self.from_index(query, top_k, factor)
    }

    fn exact_scan(&self, query: &Vector, allowed: &[ItemId]) -> Result<CandidateSet> {
        let mut seen = AHashSet::with_capacity(allowed.len());
        let unique: Vec<ItemId> = allowed.iter().copied().filter(|id| seen.insert(*id)).collect();

        let embeddings = self.store.read("embeddings", |s| s.embeddings(&unique))?;
        let missing_embeddings = unique.len().saturating_sub(embeddings.len());

        let mut candidates: Vec<(ItemId, f32)> = embeddings
            .iter()
            .map(|(id, v)| (*id, query.cosine_similarity(v)))
            .collect();
        sort_by_similarity(&mut candidates);

        debug!(allowed = unique.len(), scored = candidates.len(), missing_embeddings, "exact allow-list scan");
        Ok(CandidateSet {
            candidates,
            source: CandidateSource::ExactScan,
            missing_embeddings,
        })
    }

    fn from_index(&self, query: &Vector, top_k: usize, factor: usize) -> Result<CandidateSet> {
        let requested = top_k.saturating_mul(factor).min(self.index.len());
        let candidates = if requested == 0 {
            Vec::new()
        } else {
            self.index.top_n(query, requested).map_err(|e| match e {
                Error::IndexUnavailable(_) => e,
                other => Error::IndexUnavailable(other.to_string()),
            })?
        };

        debug!(requested, returned = candidates.len(), factor, "index candidates");
        Ok(CandidateSet {
            candidates,
            source: CandidateSource::Index { requested },
            missing_embeddings: 0,
        })
    }
}
