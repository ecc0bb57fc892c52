//! # gamerec engine
//!
//! The ranking and constraint engine. Given a reference item and a
//! [`RankRequest`], a [`Ranker`] generates candidates from the vector index
//! (or an exact scan of a small allow-list), filters them through value and
//! constraint checks, blends embedding and meta-similarity, applies the
//! re-ranking bonuses and truncates to `top_k`.
//!
//! ## Example
//!
//! ```rust
//! use gamerec_core::{FacetSets, IndexKind, Item, PlayerVotes, Vector};
//! use gamerec_engine::{build_index, EngineConfig, RankRequest, Ranker};
//! use gamerec_storage::MemoryCatalog;
//! use std::sync::Arc;
//!
//! let catalog = Arc::new(MemoryCatalog::new());
//! for (id, v) in [(1u64, [1.0, 0.0]), (2, [0.8, 0.2]), (3, [0.0, 1.0])] {
//!     let item = Item::new(id, format!("Game {}", id)).with_embedding(Vector::new(v.to_vec()));
//!     catalog.upsert_item_named(item, &FacetSets::default(), PlayerVotes::default());
//! }
//!
//! let index = build_index(IndexKind::Flat, catalog.embedding_entries()).unwrap();
//! let ranker = Ranker::new(catalog, index, EngineConfig::default()).unwrap();
//! let outcome = ranker.rank(&RankRequest::new(1u64).top_k(1)).unwrap();
//! assert_eq!(outcome.candidates[0].id.0, 2);
//! ```

pub mod candidates;
pub mod config;
pub mod counters;
pub mod escalation;
pub mod ranker;
pub mod request;

pub use candidates::{CandidateGenerator, CandidateSet};
pub use config::{BlendConfig, CandidateConfig, EngineConfig, RarityConfig, StoreConfig};
pub use counters::{SkipCounters, SkipReason};
pub use ranker::{PipelineStage, Ranker};
pub use request::{CandidateSource, EscalationStage, RankOutcome, RankRequest, ScoredCandidate, ScoringMode};

use gamerec_core::{FlatIndex, HnswIndex, IndexKind, ItemId, Result, Vector, VectorIndex};
use std::sync::Arc;
use tracing::info;

/// Build a vector index of the given kind over `entries`
pub fn build_index(kind: IndexKind, entries: Vec<(ItemId, Vector)>) -> Result<Arc<dyn VectorIndex>> {
    let count = entries.len();
    let index: Arc<dyn VectorIndex> = match kind {
        IndexKind::Flat => Arc::new(FlatIndex::build(entries)?),
        IndexKind::Hnsw => Arc::new(HnswIndex::build(entries)?),
    };
    info!(kind = ?kind, items = count, "vector index built");
    Ok(index)
}
