//! # gamerec
//!
//! Similar-game recommendations: nearest neighbours in a semantic embedding
//! space, blended with structured facet overlap, filtered through
//! declarative constraints and re-ranked on rating, popularity, recency and
//! complexity.
//!
//! ## Quick Start
//!
//! ### From the command line
//!
//! ```bash
//! gamerec --catalog catalog.json rank --id 13 --top-k 5 --explain
//! gamerec --catalog catalog.json rarity --facet mechanics --limit 20
//! ```
//!
//! ### As a library
//!
//! ```rust,no_run
//! use gamerec::prelude::*;
//!
//! let ranker = gamerec::open("catalog.json", None, IndexKind::Hnsw).unwrap();
//! let request = RankRequest::new(13u64)
//!     .top_k(5)
//!     .required(FeatureValueFilter::new().with(FacetKind::Categories, "Fantasy"))
//!     .explain(true);
//! for candidate in ranker.rank(&request).unwrap().candidates {
//!     println!("{} {:.3}", candidate.name, candidate.adjusted_score);
//! }
//! ```
//!
//! ## Crate Structure
//!
//! - `gamerec-core`: items, facets, snapshots, vectors and vector indexes
//! - `gamerec-storage`: catalog store, retrying reads, feature snapshots, JSON snapshots
//! - `gamerec-similarity`: Jaccard, rarity, meta-similarity, constraints, re-ranking, explanations
//! - `gamerec-engine`: candidate generation and the ranking pipeline

pub use gamerec_core as core;
pub use gamerec_engine as engine;
pub use gamerec_similarity as similarity;
pub use gamerec_storage as storage;

use std::path::Path;
use std::sync::Arc;

/// Commonly used types
pub mod prelude {
    pub use gamerec_core::{Error, FacetKind, IndexKind, Item, ItemId, Result, Vector, VectorIndex};
    pub use gamerec_engine::{EngineConfig, RankOutcome, RankRequest, Ranker, ScoredCandidate};
    pub use gamerec_similarity::{ConstraintSpec, FacetBounds, FeatureValueFilter, PlayerConstraint, PlaytimeConstraint};
    pub use gamerec_storage::{CatalogStore, MemoryCatalog};
}

use prelude::*;

/// Load a catalog snapshot, build an index over its embeddings and return a
/// ready ranker. Without a config file the defaults apply.
pub fn open<P: AsRef<Path>>(catalog: P, config: Option<&Path>, index: IndexKind) -> Result<Ranker> {
    let config = match config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    let snapshot = gamerec_storage::load_snapshot(catalog)?;
    let catalog = Arc::new(MemoryCatalog::from_snapshot(snapshot)?);
    let index = gamerec_engine::build_index(index, catalog.embedding_entries())?;
    Ranker::new(catalog, index, config)
}
