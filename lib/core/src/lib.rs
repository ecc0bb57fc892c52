//! # gamerec core
//!
//! Core types for the gamerec ranking engine:
//!
//! - [`Item`] / [`ItemId`] - catalog records with scalar attributes and a unit embedding
//! - [`FacetKind`] / [`FacetMap`] - the six categorical facets and per-facet tables
//! - [`FeatureSnapshot`] - an item's facet sets and player data for one request
//! - [`VectorIndex`] - top-N cosine lookup, exact ([`FlatIndex`]) or approximate ([`HnswIndex`])
//!
//! ## Example
//!
//! ```rust
//! use gamerec_core::{FlatIndex, ItemId, Vector, VectorIndex};
//!
//! let index = FlatIndex::build(vec![
//!     (ItemId(1), Vector::new(vec![1.0, 0.0])),
//!     (ItemId(2), Vector::new(vec![0.0, 1.0])),
//! ]).unwrap();
//!
//! let results = index.top_n(&Vector::new(vec![0.9, 0.1]), 1).unwrap();
//! assert_eq!(results[0].0, ItemId(1));
//! ```

pub mod error;
pub mod facet;
pub mod hnsw;
pub mod index;
pub mod item;
pub mod vector;

/// SIMD-optimized vector operations
///
/// - AVX2/FMA on x86_64
/// - NEON on ARM64/Apple Silicon
pub mod simd;

pub use error::{Error, Result};
pub use facet::{
    value_eq, FacetKind, FacetMap, FacetSets, FeatureOverride, FeatureSnapshot, OverrideAction, PlayerVotes,
};
pub use hnsw::HnswIndex;
pub use index::{FlatIndex, IndexKind, VectorIndex};
pub use item::{Item, ItemId};
pub use vector::Vector;
