//! # gamerec similarity
//!
//! Structured similarity between catalog items: per-facet Jaccard overlap,
//! rarity weighting, declarative constraints, re-ranking bonuses and
//! overlap explanations.
//!
//! ## Example
//!
//! ```rust
//! use gamerec_core::{FacetKind, FeatureSnapshot, ItemId};
//! use gamerec_similarity::{ConstraintSpec, FacetBounds, MetaScorer};
//!
//! let mut a = FeatureSnapshot::new(ItemId(1));
//! a.facets[FacetKind::Mechanics].insert("Deck Building".to_string());
//! a.facets[FacetKind::Mechanics].insert("Drafting".to_string());
//! let mut b = FeatureSnapshot::new(ItemId(2));
//! b.facets[FacetKind::Mechanics].insert("Deck Building".to_string());
//!
//! let score = MetaScorer::new().score(&a, &b, None);
//! assert_eq!(score.jaccard[FacetKind::Mechanics], 0.5);
//!
//! let spec = ConstraintSpec::new().with_facet(FacetKind::Mechanics, FacetBounds::jaccard_at_least(0.6));
//! assert!(!spec.satisfies_generic(&score));
//! ```

pub mod constraint;
pub mod explain;
pub mod filter;
pub mod overlap;
pub mod rarity;
pub mod rerank;
pub mod scorer;

pub use constraint::{ConstraintSpec, FacetBounds, PlayerConstraint, PlaytimeConstraint, DEFAULT_PLAYTIME_TOLERANCE};
pub use explain::{Explanation, Reason};
pub use filter::FeatureValueFilter;
pub use overlap::jaccard;
pub use rarity::{rarity_weight, rarity_weights, RarityTable};
pub use rerank::{RerankBonus, RerankConfig, RerankInputs, Rerankable, Reranker};
pub use scorer::{base_weights, MetaScore, MetaScorer, DEFAULT_RARITY_MULTIPLIER, NON_GAMEPLAY_CATEGORIES};
