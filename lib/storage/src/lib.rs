//! # gamerec storage
//!
//! Catalog access for the ranking engine:
//!
//! - [`CatalogStore`] - one-round-trip read interface with connection recovery
//! - [`MemoryCatalog`] - arena-style in-memory catalog
//! - [`ResilientStore`] - reconnect-and-retry wrapper used by every engine read
//! - [`FeatureAccessor`] - feature snapshots with overrides applied
//! - snapshots - JSON catalog documents, written atomically

pub mod features;
pub mod memory;
pub mod resilient;
pub mod snapshot;
pub mod store;

pub use features::{FeatureAccessor, ItemFeatures};
pub use memory::MemoryCatalog;
pub use resilient::{ResilientStore, DEFAULT_MAX_RETRIES};
pub use snapshot::{load_snapshot, save_snapshot, CatalogSnapshot, ItemRecord, OverrideRecord};
pub use store::CatalogStore;
