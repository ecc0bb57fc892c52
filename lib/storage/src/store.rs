//! Read interface to the catalog store
//!
//! Every method is one round-trip. Implementations backed by a connection
//! report a dead connection as [`Error::StoreUnavailable`](gamerec_core::Error)
//! and recover through [`CatalogStore::reconnect`]; the engine never calls the
//! store directly but always through [`ResilientStore`](crate::ResilientStore).

use ahash::AHashMap;
use gamerec_core::{FacetKind, FacetSets, FeatureOverride, Item, ItemId, PlayerVotes, Result, Vector};

pub trait CatalogStore: Send + Sync {
    /// Cheap liveness probe.
    fn ping(&self) -> Result<()>;

    /// Drop and re-establish the underlying connection.
    fn reconnect(&self) -> Result<()>;

    /// Scalar attributes and embedding of one item, `NotFound` if absent.
    fn item(&self, id: ItemId) -> Result<Item>;

    /// Base facet links of one item, resolved to value names.
    fn facet_links(&self, id: ItemId) -> Result<FacetSets>;

    /// Player-count poll data of one item.
    fn player_votes(&self, id: ItemId) -> Result<PlayerVotes>;

    /// Manual facet overrides recorded against one item.
    fn overrides(&self, id: ItemId) -> Result<Vec<FeatureOverride>>;

    /// Display name of a facet value id.
    fn facet_value_name(&self, facet: FacetKind, value_id: u32) -> Result<Option<String>>;

    /// Embeddings for a batch of ids. Ids without an embedding are omitted.
    fn embeddings(&self, ids: &[ItemId]) -> Result<Vec<(ItemId, Vector)>>;

    /// Number of items carrying each value of `facet`.
    fn facet_value_counts(&self, facet: FacetKind) -> Result<AHashMap<String, usize>>;

    /// Total number of catalog items.
    fn item_count(&self) -> Result<usize>;
}
