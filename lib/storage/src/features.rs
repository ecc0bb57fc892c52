//! Feature snapshots with overrides applied
//!
//! A snapshot is assembled from four reads (item row, facet links, player
//! votes, overrides) plus one name lookup per override. It is never cached:
//! overrides may change between requests.

use crate::resilient::ResilientStore;
use gamerec_core::{FeatureSnapshot, Item, ItemId, Result};
use tracing::debug;

/// An item together with its resolved features
#[derive(Debug, Clone)]
pub struct ItemFeatures {
    pub item: Item,
    pub snapshot: FeatureSnapshot,
}

pub struct FeatureAccessor<'a> {
    store: &'a ResilientStore,
}

impl<'a> FeatureAccessor<'a> {
    pub fn new(store: &'a ResilientStore) -> Self {
        Self { store }
    }

    /// Fetch an item's attributes and its full feature snapshot.
    ///
    /// Fails with `NotFound` when the item has no row and with
    /// `StoreUnavailable` when a read still fails after reconnecting.
    pub fn features(&self, id: ItemId) -> Result<ItemFeatures> {
        let item = self.store.read("item", |s| s.item(id))?;
        let facets = self.store.read("facet_links", |s| s.facet_links(id))?;
        let votes = self.store.read("player_votes", |s| s.player_votes(id))?;
        let overrides = self.store.read("overrides", |s| s.overrides(id))?;

        let mut snapshot = FeatureSnapshot::new(id);
        snapshot.facets = facets;
        snapshot.min_players = item.min_players;
        snapshot.max_players = item.max_players;
        snapshot.votes = votes;

        for change in overrides {
            let name = self.store.read("facet_value_name", |s| {
                s.facet_value_name(change.facet, change.value_id)
            })?;
            match name {
                Some(name) => snapshot.apply_override(change.facet, &name, change.action),
                None => debug!(
                    item = %id,
                    facet = %change.facet,
                    value_id = change.value_id,
                    "override references unknown facet value, ignored"
                ),
            }
        }

        Ok(ItemFeatures { item, snapshot })
    }
}
