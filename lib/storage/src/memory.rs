//! In-memory catalog store
//!
//! Arena layout: items live in a `Vec` and are found through an id → slot map.
//! Facet links are stored as value ids and resolved against a per-facet value
//! dictionary on read. Overrides are kept apart from the base records so they
//! can change between requests without touching the items.

use crate::snapshot::{CatalogSnapshot, ItemRecord, OverrideRecord};
use crate::store::CatalogStore;
use ahash::AHashMap;
use gamerec_core::{
    Error, FacetKind, FacetMap, FacetSets, FeatureOverride, Item, ItemId, PlayerVotes, Result,
    Vector,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

struct StoredItem {
    item: Item,
    links: FacetMap<Vec<u32>>,
    votes: PlayerVotes,
}

#[derive(Default)]
struct Tables {
    items: Vec<StoredItem>,
    positions: AHashMap<ItemId, usize>,
    dictionary: FacetMap<BTreeMap<u32, String>>,
}

impl Tables {
    fn get(&self, id: ItemId) -> Result<&StoredItem> {
        self.positions
            .get(&id)
            .map(|&slot| &self.items[slot])
            .ok_or(Error::NotFound(id))
    }

    /// Id of `name` in the facet dictionary, assigning the next free id if new
    fn intern(&mut self, facet: FacetKind, name: &str) -> u32 {
        let dictionary = &mut self.dictionary[facet];
        if let Some((&id, _)) = dictionary.iter().find(|(_, v)| v.as_str() == name) {
            return id;
        }
        let id = dictionary.keys().next_back().map_or(1, |last| last + 1);
        dictionary.insert(id, name.to_string());
        id
    }
}

/// Catalog held entirely in memory behind a simulated connection
pub struct MemoryCatalog {
    tables: RwLock<Tables>,
    overrides: RwLock<AHashMap<ItemId, Vec<FeatureOverride>>>,
    connected: AtomicBool,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            overrides: RwLock::new(AHashMap::new()),
            connected: AtomicBool::new(true),
        }
    }

    /// Restore a catalog from a snapshot document
    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Result<Self> {
        let catalog = Self::new();
        {
            let mut tables = catalog.tables.write();
            tables.dictionary = snapshot.dictionary;
        }
        for record in snapshot.items {
            catalog.upsert_item(record.item, record.links, record.votes);
        }
        for record in snapshot.overrides {
            catalog.add_override(record.item_id, record.change);
        }
        info!(items = catalog.len(), "catalog restored from snapshot");
        Ok(catalog)
    }

    /// Capture the full catalog, overrides included
    pub fn to_snapshot(&self) -> CatalogSnapshot {
        let tables = self.tables.read();
        let overrides = self.overrides.read();

        let items = tables
            .items
            .iter()
            .map(|stored| ItemRecord {
                item: stored.item.clone(),
                links: stored.links.clone(),
                votes: stored.votes.clone(),
            })
            .collect();

        let mut override_records: Vec<OverrideRecord> = overrides
            .iter()
            .flat_map(|(&item_id, changes)| {
                changes.iter().map(move |&change| OverrideRecord { item_id, change })
            })
            .collect();
        override_records.sort_by_key(|r| (r.item_id, r.change.facet, r.change.value_id));

        CatalogSnapshot {
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            dictionary: tables.dictionary.clone(),
            items,
            overrides: override_records,
        }
    }

    pub fn len(&self) -> usize {
        self.tables.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a facet value name under a fixed id
    pub fn define_value(&self, facet: FacetKind, value_id: u32, name: impl Into<String>) {
        self.tables.write().dictionary[facet].insert(value_id, name.into());
    }

    /// Id of a facet value name, registering it if unknown
    pub fn intern_value(&self, facet: FacetKind, name: &str) -> u32 {
        self.tables.write().intern(facet, name)
    }

    /// Insert or replace an item with its facet links (value ids)
    pub fn upsert_item(&self, item: Item, links: FacetMap<Vec<u32>>, votes: PlayerVotes) {
        let mut tables = self.tables.write();
        let id = item.id;
        let stored = StoredItem { item, links, votes };
        let existing = tables.positions.get(&id).copied();
        match existing {
            Some(slot) => tables.items[slot] = stored,
            None => {
                let slot = tables.items.len();
                tables.items.push(stored);
                tables.positions.insert(id, slot);
            }
        }
    }

    /// Insert or replace an item, interning facet value names as needed
    pub fn upsert_item_named(&self, item: Item, names: &FacetSets, votes: PlayerVotes) {
        let links = {
            let mut tables = self.tables.write();
            let mut links: FacetMap<Vec<u32>> = FacetMap::default();
            for (facet, values) in names.iter() {
                links[facet] = values.iter().map(|name| tables.intern(facet, name)).collect();
            }
            links
        };
        self.upsert_item(item, links, votes);
    }

    /// Record a manual override; identical overrides are stored once
    pub fn add_override(&self, item_id: ItemId, change: FeatureOverride) {
        let mut overrides = self.overrides.write();
        let changes = overrides.entry(item_id).or_default();
        if !changes.contains(&change) {
            changes.push(change);
        }
    }

    pub fn clear_overrides(&self, item_id: ItemId) {
        self.overrides.write().remove(&item_id);
    }

    /// All stored embeddings, in insertion order
    pub fn embedding_entries(&self) -> Vec<(ItemId, Vector)> {
        self.tables
            .read()
            .items
            .iter()
            .filter_map(|s| s.item.embedding.clone().map(|e| (s.item.id, e)))
            .collect()
    }

    /// Simulate the connection dropping; reads fail until [`CatalogStore::reconnect`].
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn check_connection(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::StoreUnavailable("connection closed".to_string()))
        }
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStore for MemoryCatalog {
    fn ping(&self) -> Result<()> {
        self.check_connection()
    }

    fn reconnect(&self) -> Result<()> {
        self.connected.store(true, Ordering::Release);
        debug!("in-memory catalog reconnected");
        Ok(())
    }

    fn item(&self, id: ItemId) -> Result<Item> {
        self.check_connection()?;
        Ok(self.tables.read().get(id)?.item.clone())
    }

    fn facet_links(&self, id: ItemId) -> Result<FacetSets> {
        self.check_connection()?;
        let tables = self.tables.read();
        let stored = tables.get(id)?;
        Ok(stored.links.map(|facet, ids| {
            ids.iter()
                .filter_map(|value_id| tables.dictionary[facet].get(value_id).cloned())
                .collect()
        }))
    }

    fn player_votes(&self, id: ItemId) -> Result<PlayerVotes> {
        self.check_connection()?;
        Ok(self.tables.read().get(id)?.votes.clone())
    }

    fn overrides(&self, id: ItemId) -> Result<Vec<FeatureOverride>> {
        self.check_connection()?;
        Ok(self.overrides.read().get(&id).cloned().unwrap_or_default())
    }

    fn facet_value_name(&self, facet: FacetKind, value_id: u32) -> Result<Option<String>> {
        self.check_connection()?;
        Ok(self.tables.read().dictionary[facet].get(&value_id).cloned())
    }

    fn embeddings(&self, ids: &[ItemId]) -> Result<Vec<(ItemId, Vector)>> {
        self.check_connection()?;
        let tables = self.tables.read();
        Ok(ids
            .iter()
            .filter_map(|id| {
                let slot = tables.positions.get(id)?;
                let embedding = tables.items[*slot].item.embedding.clone()?;
                Some((*id, embedding))
            })
            .collect())
    }

    fn facet_value_counts(&self, facet: FacetKind) -> Result<AHashMap<String, usize>> {
        self.check_connection()?;
        let tables = self.tables.read();
        let mut counts: AHashMap<String, usize> = AHashMap::new();
        for stored in &tables.items {
            let mut seen: Vec<u32> = stored.links[facet].clone();
            seen.sort_unstable();
            seen.dedup();
            for value_id in seen {
                if let Some(name) = tables.dictionary[facet].get(&value_id) {
                    *counts.entry(name.clone()).or_insert(0) += 1;
                }
            }
        }
        Ok(counts)
    }

    fn item_count(&self) -> Result<usize> {
        self.check_connection()?;
        Ok(self.tables.read().items.len())
    }
}
