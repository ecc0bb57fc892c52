// Catalog snapshots: a single JSON document holding the facet dictionary,
// every item with its links and poll data, and outstanding overrides.
use gamerec_core::{Error, FacetMap, FeatureOverride, Item, ItemId, PlayerVotes, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Facet value id → display name, per facet
    #[serde(default)]
    pub dictionary: FacetMap<BTreeMap<u32, String>>,
    pub items: Vec<ItemRecord>,
    #[serde(default)]
    pub overrides: Vec<OverrideRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRecord {
    #[serde(flatten)]
    pub item: Item,
    /// Facet value ids, resolved through the dictionary
    #[serde(default)]
    pub links: FacetMap<Vec<u32>>,
    #[serde(default)]
    pub votes: PlayerVotes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideRecord {
    pub item_id: ItemId,
    #[serde(flatten)]
    pub change: FeatureOverride,
}

/// Read a snapshot document from disk
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<CatalogSnapshot> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let snapshot: CatalogSnapshot = serde_json::from_reader(BufReader::new(file))?;
    info!(path = %path.display(), items = snapshot.items.len(), "loaded catalog snapshot");
    Ok(snapshot)
}

/// Write a snapshot document atomically (temp file + rename)
pub fn save_snapshot<P: AsRef<Path>>(path: P, snapshot: &CatalogSnapshot) -> Result<()> {
    let path = path.as_ref();
    let file = atomicwrites::AtomicFile::new(path, atomicwrites::OverwriteBehavior::AllowOverwrite);
    file.write(|f| -> std::result::Result<(), Error> {
        let mut writer = BufWriter::new(f);
        serde_json::to_writer_pretty(&mut writer, snapshot)?;
        writer.flush()?;
        Ok(())
    })
    .map_err(|e| match e {
        atomicwrites::Error::Internal(io) => Error::Io(io),
        atomicwrites::Error::User(inner) => inner,
    })?;
    info!(path = %path.display(), items = snapshot.items.len(), "saved catalog snapshot");
    Ok(())
}
