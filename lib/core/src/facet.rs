//! Facets and per-request feature snapshots
//!
//! A facet is one of the six categorical dimensions describing an item.
//! [`FacetMap`] is a fixed-size table indexed by [`FacetKind`], used wherever
//! something is tracked per facet (value sets, bounds, weights, scores).

use crate::item::ItemId;
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::ops::{Index, IndexMut};

/// The six categorical dimensions of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetKind {
    Mechanics,
    Categories,
    Families,
    Designers,
    Artists,
    Publishers,
}

impl FacetKind {
    pub const ALL: [FacetKind; 6] = [
        FacetKind::Mechanics,
        FacetKind::Categories,
        FacetKind::Families,
        FacetKind::Designers,
        FacetKind::Artists,
        FacetKind::Publishers,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            FacetKind::Mechanics => "mechanics",
            FacetKind::Categories => "categories",
            FacetKind::Families => "families",
            FacetKind::Designers => "designers",
            FacetKind::Artists => "artists",
            FacetKind::Publishers => "publishers",
        }
    }
}

impl std::fmt::Display for FacetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FacetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FacetKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown facet '{}'", s))
    }
}

/// One value of `T` per facet
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FacetMap<T> {
    values: [T; 6],
}

impl<T> FacetMap<T> {
    pub fn from_fn(mut f: impl FnMut(FacetKind) -> T) -> Self {
        Self {
            values: FacetKind::ALL.map(&mut f),
        }
    }

    /// Iterate in [`FacetKind::ALL`] order
    pub fn iter(&self) -> impl Iterator<Item = (FacetKind, &T)> {
        FacetKind::ALL.into_iter().zip(self.values.iter())
    }

    pub fn map<U>(&self, mut f: impl FnMut(FacetKind, &T) -> U) -> FacetMap<U> {
        FacetMap::from_fn(|kind| f(kind, &self.values[kind.index()]))
    }
}

impl<T> Index<FacetKind> for FacetMap<T> {
    type Output = T;

    fn index(&self, kind: FacetKind) -> &T {
        &self.values[kind.index()]
    }
}

impl<T> IndexMut<FacetKind> for FacetMap<T> {
    fn index_mut(&mut self, kind: FacetKind) -> &mut T {
        &mut self.values[kind.index()]
    }
}

impl<T: Serialize> Serialize for FacetMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(6))?;
        for (kind, value) in self.iter() {
            map.serialize_entry(kind.as_str(), value)?;
        }
        map.end()
    }
}

/// Missing facets take `T::default()`; unknown facet names are rejected.
impl<'de, T: Deserialize<'de> + Default> Deserialize<'de> for FacetMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut raw: HashMap<FacetKind, T> = HashMap::deserialize(deserializer)?;
        Ok(FacetMap::from_fn(|kind| raw.remove(&kind).unwrap_or_default()))
    }
}

/// Facet value sets keyed by facet
pub type FacetSets = FacetMap<BTreeSet<String>>;

/// Manual correction recorded against an item's facet links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureOverride {
    pub facet: FacetKind,
    pub value_id: u32,
    pub action: OverrideAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideAction {
    Add,
    Remove,
}

/// Community player-count poll results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerVotes {
    /// Player counts with a positive recommendation balance.
    #[serde(default)]
    pub recommended: BTreeSet<u32>,
    #[serde(default)]
    pub best: Option<u32>,
    /// Language dependence level, 1 (none) to 5 (unplayable in another language).
    #[serde(default)]
    pub language_dependence: Option<u8>,
}

/// Case-insensitive equality of facet value names. Folds full Unicode case
/// without allocating; every value comparison goes through this.
pub fn value_eq(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Per-request view of an item's features, with overrides applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSnapshot {
    pub item_id: ItemId,
    pub facets: FacetSets,
    pub min_players: Option<u32>,
    pub max_players: Option<u32>,
    pub votes: PlayerVotes,
}

impl FeatureSnapshot {
    pub fn new(item_id: ItemId) -> Self {
        Self {
            item_id,
            facets: FacetSets::default(),
            min_players: None,
            max_players: None,
            votes: PlayerVotes::default(),
        }
    }

    /// Apply one override; adds and removes commute on a set.
    pub fn apply_override(&mut self, facet: FacetKind, value: &str, action: OverrideAction) {
        let set = &mut self.facets[facet];
        match action {
            OverrideAction::Add => {
                set.insert(value.to_string());
            }
            OverrideAction::Remove => {
                set.remove(value);
            }
        }
    }

    /// Whether the item lists `value` under `facet`, ignoring case
    pub fn has_value(&self, facet: FacetKind, value: &str) -> bool {
        self.facets[facet].iter().any(|v| value_eq(v, value))
    }
}
