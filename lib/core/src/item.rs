use crate::vector::Vector;
use serde::{Deserialize, Serialize};

/// Numeric catalog identifier of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        ItemId(id)
    }
}

impl std::str::FromStr for ItemId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(ItemId)
    }
}

/// A catalog record as written by ingestion.
///
/// Scalar attributes are optional because the upstream catalog is sparse;
/// every consumer treats a missing attribute as "no information".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub rating_count: Option<u32>,
    #[serde(default)]
    pub popularity_rank: Option<u32>,
    /// Complexity weight on a 1.0-5.0 scale.
    #[serde(default)]
    pub complexity: Option<f64>,
    #[serde(default)]
    pub playing_time: Option<u32>,
    #[serde(default)]
    pub min_playtime: Option<u32>,
    #[serde(default)]
    pub max_playtime: Option<u32>,
    #[serde(default)]
    pub min_players: Option<u32>,
    #[serde(default)]
    pub max_players: Option<u32>,
    /// Stored unit-normalized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vector>,
}

impl Item {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            year: None,
            rating: None,
            rating_count: None,
            popularity_rank: None,
            complexity: None,
            playing_time: None,
            min_playtime: None,
            max_playtime: None,
            min_players: None,
            max_players: None,
            embedding: None,
        }
    }

    /// Attach an embedding, normalizing it to unit length
    #[inline]
    #[must_use]
    pub fn with_embedding(mut self, embedding: Vector) -> Self {
        self.embedding = Some(embedding.normalized());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_players(mut self, min: u32, max: u32) -> Self {
        self.min_players = Some(min);
        self.max_players = Some(max);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_playtime(mut self, min: u32, max: u32) -> Self {
        self.min_playtime = Some(min);
        self.max_playtime = Some(max);
        self
    }

    /// Best available playtime estimate in minutes: the listed playing time,
    /// else the midpoint of the bounds, else whichever bound exists.
    pub fn playtime_estimate(&self) -> Option<f64> {
        if let Some(t) = self.playing_time {
            return Some(t as f64);
        }
        match (self.min_playtime, self.max_playtime) {
            (Some(lo), Some(hi)) => Some((lo as f64 + hi as f64) / 2.0),
            (Some(t), None) | (None, Some(t)) => Some(t as f64),
            (None, None) => None,
        }
    }
}
