//! Engine configuration
//!
//! Every tunable constant lives here with its default. A TOML file may
//! override any subset; missing sections and keys keep their defaults.

use gamerec_core::{Error, Result};
use gamerec_similarity::{RerankConfig, DEFAULT_RARITY_MULTIPLIER};
use gamerec_storage::DEFAULT_MAX_RETRIES;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub blend: BlendConfig,
    pub rarity: RarityConfig,
    pub rerank: RerankConfig,
    pub candidates: CandidateConfig,
    pub store: StoreConfig,
}

/// Weights of embedding similarity and meta-similarity in the final score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    pub embedding_weight: f64,
    pub meta_weight: f64,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            embedding_weight: 0.8,
            meta_weight: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RarityConfig {
    pub multiplier: f64,
}

impl Default for RarityConfig {
    fn default() -> Self {
        Self {
            multiplier: DEFAULT_RARITY_MULTIPLIER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateConfig {
    /// Largest allow-list scored directly instead of through the index
    pub exact_scan_limit: usize,
    pub default_overfetch: usize,
    /// Over-fetch factor when filters are expected to drop most matches
    pub restrictive_overfetch: usize,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            exact_scan_limit: 500,
            default_overfetch: 2,
            restrictive_overfetch: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub max_retries: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("blend.embedding_weight", self.blend.embedding_weight),
            ("blend.meta_weight", self.blend.meta_weight),
            ("rarity.multiplier", self.rarity.multiplier),
            ("rerank.rating_count_cap", self.rerank.rating_count_cap),
            ("rerank.popularity_cap", self.rerank.popularity_cap),
            ("rerank.recency_cap", self.rerank.recency_cap),
            ("rerank.complexity_cap", self.rerank.complexity_cap),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!("{} must be a non-negative number, got {}", name, value)));
            }
        }
        if self.blend.embedding_weight + self.blend.meta_weight <= 0.0 {
            return Err(Error::InvalidConfig("blend weights must not both be zero".to_string()));
        }
        let zero_diff = self.rerank.complexity_zero_diff;
        if !zero_diff.is_finite() || zero_diff <= 0.0 {
            return Err(Error::InvalidConfig("rerank.complexity_zero_diff must be positive".to_string()));
        }
        if self.rerank.recency_zero_years < self.rerank.recency_full_years {
            return Err(Error::InvalidConfig(
                "rerank.recency_zero_years must not be below rerank.recency_full_years".to_string(),
            ));
        }
        if self.rerank.popularity_floor_rank == 0 || self.rerank.rating_count_saturation == 0 {
            return Err(Error::InvalidConfig(
                "rerank.popularity_floor_rank and rerank.rating_count_saturation must be positive".to_string(),
            ));
        }
        if self.candidates.default_overfetch == 0 || self.candidates.restrictive_overfetch == 0 {
            return Err(Error::InvalidConfig("over-fetch factors must be at least 1".to_string()));
        }
        Ok(())
    }
}
