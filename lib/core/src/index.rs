//! Vector index abstraction
//!
//! The ranking engine only needs `top_n(query, n)` over unit-normalized
//! embeddings. [`FlatIndex`] answers it exactly by scanning every vector;
//! [`HnswIndex`](crate::HnswIndex) answers it approximately.

use crate::{Error, ItemId, Result, Vector};
use ahash::AHashMap;
use parking_lot::RwLock;
use std::cmp::Ordering;

/// Nearest-neighbour lookup by cosine similarity
pub trait VectorIndex: Send + Sync {
    /// Up to `n` items ordered by descending similarity to `query`.
    fn top_n(&self, query: &Vector, n: usize) -> Result<Vec<(ItemId, f32)>>;

    /// Number of indexed items.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which index implementation to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexKind {
    /// Exhaustive scan, exact results
    Flat,
    /// Approximate graph search
    #[default]
    Hnsw,
}

impl std::str::FromStr for IndexKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(IndexKind::Flat),
            "hnsw" => Ok(IndexKind::Hnsw),
            other => Err(format!("unknown index kind '{}', use flat or hnsw", other)),
        }
    }
}

/// Sort `(id, similarity)` pairs best-first with ids breaking ties, so equal
/// scores come back in the same order on every call.
pub fn sort_by_similarity(results: &mut [(ItemId, f32)]) {
    results.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
}

/// Exact index over a contiguous vector table
pub struct FlatIndex {
    inner: RwLock<FlatInner>,
}

struct FlatInner {
    dim: usize,
    ids: Vec<ItemId>,
    vectors: Vec<f32>,
    positions: AHashMap<ItemId, usize>,
}

impl FlatIndex {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(FlatInner {
                dim: 0,
                ids: Vec::new(),
                vectors: Vec::new(),
                positions: AHashMap::new(),
            }),
        }
    }

    /// Build from `(id, embedding)` pairs
    pub fn build(entries: impl IntoIterator<Item = (ItemId, Vector)>) -> Result<Self> {
        let index = Self::new();
        for (id, vector) in entries {
            index.insert(id, vector)?;
        }
        Ok(index)
    }

    /// Insert or replace an embedding; it is normalized on the way in.
    pub fn insert(&self, id: ItemId, vector: Vector) -> Result<()> {
        let vector = vector.normalized();
        let mut inner = self.inner.write();
        if inner.dim == 0 {
            inner.dim = vector.dim();
        } else if vector.dim() != inner.dim {
            return Err(Error::InvalidDimension {
                expected: inner.dim,
                actual: vector.dim(),
            });
        }

        let dim = inner.dim;
        if let Some(&pos) = inner.positions.get(&id) {
            inner.vectors[pos * dim..(pos + 1) * dim].copy_from_slice(vector.as_slice());
        } else {
            let pos = inner.ids.len();
            inner.ids.push(id);
            inner.vectors.extend_from_slice(vector.as_slice());
            inner.positions.insert(id, pos);
        }
        Ok(())
    }
}

impl Default for FlatIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorIndex for FlatIndex {
    fn top_n(&self, query: &Vector, n: usize) -> Result<Vec<(ItemId, f32)>> {
        let inner = self.inner.read();
        if inner.ids.is_empty() || n == 0 {
            return Ok(Vec::new());
        }
        if query.dim() != inner.dim {
            return Err(Error::InvalidDimension {
                expected: inner.dim,
                actual: query.dim(),
            });
        }

        let query = query.normalized();
        let mut results: Vec<(ItemId, f32)> = inner
            .ids
            .iter()
            .zip(inner.vectors.chunks_exact(inner.dim))
            .map(|(&id, v)| (id, crate::simd::dot_product_simd(query.as_slice(), v)))
            .collect();

        sort_by_similarity(&mut results);
        results.truncate(n);
        Ok(results)
    }

    fn len(&self) -> usize {
        self.inner.read().ids.len()
    }
}
