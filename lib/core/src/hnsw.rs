use crate::index::{sort_by_similarity, VectorIndex};
use crate::{Error, ItemId, Result, Vector};
use ahash::AHashMap;
use ordered_float::OrderedFloat;
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Layer assignment is seeded so the same insert order builds the same graph.
const LAYER_SEED: u64 = 0x5eed_0f_9a3e;

/// Generation-stamped bit set for visited-node tracking.
/// Clearing bumps the generation instead of zeroing the words.
#[derive(Clone)]
struct VisitedSet {
    bits: Vec<u64>,
    generation: u64,
    generations: Vec<u64>,
}

impl VisitedSet {
    #[inline]
    fn new(capacity: usize) -> Self {
        let num_words = capacity.div_ceil(64).max(1);
        Self {
            bits: vec![0; num_words],
            generation: 1,
            generations: vec![0; num_words],
        }
    }

    #[inline]
    fn clear(&mut self) {
        self.generation += 1;
        if self.generation == 0 {
            self.generation = 1;
            self.bits.fill(0);
            self.generations.fill(0);
        }
    }

    #[inline]
    fn ensure_capacity(&mut self, capacity: usize) {
        let num_words = capacity.div_ceil(64);
        if num_words > self.bits.len() {
            self.bits.resize(num_words, 0);
            self.generations.resize(num_words, 0);
        }
    }

    /// Returns true if `idx` was not yet visited.
    #[inline]
    fn insert(&mut self, idx: usize) -> bool {
        let word_idx = idx / 64;
        let mask = 1u64 << (idx % 64);

        if word_idx >= self.bits.len() {
            self.ensure_capacity(idx + 1);
        }
        if self.generations[word_idx] != self.generation {
            self.bits[word_idx] = 0;
            self.generations[word_idx] = self.generation;
        }

        let was_set = (self.bits[word_idx] & mask) != 0;
        self.bits[word_idx] |= mask;
        !was_set
    }

    #[inline]
    fn contains(&self, idx: usize) -> bool {
        let word_idx = idx / 64;
        if word_idx >= self.bits.len() || self.generations[word_idx] != self.generation {
            return false;
        }
        (self.bits[word_idx] & (1u64 << (idx % 64))) != 0
    }
}

#[derive(Debug, Clone)]
struct HnswNode {
    id: ItemId,
    layers: Vec<Vec<usize>>,
}

struct HnswGraph {
    nodes: Vec<HnswNode>,
    /// Contiguous unit vectors, `dim` floats per node
    vectors: Vec<f32>,
    dim: usize,
    positions: AHashMap<ItemId, usize>,
    entry_point: Option<usize>,
    top_layer: usize,
    max_connections: usize,
    max_layers: usize,
    ef_construction: usize,
    rng: StdRng,
}

impl HnswGraph {
    #[inline]
    fn vector(&self, node_idx: usize) -> &[f32] {
        let start = node_idx * self.dim;
        &self.vectors[start..start + self.dim]
    }

    /// Cosine distance between a unit query and a stored node
    #[inline]
    fn distance(&self, query: &[f32], node_idx: usize) -> f32 {
        1.0 - crate::simd::dot_product_simd(query, self.vector(node_idx))
    }

    fn select_layer(&mut self) -> usize {
        let mut layer = 0;
        while layer < self.max_layers - 1 && self.rng.random::<f32>() < 0.5 {
            layer += 1;
        }
        layer
    }

    /// Beam search within one layer. Returns `(node, distance)` closest first.
    fn search_layer(
        &self,
        query: &[f32],
        entry_point: usize,
        ef: usize,
        layer: usize,
        visited: &mut VisitedSet,
    ) -> Vec<(usize, f32)> {
        visited.clear();
        visited.ensure_capacity(self.nodes.len());

        let entry_dist = self.distance(query, entry_point);
        let mut candidates = BinaryHeap::with_capacity(ef * 2);
        let mut results = BinaryHeap::with_capacity(ef + 1);
        candidates.push(Reverse((OrderedFloat(entry_dist), entry_point)));
        results.push((OrderedFloat(entry_dist), entry_point));
        visited.insert(entry_point);

        while let Some(Reverse((OrderedFloat(current_dist), current_idx))) = candidates.pop() {
            let worst = results.peek().map(|(d, _)| d.0).unwrap_or(f32::INFINITY);
            if results.len() >= ef && current_dist > worst {
                break;
            }

            let Some(neighbors) = self.nodes[current_idx].layers.get(layer) else {
                continue;
            };
            for &neighbor in neighbors {
                if !visited.insert(neighbor) {
                    continue;
                }
                let dist = self.distance(query, neighbor);
                let worst = results.peek().map(|(d, _)| d.0).unwrap_or(f32::INFINITY);
                if results.len() < ef || dist < worst {
                    candidates.push(Reverse((OrderedFloat(dist), neighbor)));
                    results.push((OrderedFloat(dist), neighbor));
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut found: Vec<(usize, f32)> = results
            .into_iter()
            .map(|(OrderedFloat(dist), idx)| (idx, dist))
            .collect();
        found.sort_by(|a, b| OrderedFloat(a.1).cmp(&OrderedFloat(b.1)).then(a.0.cmp(&b.0)));
        found
    }

    /// Walk down from the top layer to `stop_above`, keeping the closest node.
    fn descend(&self, query: &[f32], stop_above: usize, visited: &mut VisitedSet) -> Option<usize> {
        let mut ep = self.entry_point?;
        let mut layer = self.top_layer;
        while layer > stop_above {
            if let Some(&(closest, _)) = self.search_layer(query, ep, 1, layer, visited).first() {
                ep = closest;
            }
            layer -= 1;
        }
        Some(ep)
    }

    fn layer_capacity(&self, layer: usize) -> usize {
        if layer == 0 {
            self.max_connections * 2
        } else {
            self.max_connections
        }
    }

    fn insert(&mut self, id: ItemId, vector: Vector) -> Result<()> {
        let vector = vector.normalized();
        if self.dim == 0 {
            self.dim = vector.dim();
        } else if vector.dim() != self.dim {
            return Err(Error::InvalidDimension {
                expected: self.dim,
                actual: vector.dim(),
            });
        }

        // Re-inserting an id refreshes its vector and keeps its edges.
        if let Some(&pos) = self.positions.get(&id) {
            let dim = self.dim;
            self.vectors[pos * dim..(pos + 1) * dim].copy_from_slice(vector.as_slice());
            return Ok(());
        }

        let level = self.select_layer();
        let node_idx = self.nodes.len();
        self.vectors.extend_from_slice(vector.as_slice());
        self.nodes.push(HnswNode {
            id,
            layers: vec![Vec::new(); level + 1],
        });
        self.positions.insert(id, node_idx);

        if self.entry_point.is_none() {
            self.entry_point = Some(node_idx);
            self.top_layer = level;
            return Ok(());
        }

        let query = vector.as_slice();
        let mut visited = VisitedSet::new(self.nodes.len());
        let Some(mut ep) = self.descend(query, level, &mut visited) else {
            return Ok(());
        };

        for layer in (0..=level.min(self.top_layer)).rev() {
            let candidates = self.search_layer(query, ep, self.ef_construction, layer, &mut visited);
            let neighbors: Vec<usize> = candidates
                .iter()
                .filter(|(idx, _)| *idx != node_idx)
                .take(self.max_connections)
                .map(|(idx, _)| *idx)
                .collect();

            for &neighbor in &neighbors {
                self.nodes[neighbor].layers[layer].push(node_idx);
                if self.nodes[neighbor].layers[layer].len() > self.layer_capacity(layer) {
                    self.prune(neighbor, layer);
                }
            }
            self.nodes[node_idx].layers[layer] = neighbors;

            if let Some(&(closest, _)) = candidates.first() {
                ep = closest;
            }
        }

        if level > self.top_layer {
            self.top_layer = level;
            self.entry_point = Some(node_idx);
        }
        Ok(())
    }

    /// Keep only the closest links of an over-full node.
    fn prune(&mut self, node_idx: usize, layer: usize) {
        let base = self.vector(node_idx).to_vec();
        let mut links = std::mem::take(&mut self.nodes[node_idx].layers[layer]);
        links.sort_by_key(|&other| (OrderedFloat(self.distance(&base, other)), other));
        links.truncate(self.layer_capacity(layer));
        self.nodes[node_idx].layers[layer] = links;
    }

    fn search(&self, query: &[f32], k: usize, ef: usize) -> Vec<(ItemId, f32)> {
        let mut visited = VisitedSet::new(self.nodes.len());
        let Some(ep) = self.descend(query, 0, &mut visited) else {
            return Vec::new();
        };

        let mut results: Vec<(ItemId, f32)> = self
            .search_layer(query, ep, ef.max(k), 0, &mut visited)
            .into_iter()
            .map(|(idx, dist)| (self.nodes[idx].id, 1.0 - dist))
            .collect();
        sort_by_similarity(&mut results);
        results.truncate(k);
        results
    }
}

/// Approximate nearest neighbour index over unit-normalized embeddings
///
/// Graph construction follows HNSW: each node is assigned a top layer with
/// exponentially decaying probability, greedily descends from the entry point
/// and links to its closest neighbours on every layer it lives on.
pub struct HnswIndex {
    graph: RwLock<HnswGraph>,
    ef_search: usize,
}

impl HnswIndex {
    pub fn new(max_connections: usize, max_layers: usize) -> Self {
        Self {
            graph: RwLock::new(HnswGraph {
                nodes: Vec::new(),
                vectors: Vec::new(),
                dim: 0,
                positions: AHashMap::new(),
                entry_point: None,
                top_layer: 0,
                max_connections: max_connections.max(2),
                max_layers: max_layers.max(1),
                ef_construction: 200,
                rng: StdRng::seed_from_u64(LAYER_SEED),
            }),
            ef_search: 64,
        }
    }

    /// Override the search beam width (default 64)
    #[must_use]
    pub fn with_ef_search(mut self, ef: usize) -> Self {
        self.ef_search = ef.max(1);
        self
    }

    /// Build from `(id, embedding)` pairs with default graph parameters
    pub fn build(entries: impl IntoIterator<Item = (ItemId, Vector)>) -> Result<Self> {
        let index = Self::new(16, 4);
        for (id, vector) in entries {
            index.insert(id, vector)?;
        }
        Ok(index)
    }

    pub fn insert(&self, id: ItemId, vector: Vector) -> Result<()> {
        self.graph.write().insert(id, vector)
    }
}

impl VectorIndex for HnswIndex {
    fn top_n(&self, query: &Vector, n: usize) -> Result<Vec<(ItemId, f32)>> {
        let graph = self.graph.read();
        if graph.nodes.is_empty() || n == 0 {
            return Ok(Vec::new());
        }
        if query.dim() != graph.dim {
            return Err(Error::InvalidDimension {
                expected: graph.dim,
                actual: query.dim(),
            });
        }
        let query = query.normalized();
        Ok(graph.search(query.as_slice(), n, self.ef_search))
    }

    fn len(&self) -> usize {
        self.graph.read().nodes.len()
    }
}
