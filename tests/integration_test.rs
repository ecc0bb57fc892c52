// Integration tests for gamerec
use ahash::AHashMap;
use gamerec::engine::{build_index, CandidateSource, EscalationStage, ScoringMode};
use gamerec::prelude::*;
use gamerec::similarity::MetaScorer;
use gamerec::storage::{save_snapshot, FeatureAccessor, ResilientStore};
use gamerec_core::{FacetSets, FeatureOverride, FeatureSnapshot, FlatIndex, OverrideAction, PlayerVotes};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn facets(entries: &[(FacetKind, &[&str])]) -> FacetSets {
    let mut sets = FacetSets::default();
    for (kind, values) in entries {
        sets[*kind] = values.iter().map(|v| v.to_string()).collect();
    }
    sets
}

fn game(id: u64, name: &str, embedding: &[f32]) -> Item {
    Item::new(id, name).with_embedding(Vector::from_slice(embedding))
}

/// A small deck-building neighbourhood plus a few unrelated titles
fn library() -> Arc<MemoryCatalog> {
    use FacetKind::*;
    let catalog = Arc::new(MemoryCatalog::new());
    let add = |item: Item, sets: FacetSets| catalog.upsert_item_named(item, &sets, PlayerVotes::default());

    add(
        game(1, "Dominion", &[1.0, 0.0, 0.0, 0.0]).with_players(2, 4).with_playtime(30, 30),
        facets(&[
            (Mechanics, &["Deck Building", "Drafting"]),
            (Categories, &["Card Game", "Medieval"]),
            (Designers, &["Donald X. Vaccarino"]),
            (Families, &["Dominion"]),
            (Publishers, &["Rio Grande Games"]),
        ]),
    );
    add(
        game(2, "Thunderstone", &[0.95, 0.2, 0.0, 0.0]).with_players(1, 5).with_playtime(45, 60),
        facets(&[(Mechanics, &["Deck Building"]), (Categories, &["Card Game", "Fantasy"])]),
    );
    add(
        game(3, "Dominion: Intrigue", &[0.9, 0.1, 0.1, 0.0]).with_players(2, 4).with_playtime(30, 30),
        facets(&[
            (Mechanics, &["Deck Building", "Drafting"]),
            (Categories, &["Card Game", "Medieval"]),
            (Designers, &["Donald X. Vaccarino"]),
            (Families, &["Dominion"]),
        ]),
    );
    add(
        game(4, "Star Realms", &[0.85, 0.3, 0.0, 0.1]).with_players(2, 2).with_playtime(20, 20),
        facets(&[(Mechanics, &["Deck Building"]), (Categories, &["Card Game", "Sci-Fi"])]),
    );
    add(
        game(5, "7 Wonders", &[0.6, 0.6, 0.2, 0.0]).with_players(2, 7).with_playtime(30, 30),
        facets(&[(Mechanics, &["Drafting"]), (Categories, &["Ancient", "Card Game"])]),
    );
    add(
        game(6, "Twilight Struggle", &[0.0, 0.0, 1.0, 0.0]).with_players(2, 2).with_playtime(120, 180),
        facets(&[(Categories, &["Wargame", "Political"])]),
    );
    add(
        game(7, "Clank!", &[0.8, 0.1, 0.3, 0.2]).with_players(2, 4).with_playtime(30, 60),
        facets(&[(Mechanics, &["Deck Building"]), (Categories, &["Adventure", "Fantasy"])]),
    );
    add(
        game(8, "Aeon's End", &[0.88, 0.05, 0.2, 0.1]).with_players(1, 4).with_playtime(60, 60),
        facets(&[(Mechanics, &["Cooperative Game", "Deck Building"]), (Categories, &["Fantasy"])]),
    );
    catalog
}

fn config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.rerank.current_year = 2024;
    config
}

fn ranker_over(store: Arc<dyn CatalogStore>, catalog: &MemoryCatalog) -> Ranker {
    let index = build_index(IndexKind::Flat, catalog.embedding_entries()).unwrap();
    Ranker::new(store, index, config()).unwrap()
}

fn library_ranker() -> (Arc<MemoryCatalog>, Ranker) {
    let catalog = library();
    let ranker = ranker_over(catalog.clone(), &catalog);
    (catalog, ranker)
}

fn snapshot_of(catalog: &Arc<MemoryCatalog>, id: u64) -> FeatureSnapshot {
    let store = ResilientStore::new(catalog.clone());
    FeatureAccessor::new(&store).features(ItemId(id)).unwrap().snapshot
}

/// Wraps a catalog and injects failures into chosen reads
struct FaultyStore {
    inner: Arc<MemoryCatalog>,
    calls: AtomicUsize,
    /// 1-based call number that fails once, 0 for none
    fail_call: AtomicUsize,
    broken_facets: Mutex<Vec<ItemId>>,
    broken_items: Mutex<Vec<ItemId>>,
    embeddings_down: AtomicBool,
    batch_embeddings_down: AtomicBool,
}

impl FaultyStore {
    fn new(inner: Arc<MemoryCatalog>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            fail_call: AtomicUsize::new(0),
            broken_facets: Mutex::new(Vec::new()),
            broken_items: Mutex::new(Vec::new()),
            embeddings_down: AtomicBool::new(false),
            batch_embeddings_down: AtomicBool::new(false),
        }
    }

    fn gate(&self) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_call.load(Ordering::SeqCst) {
            return Err(Error::StoreUnavailable("injected one-off failure".to_string()));
        }
        Ok(())
    }

    fn down() -> Error {
        Error::StoreUnavailable("injected outage".to_string())
    }
}

impl CatalogStore for FaultyStore {
    fn ping(&self) -> Result<()> {
        self.gate()?;
        self.inner.ping()
    }

    fn reconnect(&self) -> Result<()> {
        self.inner.reconnect()
    }

    fn item(&self, id: ItemId) -> Result<Item> {
        self.gate()?;
        if self.broken_items.lock().unwrap().contains(&id) {
            return Err(Self::down());
        }
        self.inner.item(id)
    }

    fn facet_links(&self, id: ItemId) -> Result<FacetSets> {
        self.gate()?;
        if self.broken_facets.lock().unwrap().contains(&id) {
            return Err(Self::down());
        }
        self.inner.facet_links(id)
    }

    fn player_votes(&self, id: ItemId) -> Result<PlayerVotes> {
        self.gate()?;
        self.inner.player_votes(id)
    }

    fn overrides(&self, id: ItemId) -> Result<Vec<FeatureOverride>> {
        self.gate()?;
        self.inner.overrides(id)
    }

    fn facet_value_name(&self, facet: FacetKind, value_id: u32) -> Result<Option<String>> {
        self.gate()?;
        self.inner.facet_value_name(facet, value_id)
    }

    fn embeddings(&self, ids: &[ItemId]) -> Result<Vec<(ItemId, Vector)>> {
        self.gate()?;
        if self.embeddings_down.load(Ordering::SeqCst)
            || (ids.len() > 1 && self.batch_embeddings_down.load(Ordering::SeqCst))
        {
            return Err(Self::down());
        }
        self.inner.embeddings(ids)
    }

    fn facet_value_counts(&self, facet: FacetKind) -> Result<AHashMap<String, usize>> {
        self.gate()?;
        self.inner.facet_value_counts(facet)
    }

    fn item_count(&self) -> Result<usize> {
        self.gate()?;
        self.inner.item_count()
    }
}

struct OfflineIndex;

impl VectorIndex for OfflineIndex {
    fn top_n(&self, _query: &Vector, _n: usize) -> Result<Vec<(ItemId, f32)>> {
        Err(Error::IndexUnavailable("index offline".to_string()))
    }

    fn len(&self) -> usize {
        8
    }
}

#[test]
fn test_jaccard_threshold_excludes_partial_mechanic_overlap() {
    let (_, ranker) = library_ranker();
    let spec = ConstraintSpec::new().with_facet(FacetKind::Mechanics, FacetBounds::jaccard_at_least(0.6));
    let outcome = ranker.rank(&RankRequest::new(1u64).constraints(spec)).unwrap();

    assert!(!outcome.ids().contains(&ItemId(2)));
    assert_eq!(outcome.ids(), vec![ItemId(3)]);
    for candidate in &outcome.candidates {
        assert!(candidate.meta.as_ref().unwrap().jaccard[FacetKind::Mechanics] >= 0.6);
    }
    assert!(outcome.skipped.facet_constraint >= 1);
}

#[test]
fn test_required_category_excludes_regardless_of_similarity() {
    let (_, ranker) = library_ranker();
    let request = RankRequest::new(1u64).required(FeatureValueFilter::new().with(FacetKind::Categories, "Fantasy"));
    let outcome = ranker.rank(&request).unwrap();

    assert!(!outcome.is_empty());
    assert!(!outcome.ids().contains(&ItemId(4)));
    for id in outcome.ids() {
        assert!([ItemId(2), ItemId(7), ItemId(8)].contains(&id), "unexpected {}", id);
    }
}

#[test]
fn test_small_allow_list_scored_by_true_cosine() {
    let (catalog, ranker) = library_ranker();
    let outcome = ranker
        .rank(&RankRequest::new(1u64).allowed([ItemId(6), ItemId(5), ItemId(2)]).top_k(3))
        .unwrap();

    assert_eq!(outcome.source, CandidateSource::ExactScan);
    assert_eq!(outcome.ids(), vec![ItemId(2), ItemId(5), ItemId(6)]);

    let reference = catalog.item(ItemId(1)).unwrap().embedding.unwrap();
    for candidate in &outcome.candidates {
        let embedding = catalog.item(candidate.id).unwrap().embedding.unwrap();
        let expected = reference.cosine_similarity(&embedding) as f64;
        assert!((candidate.embedding_similarity - expected).abs() < 1e-6);
    }
}

#[test]
fn test_exact_player_count_requires_capacity() {
    let (_, ranker) = library_ranker();
    let spec = ConstraintSpec::new().with_players(PlayerConstraint { exact: Some(4), ..Default::default() });
    let outcome = ranker.rank(&RankRequest::new(1u64).constraints(spec)).unwrap();

    assert!(!outcome.ids().contains(&ItemId(4)));
    assert!(!outcome.ids().contains(&ItemId(6)));
    assert!(outcome.skipped.player_constraint >= 1);
}

#[test]
fn test_rarity_weighting_rewards_rare_shared_value() {
    let catalog = Arc::new(MemoryCatalog::new());
    let common = facets(&[(FacetKind::Mechanics, &["Hand Management"])]);
    for id in 3..=200u64 {
        let item = game(id, &format!("Filler {}", id), &[0.0, 1.0, (id % 7) as f32 * 0.1]);
        catalog.upsert_item_named(item, &common, PlayerVotes::default());
    }
    catalog.upsert_item_named(
        game(1, "Reference", &[1.0, 0.0, 0.0]),
        &facets(&[(FacetKind::Mechanics, &["Trick-taking", "Hand Management"])]),
        PlayerVotes::default(),
    );
    catalog.upsert_item_named(
        game(2, "Candidate", &[0.95, 0.05, 0.0]),
        &facets(&[(FacetKind::Mechanics, &["Trick-taking"])]),
        PlayerVotes::default(),
    );
    let ranker = ranker_over(catalog.clone(), &catalog);

    let composite = |rarity: bool| {
        let outcome = ranker.rank(&RankRequest::new(1u64).top_k(1).use_rarity(rarity)).unwrap();
        assert_eq!(outcome.ids(), vec![ItemId(2)]);
        outcome.candidates[0].meta.as_ref().unwrap().composite
    };
    let plain = composite(false);
    let boosted = composite(true);
    assert!(boosted > plain, "boosted {} plain {}", boosted, plain);
    assert!(boosted <= 1.0);
}

#[test]
fn test_rank_is_idempotent() {
    let (_, ranker) = library_ranker();
    let request = RankRequest::new(1u64)
        .top_k(5)
        .explain(true)
        .use_rarity(true)
        .excluded(FeatureValueFilter::new().with(FacetKind::Categories, "Wargame"));
    let first = ranker.rank(&request).unwrap();
    let second = ranker.rank(&request).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_no_match_is_empty_list_not_error() {
    let (_, ranker) = library_ranker();
    let request = RankRequest::new(1u64).required(FeatureValueFilter::new().with(FacetKind::Artists, "Nobody"));
    let outcome = ranker.rank(&request).unwrap();
    assert!(outcome.is_empty());
    assert_eq!(outcome.skipped.missing_required, outcome.considered - outcome.skipped.self_match);
}

#[test]
fn test_explanation_reason_order() {
    let (_, ranker) = library_ranker();
    let outcome = ranker.rank(&RankRequest::new(1u64).explain(true)).unwrap();
    let intrigue = outcome.candidates.iter().find(|c| c.id == ItemId(3)).unwrap();
    let explanation = intrigue.explanation.as_ref().unwrap();

    let order: Vec<FacetKind> = explanation.reasons.iter().map(|r| r.facet).collect();
    assert_eq!(
        order,
        vec![FacetKind::Designers, FacetKind::Mechanics, FacetKind::Categories, FacetKind::Families]
    );
    assert_eq!(
        explanation.summary,
        "Same designer: Donald X. Vaccarino; shared mechanics: Deck Building and Drafting; \
         similar categories: Card Game and Medieval; same family: Dominion"
    );

    // Twilight Struggle shares nothing with Dominion.
    let unrelated = ranker
        .rank(&RankRequest::new(1u64).allowed([ItemId(6)]).explain(true))
        .unwrap();
    let explanation = unrelated.candidates[0].explanation.as_ref().unwrap();
    assert!(explanation.reasons.is_empty());
    assert!(!explanation.summary.is_empty());
}

#[test]
fn test_overrides_apply_on_next_request() {
    let (catalog, ranker) = library_ranker();
    let request = RankRequest::new(1u64).required(FeatureValueFilter::new().with(FacetKind::Categories, "Sci-Fi"));
    assert_eq!(ranker.rank(&request).unwrap().ids(), vec![ItemId(4)]);

    let sci_fi = catalog.intern_value(FacetKind::Categories, "Sci-Fi");
    catalog.add_override(
        ItemId(2),
        FeatureOverride { facet: FacetKind::Categories, value_id: sci_fi, action: OverrideAction::Add },
    );
    catalog.add_override(
        ItemId(4),
        FeatureOverride { facet: FacetKind::Categories, value_id: sci_fi, action: OverrideAction::Remove },
    );
    assert_eq!(ranker.rank(&request).unwrap().ids(), vec![ItemId(2)]);
}

#[test]
fn test_transient_failure_anywhere_is_recovered() {
    let catalog = library();
    let request = RankRequest::new(1u64)
        .top_k(4)
        .use_rarity(true)
        .required(FeatureValueFilter::new().with(FacetKind::Categories, "Card Game"));
    let baseline = ranker_over(catalog.clone(), &catalog).rank(&request).unwrap();

    for call in 1..=40 {
        let store = Arc::new(FaultyStore::new(catalog.clone()));
        store.fail_call.store(call, Ordering::SeqCst);
        let ranker = ranker_over(store.clone(), &catalog);
        let outcome = ranker.rank(&request).unwrap();
        assert_eq!(outcome, baseline, "failure on call {}", call);
        assert_eq!(ranker.store().reconnect_count(), 1, "failure on call {}", call);
    }
}

#[test]
fn test_reference_features_outage_degrades_to_embedding_only() {
    let catalog = library();
    let store = Arc::new(FaultyStore::new(catalog.clone()));
    store.broken_facets.lock().unwrap().push(ItemId(1));
    let ranker = ranker_over(store.clone(), &catalog);

    let outcome = ranker.rank(&RankRequest::new(1u64).top_k(3).explain(true)).unwrap();
    assert_eq!(outcome.mode, ScoringMode::EmbeddingOnly);
    assert_eq!(outcome.candidates.len(), 3);
    for candidate in &outcome.candidates {
        assert!(candidate.meta.is_none());
        assert!(candidate.explanation.is_none());
        assert_eq!(candidate.final_score, candidate.embedding_similarity);
    }

    // Rules comparing against the reference cannot be honoured.
    let spec = ConstraintSpec::new().with_facet(FacetKind::Mechanics, FacetBounds::overlap_at_least(1));
    let constrained = ranker.rank(&RankRequest::new(1u64).constraints(spec)).unwrap();
    assert!(constrained.is_empty());
    assert!(constrained.skipped.reference_unavailable > 0);

    // Rules on the candidate alone still apply.
    let spec = ConstraintSpec::new().with_players(PlayerConstraint { exact: Some(5), ..Default::default() });
    let players = ranker.rank(&RankRequest::new(1u64).constraints(spec)).unwrap();
    assert!(players.ids().iter().all(|id| [ItemId(2), ItemId(5)].contains(id)));
}

#[test]
fn test_similar_best_without_reference_votes_does_not_block() {
    let catalog = library();
    let store = Arc::new(FaultyStore::new(catalog.clone()));
    store.broken_facets.lock().unwrap().push(ItemId(1));
    let ranker = ranker_over(store.clone(), &catalog);

    let spec = ConstraintSpec::new().with_players(PlayerConstraint { similar_best: true, ..Default::default() });
    let outcome = ranker.rank(&RankRequest::new(1u64).top_k(5).constraints(spec)).unwrap();
    assert_eq!(outcome.mode, ScoringMode::EmbeddingOnly);
    assert_eq!(outcome.candidates.len(), 5);
    assert_eq!(outcome.skipped.reference_unavailable, 0);
    assert_eq!(outcome.skipped.player_constraint, 0);
}

#[test]
fn test_candidate_outage_drops_only_that_candidate() {
    let catalog = library();
    let store = Arc::new(FaultyStore::new(catalog.clone()));
    store.broken_items.lock().unwrap().push(ItemId(3));
    let ranker = ranker_over(store.clone(), &catalog);

    let outcome = ranker.rank(&RankRequest::new(1u64).top_k(7)).unwrap();
    assert!(!outcome.ids().contains(&ItemId(3)));
    assert_eq!(outcome.skipped.store_unavailable, 1);
    assert_eq!(outcome.candidates.len(), 6);
}

#[test]
fn test_embedding_outage_is_fatal() {
    let catalog = library();
    let store = Arc::new(FaultyStore::new(catalog.clone()));
    store.embeddings_down.store(true, Ordering::SeqCst);
    let ranker = ranker_over(store.clone(), &catalog);
    assert!(matches!(
        ranker.rank(&RankRequest::new(1u64)),
        Err(Error::StoreUnavailable(_))
    ));
}

#[test]
fn test_allow_list_outage_falls_back_to_index() {
    let catalog = library();
    let store = Arc::new(FaultyStore::new(catalog.clone()));
    store.batch_embeddings_down.store(true, Ordering::SeqCst);
    let ranker = ranker_over(store.clone(), &catalog);

    let outcome = ranker
        .rank(&RankRequest::new(1u64).allowed([ItemId(2), ItemId(3)]).top_k(2))
        .unwrap();
    assert_eq!(outcome.source, CandidateSource::Index { requested: 8 });
    let mut ids = outcome.ids();
    ids.sort();
    assert_eq!(ids, vec![ItemId(2), ItemId(3)]);
}

#[test]
fn test_index_outage_is_fatal() {
    let catalog = library();
    let ranker = Ranker::new(catalog, Arc::new(OfflineIndex), config()).unwrap();
    assert!(matches!(
        ranker.rank(&RankRequest::new(1u64)),
        Err(Error::IndexUnavailable(_))
    ));
}

#[test]
fn test_fallback_drops_allow_list_then_filters() {
    let (_, ranker) = library_ranker();

    // Nothing in the collection is Fantasy, but the wider catalog has some.
    let scoped = RankRequest::new(1u64)
        .allowed([ItemId(3), ItemId(4)])
        .required(FeatureValueFilter::new().with(FacetKind::Categories, "Fantasy"));
    assert!(ranker.rank(&scoped).unwrap().is_empty());
    let outcome = ranker.rank_with_fallback(&scoped).unwrap();
    assert_eq!(outcome.stage, EscalationStage::Global);
    assert!(outcome.ids().iter().all(|id| [ItemId(2), ItemId(7), ItemId(8)].contains(id)));

    // No game anywhere satisfies this.
    let impossible = RankRequest::new(1u64).required(FeatureValueFilter::new().with(FacetKind::Artists, "Nobody"));
    let outcome = ranker.rank_with_fallback(&impossible).unwrap();
    assert_eq!(outcome.stage, EscalationStage::Unconstrained);
    assert!(!outcome.is_empty());

    // Nothing to relax.
    let outcome = ranker.rank_with_fallback(&RankRequest::new(1u64)).unwrap();
    assert_eq!(outcome.stage, EscalationStage::Requested);
}

#[test]
fn test_fallback_reaches_embedding_only_when_features_are_down() {
    let catalog = library();
    let store = Arc::new(FaultyStore::new(catalog.clone()));
    store.broken_facets.lock().unwrap().extend((1..=8).map(ItemId));
    let ranker = ranker_over(store.clone(), &catalog);

    let outcome = ranker.rank_with_fallback(&RankRequest::new(1u64).top_k(3)).unwrap();
    assert_eq!(outcome.stage, EscalationStage::EmbeddingOnly);
    assert_eq!(outcome.mode, ScoringMode::EmbeddingOnly);
    assert_eq!(outcome.ids(), vec![ItemId(3), ItemId(2), ItemId(8)]);
}

#[test]
fn test_malformed_constraints_rejected_before_work() {
    assert!(matches!(
        ConstraintSpec::from_json(r#"{"themes": {"min_overlap": 1}}"#),
        Err(Error::MalformedConstraint(_))
    ));

    let (catalog, ranker) = library_ranker();
    catalog.disconnect();
    let bad = ConstraintSpec::new().with_facet(
        FacetKind::Mechanics,
        FacetBounds { jaccard_min: Some(0.9), jaccard_max: Some(0.1), ..Default::default() },
    );
    assert!(matches!(
        ranker.rank(&RankRequest::new(1u64).constraints(bad)),
        Err(Error::MalformedConstraint(_))
    ));
    assert!(!catalog.is_connected());
}

#[test]
fn test_concurrent_requests_match_sequential() {
    let (_, ranker) = library_ranker();
    let requests: Vec<RankRequest> = (1..=8u64).map(|id| RankRequest::new(id).top_k(3).explain(true)).collect();
    let sequential: Vec<RankOutcome> = requests.iter().map(|r| ranker.rank(r).unwrap()).collect();

    let concurrent: Vec<RankOutcome> = std::thread::scope(|scope| {
        let handles: Vec<_> = requests
            .iter()
            .map(|r| {
                let ranker = &ranker;
                scope.spawn(move || ranker.rank(r).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(sequential, concurrent);
}

#[test]
fn test_open_from_snapshot_file() {
    let catalog = library();
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = dir.path().join("catalog.json");
    save_snapshot(&catalog_path, &catalog.to_snapshot()).unwrap();

    let config_path = dir.path().join("engine.toml");
    std::fs::write(&config_path, "[rerank]\ncurrent_year = 2024\n").unwrap();

    let restored = gamerec::open(&catalog_path, Some(&config_path), IndexKind::Flat).unwrap();
    let direct = ranker_over(catalog.clone(), &catalog);

    let request = RankRequest::new(1u64).top_k(5).explain(true);
    assert_eq!(restored.rank(&request).unwrap(), direct.rank(&request).unwrap());
}

#[test]
fn test_hnsw_ranker_agrees_on_small_catalog() {
    let catalog = library();
    let hnsw = build_index(IndexKind::Hnsw, catalog.embedding_entries()).unwrap();
    let ranker = Ranker::new(catalog.clone(), hnsw, config()).unwrap();
    let flat = ranker_over(catalog.clone(), &catalog);

    let request = RankRequest::new(1u64).top_k(3);
    assert_eq!(ranker.rank(&request).unwrap().ids(), flat.rank(&request).unwrap().ids());
}

const MECHANICS: [&str; 6] = ["Deck Building", "Drafting", "Worker Placement", "Auction", "Dice Rolling", "Trading"];
const CATEGORIES: [&str; 5] = ["Fantasy", "Sci-Fi", "Economic", "Card Game", "Wargame"];
const DESIGNERS: [&str; 4] = ["Knizia", "Rosenberg", "Feld", "Lacerda"];

fn random_subset(rng: &mut StdRng, pool: &[&str], p: f64) -> Vec<String> {
    pool.iter().filter(|_| rng.random_bool(p)).map(|v| v.to_string()).collect()
}

fn random_catalog(rng: &mut StdRng, size: u64) -> Arc<MemoryCatalog> {
    let catalog = Arc::new(MemoryCatalog::new());
    for id in 1..=size {
        let embedding: Vec<f32> = (0..6).map(|_| rng.random_range(0.01f32..1.0)).collect();
        let mut item = game(id, &format!("Game {}", id), &embedding);
        let min = rng.random_range(1..=3u32);
        item = item.with_players(min, min + rng.random_range(0..=4u32));
        if rng.random_bool(0.8) {
            let lo = rng.random_range(15..=90u32);
            item = item.with_playtime(lo, lo + rng.random_range(0..=60u32));
        }
        let mut sets = FacetSets::default();
        sets[FacetKind::Mechanics] = random_subset(rng, &MECHANICS, 0.35).into_iter().collect();
        sets[FacetKind::Categories] = random_subset(rng, &CATEGORIES, 0.3).into_iter().collect();
        sets[FacetKind::Designers] = random_subset(rng, &DESIGNERS, 0.2).into_iter().collect();
        let votes = PlayerVotes {
            recommended: (min..=min + 2).collect(),
            best: Some(min + 1),
            language_dependence: None,
        };
        catalog.upsert_item_named(item, &sets, votes);
    }
    catalog
}

fn random_request(rng: &mut StdRng, size: u64) -> RankRequest {
    let mut request = RankRequest::new(rng.random_range(1..=size)).top_k(rng.random_range(1..=10));
    let mut spec = ConstraintSpec::new();
    if rng.random_bool(0.5) {
        let min = [0.0, 0.2, 0.34, 0.5][rng.random_range(0..4)];
        spec = spec.with_facet(FacetKind::Mechanics, FacetBounds::jaccard_at_least(min));
    }
    if rng.random_bool(0.3) {
        spec = spec.with_facet(FacetKind::Categories, FacetBounds { max_overlap: Some(1), ..Default::default() });
    }
    if rng.random_bool(0.4) {
        spec = spec.with_players(PlayerConstraint {
            exact: Some(rng.random_range(1..=5)),
            min_overlap: if rng.random_bool(0.5) { Some(2) } else { None },
            use_recommended: rng.random_bool(0.5),
            similar_best: rng.random_bool(0.5),
        });
    }
    if rng.random_bool(0.3) {
        spec = spec.with_playtime(PlaytimeConstraint::new(rng.random_range(30.0..90.0), 0.3));
    }
    request = request.constraints(spec);
    if rng.random_bool(0.3) {
        let value = CATEGORIES[rng.random_range(0..CATEGORIES.len())];
        request = request.required(FeatureValueFilter::new().with(FacetKind::Categories, value));
    }
    if rng.random_bool(0.4) {
        let value = MECHANICS[rng.random_range(0..MECHANICS.len())];
        request = request.excluded(FeatureValueFilter::new().with(FacetKind::Mechanics, value));
    }
    if rng.random_bool(0.2) {
        let allowed: Vec<ItemId> = (0..20).map(|_| ItemId(rng.random_range(1..=size))).collect();
        request = request.allowed(allowed);
    }
    request.use_rarity(rng.random_bool(0.3))
}

#[test]
fn test_results_always_satisfy_every_active_filter() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let size = 120;
    let catalog = random_catalog(&mut rng, size);
    let index = Arc::new(FlatIndex::build(catalog.embedding_entries()).unwrap());
    let ranker = Ranker::new(catalog.clone(), index, config()).unwrap();
    let scorer = MetaScorer::new();

    let mut non_empty = 0;
    for round in 0..150 {
        let request = random_request(&mut rng, size);
        let outcome = ranker.rank(&request).unwrap();
        assert!(outcome.candidates.len() <= request.top_k);
        if !outcome.is_empty() {
            non_empty += 1;
        }

        let reference = snapshot_of(&catalog, request.reference.0);
        let spec = request.constraints.clone().unwrap_or_default();
        for pair in outcome.candidates.windows(2) {
            assert!(pair[0].adjusted_score >= pair[1].adjusted_score, "round {}", round);
        }
        for candidate in &outcome.candidates {
            assert_ne!(candidate.id, request.reference, "round {}", round);
            if let Some(allowed) = &request.allowed {
                assert!(allowed.contains(&candidate.id), "round {}", round);
            }
            let snapshot = snapshot_of(&catalog, candidate.id.0);
            let item = catalog.item(candidate.id).unwrap();
            assert!(request.required.all_present(&snapshot), "round {}", round);
            assert!(request.excluded.none_present(&snapshot), "round {}", round);
            assert!(spec.satisfies_players(Some(&reference), &snapshot), "round {}", round);
            assert!(spec.satisfies_playtime(item.playtime_estimate()), "round {}", round);
            let meta = scorer.score(&reference, &snapshot, None);
            assert!(spec.satisfies_generic(&meta), "round {}", round);
            let composite = candidate.meta.as_ref().unwrap().composite;
            assert!((0.0..=1.0).contains(&composite));
        }
    }
    assert!(non_empty > 0);
}
