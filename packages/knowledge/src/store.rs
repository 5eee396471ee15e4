//! The district knowledge store.
//!
//! Holds the embedding index over district documents, keeps it fresh
//! against the on-disk cache, and answers district and comparison queries.
//! No operation here fails: collection problems degrade to cached or seed
//! data, cache problems degrade to a refresh attempt and embedding problems
//! degrade to offline hashing embeddings.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use ub_realty_aggregate::fallback_documents;
use ub_realty_property_models::document::NO_DATA;
use ub_realty_property_models::{DistrictDocument, DistrictSummary, format_tugrik};
use ub_realty_retrieval::{CollectionReport, PropertyRetriever};

use crate::cache::{CacheDir, CacheSnapshot, CacheStatus, freshness_window};
use crate::config::{ConfigError, KnowledgeConfig};
use crate::districts::DistrictMatcher;
use crate::embedder::{Embedder, HashingEmbedder};
use crate::index::VectorIndex;

/// Answer returned when no stored document matches a query.
pub const NOT_FOUND: &str = "Тодорхой дүүргийн мэдээлэл олдсонгүй.";

/// Substrings that route a lookup to the all-district comparison.
pub const COMPARISON_KEYWORDS: [&str; 4] = ["бүх дүүрэг", "дүүрэг харьцуулах", "дүүргүүд", "compare"];

pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_MIN_SIMILARITY: f32 = 0.35;

/// Room counts listed in the comparison block.
const COMPARED_ROOM_COUNTS: [u32; 3] = [1, 2, 3];

/// Produces district documents for a refresh.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn collect(&self) -> CollectionReport;
}

#[async_trait]
impl DocumentSource for PropertyRetriever {
    async fn collect(&self) -> CollectionReport {
        Self::collect(self).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Uninitialized,
    /// Serving queries. `degraded` is set while the index holds seed or
    /// stale data because live collection failed.
    Ready { degraded: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The cache is within the freshness window; nothing was collected.
    Fresh,
    /// The index was rebuilt from this many live documents.
    Refreshed(usize),
    /// Collection produced no live data; the previous index was kept.
    KeptPrevious,
    /// No document source is configured.
    NoSource,
}

/// Whether `query` asks for a comparison of all districts.
#[must_use]
pub fn is_comparison_query(query: &str) -> bool {
    let lowered = query.to_lowercase();
    COMPARISON_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

/// Comparison block, one ranked line per district.
struct Ranking<'a>(&'a [DistrictSummary]);

impl fmt::Display for Ranking<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Дүүргүүдийн 1м2 дундаж үнийн харьцуулалт (өндрөөс бага руу):")?;
        for (rank, summary) in self.0.iter().enumerate() {
            write!(
                f,
                "{}. {}: нийт {}",
                rank + 1,
                summary.name,
                format_tugrik(summary.overall_average)
            )?;
            for rooms in COMPARED_ROOM_COUNTS {
                let value = summary
                    .room_average(rooms)
                    .map_or_else(|| NO_DATA.to_string(), format_tugrik);
                write!(f, "; {rooms} өрөө: {value}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

pub struct DistrictKnowledgeStore {
    cache: CacheDir,
    embedder: Arc<dyn Embedder>,
    source: Option<Arc<dyn DocumentSource>>,
    index: VectorIndex,
    state: StoreState,
    top_k: usize,
    min_similarity: f32,
    freshness_window: Duration,
    matcher: DistrictMatcher,
}

impl DistrictKnowledgeStore {
    /// Creates an uninitialized store backed by `cache`, using the default
    /// [`HashingEmbedder`] and no document source.
    #[must_use]
    pub fn new(cache: CacheDir) -> Self {
        Self {
            cache,
            embedder: Arc::new(HashingEmbedder::default()),
            source: None,
            index: VectorIndex::default(),
            state: StoreState::Uninitialized,
            top_k: DEFAULT_TOP_K,
            min_similarity: DEFAULT_MIN_SIMILARITY,
            freshness_window: freshness_window(),
            matcher: DistrictMatcher::embedded(),
        }
    }

    /// Creates an uninitialized store with the search settings, embedder and
    /// district spellings of `config`. An embedder that cannot be set up is
    /// replaced by [`HashingEmbedder`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the district spellings are unusable.
    pub fn from_config(cache: CacheDir, config: &KnowledgeConfig) -> Result<Self, ConfigError> {
        let embedder = config.build_embedder().unwrap_or_else(|e| {
            log::warn!("{e}; using offline hashing embeddings");
            Arc::new(HashingEmbedder::default())
        });
        Ok(Self {
            matcher: DistrictMatcher::new(&config.districts)?,
            ..Self::new(cache)
        }
        .with_embedder(embedder)
        .with_top_k(config.top_k)
        .with_min_similarity(config.min_similarity)
        .with_freshness_window(config.freshness_window()))
    }

    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn DocumentSource>) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = embedder;
        self
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    #[must_use]
    pub const fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    #[must_use]
    pub const fn with_freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }

    #[must_use]
    pub const fn state(&self) -> StoreState {
        self.state
    }

    #[must_use]
    pub const fn cache(&self) -> &CacheDir {
        &self.cache
    }

    /// Name of the embedder currently in use.
    #[must_use]
    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    /// Freshness of the on-disk cache as of now.
    #[must_use]
    pub fn cache_status(&self) -> CacheStatus {
        CacheStatus::at(self.cache.last_update(), Utc::now(), self.freshness_window)
    }

    /// Populates the index. Uses the cache when it is fresh, otherwise runs
    /// a collection. When collection yields no live data the stale cache is
    /// used if readable, else the seed documents, and the store is marked
    /// degraded. Does nothing once the store is ready.
    pub async fn initialize(&mut self) {
        self.load().await;
    }

    /// Rebuilds the index from a fresh collection run when the cache is
    /// stale or `force` is set. A run that yields no live data leaves the
    /// current index untouched.
    ///
    /// On an uninitialized store the initial load counts as the refresh: if
    /// it had to collect, that run's outcome is returned without collecting
    /// again.
    pub async fn refresh(&mut self, force: bool) -> RefreshOutcome {
        if let Some(outcome) = self.load().await {
            return outcome;
        }

        if !force && self.cache_status().is_fresh {
            log::debug!("Cache is fresh, skipping refresh");
            return RefreshOutcome::Fresh;
        }

        let Some(source) = self.source.clone() else {
            log::warn!("Refresh requested but no document source is configured");
            return RefreshOutcome::NoSource;
        };

        let report = source.collect().await;
        if !report.is_live() {
            log::warn!(
                "Refresh produced no live data ({}), keeping the previous index",
                report.stats.totals()
            );
            return RefreshOutcome::KeptPrevious;
        }

        let count = report.documents.len();
        self.install_documents(report.documents).await;
        self.persist();
        self.state = StoreState::Ready { degraded: false };
        log::info!("Index rebuilt with {count} district documents");
        RefreshOutcome::Refreshed(count)
    }

    /// Answers a free-form district query, refreshing stale data first.
    /// Comparison queries get the all-district ranking.
    pub async fn lookup(&mut self, query: &str) -> String {
        self.refresh(false).await;
        if is_comparison_query(query) {
            self.query_all_sorted()
        } else {
            self.query_one(query).await
        }
    }

    /// Text of the best stored document for `query`.
    ///
    /// A district named in the query under any known spelling is searched
    /// by its canonical name. Among the top hits, one containing that name
    /// (or the query itself when no district is named) ignoring case wins.
    /// Otherwise the best hit is returned if it is similar enough, and
    /// [`NOT_FOUND`] if not.
    pub async fn query_one(&mut self, query: &str) -> String {
        let district = self.matcher.canonical(query).map(str::to_string);
        let search_text = district.as_deref().unwrap_or(query);
        let needle = search_text.trim().to_lowercase();

        let vector = self.embed_query(search_text).await;
        let hits = self.index.search(&vector, self.top_k);

        if !needle.is_empty()
            && let Some(hit) = hits
                .iter()
                .find(|hit| hit.entry.text.to_lowercase().contains(&needle))
        {
            log::debug!("Substring match for '{query}' (similarity {:.3})", hit.similarity);
            return hit.entry.text.clone();
        }

        match hits.first() {
            Some(hit) if hit.similarity >= self.min_similarity => {
                log::debug!("Similarity match for '{query}' ({:.3})", hit.similarity);
                hit.entry.text.clone()
            }
            _ => {
                log::debug!("No district matched '{query}'");
                NOT_FOUND.to_string()
            }
        }
    }

    /// Ranking of every stored district by overall price per m², most
    /// expensive first, with 1 to 3 room averages.
    ///
    /// Raw texts are included when they parse as district documents.
    #[must_use]
    pub fn query_all_sorted(&self) -> String {
        let mut summaries: Vec<DistrictSummary> = self
            .index
            .entries()
            .filter_map(|entry| {
                entry.document.as_ref().map_or_else(
                    || DistrictSummary::parse(&entry.text),
                    |document| Some(DistrictSummary::from(document)),
                )
            })
            .collect();

        if summaries.is_empty() {
            return NOT_FOUND.to_string();
        }

        summaries.sort_by(|a, b| b.overall_average.total_cmp(&a.overall_average));
        Ranking(&summaries).to_string()
    }

    /// Adds a raw text to the index. It is kept across refreshes and saved
    /// with the next snapshot.
    pub async fn insert_text(&mut self, text: impl Into<String> + Send) {
        let text = text.into();
        let vectors = self.embed_texts(&[text.as_str()]).await;
        if let Some(vector) = vectors.into_iter().next() {
            self.index.insert(text, None, vector);
        }
    }

    /// Every stored text, documents first in collection order.
    #[must_use]
    pub fn documents(&self) -> Vec<String> {
        self.index.entries().map(|entry| entry.text.clone()).collect()
    }

    /// Structured district documents currently indexed.
    #[must_use]
    pub fn district_documents(&self) -> Vec<DistrictDocument> {
        self.index.district_documents().cloned().collect()
    }

    /// Populates an uninitialized index. Returns the outcome of the
    /// collection run when one was made.
    async fn load(&mut self) -> Option<RefreshOutcome> {
        if self.state != StoreState::Uninitialized {
            return None;
        }

        if self.cache_status().is_fresh
            && let Some(snapshot) = self.load_snapshot()
        {
            log::info!(
                "Loaded {} district documents from fresh cache",
                snapshot.documents.len()
            );
            self.install_snapshot(snapshot).await;
            self.state = StoreState::Ready { degraded: false };
            return None;
        }

        let mut collected = None;
        if let Some(source) = self.source.clone() {
            let report = source.collect().await;
            if report.is_live() {
                let count = report.documents.len();
                log::info!("Initialized from {count} live district documents");
                self.install_documents(report.documents).await;
                self.persist();
                self.state = StoreState::Ready { degraded: false };
                return Some(RefreshOutcome::Refreshed(count));
            }
            log::warn!("Live collection produced no data during initialization");
            collected = Some(RefreshOutcome::KeptPrevious);
        }

        if let Some(snapshot) = self.load_snapshot() {
            log::warn!(
                "Serving {} district documents from stale cache",
                snapshot.documents.len()
            );
            self.install_snapshot(snapshot).await;
        } else {
            log::warn!("Serving static seed district documents");
            self.install_documents(fallback_documents(Utc::now())).await;
        }
        self.state = StoreState::Ready { degraded: true };
        collected
    }

    fn load_snapshot(&self) -> Option<CacheSnapshot> {
        match self.cache.load_snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("Ignoring unusable cache snapshot: {e}");
                None
            }
        }
    }

    async fn install_snapshot(&mut self, snapshot: CacheSnapshot) {
        let mut extra = snapshot.extra_texts;
        for text in self.index.extra_texts() {
            if !extra.iter().any(|existing| existing == text) {
                extra.push(text.to_string());
            }
        }
        self.rebuild(snapshot.documents, extra).await;
    }

    async fn install_documents(&mut self, documents: Vec<DistrictDocument>) {
        let extra = self.index.extra_texts().map(str::to_string).collect();
        self.rebuild(documents, extra).await;
    }

    async fn rebuild(&mut self, documents: Vec<DistrictDocument>, extra_texts: Vec<String>) {
        let texts: Vec<String> = documents
            .iter()
            .map(DistrictDocument::render_text)
            .chain(extra_texts)
            .collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let vectors = self.embed_texts(&refs).await;

        let mut index = VectorIndex::default();
        let mut documents = documents.into_iter();
        for (text, vector) in texts.into_iter().zip(vectors) {
            index.insert(text, documents.next(), vector);
        }
        self.index = index;
    }

    async fn embed_query(&mut self, query: &str) -> Vec<f32> {
        self.embed_texts(&[query]).await.pop().unwrap_or_default()
    }

    /// Embeds `texts` with the current embedder. If it fails, the store
    /// switches to [`HashingEmbedder`] for good and re-embeds the index.
    async fn embed_texts(&mut self, texts: &[&str]) -> Vec<Vec<f32>> {
        match self.embedder.embed_batch(texts).await {
            Ok(vectors) if vectors.len() == texts.len() => return vectors,
            Ok(vectors) => log::warn!(
                "{} returned {} embeddings for {} texts",
                self.embedder.name(),
                vectors.len(),
                texts.len()
            ),
            Err(e) => log::warn!("Embedding with {} failed: {e}", self.embedder.name()),
        }

        let offline = HashingEmbedder::default();
        self.switch_embedder(offline);
        texts.iter().map(|text| offline.embed_text(text)).collect()
    }

    fn switch_embedder(&mut self, offline: HashingEmbedder) {
        log::warn!("Switching to offline hashing embeddings");
        let mut index = VectorIndex::default();
        for entry in self.index.entries() {
            index.insert(
                entry.text.clone(),
                entry.document.clone(),
                offline.embed_text(&entry.text),
            );
        }
        self.index = index;
        self.embedder = Arc::new(offline);
    }

    /// Writes the snapshot and then the timestamp, so a failed snapshot
    /// write never marks the cache fresh.
    fn persist(&self) {
        let snapshot = CacheSnapshot::new(
            self.district_documents(),
            self.index.extra_texts().map(str::to_string).collect(),
        );
        let result = self
            .cache
            .save_snapshot(&snapshot)
            .and_then(|()| self.cache.write_last_update(Utc::now()));
        if let Err(e) = result {
            log::warn!(
                "Failed to persist cache to {}: {e}",
                self.cache.root().display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Mutex;

    use ub_realty_retrieval::{CollectionStats, DocumentOrigin};

    use super::*;
    use crate::config::EmbeddingBackend;
    use crate::embedder::EmbeddingError;

    /// Hands out queued reports; an exhausted queue yields a fallback
    /// report.
    struct StubSource {
        reports: Mutex<VecDeque<CollectionReport>>,
        calls: Mutex<usize>,
    }

    impl StubSource {
        fn new(reports: Vec<CollectionReport>) -> Arc<Self> {
            Arc::new(Self {
                reports: Mutex::new(reports.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl DocumentSource for StubSource {
        async fn collect(&self) -> CollectionReport {
            *self.calls.lock().unwrap() += 1;
            self.reports
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(fallback_report)
        }
    }

    /// Delegates to a small [`HashingEmbedder`] for `working_calls` batches,
    /// then fails every call.
    struct FlakyEmbedder {
        working_calls: Mutex<usize>,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        fn name(&self) -> &str {
            "flaky"
        }

        fn dimensions(&self) -> usize {
            64
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            let mut remaining = self.working_calls.lock().unwrap();
            if *remaining == 0 {
                return Err(EmbeddingError::Response("service unavailable".to_string()));
            }
            *remaining -= 1;
            let inner = HashingEmbedder::new(64);
            Ok(texts.iter().map(|text| inner.embed_text(text)).collect())
        }
    }

    fn flaky(working_calls: usize) -> Arc<FlakyEmbedder> {
        Arc::new(FlakyEmbedder {
            working_calls: Mutex::new(working_calls),
        })
    }

    fn fallback_report() -> CollectionReport {
        CollectionReport {
            documents: fallback_documents(Utc::now()),
            origin: DocumentOrigin::Fallback,
            stats: CollectionStats::default(),
        }
    }

    fn live_report(districts: &[(&str, f64)]) -> CollectionReport {
        let documents = districts
            .iter()
            .map(|(name, average)| DistrictDocument {
                district_name: (*name).to_string(),
                overall_average_price_per_sqm: *average,
                per_room_count_averages: BTreeMap::from([(2, *average)]),
                per_room_sample_counts: BTreeMap::from([(2, 4)]),
                sample_count: 4,
                generated_at: Utc::now(),
                description: format!("{name} дүүргийн шинэ мэдээлэл."),
            })
            .collect();
        CollectionReport {
            documents,
            origin: DocumentOrigin::Live,
            stats: CollectionStats::default(),
        }
    }

    fn temp_cache(name: &str) -> CacheDir {
        let dir = std::env::temp_dir().join(format!("ub_realty_store_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        CacheDir::new(dir)
    }

    fn cleanup(cache: &CacheDir) {
        let _ = std::fs::remove_dir_all(cache.root());
    }

    #[tokio::test]
    async fn live_initialization_persists_and_fresh_cache_skips_collection() {
        let cache = temp_cache("fresh");
        let source = StubSource::new(vec![live_report(&[("Хан-Уул", 4_200_000.0)])]);

        let mut store = DistrictKnowledgeStore::new(cache.clone()).with_source(source.clone());
        store.initialize().await;
        assert_eq!(store.state(), StoreState::Ready { degraded: false });
        assert_eq!(source.calls(), 1);
        assert!(store.cache_status().is_fresh);

        let second_source = StubSource::new(vec![]);
        let mut reloaded = DistrictKnowledgeStore::new(cache.clone()).with_source(second_source.clone());
        reloaded.initialize().await;
        assert_eq!(second_source.calls(), 0);
        assert_eq!(reloaded.state(), StoreState::Ready { degraded: false });
        assert_eq!(reloaded.district_documents().len(), 1);
        assert!(reloaded.query_one("Хан-Уул").await.contains("4 200 000"));

        cleanup(&cache);
    }

    #[tokio::test]
    async fn corrupt_cache_counts_as_stale() {
        let cache = temp_cache("corrupt");
        cache.write_last_update(Utc::now()).unwrap();
        std::fs::write(cache.root().join(crate::cache::SNAPSHOT_FILE), "{broken").unwrap();

        let source = StubSource::new(vec![live_report(&[("Баянгол", 3_600_000.0)])]);
        let mut store = DistrictKnowledgeStore::new(cache.clone()).with_source(source.clone());
        store.initialize().await;

        assert_eq!(source.calls(), 1);
        assert_eq!(store.state(), StoreState::Ready { degraded: false });
        assert!(cache.load_snapshot().unwrap().is_some());

        cleanup(&cache);
    }

    #[tokio::test]
    async fn without_source_serves_degraded_seed_documents() {
        let cache = temp_cache("seed");
        let mut store = DistrictKnowledgeStore::new(cache.clone());
        store.initialize().await;

        assert_eq!(store.state(), StoreState::Ready { degraded: true });
        assert_eq!(store.documents().len(), 6);
        assert_eq!(store.refresh(false).await, RefreshOutcome::NoSource);

        cleanup(&cache);
    }

    #[tokio::test]
    async fn failed_collection_prefers_stale_cache_over_seeds() {
        let cache = temp_cache("stale");
        let snapshot = CacheSnapshot::new(live_report(&[("Налайх", 2_100_000.0)]).documents, vec![]);
        cache.save_snapshot(&snapshot).unwrap();
        cache
            .write_last_update(Utc::now() - Duration::days(30))
            .unwrap();

        let source = StubSource::new(vec![]);
        let mut store = DistrictKnowledgeStore::new(cache.clone()).with_source(source.clone());
        store.initialize().await;

        assert_eq!(source.calls(), 1);
        assert_eq!(store.state(), StoreState::Ready { degraded: true });
        assert_eq!(store.district_documents()[0].district_name, "Налайх");

        cleanup(&cache);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_index() {
        let cache = temp_cache("keep");
        let source = StubSource::new(vec![live_report(&[
            ("Хан-Уул", 4_200_000.0),
            ("Баянгол", 3_600_000.0),
        ])]);
        let mut store = DistrictKnowledgeStore::new(cache.clone()).with_source(source.clone());
        store.initialize().await;
        let before = store.documents();

        assert_eq!(store.refresh(true).await, RefreshOutcome::KeptPrevious);
        assert_eq!(source.calls(), 2);
        assert_eq!(store.documents(), before);
        assert_eq!(store.state(), StoreState::Ready { degraded: false });

        cleanup(&cache);
    }

    #[tokio::test]
    async fn refresh_respects_freshness_unless_forced() {
        let cache = temp_cache("force");
        let source = StubSource::new(vec![
            live_report(&[("Хан-Уул", 4_200_000.0)]),
            live_report(&[("Хан-Уул", 4_300_000.0), ("Чингэлтэй", 3_900_000.0)]),
        ]);
        let mut store = DistrictKnowledgeStore::new(cache.clone()).with_source(source.clone());
        store.initialize().await;

        assert_eq!(store.refresh(false).await, RefreshOutcome::Fresh);
        assert_eq!(source.calls(), 1);

        assert_eq!(store.refresh(true).await, RefreshOutcome::Refreshed(2));
        assert!(store.query_one("Хан-Уул").await.contains("4 300 000"));
        assert_eq!(cache.load_snapshot().unwrap().unwrap().documents.len(), 2);

        cleanup(&cache);
    }

    #[tokio::test]
    async fn inserted_texts_survive_refresh() {
        let cache = temp_cache("extra");
        let source = StubSource::new(vec![
            live_report(&[("Хан-Уул", 4_200_000.0)]),
            live_report(&[("Баянгол", 3_600_000.0)]),
        ]);
        let mut store = DistrictKnowledgeStore::new(cache.clone()).with_source(source);
        store.initialize().await;
        store.insert_text("Зайсан орчмын шинэ барилгууд").await;

        store.refresh(true).await;
        assert!(store.documents().iter().any(|t| t == "Зайсан орчмын шинэ барилгууд"));
        assert_eq!(
            cache.load_snapshot().unwrap().unwrap().extra_texts,
            vec!["Зайсан орчмын шинэ барилгууд".to_string()]
        );

        cleanup(&cache);
    }

    #[tokio::test]
    async fn query_one_prefers_substring_and_falls_back_to_sentinel() {
        let cache = temp_cache("query");
        let mut store = DistrictKnowledgeStore::new(cache.clone());
        store.initialize().await;

        let answer = store.query_one("баянзүрх").await;
        assert!(answer.starts_with("Дүүрэг: Баянзүрх"));

        let mut strict = DistrictKnowledgeStore::new(cache.clone()).with_min_similarity(0.99);
        strict.initialize().await;
        assert_eq!(strict.query_one("Налайх").await, NOT_FOUND);
        assert_eq!(strict.query_one("   ").await, NOT_FOUND);

        cleanup(&cache);
    }

    #[tokio::test]
    async fn comparison_is_sorted_descending() {
        let cache = temp_cache("compare");
        let mut store = DistrictKnowledgeStore::new(cache.clone());
        store.initialize().await;
        store
            .insert_text(
                "Дүүрэг: Налайх\nНийт байрны 1м2 дундаж үнэ: 1 900 000 төгрөг\n2 өрөө байрны 1м2 дундаж үнэ: 2 000 000 төгрөг",
            )
            .await;
        store.insert_text("Дүүргийн тухай ерөнхий тэмдэглэл").await;

        let ranking = store.query_all_sorted();
        let lines: Vec<&str> = ranking.lines().skip(1).collect();
        assert_eq!(lines.len(), 7);
        assert!(lines[0].starts_with("1. Сүхбаатар: нийт 4 500 000 төгрөг"));
        assert!(lines[0].contains("2 өрөө: 4 600 000 төгрөг"));
        assert!(lines[5].starts_with("6. Сонгинохайрхан"));
        assert!(lines[6].starts_with("7. Налайх: нийт 1 900 000 төгрөг"));
        assert!(lines[6].contains(&format!("1 өрөө: {NO_DATA}")));

        cleanup(&cache);
    }

    #[tokio::test]
    async fn lookup_routes_comparison_queries() {
        let cache = temp_cache("lookup");
        let mut store = DistrictKnowledgeStore::new(cache.clone());

        let ranking = store.lookup("Бүх дүүрэг харьцуулж өгөөч").await;
        assert!(ranking.starts_with("Дүүргүүдийн"));
        assert_eq!(store.state(), StoreState::Ready { degraded: true });

        let single = store.lookup("Чингэлтэй").await;
        assert!(single.starts_with("Дүүрэг: Чингэлтэй"));

        assert!(is_comparison_query("please COMPARE districts"));
        assert!(!is_comparison_query("Хан-Уул"));

        cleanup(&cache);
    }

    #[tokio::test]
    async fn first_lookup_on_empty_cache_collects_once() {
        let cache = temp_cache("first_lookup");
        let source = StubSource::new(vec![]);
        let mut store = DistrictKnowledgeStore::new(cache.clone()).with_source(source.clone());

        let answer = store.lookup("Хан-Уул").await;
        assert!(answer.starts_with("Дүүрэг: Хан-Уул"));
        assert_eq!(source.calls(), 1);
        assert_eq!(store.state(), StoreState::Ready { degraded: true });

        cleanup(&cache);
    }

    #[tokio::test]
    async fn first_refresh_reports_the_initial_collection() {
        let cache = temp_cache("first_refresh");
        let source = StubSource::new(vec![live_report(&[("Баянгол", 3_600_000.0)])]);
        let mut store = DistrictKnowledgeStore::new(cache.clone()).with_source(source.clone());

        assert_eq!(store.refresh(false).await, RefreshOutcome::Refreshed(1));
        assert_eq!(source.calls(), 1);

        let mut failing = DistrictKnowledgeStore::new(temp_cache("first_refresh_failing"))
            .with_source(StubSource::new(vec![]));
        assert_eq!(failing.refresh(true).await, RefreshOutcome::KeptPrevious);

        cleanup(&cache);
        cleanup(failing.cache());
    }

    #[tokio::test]
    async fn spelling_variants_find_the_canonical_district() {
        let cache = temp_cache("variants");
        let mut store = DistrictKnowledgeStore::new(cache.clone());
        store.initialize().await;

        assert!(store.query_one("khan uul").await.starts_with("Дүүрэг: Хан-Уул"));
        assert!(store.query_one("хануул 2 өрөө").await.starts_with("Дүүрэг: Хан-Уул"));
        assert!(store.query_one("сухбаатар").await.starts_with("Дүүрэг: Сүхбаатар"));
        assert!(
            store
                .lookup("Баянзурх дүүргийн байрны үнэ")
                .await
                .starts_with("Дүүрэг: Баянзүрх")
        );

        cleanup(&cache);
    }

    #[tokio::test]
    async fn embedding_failure_switches_to_hashing() {
        let cache = temp_cache("embed_fail");
        let mut store = DistrictKnowledgeStore::new(cache.clone()).with_embedder(flaky(1));
        store.initialize().await;
        assert_eq!(store.embedder_name(), "flaky");

        let answer = store.query_one("Чингэлтэй").await;
        assert!(answer.starts_with("Дүүрэг: Чингэлтэй"));
        assert_eq!(store.embedder_name(), "hashing");
        assert_eq!(store.documents().len(), 6);

        let mut broken = DistrictKnowledgeStore::new(cache.clone()).with_embedder(flaky(0));
        broken.initialize().await;
        assert_eq!(broken.embedder_name(), "hashing");
        assert!(broken.query_one("Баянгол").await.starts_with("Дүүрэг: Баянгол"));

        cleanup(&cache);
    }

    #[tokio::test]
    async fn unusable_http_embedder_falls_back_to_hashing() {
        let mut config = KnowledgeConfig::embedded();
        config.embedding.backend = EmbeddingBackend::Http;
        if let Some(http) = config.embedding.http.as_mut() {
            http.api_key_env = Some("UB_REALTY_UNSET_EMBEDDING_KEY".to_string());
        }
        config.top_k = 5;

        let cache = temp_cache("http_config");
        let store = DistrictKnowledgeStore::from_config(cache.clone(), &config).unwrap();
        assert_eq!(store.embedder_name(), "hashing");
        assert_eq!(store.top_k, 5);

        cleanup(&cache);
    }
}
