//! Query orchestration: keyed cache, in-flight dedupe, freshness windows,
//! and stale-result discard.
//!
//! Every remote read flows through [`QueryEngine::query`]. Each query name
//! has at most one active key at a time; when the key changes mid-flight
//! (the user moved the date range or switched dataset), the late result is
//! discarded rather than cached under a key nobody is looking at.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::charts::ChartData;
use crate::error::ApiError;
use crate::store::{KvStore, AUTO_LOAD_KEY};
use crate::types::{DateRange, Dataset, KpiValue, SmartDashboard, SummaryReport};

/// The remote reads the engine knows how to cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryName {
    Summary,
    Datasets,
    SmartDashboard,
    SalesChart,
    ProfitChart,
    RegionChart,
    CustomerChart,
    SalesKpi,
    PurchasesKpi,
    QuantityKpi,
}

impl QueryName {
    /// Queries that hit the expensive analysis endpoints. These never fire
    /// until auto-loading has been explicitly enabled for the session.
    pub fn gated(&self) -> bool {
        matches!(
            self,
            QueryName::SmartDashboard
                | QueryName::SalesChart
                | QueryName::ProfitChart
                | QueryName::RegionChart
                | QueryName::CustomerChart
                | QueryName::SalesKpi
                | QueryName::PurchasesKpi
                | QueryName::QuantityKpi
        )
    }

    /// How long a cached success stays reusable. Dataset-dependent reads get
    /// a shorter window since an upload elsewhere invalidates them sooner.
    pub fn freshness(&self) -> Duration {
        match self {
            QueryName::Datasets
            | QueryName::SalesKpi
            | QueryName::PurchasesKpi
            | QueryName::QuantityKpi => Duration::from_secs(30),
            _ => Duration::from_secs(60),
        }
    }
}

/// Cache key: the query plus every input that changes its result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub name: QueryName,
    pub range: DateRange,
    pub dataset: Option<String>,
}

impl QueryKey {
    pub fn new(name: QueryName, range: DateRange, dataset: Option<String>) -> Self {
        Self {
            name,
            range,
            dataset,
        }
    }

    pub fn unscoped(name: QueryName) -> Self {
        Self {
            name,
            range: DateRange::default(),
            dataset: None,
        }
    }
}

/// One chart read's payload: the tagged data plus whatever narrative or
/// advisory error rode along with it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartResponse {
    pub data: Option<ChartData>,
    pub narrative: Option<String>,
    pub ai_error: Option<String>,
}

/// Successful payloads, one variant per query family.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
    Summary(SummaryReport),
    Datasets(Vec<Dataset>),
    Smart(SmartDashboard),
    Chart(ChartResponse),
    Kpi(KpiValue),
}

impl QueryData {
    pub fn as_summary(&self) -> Option<&SummaryReport> {
        match self {
            QueryData::Summary(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_datasets(&self) -> Option<&[Dataset]> {
        match self {
            QueryData::Datasets(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_smart(&self) -> Option<&SmartDashboard> {
        match self {
            QueryData::Smart(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_chart(&self) -> Option<&ChartResponse> {
        match self {
            QueryData::Chart(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_kpi(&self) -> Option<&KpiValue> {
        match self {
            QueryData::Kpi(k) => Some(k),
            _ => None,
        }
    }
}

/// Lifecycle of one keyed query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState {
    /// Not started, or gated off, or superseded before completion.
    Idle,
    Pending,
    Success(QueryData),
    Error(ApiError),
}

impl QueryState {
    pub fn data(&self) -> Option<&QueryData> {
        match self {
            QueryState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, QueryState::Pending)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    state: QueryState,
    fetched_at: Instant,
}

/// Executes one keyed fetch. Implemented over the HTTP client in production
/// and by fakes in tests.
#[async_trait]
pub trait QueryFetcher: Send + Sync {
    async fn fetch(&self, key: &QueryKey) -> Result<QueryData, ApiError>;
}

/// The orchestration layer all dashboard reads go through.
pub struct QueryEngine {
    fetcher: Arc<dyn QueryFetcher>,
    cache: Mutex<HashMap<QueryKey, CacheEntry>>,
    active: Mutex<HashMap<QueryName, QueryKey>>,
    auto_load: AtomicBool,
}

impl QueryEngine {
    pub fn new(fetcher: Arc<dyn QueryFetcher>) -> Self {
        Self {
            fetcher,
            cache: Mutex::new(HashMap::new()),
            active: Mutex::new(HashMap::new()),
            auto_load: AtomicBool::new(false),
        }
    }

    /// Turn on auto-loading for the rest of the session. One-way.
    pub fn enable_auto_load(&self) {
        if !self.auto_load.swap(true, Ordering::SeqCst) {
            log::info!("auto-load enabled");
        }
    }

    pub fn auto_load_enabled(&self) -> bool {
        self.auto_load.load(Ordering::SeqCst)
    }

    /// Pick up the one-shot handoff a fresh upload leaves in the store, so
    /// the dashboard auto-loads immediately after arriving from the upload
    /// flow. Consuming it removes the flag.
    pub fn consume_auto_load_handoff(&self, store: &Arc<dyn KvStore>) {
        if store.get(AUTO_LOAD_KEY).as_deref() == Some("1") {
            store.remove(AUTO_LOAD_KEY);
            self.enable_auto_load();
        }
    }

    /// Current cached state for a key without triggering a fetch.
    pub fn cached(&self, key: &QueryKey) -> QueryState {
        self.cache
            .lock()
            .get(key)
            .map(|entry| entry.state.clone())
            .unwrap_or(QueryState::Idle)
    }

    /// Drop every cached result. Used after uploads and auth changes.
    pub fn invalidate_all(&self) {
        self.cache.lock().clear();
    }

    /// Resolve a keyed query: reuse a fresh cached success, dedupe against
    /// an in-flight fetch, otherwise fetch. The returned state is what the
    /// view should render for this key right now.
    pub async fn query(&self, key: QueryKey) -> QueryState {
        if key.name.gated() && !self.auto_load_enabled() {
            return QueryState::Idle;
        }

        // This key is now what the view wants for its name slot.
        self.active.lock().insert(key.name, key.clone());

        {
            let mut cache = self.cache.lock();
            if let Some(entry) = cache.get(&key) {
                match &entry.state {
                    QueryState::Pending => return QueryState::Pending,
                    QueryState::Success(_) if entry.fetched_at.elapsed() < key.name.freshness() => {
                        return entry.state.clone();
                    }
                    _ => {}
                }
            }
            cache.insert(
                key.clone(),
                CacheEntry {
                    state: QueryState::Pending,
                    fetched_at: Instant::now(),
                },
            );
        }

        let result = self.fetcher.fetch(&key).await;

        // A newer key for the same name supersedes this fetch; drop the
        // result on the floor instead of caching it.
        if self.active.lock().get(&key.name) != Some(&key) {
            self.cache.lock().remove(&key);
            log::debug!("discarding stale result for {:?}", key.name);
            return QueryState::Idle;
        }

        let state = match result {
            Ok(data) => QueryState::Success(data),
            Err(e) => {
                log::warn!("query {:?} failed: {}", key.name, e);
                QueryState::Error(e)
            }
        };
        self.cache.lock().insert(
            key,
            CacheEntry {
                state: state.clone(),
                fetched_at: Instant::now(),
            },
        );
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    struct CountingFetcher {
        calls: AtomicUsize,
    }

    impl CountingFetcher {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl QueryFetcher for CountingFetcher {
        async fn fetch(&self, _key: &QueryKey) -> Result<QueryData, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(QueryData::Kpi(KpiValue {
                value: Some(1.0),
                ..Default::default()
            }))
        }
    }

    /// Blocks each fetch until released, and tags the result with the
    /// dataset name so tests can tell results apart.
    struct BlockingFetcher {
        release: Notify,
    }

    #[async_trait]
    impl QueryFetcher for BlockingFetcher {
        async fn fetch(&self, key: &QueryKey) -> Result<QueryData, ApiError> {
            self.release.notified().await;
            Ok(QueryData::Smart(SmartDashboard {
                data_summary: key.dataset.clone().map(serde_json::Value::String),
                ..Default::default()
            }))
        }
    }

    #[tokio::test]
    async fn test_gated_query_idle_until_enabled() {
        let fetcher = Arc::new(CountingFetcher::new());
        let engine = QueryEngine::new(fetcher.clone());
        let key = QueryKey::unscoped(QueryName::SalesKpi);

        assert_eq!(engine.query(key.clone()).await, QueryState::Idle);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);

        engine.enable_auto_load();
        let state = engine.query(key).await;
        assert!(matches!(state, QueryState::Success(_)));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fresh_success_reused_without_refetch() {
        let fetcher = Arc::new(CountingFetcher::new());
        let engine = QueryEngine::new(fetcher.clone());
        let key = QueryKey::unscoped(QueryName::Summary);

        engine.query(key.clone()).await;
        engine.query(key.clone()).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        // a different key is its own cache line
        let other = QueryKey::new(QueryName::Summary, DateRange::default(), Some("q3".into()));
        engine.query(other).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_all_forces_refetch() {
        let fetcher = Arc::new(CountingFetcher::new());
        let engine = QueryEngine::new(fetcher.clone());
        let key = QueryKey::unscoped(QueryName::Datasets);

        engine.query(key.clone()).await;
        engine.invalidate_all();
        engine.query(key).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_superseded_fetch_is_discarded() {
        let fetcher = Arc::new(BlockingFetcher {
            release: Notify::new(),
        });
        let engine = Arc::new(QueryEngine::new(fetcher.clone()));
        engine.enable_auto_load();

        let old_key = QueryKey::new(
            QueryName::SmartDashboard,
            DateRange::default(),
            Some("old".into()),
        );
        let new_key = QueryKey::new(
            QueryName::SmartDashboard,
            DateRange::default(),
            Some("new".into()),
        );

        let first = tokio::spawn({
            let engine = engine.clone();
            let key = old_key.clone();
            async move { engine.query(key).await }
        });
        // let the first fetch register as active before superseding it
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(engine.cached(&old_key).is_pending());

        let second = tokio::spawn({
            let engine = engine.clone();
            let key = new_key.clone();
            async move { engine.query(key).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // release both fetches; the superseded one must not land in cache
        fetcher.release.notify_one();
        fetcher.release.notify_one();

        let first_state = first.await.unwrap();
        let second_state = second.await.unwrap();

        assert_eq!(first_state, QueryState::Idle);
        assert_eq!(engine.cached(&old_key), QueryState::Idle);
        match &second_state {
            QueryState::Success(QueryData::Smart(smart)) => {
                assert_eq!(
                    smart.data_summary,
                    Some(serde_json::Value::String("new".into()))
                );
            }
            other => panic!("unexpected state: {:?}", other),
        }
        assert_eq!(engine.cached(&new_key), second_state);
    }

    #[tokio::test]
    async fn test_pending_key_dedupes_to_pending() {
        let fetcher = Arc::new(BlockingFetcher {
            release: Notify::new(),
        });
        let engine = Arc::new(QueryEngine::new(fetcher.clone()));
        engine.enable_auto_load();
        let key = QueryKey::unscoped(QueryName::SmartDashboard);

        let first = tokio::spawn({
            let engine = engine.clone();
            let key = key.clone();
            async move { engine.query(key).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // re-asking for the same key while in flight does not start a second
        // fetch
        assert_eq!(engine.query(key.clone()).await, QueryState::Pending);

        fetcher.release.notify_one();
        let state = first.await.unwrap();
        assert!(matches!(state, QueryState::Success(_)));
    }

    #[tokio::test]
    async fn test_auto_load_handoff_consumed_once() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        store.set(AUTO_LOAD_KEY, "1");

        let engine = QueryEngine::new(Arc::new(CountingFetcher::new()));
        assert!(!engine.auto_load_enabled());

        engine.consume_auto_load_handoff(&store);
        assert!(engine.auto_load_enabled());
        assert!(store.get(AUTO_LOAD_KEY).is_none());

        // a second engine in the same session sees no handoff
        let other = QueryEngine::new(Arc::new(CountingFetcher::new()));
        other.consume_auto_load_handoff(&store);
        assert!(!other.auto_load_enabled());
    }
}
