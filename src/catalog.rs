//! The catalog facade: the request/response boundary that transports call.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`query`](Catalog::query) | Filtered, paginated search |
//! | [`get`](Catalog::get) | Fetch one workflow by filename |
//! | [`stats`](Catalog::stats) | Corpus analytics (memoized) |
//! | [`reindex`](Catalog::reindex) | Incremental or forced reindex |
//! | [`find_similar`](Catalog::find_similar) | Similarity ranking |
//! | [`categories`](Catalog::categories) | Category names and sizes |

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Clock, SystemClock};
use crate::categories::{CategoryMap, CategorySummary};
use crate::config::{Config, CorpusConfig};
use crate::error::{IndexError, Result};
use crate::ingest::{self, ReindexReport};
use crate::models::WorkflowRecord;
use crate::search::{self, QueryRequest, QueryResponse};
use crate::similar::{self, SimilarResponse};
use crate::stats::{AnalyticsEngine, AnalyticsSnapshot};
use crate::store::{SqliteStore, Store};

pub struct Catalog {
    store: Arc<dyn Store>,
    corpus: CorpusConfig,
    categories: CategoryMap,
    analytics: AnalyticsEngine,
}

impl Catalog {
    pub fn new(
        store: Arc<dyn Store>,
        corpus: CorpusConfig,
        categories: CategoryMap,
        analytics: AnalyticsEngine,
    ) -> Self {
        Self {
            store,
            corpus,
            categories,
            analytics,
        }
    }

    /// Open for the writer side: creates and migrates the store if needed.
    pub async fn init(config: &Config) -> Result<Self> {
        let store = SqliteStore::init(config).await?;
        Self::assemble(config, store, Box::new(SystemClock))
    }

    /// Open for the query side: the store must already exist.
    pub async fn open(config: &Config) -> Result<Self> {
        let store = SqliteStore::open(config).await?;
        Self::assemble(config, store, Box::new(SystemClock))
    }

    /// Like [`Catalog::init`], with an explicit analytics clock.
    pub async fn init_with_clock(config: &Config, clock: Box<dyn Clock>) -> Result<Self> {
        let store = SqliteStore::init(config).await?;
        Self::assemble(config, store, clock)
    }

    fn assemble(config: &Config, store: SqliteStore, clock: Box<dyn Clock>) -> Result<Self> {
        let categories = CategoryMap::load(config.categories.path.as_deref())?;
        let analytics = AnalyticsEngine::new(
            Duration::from_secs(config.analytics.cache_ttl_secs),
            clock,
        );
        Ok(Self::new(
            Arc::new(store),
            config.corpus.clone(),
            categories,
            analytics,
        ))
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        search::run_query(self.store.as_ref(), &self.categories, request).await
    }

    pub async fn get(&self, filename: &str) -> Result<WorkflowRecord> {
        self.store
            .fetch(filename)
            .await?
            .ok_or_else(|| IndexError::not_found("workflow", filename))
    }

    pub async fn stats(&self) -> Result<AnalyticsSnapshot> {
        self.analytics.snapshot(self.store.as_ref()).await
    }

    pub async fn reindex(&self, force: bool) -> Result<ReindexReport> {
        ingest::reindex(self.store.as_ref(), &self.corpus, force).await
    }

    pub async fn find_similar(&self, filename: &str, threshold: f64) -> Result<SimilarResponse> {
        similar::find_similar(self.store.as_ref(), filename, threshold).await
    }

    pub fn categories(&self) -> Vec<CategorySummary> {
        self.categories.summaries()
    }
}
