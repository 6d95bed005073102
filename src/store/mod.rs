//! Storage abstraction for the workflow index.
//!
//! The [`Store`] trait is the single source of truth read by the query,
//! analytics and similarity engines and written by the indexing pipeline.
//! Implementations guarantee one live record per filename and keep the
//! full-text shadow in lockstep with the records: a reader never sees a
//! record without its shadow row or the other way around.

pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Complexity, TriggerType, WorkflowRecord};

pub use sqlite::SqliteStore;

/// Result ordering. Ties are always broken by filename ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Name,
    NodeCount,
    AnalyzedAt,
}

/// Backend-neutral search predicate.
///
/// All present conditions combine with AND. `fts` is an FTS5 MATCH
/// expression; `None` matches every record.
#[derive(Debug, Clone, Default)]
pub struct SearchPredicate {
    pub fts: Option<String>,
    pub trigger: Option<TriggerType>,
    pub complexity: Option<Complexity>,
    pub active_only: bool,
    /// Every listed integration must be present.
    pub integrations: Vec<String>,
    /// Restrict to these filenames when set.
    pub filenames: Option<Vec<String>>,
    pub sort: SortKey,
    pub limit: u32,
    pub offset: u64,
}

/// One page of search results plus the unpaginated match count.
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub records: Vec<WorkflowRecord>,
    pub total: u64,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or wholesale replace the record and its shadow row.
    async fn upsert(&self, record: &WorkflowRecord) -> Result<()>;

    async fn fetch(&self, filename: &str) -> Result<Option<WorkflowRecord>>;

    /// Remove the record and its shadow row. Returns whether a record existed.
    async fn delete(&self, filename: &str) -> Result<bool>;

    /// Content digest of the stored record, used for change detection.
    async fn digest_of(&self, filename: &str) -> Result<Option<String>>;

    async fn search(&self, predicate: &SearchPredicate) -> Result<SearchPage>;

    /// Every live record, ordered by filename.
    async fn all(&self) -> Result<Vec<WorkflowRecord>>;
}
