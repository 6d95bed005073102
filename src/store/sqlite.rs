//! SQLite-backed [`Store`] implementation.
//!
//! Records live in `workflows`; the searchable projection lives in the
//! `workflows_fts` FTS5 table under the same rowid. Both are written in a
//! single transaction, and the pool runs in WAL mode so readers keep
//! seeing the last committed pair while a write is in flight.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::BTreeSet;

use crate::config::Config;
use crate::db;
use crate::error::{IndexError, Result};
use crate::migrate;
use crate::models::WorkflowRecord;

use super::{SearchPage, SearchPredicate, SortKey, Store};

const COLUMNS: &str = "w.filename, w.name, w.source_id, w.active, w.description, \
    w.trigger_type, w.complexity, w.node_count, w.integrations, w.tags, \
    w.created_at, w.updated_at, w.digest, w.byte_size, w.analyzed_at";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) and migrate the store. Writer-side entry point.
    pub async fn init(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Open an already-initialized store. Query-side entry point.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect_existing(config).await?;
        Ok(Self::new(pool))
    }
}

fn push_conditions(qb: &mut QueryBuilder<'_, Sqlite>, predicate: &SearchPredicate) {
    qb.push(" FROM workflows w WHERE 1 = 1");

    if let Some(ref expr) = predicate.fts {
        qb.push(" AND w.id IN (SELECT rowid FROM workflows_fts WHERE workflows_fts MATCH ")
            .push_bind(expr.clone())
            .push(")");
    }
    if let Some(trigger) = predicate.trigger {
        qb.push(" AND w.trigger_type = ")
            .push_bind(trigger.as_str());
    }
    if let Some(complexity) = predicate.complexity {
        qb.push(" AND w.complexity = ")
            .push_bind(complexity.as_str());
    }
    if predicate.active_only {
        qb.push(" AND w.active = 1");
    }
    for integration in &predicate.integrations {
        qb.push(" AND EXISTS (SELECT 1 FROM json_each(w.integrations) WHERE json_each.value = ")
            .push_bind(integration.clone())
            .push(" COLLATE NOCASE)");
    }
    if let Some(ref filenames) = predicate.filenames {
        let allow_list = serde_json::Value::from(filenames.clone()).to_string();
        qb.push(" AND w.filename IN (SELECT value FROM json_each(")
            .push_bind(allow_list)
            .push("))");
    }
}

fn order_by(sort: SortKey) -> &'static str {
    match sort {
        SortKey::Name => " ORDER BY w.name ASC, w.filename ASC",
        SortKey::NodeCount => " ORDER BY w.node_count DESC, w.filename ASC",
        SortKey::AnalyzedAt => " ORDER BY w.analyzed_at DESC, w.filename ASC",
    }
}

fn string_set(json: &str, column: &str) -> Result<BTreeSet<String>> {
    serde_json::from_str(json).map_err(|e| {
        IndexError::StoreUnavailable(format!("corrupt {} column: {}", column, e))
    })
}

fn row_to_record(row: &SqliteRow) -> Result<WorkflowRecord> {
    let trigger: String = row.try_get("trigger_type")?;
    let complexity: String = row.try_get("complexity")?;
    let integrations: String = row.try_get("integrations")?;
    let tags: String = row.try_get("tags")?;
    let node_count: i64 = row.try_get("node_count")?;
    let byte_size: i64 = row.try_get("byte_size")?;
    let active: i64 = row.try_get("active")?;

    Ok(WorkflowRecord {
        filename: row.try_get("filename")?,
        name: row.try_get("name")?,
        source_id: row.try_get("source_id")?,
        active: active != 0,
        description: row.try_get("description")?,
        trigger_type: trigger.parse()?,
        complexity: complexity.parse()?,
        node_count: u32::try_from(node_count).unwrap_or(0),
        integrations: string_set(&integrations, "integrations")?,
        tags: string_set(&tags, "tags")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        digest: row.try_get("digest")?,
        byte_size: u64::try_from(byte_size).unwrap_or(0),
        analyzed_at: row.try_get("analyzed_at")?,
    })
}

fn to_json_array(set: &BTreeSet<String>) -> String {
    serde_json::Value::from(set.iter().cloned().collect::<Vec<_>>()).to_string()
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert(&self, record: &WorkflowRecord) -> Result<()> {
        let shadow = record.shadow();
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO workflows (filename, name, source_id, active, description,
                                   trigger_type, complexity, node_count, integrations,
                                   tags, created_at, updated_at, digest, byte_size,
                                   analyzed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(filename) DO UPDATE SET
                name = excluded.name,
                source_id = excluded.source_id,
                active = excluded.active,
                description = excluded.description,
                trigger_type = excluded.trigger_type,
                complexity = excluded.complexity,
                node_count = excluded.node_count,
                integrations = excluded.integrations,
                tags = excluded.tags,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                digest = excluded.digest,
                byte_size = excluded.byte_size,
                analyzed_at = excluded.analyzed_at
            RETURNING id
            "#,
        )
        .bind(&record.filename)
        .bind(&record.name)
        .bind(&record.source_id)
        .bind(record.active)
        .bind(&record.description)
        .bind(record.trigger_type.as_str())
        .bind(record.complexity.as_str())
        .bind(i64::from(record.node_count))
        .bind(to_json_array(&record.integrations))
        .bind(to_json_array(&record.tags))
        .bind(&record.created_at)
        .bind(&record.updated_at)
        .bind(&record.digest)
        .bind(i64::try_from(record.byte_size).unwrap_or(i64::MAX))
        .bind(&record.analyzed_at)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO workflows_fts (rowid, filename, name, description, integrations, tags)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&shadow.filename)
        .bind(&shadow.name)
        .bind(&shadow.description)
        .bind(&shadow.integrations)
        .bind(&shadow.tags)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn fetch(&self, filename: &str) -> Result<Option<WorkflowRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM workflows w WHERE w.filename = ?",
            COLUMNS
        ))
        .bind(filename)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn delete(&self, filename: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM workflows WHERE filename = ?")
            .bind(filename)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(id) = id else {
            tx.rollback().await?;
            return Ok(false);
        };

        sqlx::query("DELETE FROM workflows_fts WHERE rowid = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM workflows WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn digest_of(&self, filename: &str) -> Result<Option<String>> {
        let digest = sqlx::query_scalar("SELECT digest FROM workflows WHERE filename = ?")
            .bind(filename)
            .fetch_optional(&self.pool)
            .await?;
        Ok(digest)
    }

    async fn search(&self, predicate: &SearchPredicate) -> Result<SearchPage> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*)");
        push_conditions(&mut count_qb, predicate);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {}", COLUMNS));
        push_conditions(&mut qb, predicate);
        qb.push(order_by(predicate.sort));
        qb.push(" LIMIT ")
            .push_bind(i64::from(predicate.limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(predicate.offset).unwrap_or(i64::MAX));

        let rows = qb.build().fetch_all(&self.pool).await?;
        let records = rows.iter().map(row_to_record).collect::<Result<Vec<_>>>()?;

        Ok(SearchPage {
            records,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn all(&self) -> Result<Vec<WorkflowRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM workflows w ORDER BY w.filename ASC",
            COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }
}
