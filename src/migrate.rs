use sqlx::SqlitePool;

use crate::error::Result;

/// Create the workflow table, its indexes and the full-text shadow.
/// Safe to run on every start.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS workflows (
            id INTEGER PRIMARY KEY,
            filename TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            source_id TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 0,
            description TEXT NOT NULL,
            trigger_type TEXT NOT NULL,
            complexity TEXT NOT NULL,
            node_count INTEGER NOT NULL DEFAULT 0,
            integrations TEXT NOT NULL DEFAULT '[]',
            tags TEXT NOT NULL DEFAULT '[]',
            created_at TEXT,
            updated_at TEXT,
            digest TEXT NOT NULL,
            byte_size INTEGER NOT NULL DEFAULT 0,
            analyzed_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // FTS5 CREATE is not idempotent natively, so we check first
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='workflows_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        // rowid mirrors workflows.id
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE workflows_fts USING fts5(
                filename,
                name,
                description,
                integrations,
                tags
            )
            "#,
        )
        .execute(pool)
        .await?;
    }

    for ddl in [
        "CREATE INDEX IF NOT EXISTS idx_workflows_trigger_type ON workflows(trigger_type)",
        "CREATE INDEX IF NOT EXISTS idx_workflows_complexity ON workflows(complexity)",
        "CREATE INDEX IF NOT EXISTS idx_workflows_active ON workflows(active)",
        "CREATE INDEX IF NOT EXISTS idx_workflows_node_count ON workflows(node_count)",
        "CREATE INDEX IF NOT EXISTS idx_workflows_filename ON workflows(filename)",
    ] {
        sqlx::query(ddl).execute(pool).await?;
    }

    Ok(())
}
