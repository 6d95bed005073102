//! Incremental indexing pipeline.
//!
//! Scans the corpus, analyzes every document and upserts the ones whose
//! content digest changed. Per-document failures are counted and logged;
//! only a failure to enumerate the corpus aborts the run.

use chrono::Utc;
use serde::Serialize;

use crate::analyze::{analyze, content_digest};
use crate::config::CorpusConfig;
use crate::corpus::{scan_corpus, CorpusFile};
use crate::error::{IndexError, Result};
use crate::store::Store;

/// Counters returned by a reindex run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
    pub processed: u64,
    pub skipped: u64,
    pub errors: u64,
    pub total: u64,
}

enum Outcome {
    Processed,
    Skipped,
}

/// Reindex the corpus into `store`. With `force`, unchanged documents are
/// rewritten too.
pub async fn reindex(store: &dyn Store, corpus: &CorpusConfig, force: bool) -> Result<ReindexReport> {
    let files = scan_corpus(corpus)?;
    tracing::info!(
        root = %corpus.root.display(),
        files = files.len(),
        force,
        "reindex started"
    );

    let mut report = ReindexReport {
        total: files.len() as u64,
        ..Default::default()
    };

    for file in &files {
        match index_file(store, file, force).await {
            Ok(Outcome::Processed) => report.processed += 1,
            Ok(Outcome::Skipped) => report.skipped += 1,
            Err(IndexError::Parse { filename, detail }) => {
                tracing::warn!(%filename, %detail, "skipping malformed document");
                report.errors += 1;
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(
        processed = report.processed,
        skipped = report.skipped,
        errors = report.errors,
        total = report.total,
        "reindex finished"
    );
    Ok(report)
}

async fn index_file(store: &dyn Store, file: &CorpusFile, force: bool) -> Result<Outcome> {
    let bytes = std::fs::read(&file.path).map_err(|e| IndexError::parse(&file.key, e))?;

    if !force {
        let digest = content_digest(&bytes);
        if store.digest_of(&file.key).await?.as_deref() == Some(digest.as_str()) {
            tracing::debug!(filename = %file.key, "unchanged, skipping");
            return Ok(Outcome::Skipped);
        }
    }

    let record = analyze(&file.key, &bytes, Utc::now())?;
    store.upsert(&record).await?;
    Ok(Outcome::Processed)
}
