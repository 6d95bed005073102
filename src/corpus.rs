use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::error::{IndexError, Result};

/// One document file found in the corpus.
#[derive(Debug, Clone)]
pub struct CorpusFile {
    /// Path relative to the corpus root with `/` separators; the record key.
    pub key: String,
    pub path: PathBuf,
}

/// Enumerate the corpus. Any failure here aborts the whole reindex.
pub fn scan_corpus(config: &CorpusConfig) -> Result<Vec<CorpusFile>> {
    let root = &config.root;
    let corpus_err = |message: String| IndexError::Corpus {
        path: root.clone(),
        message,
    };

    if !root.is_dir() {
        return Err(corpus_err("corpus root does not exist".to_string()));
    }

    let include_set = build_globset(&config.include_globs).map_err(corpus_err)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes).map_err(corpus_err)?;

    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(config.follow_symlinks) {
        let entry = entry.map_err(|e| corpus_err(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if exclude_set.is_match(&key) || !include_set.is_match(&key) {
            continue;
        }

        files.push(CorpusFile {
            key,
            path: path.to_path_buf(),
        });
    }

    // Sort for deterministic ordering
    files.sort_by(|a, b| a.key.cmp(&b.key));

    Ok(files)
}

fn build_globset(patterns: &[String]) -> std::result::Result<GlobSet, String> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).map_err(|e| e.to_string())?);
    }
    builder.build().map_err(|e| e.to_string())
}
