//! Query engine: filtered, paginated, sorted search over the index.
//!
//! Free text is compiled into an FTS5 MATCH expression against the
//! full-text shadow; structured filters are ANDed on top. The total match
//! count is computed before pagination so callers can page through the
//! full result set.

use serde::{Deserialize, Serialize};

use crate::categories::CategoryMap;
use crate::error::{IndexError, Result};
use crate::models::{Complexity, TriggerType, WorkflowRecord};
use crate::store::{SearchPredicate, SortKey, Store};

pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryRequest {
    pub query: String,
    pub trigger: Option<TriggerType>,
    pub complexity: Option<Complexity>,
    pub active_only: bool,
    /// Every listed integration must be present; names compare case-insensitively.
    pub integrations: Vec<String>,
    pub category: Option<String>,
    pub limit: i64,
    pub offset: i64,
    pub sort: SortKey,
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            trigger: None,
            complexity: None,
            active_only: false,
            integrations: Vec::new(),
            category: None,
            limit: 20,
            offset: 0,
            sort: SortKey::Name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub documents: Vec<WorkflowRecord>,
    pub total: u64,
    pub pages: u64,
    pub limit: i64,
    pub offset: i64,
}

/// Run a search request.
///
/// Returns `Validation` for a limit outside `1..=100` or a negative offset.
pub async fn run_query(
    store: &dyn Store,
    categories: &CategoryMap,
    request: &QueryRequest,
) -> Result<QueryResponse> {
    if !(1..=MAX_LIMIT).contains(&request.limit) {
        return Err(IndexError::validation(
            "limit",
            format!("must be between 1 and {}, got {}", MAX_LIMIT, request.limit),
        ));
    }
    if request.offset < 0 {
        return Err(IndexError::validation(
            "offset",
            format!("must be >= 0, got {}", request.offset),
        ));
    }

    let predicate = SearchPredicate {
        fts: build_match_expression(&request.query),
        trigger: request.trigger,
        complexity: request.complexity,
        active_only: request.active_only,
        integrations: request.integrations.clone(),
        filenames: request
            .category
            .as_deref()
            .map(|c| categories.members(c)),
        sort: request.sort,
        limit: request.limit as u32,
        offset: request.offset as u64,
    };

    let page = store.search(&predicate).await?;

    Ok(QueryResponse {
        pages: page.total.div_ceil(request.limit as u64),
        total: page.total,
        documents: page.records,
        limit: request.limit,
        offset: request.offset,
    })
}

/// Compile free text into an FTS5 MATCH expression.
///
/// Characters other than word characters, quotes, hyphens and apostrophes
/// are dropped. Quoted substrings become exact phrases; remaining terms of
/// at least two characters become prefix terms. All terms are ANDed.
/// Returns `None` when nothing searchable remains.
pub fn build_match_expression(query: &str) -> Option<String> {
    let cleaned: String = query
        .chars()
        .filter(|c| {
            c.is_alphanumeric() || c.is_whitespace() || matches!(c, '_' | '"' | '-' | '\'')
        })
        .collect();

    let segments: Vec<&str> = cleaned.split('"').collect();
    // An unterminated quote leaves an odd segment out; treat it as plain text.
    let closed = if segments.len() % 2 == 0 {
        segments.len() - 1
    } else {
        segments.len()
    };

    let mut parts = Vec::new();
    for (i, segment) in segments.iter().enumerate() {
        if i % 2 == 1 && i < closed {
            let phrase = segment.split_whitespace().collect::<Vec<_>>().join(" ");
            if has_token(&phrase) {
                parts.push(format!("\"{}\"", phrase));
            }
        } else {
            for term in segment.split_whitespace() {
                if term.chars().count() >= 2 && has_token(term) {
                    parts.push(format!("\"{}\"*", term));
                }
            }
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" AND "))
    }
}

fn has_token(s: &str) -> bool {
    s.chars().any(char::is_alphanumeric)
}
