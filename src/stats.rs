//! Corpus-wide analytics.
//!
//! Aggregates every record into an [`AnalyticsSnapshot`]. Snapshots are
//! memoized in a [`TtlCell`]; inside the window the previous snapshot is
//! returned verbatim without reading the store, so callers see data that
//! is at most one window stale.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::cache::{Clock, TtlCell};
use crate::error::Result;
use crate::models::{Complexity, TriggerType, WorkflowRecord};
use crate::store::Store;

pub const TOP_INTEGRATIONS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSnapshot {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    pub triggers: BTreeMap<String, u64>,
    pub complexity: BTreeMap<String, u64>,
    pub total_nodes: u64,
    pub unique_integrations: u64,
    pub top_integrations: Vec<IntegrationCount>,
    pub avg_nodes: f64,
    pub active_percentage: f64,
    pub last_analyzed: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrationCount {
    pub name: String,
    pub count: u64,
}

pub struct AnalyticsEngine {
    cache: TtlCell<AnalyticsSnapshot>,
}

impl AnalyticsEngine {
    pub fn new(ttl: Duration, clock: Box<dyn Clock>) -> Self {
        Self {
            cache: TtlCell::new(ttl, clock),
        }
    }

    /// Cached snapshot if still fresh, otherwise a fresh scan of `store`.
    pub async fn snapshot(&self, store: &dyn Store) -> Result<AnalyticsSnapshot> {
        if let Some(cached) = self.cache.get() {
            tracing::debug!("analytics cache hit");
            return Ok(cached);
        }

        let records = store.all().await?;
        let snapshot = compute_snapshot(&records);
        self.cache.set(snapshot.clone());
        Ok(snapshot)
    }
}

pub fn compute_snapshot(records: &[WorkflowRecord]) -> AnalyticsSnapshot {
    let total = records.len() as u64;
    let active = records.iter().filter(|r| r.active).count() as u64;
    let total_nodes: u64 = records.iter().map(|r| u64::from(r.node_count)).sum();

    let mut triggers: BTreeMap<String, u64> = TriggerType::ALL
        .iter()
        .map(|t| (t.to_string(), 0))
        .collect();
    let mut complexity: BTreeMap<String, u64> = Complexity::ALL
        .iter()
        .map(|c| (c.to_string(), 0))
        .collect();
    let mut integration_counts: HashMap<&str, u64> = HashMap::new();

    for record in records {
        *triggers.entry(record.trigger_type.to_string()).or_default() += 1;
        *complexity.entry(record.complexity.to_string()).or_default() += 1;
        for integration in &record.integrations {
            *integration_counts.entry(integration.as_str()).or_default() += 1;
        }
    }

    let unique_integrations = integration_counts.len() as u64;
    let mut top_integrations: Vec<IntegrationCount> = integration_counts
        .into_iter()
        .map(|(name, count)| IntegrationCount {
            name: name.to_string(),
            count,
        })
        .collect();
    top_integrations.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    top_integrations.truncate(TOP_INTEGRATIONS);

    let (avg_nodes, active_percentage) = if total > 0 {
        (
            round1(total_nodes as f64 / total as f64),
            round1(active as f64 * 100.0 / total as f64),
        )
    } else {
        (0.0, 0.0)
    };

    AnalyticsSnapshot {
        total,
        active,
        inactive: total - active,
        triggers,
        complexity,
        total_nodes,
        unique_integrations,
        top_integrations,
        avg_nodes,
        active_percentage,
        last_analyzed: records.iter().map(|r| r.analyzed_at.clone()).max(),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
