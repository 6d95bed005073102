//! Core data models used throughout the workflow index.
//!
//! [`RawWorkflow`] is the typed subset of a corpus document that the
//! analyzer reads; [`WorkflowRecord`] is the normalized row stored in
//! SQLite and returned by every query-side operation.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::IndexError;

/// How a workflow's execution begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TriggerType {
    Manual,
    Webhook,
    Scheduled,
    Triggered,
    Complex,
    Unknown,
}

impl TriggerType {
    pub const ALL: [TriggerType; 6] = [
        TriggerType::Manual,
        TriggerType::Webhook,
        TriggerType::Scheduled,
        TriggerType::Triggered,
        TriggerType::Complex,
        TriggerType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::Manual => "Manual",
            TriggerType::Webhook => "Webhook",
            TriggerType::Scheduled => "Scheduled",
            TriggerType::Triggered => "Triggered",
            TriggerType::Complex => "Complex",
            TriggerType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerType {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TriggerType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                IndexError::validation(
                    "trigger",
                    format!(
                        "unknown trigger type '{}'. Must be one of Manual, Webhook, Scheduled, Triggered, Complex, Unknown",
                        s
                    ),
                )
            })
    }
}

/// Coarse complexity bucket, a pure function of the node count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub const ALL: [Complexity; 3] = [Complexity::Low, Complexity::Medium, Complexity::High];

    /// `<= 5` is low, `6..=15` is medium, anything above is high.
    pub fn from_node_count(node_count: u32) -> Self {
        match node_count {
            0..=5 => Complexity::Low,
            6..=15 => Complexity::Medium,
            _ => Complexity::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Complexity {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Complexity::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                IndexError::validation(
                    "complexity",
                    format!("unknown complexity '{}'. Must be low, medium, or high", s),
                )
            })
    }
}

/// Normalized workflow record, keyed by `filename`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub filename: String,
    pub name: String,
    pub source_id: String,
    pub active: bool,
    pub description: String,
    pub trigger_type: TriggerType,
    pub complexity: Complexity,
    pub node_count: u32,
    pub integrations: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub digest: String,
    pub byte_size: u64,
    /// RFC 3339 timestamp of the analysis that produced this record.
    pub analyzed_at: String,
}

impl WorkflowRecord {
    /// The searchable projection mirrored into the full-text shadow.
    pub fn shadow(&self) -> ShadowEntry {
        ShadowEntry {
            filename: self.filename.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            integrations: join_set(&self.integrations),
            tags: join_set(&self.tags),
        }
    }
}

fn join_set(set: &BTreeSet<String>) -> String {
    set.iter().cloned().collect::<Vec<_>>().join(" ")
}

/// Row of the `workflows_fts` table.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowEntry {
    pub filename: String,
    pub name: String,
    pub description: String,
    pub integrations: String,
    pub tags: String,
}

/// Typed subset of a corpus document. Unknown fields are kept in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawWorkflow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: Vec<RawNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(
        rename = "createdAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<String>,
    #[serde(
        rename = "updatedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tags: Vec<RawTag>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An explicit `null` reads the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Tags appear either as bare strings or as `{ "name": ... }` objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTag {
    Name(String),
    Object {
        name: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl RawTag {
    pub fn name(&self) -> &str {
        match self {
            RawTag::Name(name) => name,
            RawTag::Object { name, .. } => name,
        }
    }
}
