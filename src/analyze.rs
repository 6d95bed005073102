//! Workflow document analysis.
//!
//! Turns the raw bytes of one corpus document into a [`WorkflowRecord`].
//! Analysis is a pure function of `(filename, bytes, analyzed_at)`: the
//! same input always yields a byte-identical record.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

use crate::error::{IndexError, Result};
use crate::models::{Complexity, RawWorkflow, TriggerType, WorkflowRecord};

/// Trigger classification rules in priority order.
///
/// Each rule is `(kind, any-of substrings, none-of substrings)` matched
/// against the lowercased node type. The first rule matched by any node
/// wins; a workflow matching no rule is [`TriggerType::Manual`].
const TRIGGER_RULES: &[(TriggerType, &[&str], &[&str])] = &[
    (TriggerType::Webhook, &["webhook"], &[]),
    (TriggerType::Scheduled, &["cron", "schedule"], &[]),
    (TriggerType::Triggered, &["trigger"], &["manual"]),
];

/// Node kinds that describe control flow rather than an external service.
/// Compared against the lowercased type with its namespace stripped.
const STRUCTURAL_NODES: &[&str] = &[
    "start",
    "noop",
    "code",
    "function",
    "functionitem",
    "set",
    "if",
    "filter",
    "merge",
    "switch",
    "stickynote",
    "wait",
    "splitinbatches",
    "webhook",
    "respondtowebhook",
    "manualtrigger",
    "cron",
    "scheduletrigger",
    "schedule",
    "manual",
    "interval",
];

/// Declared names that say nothing about the workflow.
const GENERIC_NAMES: &[&str] = &[
    "my workflow",
    "untitled",
    "untitled workflow",
    "new workflow",
    "workflow",
];

/// Tokens rendered verbatim when deriving a name from the filename.
const ACRONYMS: &[(&str, &str)] = &[
    ("http", "HTTP"),
    ("https", "HTTPS"),
    ("api", "API"),
    ("url", "URL"),
    ("json", "JSON"),
    ("xml", "XML"),
    ("csv", "CSV"),
    ("sql", "SQL"),
    ("ai", "AI"),
    ("crm", "CRM"),
    ("sms", "SMS"),
    ("rss", "RSS"),
    ("ftp", "FTP"),
    ("ssh", "SSH"),
    ("pdf", "PDF"),
    ("aws", "AWS"),
    ("gpt", "GPT"),
    ("ui", "UI"),
    ("id", "ID"),
];

const DESCRIPTION_INTEGRATIONS: usize = 3;

/// Analyze one corpus document.
///
/// Returns [`IndexError::Parse`] when the bytes are not UTF-8 JSON
/// matching the minimal workflow schema.
pub fn analyze(filename: &str, bytes: &[u8], analyzed_at: DateTime<Utc>) -> Result<WorkflowRecord> {
    let text = std::str::from_utf8(bytes).map_err(|e| IndexError::parse(filename, e))?;
    let raw: RawWorkflow =
        serde_json::from_str(text).map_err(|e| IndexError::parse(filename, e))?;

    let node_count = u32::try_from(raw.nodes.len()).unwrap_or(u32::MAX);
    let complexity = Complexity::from_node_count(node_count);
    let node_types: Vec<&str> = raw.nodes.iter().map(|n| n.node_type.as_str()).collect();
    let trigger_type = classify_trigger(&node_types);
    let integrations = extract_integrations(&node_types);
    let tags: BTreeSet<String> = raw
        .tags
        .iter()
        .map(|t| t.name().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let name = match raw.name.as_deref().map(str::trim) {
        Some(declared) if !is_generic_name(declared) => declared.to_string(),
        _ => name_from_filename(filename),
    };

    let source_id = match &raw.id {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => filename.to_string(),
    };

    Ok(WorkflowRecord {
        filename: filename.to_string(),
        name,
        source_id,
        active: raw.active.unwrap_or(false),
        description: describe(trigger_type, &integrations, node_count, complexity),
        trigger_type,
        complexity,
        node_count,
        integrations,
        tags,
        created_at: raw.created_at,
        updated_at: raw.updated_at,
        digest: content_digest(bytes),
        byte_size: bytes.len() as u64,
        analyzed_at: analyzed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Classify how a workflow starts from its node type strings.
pub fn classify_trigger(node_types: &[&str]) -> TriggerType {
    let lowered: Vec<String> = node_types.iter().map(|t| t.to_lowercase()).collect();
    TRIGGER_RULES
        .iter()
        .find(|(_, any_of, none_of)| {
            lowered.iter().any(|t| {
                any_of.iter().any(|p| t.contains(p)) && !none_of.iter().any(|p| t.contains(p))
            })
        })
        .map(|(kind, _, _)| *kind)
        .unwrap_or(TriggerType::Manual)
}

/// Map node type strings to the set of external services they imply.
pub fn extract_integrations(node_types: &[&str]) -> BTreeSet<String> {
    node_types
        .iter()
        .filter_map(|t| integration_name(t))
        .collect()
}

fn integration_name(node_type: &str) -> Option<String> {
    let base = node_type.rsplit('.').next().unwrap_or(node_type).trim();
    let lowered = base.to_lowercase();
    if base.is_empty() || STRUCTURAL_NODES.contains(&lowered.as_str()) {
        return None;
    }

    let base = match base.strip_suffix("Trigger") {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => base,
    };
    if STRUCTURAL_NODES.contains(&base.to_lowercase().as_str()) {
        return None;
    }

    let name = split_camel_case(base)
        .iter()
        .map(|w| title_case(w))
        .collect::<Vec<_>>()
        .join(" ");
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn split_camel_case(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in s.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn is_generic_name(name: &str) -> bool {
    if name.is_empty() {
        return true;
    }
    let lowered = name.to_lowercase();
    if GENERIC_NAMES.contains(&lowered.as_str()) {
        return true;
    }
    // "My workflow 2", "Untitled 3"
    GENERIC_NAMES.iter().any(|g| {
        lowered
            .strip_prefix(g)
            .map(|rest| {
                let rest = rest.trim();
                !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
            })
            .unwrap_or(false)
    })
}

/// Human-readable name derived from a corpus filename.
///
/// `0042_slack_http_api_sync.json` becomes `Slack HTTP API Sync`.
pub fn name_from_filename(filename: &str) -> String {
    let base = filename.rsplit('/').next().unwrap_or(filename);
    let stem = match base.rfind('.') {
        Some(idx) if idx > 0 => &base[..idx],
        _ => base,
    };
    // "0042_" style prefixes only; "2fa_setup" keeps its digits.
    let unnumbered = stem.trim_start_matches(|c: char| c.is_ascii_digit());
    let stem = if unnumbered.len() < stem.len() && unnumbered.starts_with(['_', '-', ' ']) {
        unnumbered.trim_start_matches(['_', '-', ' '])
    } else {
        stem
    };

    let tokens: Vec<String> = stem
        .split(['_', '-', ' ', '.'])
        .filter(|t| !t.is_empty())
        .map(|t| {
            let lowered = t.to_lowercase();
            ACRONYMS
                .iter()
                .find(|(k, _)| *k == lowered)
                .map(|(_, v)| v.to_string())
                .unwrap_or_else(|| title_case(t))
        })
        .collect();

    if tokens.is_empty() {
        base.to_string()
    } else {
        tokens.join(" ")
    }
}

/// Template: `<Trigger> workflow integrating <up to 3>[ +N more] with <n> nodes (<c> complexity)`.
pub fn describe(
    trigger: TriggerType,
    integrations: &BTreeSet<String>,
    node_count: u32,
    complexity: Complexity,
) -> String {
    let mut desc = format!("{} workflow", trigger);
    if !integrations.is_empty() {
        let shown: Vec<&str> = integrations
            .iter()
            .take(DESCRIPTION_INTEGRATIONS)
            .map(String::as_str)
            .collect();
        desc.push_str(" integrating ");
        desc.push_str(&shown.join(", "));
        if integrations.len() > DESCRIPTION_INTEGRATIONS {
            desc.push_str(&format!(
                " +{} more",
                integrations.len() - DESCRIPTION_INTEGRATIONS
            ));
        }
    }
    desc.push_str(&format!(
        " with {} nodes ({} complexity)",
        node_count, complexity
    ));
    desc
}

/// 128-bit content digest used only for change detection.
pub fn content_digest(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    hex::encode(&hash[..16])
}
