//! Read-only category map: category name to member filenames.
//!
//! The map is supplied from outside the index (a JSON file next to the
//! corpus) and is never written by the catalog.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::{IndexError, Result};

#[derive(Debug, Clone, Default)]
pub struct CategoryMap {
    categories: BTreeMap<String, BTreeSet<String>>,
}

/// A category name with the number of member filenames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub count: usize,
}

impl CategoryMap {
    pub fn from_json(json: &str) -> Result<Self> {
        let categories: BTreeMap<String, BTreeSet<String>> = serde_json::from_str(json)
            .map_err(|e| IndexError::Config(format!("invalid category map: {}", e)))?;
        Ok(Self { categories })
    }

    /// Load from `path`; `None` yields an empty map.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let json = std::fs::read_to_string(path).map_err(|e| {
            IndexError::Config(format!(
                "failed to read category map {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }

    /// Member filenames of `category`. Unknown categories resolve to an
    /// empty allow-list.
    pub fn members(&self, category: &str) -> Vec<String> {
        self.categories
            .get(category)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn summaries(&self) -> Vec<CategorySummary> {
        self.categories
            .iter()
            .map(|(name, members)| CategorySummary {
                name: name.clone(),
                count: members.len(),
            })
            .collect()
    }
}
