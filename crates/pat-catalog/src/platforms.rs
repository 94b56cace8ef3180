// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! Recognized architecture codes

use crate::error::{CatalogError, Result};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;
use std::path::Path;

/// The architectures a run tracks. `None` accepts every architecture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchitectureSet {
    allowed: Option<BTreeSet<String>>,
}

impl ArchitectureSet {
    /// Accept every architecture.
    pub fn any() -> Self {
        Self { allowed: None }
    }

    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: Some(
                codes
                    .into_iter()
                    .map(|c| c.as_ref().trim().to_lowercase())
                    .filter(|c| !c.is_empty())
                    .collect(),
            ),
        }
    }

    /// Parse a comma or whitespace separated list such as `"bromolow, apollolake"`.
    pub fn from_list(list: &str) -> Self {
        Self::from_codes(list.replace(',', " ").split_whitespace())
    }

    /// Parse a platform document. The architecture map is either the document
    /// itself or the value under a top-level `platforms` key; only keys are used.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let doc: Value = serde_yaml::from_str(content)?;
        let root = doc.as_mapping().ok_or_else(|| {
            CatalogError::Platforms("platform document is not a mapping".to_string())
        })?;

        let platforms = match root.get("platforms") {
            Some(Value::Mapping(nested)) => nested,
            _ => root,
        };

        let codes = mapping_keys(platforms)?;
        if codes.is_empty() {
            return Err(CatalogError::Platforms(
                "platform document lists no architectures".to_string(),
            ));
        }
        Ok(Self::from_codes(codes))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::Platforms(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    /// Keep only the codes also present in `other`.
    pub fn intersect(&self, other: &ArchitectureSet) -> Self {
        match (&self.allowed, &other.allowed) {
            (None, _) => other.clone(),
            (_, None) => self.clone(),
            (Some(a), Some(b)) => Self {
                allowed: Some(a.intersection(b).cloned().collect()),
            },
        }
    }

    pub fn contains(&self, arch: &str) -> bool {
        match &self.allowed {
            None => true,
            Some(set) => set.contains(&arch.to_lowercase()),
        }
    }

    /// The tracked codes in sorted order; empty when every architecture is accepted.
    pub fn codes(&self) -> Vec<&str> {
        self.allowed
            .iter()
            .flatten()
            .map(String::as_str)
            .collect()
    }

    pub fn tracked_count(&self) -> Option<usize> {
        self.allowed.as_ref().map(BTreeSet::len)
    }
}

fn mapping_keys(mapping: &Mapping) -> Result<Vec<String>> {
    mapping
        .keys()
        .map(|key| match key {
            Value::String(s) => Ok(s.clone()),
            other => Err(CatalogError::Platforms(format!(
                "architecture key is not a string: {other:?}"
            ))),
        })
        .collect()
}
