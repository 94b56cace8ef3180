// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! The catalog: architecture → model → version → package

use crate::version::VersionKey;
use indexmap::IndexMap;
use serde::Serialize;

/// Checksum recorded when a source publishes none. Marks the package as unverified.
pub const ZERO_CHECKSUM: &str = "00000000000000000000000000000000";

/// One downloadable package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchRecord {
    pub url: String,
    pub hash: String,
}

impl PatchRecord {
    pub fn new(url: impl Into<String>, checksum: &str) -> Self {
        let checksum = checksum.trim();
        Self {
            url: url.into(),
            hash: if checksum.is_empty() {
                ZERO_CHECKSUM.to_string()
            } else {
                checksum.to_string()
            },
        }
    }

    pub fn has_checksum(&self) -> bool {
        self.hash != ZERO_CHECKSUM
    }
}

pub type VersionMap = IndexMap<VersionKey, PatchRecord>;
pub type ModelMap = IndexMap<String, VersionMap>;

/// Insertion-ordered three level mapping. A version key, once written for a
/// model, keeps its first record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    architectures: IndexMap<String, ModelMap>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model without any packages yet.
    pub fn ensure_model(&mut self, architecture: &str, model: &str) {
        self.architectures
            .entry(architecture.to_string())
            .or_default()
            .entry(model.to_string())
            .or_default();
    }

    /// Insert unless the triple already has a record. Returns whether the
    /// record was stored.
    pub fn insert(
        &mut self,
        architecture: &str,
        model: &str,
        version: VersionKey,
        record: PatchRecord,
    ) -> bool {
        let versions = self
            .architectures
            .entry(architecture.to_string())
            .or_default()
            .entry(model.to_string())
            .or_default();

        if versions.contains_key(&version) {
            return false;
        }
        versions.insert(version, record);
        true
    }

    pub fn get(&self, architecture: &str, model: &str, version: &VersionKey) -> Option<&PatchRecord> {
        self.architectures.get(architecture)?.get(model)?.get(version)
    }

    pub fn versions(&self, architecture: &str, model: &str) -> Option<&VersionMap> {
        self.architectures.get(architecture)?.get(model)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ModelMap)> {
        self.architectures.iter()
    }

    pub fn contains_architecture(&self, architecture: &str) -> bool {
        self.architectures.contains_key(architecture)
    }

    /// Number of package records across all models.
    pub fn record_count(&self) -> usize {
        self.architectures
            .values()
            .flat_map(IndexMap::values)
            .map(IndexMap::len)
            .sum()
    }

    /// Number of records whose source published no checksum.
    pub fn unverified_count(&self) -> usize {
        self.architectures
            .values()
            .flat_map(IndexMap::values)
            .flat_map(IndexMap::values)
            .filter(|record| !record.has_checksum())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.architectures.is_empty()
    }
}

/// Drop a query string from a package URL.
pub fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, hash: &str) -> PatchRecord {
        PatchRecord::new(url, hash)
    }

    #[test]
    fn test_missing_checksum_gets_sentinel() {
        let r = record("https://host/a.pat", "  ");
        assert_eq!(r.hash, ZERO_CHECKSUM);
        assert_eq!(r.hash.len(), 32);
        assert!(!r.has_checksum());
        assert!(record("https://host/a.pat", "abc").has_checksum());
    }

    #[test]
    fn test_first_writer_wins() {
        let mut catalog = Catalog::new();
        let key = VersionKey::parse("7.2.1-69057-1");

        assert!(catalog.insert("bromolow", "DS3615xs", key.clone(), record("https://a/1.pat", "aaaa")));
        assert!(!catalog.insert("bromolow", "DS3615xs", key.clone(), record("https://b/1.pat", "bbbb")));

        let stored = catalog.get("bromolow", "DS3615xs", &key).unwrap();
        assert_eq!(stored.url, "https://a/1.pat");
        assert_eq!(stored.hash, "aaaa");
        assert_eq!(catalog.record_count(), 1);
    }

    #[test]
    fn test_same_version_other_model_is_separate() {
        let mut catalog = Catalog::new();
        let key = VersionKey::parse("7.2.1-69057-1");

        assert!(catalog.insert("bromolow", "DS3615xs", key.clone(), record("u1", "")));
        assert!(catalog.insert("bromolow", "RS3614xs", key.clone(), record("u2", "")));
        assert!(catalog.insert("broadwell", "DS3615xs", key, record("u3", "")));
        assert_eq!(catalog.record_count(), 3);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut catalog = Catalog::new();
        catalog.ensure_model("v1000", "DS1621+");
        catalog.ensure_model("apollolake", "DS918+");
        catalog.insert("v1000", "DS1621+", VersionKey::parse("7.2.2-72806-0"), record("b", ""));
        catalog.insert("v1000", "DS1621+", VersionKey::parse("7.1.1-42962-6"), record("a", ""));

        let archs: Vec<_> = catalog.iter().map(|(arch, _)| arch.as_str()).collect();
        assert_eq!(archs, vec!["v1000", "apollolake"]);

        let versions: Vec<_> = catalog
            .versions("v1000", "DS1621+")
            .unwrap()
            .keys()
            .map(VersionKey::render)
            .collect();
        assert_eq!(versions, vec!["7.2.2-72806-0", "7.1.1-42962-6"]);
    }

    #[test]
    fn test_ensure_model_keeps_existing_records() {
        let mut catalog = Catalog::new();
        catalog.insert("bromolow", "DS3615xs", VersionKey::parse("7.2.1-69057-1"), record("u", ""));
        catalog.ensure_model("bromolow", "DS3615xs");
        assert_eq!(catalog.record_count(), 1);
        assert_eq!(catalog.versions("bromolow", "DS3615xs").unwrap().len(), 1);
    }

    #[test]
    fn test_unverified_count() {
        let mut catalog = Catalog::new();
        catalog.insert("bromolow", "DS3615xs", VersionKey::parse("7.2.1-69057-1"), record("a", "abcd"));
        catalog.insert("bromolow", "DS3615xs", VersionKey::parse("7.1.1-42962-6"), record("b", ""));
        catalog.insert("apollolake", "DS918+", VersionKey::parse("7.2.2-72806-0"), record("c", ""));
        catalog.ensure_model("broadwell", "DS3617xs");

        assert_eq!(catalog.record_count(), 3);
        assert_eq!(catalog.unverified_count(), 2);
        assert!(catalog.contains_architecture("broadwell"));
        assert!(!catalog.contains_architecture("avoton"));
    }

    #[test]
    fn test_strip_query() {
        assert_eq!(strip_query("https://host/a.pat?model=DS3615xs"), "https://host/a.pat");
        assert_eq!(strip_query("https://host/a.pat"), "https://host/a.pat");
    }
}
