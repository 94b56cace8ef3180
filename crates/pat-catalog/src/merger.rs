// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! Folds every source's packages into one [`Catalog`]

use crate::catalog::{Catalog, PatchRecord};
use crate::directory::{ModelDirectory, ModelEntry};
use crate::version::VersionKey;
use tracing::debug;

/// What the API resolvers produced for one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPatches {
    pub entry: ModelEntry,
    pub direct: Vec<(VersionKey, PatchRecord)>,
    pub steps: Vec<(VersionKey, PatchRecord)>,
}

impl ModelPatches {
    pub fn empty(entry: ModelEntry) -> Self {
        Self {
            entry,
            direct: Vec::new(),
            steps: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub inserted: usize,
    /// Records dropped because their version was already catalogued
    pub duplicates: usize,
}

#[derive(Debug, Default)]
pub struct CatalogMerger {
    catalog: Catalog,
    summary: MergeSummary,
}

impl CatalogMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure the model shows up in the output even with no packages.
    pub fn register(&mut self, entry: &ModelEntry) {
        self.catalog
            .ensure_model(&entry.architecture, &entry.model_name);
    }

    pub fn absorb<'r, I>(&mut self, entry: &ModelEntry, records: I)
    where
        I: IntoIterator<Item = &'r (VersionKey, PatchRecord)>,
    {
        for (key, record) in records {
            if self.catalog.insert(
                &entry.architecture,
                &entry.model_name,
                key.clone(),
                record.clone(),
            ) {
                self.summary.inserted += 1;
            } else {
                let kept = self
                    .catalog
                    .get(&entry.architecture, &entry.model_name, key)
                    .map_or("", |kept| kept.hash.as_str());
                debug!(
                    "{}/{}: keeping earlier record for {key} (hash {kept}), dropping {} (hash {})",
                    entry.architecture, entry.model_name, record.url, record.hash
                );
                self.summary.duplicates += 1;
            }
        }
    }

    pub fn finish(self) -> (Catalog, MergeSummary) {
        (self.catalog, self.summary)
    }
}

/// Merge feed packages, then direct downloads, then upgrade steps, each pass
/// in directory order.
pub fn merge(directory: &ModelDirectory, resolved: &[ModelPatches]) -> (Catalog, MergeSummary) {
    let mut merger = CatalogMerger::new();

    for entry in &directory.models {
        merger.register(entry);
        merger.absorb(entry, directory.feed_records_for(&entry.model_name));
    }
    for patches in resolved {
        merger.absorb(&patches.entry, &patches.direct);
    }
    for patches in resolved {
        merger.absorb(&patches.entry, &patches.steps);
    }

    merger.finish()
}
