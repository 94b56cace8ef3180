// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! Model and architecture directory built from the update feed

use crate::catalog::{PatchRecord, strip_query};
use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::feed::{FeedItem, FeedModel, parse_feed};
use crate::platforms::ArchitectureSet;
use crate::transport::HttpTransport;
use crate::version::VersionKey;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ModelEntry {
    #[serde(rename = "arch")]
    pub architecture: String,
    #[serde(rename = "name")]
    pub model_name: String,
}

/// Models to track, plus the packages the feed publishes for them directly.
#[derive(Debug, Clone, Default)]
pub struct ModelDirectory {
    /// Sorted by architecture, then model name
    pub models: Vec<ModelEntry>,
    /// Feed packages per model name, in feed order
    pub feed_records: IndexMap<String, Vec<(VersionKey, PatchRecord)>>,
}

impl ModelDirectory {
    /// Build the directory from parsed feed items.
    pub fn from_items(
        items: &[FeedItem],
        architectures: &ArchitectureSet,
        config: &CatalogConfig,
    ) -> Self {
        let mut models: Vec<ModelEntry> = Vec::new();
        let mut feed_records: IndexMap<String, Vec<(VersionKey, PatchRecord)>> = IndexMap::new();

        for item in items {
            let major = item.major.trim().parse::<u32>().unwrap_or(0);
            if major < config.tracked_major {
                debug!(
                    "Skipping feed item {}-{}: major {major} is not tracked",
                    item.major, item.build_number
                );
                continue;
            }

            for feed_model in &item.models {
                if !feed_model.link.contains(&config.product_marker) {
                    continue;
                }

                let Some(entry) = model_entry(feed_model) else {
                    warn!(
                        "Cannot extract model from feed entry {} / {}",
                        feed_model.unique, feed_model.link
                    );
                    continue;
                };

                if !architectures.contains(&entry.architecture) {
                    continue;
                }

                match models.iter().find(|m| m.model_name == entry.model_name) {
                    Some(existing) if existing.architecture != entry.architecture => {
                        debug!(
                            "Model {} already listed under {}, ignoring {}",
                            entry.model_name, existing.architecture, entry.architecture
                        );
                        continue;
                    }
                    Some(_) => {}
                    None => models.push(entry.clone()),
                }

                let patch = patch_from_link(&feed_model.link, &item.major, &item.minor);
                let key = VersionKey::from_parts(
                    &item.major,
                    &item.minor,
                    &patch,
                    &item.build_number,
                    &item.build_phase,
                );
                let record = PatchRecord::new(strip_query(&feed_model.link), &feed_model.checksum);

                feed_records
                    .entry(entry.model_name)
                    .or_default()
                    .push((key, record));
            }
        }

        models.sort_by(|a, b| {
            (a.architecture.as_str(), a.model_name.as_str())
                .cmp(&(b.architecture.as_str(), b.model_name.as_str()))
        });

        Self {
            models,
            feed_records,
        }
    }

    pub fn feed_records_for(&self, model_name: &str) -> &[(VersionKey, PatchRecord)] {
        self.feed_records
            .get(model_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Fetch and parse the feed. Any failure here aborts the run.
pub async fn fetch_directory(
    transport: &HttpTransport,
    config: &CatalogConfig,
    architectures: &ArchitectureSet,
) -> Result<ModelDirectory> {
    info!("Fetching update feed from {}", config.feed_url);

    let body = transport
        .get_text(&config.feed_url, &[])
        .await
        .map_err(|e| CatalogError::Feed(format!("Failed to fetch {}: {e}", config.feed_url)))?;

    let items = parse_feed(&body)?;
    let directory = ModelDirectory::from_items(&items, architectures, config);

    info!(
        "Feed lists {} items, {} tracked models",
        items.len(),
        directory.models.len()
    );
    Ok(directory)
}

/// `synology_bromolow_3615xs` + `.../DSM_DS3615xs_69057.pat` → (bromolow, DS3615xs)
fn model_entry(feed_model: &FeedModel) -> Option<ModelEntry> {
    let architecture = feed_model.unique.split('_').nth(1)?.trim();
    let file_name = strip_query(&feed_model.link).rsplit('/').next()?;
    let raw_name = file_name.split('_').nth(1)?;

    if architecture.is_empty() || raw_name.is_empty() {
        return None;
    }

    let model_name = urlencoding::decode(raw_name)
        .map_or_else(|_| raw_name.replace("%2B", "+"), |s| s.into_owned());

    Some(ModelEntry {
        architecture: architecture.to_lowercase(),
        model_name,
    })
}

/// Find the `major.minor.patch` path segment of a download link and return
/// its patch part, or `"0"`.
fn patch_from_link(link: &str, major: &str, minor: &str) -> String {
    let prefix = format!("{}.{}.", major.trim(), minor.trim());
    strip_query(link)
        .split('/')
        .find_map(|segment| segment.strip_prefix(&prefix))
        .and_then(|rest| rest.split(['.', '-']).next())
        .filter(|patch| !patch.is_empty())
        .unwrap_or("0")
        .to_string()
}
