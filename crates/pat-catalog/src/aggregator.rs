// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! One aggregation run: feed → per-model resolvers → merged catalog

use crate::catalog::{Catalog, PatchRecord};
use crate::config::CatalogConfig;
use crate::directory::{ModelDirectory, ModelEntry, fetch_directory};
use crate::download_info::DirectDownloadResolver;
use crate::error::Result;
use crate::merger::{MergeSummary, ModelPatches, merge};
use crate::platforms::ArchitectureSet;
use crate::transport::HttpTransport;
use crate::upgrade_steps::UpgradeStepResolver;
use crate::version::VersionKey;
use futures_util::stream::{self, StreamExt};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{info, warn};

/// Result of a completed run.
#[derive(Debug)]
pub struct CatalogRun {
    pub catalog: Catalog,
    pub summary: MergeSummary,
    pub model_count: usize,
}

#[derive(Debug)]
pub struct Aggregator {
    transport: HttpTransport,
    config: CatalogConfig,
}

impl Aggregator {
    pub fn new(config: CatalogConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config.transport)?;
        Ok(Self { transport, config })
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Fetch the feed and build the model directory. Errors here are fatal.
    pub async fn directory(&self, architectures: &ArchitectureSet) -> Result<ModelDirectory> {
        fetch_directory(&self.transport, &self.config, architectures).await
    }

    /// Query both API resolvers for one model. Never fails: a model whose
    /// download info cannot be read simply contributes nothing.
    pub async fn resolve_model(
        &self,
        entry: &ModelEntry,
        feed_records: &[(VersionKey, PatchRecord)],
    ) -> ModelPatches {
        let model = entry.model_name.as_str();
        let scope = self.config.tracked_major.to_string();

        let direct = match DirectDownloadResolver::new(&self.transport, &self.config)
            .resolve(model, Some(&scope))
            .await
        {
            Ok(direct) => direct,
            Err(e) => {
                warn!("Skipping {}/{model}: download info failed: {e}", entry.architecture);
                return ModelPatches::empty(entry.clone());
            }
        };

        let known: HashSet<VersionKey> = feed_records
            .iter()
            .chain(direct.records.iter())
            .map(|(key, _)| key.clone())
            .collect();

        let steps = UpgradeStepResolver::new(&self.transport, &self.config)
            .resolve(model, direct.baseline, &direct.targets, &known)
            .await;

        ModelPatches {
            entry: entry.clone(),
            direct: direct.records,
            steps,
        }
    }

    /// Run the whole aggregation.
    ///
    /// Models are resolved with up to `concurrency` in flight; results come
    /// back in directory order and are merged by this task alone.
    pub async fn run(&self, architectures: &ArchitectureSet) -> Result<CatalogRun> {
        let started = Instant::now();
        let directory = self.directory(architectures).await?;

        let resolved: Vec<ModelPatches> = stream::iter(&directory.models)
            .map(|entry| self.resolve_model(entry, directory.feed_records_for(&entry.model_name)))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let (catalog, summary) = merge(&directory, &resolved);

        for arch in architectures.codes() {
            if !catalog.contains_architecture(arch) {
                warn!("No models found for tracked architecture {arch}");
            }
        }

        info!(
            "Catalogued {} packages ({} without checksum) for {} models in {:.1}s ({} duplicates dropped)",
            summary.inserted,
            catalog.unverified_count(),
            directory.models.len(),
            started.elapsed().as_secs_f64(),
            summary.duplicates
        );

        Ok(CatalogRun {
            catalog,
            summary,
            model_count: directory.models.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportConfig;
    use crate::error::CatalogError;
    use mockito::{Matcher, Server, ServerGuard};

    fn test_config(server: &ServerGuard) -> CatalogConfig {
        CatalogConfig {
            feed_url: format!("{}/autoupdate/genRSS.php", server.url()),
            download_info_url: format!("{}/api/support/findDownloadInfo", server.url()),
            upgrade_steps_url: format!("{}/api/support/findUpgradeSteps", server.url()),
            transport: TransportConfig {
                max_retries: 0,
                backoff_factor_secs: 0.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_feed_failure_is_fatal() {
        let mut server = Server::new_async().await;
        let _feed = server
            .mock("GET", "/autoupdate/genRSS.php")
            .with_status(502)
            .create_async()
            .await;

        let aggregator = Aggregator::new(test_config(&server)).unwrap();
        let result = aggregator.run(&ArchitectureSet::any()).await;

        assert!(matches!(result, Err(CatalogError::Feed(_))));
    }

    #[tokio::test]
    async fn test_download_info_failure_is_model_scoped() {
        let mut server = Server::new_async().await;
        let _info = server
            .mock("GET", "/api/support/findDownloadInfo")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;
        let steps = server
            .mock("GET", "/api/support/findUpgradeSteps")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let aggregator = Aggregator::new(test_config(&server)).unwrap();
        let entry = ModelEntry {
            architecture: "bromolow".to_string(),
            model_name: "DS3615xs".to_string(),
        };
        let patches = aggregator.resolve_model(&entry, &[]).await;

        assert_eq!(patches, ModelPatches::empty(entry));
        steps.assert_async().await;
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = CatalogConfig {
            concurrency: 0,
            ..Default::default()
        };
        assert!(Aggregator::new(config).is_err());
    }
}
