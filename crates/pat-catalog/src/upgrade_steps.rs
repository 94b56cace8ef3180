// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! Upgrade-step resolver for the support API `findUpgradeSteps` endpoint
//!
//! Walks from a model's lowest public build to every published target build
//! and keeps the full patches the API lists on the way.

use crate::api::UpgradeStepsResponse;
use crate::catalog::PatchRecord;
use crate::config::CatalogConfig;
use crate::download_info::tracked_package;
use crate::error::Result;
use crate::transport::HttpTransport;
use crate::version::VersionKey;
use reqwest::StatusCode;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Outcome of probing a package URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    Available,
    Forbidden,
    /// The probe itself failed or returned something inconclusive
    Unknown,
}

#[derive(Debug, Clone, Copy)]
pub struct UpgradeStepResolver<'a> {
    transport: &'a HttpTransport,
    config: &'a CatalogConfig,
}

impl<'a> UpgradeStepResolver<'a> {
    pub fn new(transport: &'a HttpTransport, config: &'a CatalogConfig) -> Self {
        Self { transport, config }
    }

    /// Collect full patches between `baseline` and each target build.
    ///
    /// Keys in `known` are already catalogued for this model; they are neither
    /// probed nor returned. Failures only ever skip a target or a step.
    pub async fn resolve(
        &self,
        model: &str,
        baseline: Option<i64>,
        targets: &[String],
        known: &HashSet<VersionKey>,
    ) -> Vec<(VersionKey, PatchRecord)> {
        let Some(from_ver) = baseline else {
            debug!("{model}: no public versions, skipping upgrade steps");
            return Vec::new();
        };

        let mut seen = known.clone();
        let mut records = Vec::new();

        for to_ver in targets {
            let response = match self.fetch(model, from_ver, to_ver).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("{model}: upgrade steps {from_ver} -> {to_ver} unavailable: {e}");
                    continue;
                }
            };

            for step in &response.upgrade_steps {
                if !step.full_patch {
                    continue;
                }
                let Some((key, record)) = tracked_package(&step.package, self.config.tracked_major)
                else {
                    continue;
                };
                if seen.contains(&key) {
                    continue;
                }

                if self.probe(&record.url).await == ProbeResult::Forbidden {
                    debug!("{model}: {key} is listed but forbidden at {}", record.url);
                    continue;
                }

                seen.insert(key.clone());
                records.push((key, record));
            }
        }

        debug!("{model}: {} packages from upgrade steps", records.len());
        records
    }

    async fn fetch(&self, model: &str, from_ver: i64, to_ver: &str) -> Result<UpgradeStepsResponse> {
        let query = [
            ("product", model.to_string()),
            ("from_ver", from_ver.to_string()),
            ("to_ver", to_ver.to_string()),
        ];
        self.transport
            .get_json(&self.config.upgrade_steps_url, &query)
            .await
    }

    /// HEAD the package at its canonical host. Only an explicit 403 counts
    /// against it.
    pub async fn probe(&self, url: &str) -> ProbeResult {
        let target = self.config.canonical_package_url(url);
        match self.transport.head_status(&target).await {
            Ok(StatusCode::FORBIDDEN) => ProbeResult::Forbidden,
            Ok(status) if status.is_success() => ProbeResult::Available,
            Ok(status) => {
                debug!("Probe of {target} returned {status}");
                ProbeResult::Unknown
            }
            Err(e) => {
                debug!("Probe of {target} failed: {e}");
                ProbeResult::Unknown
            }
        }
    }
}
