// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! Direct-download resolver for the support API `findDownloadInfo` endpoint

use crate::api::{BuildPackage, DownloadInfo, DownloadInfoResponse, ProductVersion};
use crate::catalog::{PatchRecord, strip_query};
use crate::config::CatalogConfig;
use crate::error::Result;
use crate::transport::HttpTransport;
use crate::version::{VersionKey, has_major_prefix};
use tracing::{debug, warn};

/// Everything one model's download info yields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectResolution {
    /// Published full packages, one per version key, in discovery order
    pub records: Vec<(VersionKey, PatchRecord)>,
    /// Lowest public build number (`from_ver` for upgrade steps)
    pub baseline: Option<i64>,
    /// Build numbers of tracked product versions (`to_ver` candidates)
    pub targets: Vec<String>,
}

impl DirectResolution {
    fn push(&mut self, entry: Option<(VersionKey, PatchRecord)>) {
        if let Some((key, record)) = entry
            && !self.records.iter().any(|(k, _)| k == &key)
        {
            self.records.push((key, record));
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DirectDownloadResolver<'a> {
    transport: &'a HttpTransport,
    config: &'a CatalogConfig,
}

impl<'a> DirectDownloadResolver<'a> {
    pub fn new(transport: &'a HttpTransport, config: &'a CatalogConfig) -> Self {
        Self { transport, config }
    }

    /// Resolve one model. `scope` is a version prefix such as `"7"` or `"7.2"`;
    /// without a minor part every tracked minor line is queried as well.
    ///
    /// An error means the first download info request failed; a response that
    /// lacks the expected fields resolves to an empty result instead.
    pub async fn resolve(&self, model: &str, scope: Option<&str>) -> Result<DirectResolution> {
        let (major, minor) = split_scope(scope, self.config.tracked_major);
        let response = self.fetch(model, &major, minor.as_deref()).await?;

        let mut resolution = DirectResolution::default();
        let Some(info) = response.info else {
            warn!("Download info for {model} has no info section");
            return Ok(resolution);
        };

        resolution.push(self.package_record(model, &info));

        let tracked: Vec<&ProductVersion> = info
            .product_vers
            .iter()
            .filter(|pv| has_major_prefix(&pv.version, self.config.tracked_major))
            .collect();

        if minor.is_none() {
            for product in &tracked {
                let mut parts = product.version.split('.');
                let (Some(line_major), Some(line_minor)) = (parts.next(), parts.next()) else {
                    continue;
                };

                match self.fetch(model, line_major, Some(line_minor)).await {
                    Ok(DownloadInfoResponse { info: Some(line) }) => {
                        resolution.push(self.package_record(model, &line));
                    }
                    Ok(_) => debug!("No download info for {model} {}", product.version),
                    Err(e) => warn!("Download info for {model} {} failed: {e}", product.version),
                }
            }
        }

        resolution.baseline = baseline_build(&info);
        for build in tracked
            .iter()
            .flat_map(|pv| pv.versions.iter())
            .filter_map(|v| v.build.as_ref())
        {
            let build = build.to_string();
            if !build.is_empty() && !resolution.targets.contains(&build) {
                resolution.targets.push(build);
            }
        }

        debug!(
            "{model}: {} direct packages, baseline {:?}, {} targets",
            resolution.records.len(),
            resolution.baseline,
            resolution.targets.len()
        );
        Ok(resolution)
    }

    async fn fetch(
        &self,
        model: &str,
        major: &str,
        minor: Option<&str>,
    ) -> Result<DownloadInfoResponse> {
        let mut query = vec![("product", model.to_string()), ("major", major.to_string())];
        if let Some(minor) = minor {
            query.push(("minor", minor.to_string()));
        }
        self.transport
            .get_json(&self.config.download_info_url, &query)
            .await
    }

    /// `info.system.detail[0].items[0]`, if it is a tracked build with a file.
    fn package_record(&self, model: &str, info: &DownloadInfo) -> Option<(VersionKey, PatchRecord)> {
        let item = info
            .system
            .as_ref()
            .and_then(|s| s.detail.first())
            .and_then(|d| d.items.first());

        let Some(item) = item else {
            debug!("{model}: download info has no system package");
            return None;
        };

        let record = tracked_package(item, self.config.tracked_major);
        if record.is_none() {
            debug!(
                "{model}: ignoring package {:?} outside the tracked generation",
                item.build_ver
            );
        }
        record
    }
}

/// Key and record for a package, if it belongs to the tracked major and has a file.
pub(crate) fn tracked_package(
    package: &BuildPackage,
    tracked_major: u32,
) -> Option<(VersionKey, PatchRecord)> {
    let build_ver = package.build_ver.as_deref()?;
    if !has_major_prefix(build_ver, tracked_major) {
        return None;
    }
    let file = package.first_file()?;

    let key = VersionKey::from_build(build_ver, &package.build_num_str(), &package.nano_str());
    let record = PatchRecord::new(
        strip_query(file.url.trim()),
        file.checksum.as_deref().unwrap_or_default(),
    );
    Some((key, record))
}

fn baseline_build(info: &DownloadInfo) -> Option<i64> {
    info.pub_vers
        .iter()
        .filter_map(|v| v.build.as_ref().and_then(crate::api::Scalar::as_int))
        .min()
}

fn split_scope(scope: Option<&str>, tracked_major: u32) -> (String, Option<String>) {
    let Some(scope) = scope.map(str::trim).filter(|s| !s.is_empty()) else {
        return (tracked_major.to_string(), None);
    };
    let mut parts = scope.split('.');
    let major = parts
        .next()
        .map_or_else(|| tracked_major.to_string(), ToString::to_string);
    let minor = parts.next().filter(|m| !m.is_empty()).map(ToString::to_string);
    (major, minor)
}
