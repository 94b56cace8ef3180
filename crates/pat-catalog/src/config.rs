// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! Configuration module for the catalog builder

use crate::error::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_FEED_URL: &str = "http://update7.synology.com/autoupdate/genRSS.php?include_beta=1";
const DEFAULT_DOWNLOAD_INFO_URL: &str =
    "https://www.synology.com/api/support/findDownloadInfo?lang=en-us";
const DEFAULT_UPGRADE_STEPS_URL: &str = "https://www.synology.com/api/support/findUpgradeSteps";

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_download_info_url() -> String {
    DEFAULT_DOWNLOAD_INFO_URL.to_string()
}

fn default_upgrade_steps_url() -> String {
    DEFAULT_UPGRADE_STEPS_URL.to_string()
}

fn default_7() -> u32 {
    7
}

fn default_product_marker() -> String {
    "DSM".to_string()
}

fn default_cdn_aliases() -> Vec<HostAlias> {
    vec![HostAlias {
        from: "global.synologydownload.com".to_string(),
        to: "global.download.synology.com".to_string(),
    }]
}

/// Largest accepted `transport.max_retries`.
pub const MAX_RETRIES: u32 = 10;

fn default_1() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Update feed (RSS) listing current releases per model
    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    /// Support API "download info" endpoint
    #[serde(default = "default_download_info_url")]
    pub download_info_url: String,

    /// Support API "upgrade steps" endpoint
    #[serde(default = "default_upgrade_steps_url")]
    pub upgrade_steps_url: String,

    /// Only this major generation is tracked
    #[serde(default = "default_7")]
    pub tracked_major: u32,

    /// Substring a feed download link must contain to belong to the OS product line
    #[serde(default = "default_product_marker")]
    pub product_marker: String,

    /// Host rewrites applied before probing a package URL
    #[serde(default = "default_cdn_aliases")]
    pub cdn_aliases: Vec<HostAlias>,

    /// How many models are resolved at once
    #[serde(default = "default_1")]
    pub concurrency: usize,

    #[serde(default)]
    pub transport: TransportConfig,
}

/// A CDN hostname and the canonical host it stands for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostAlias {
    pub from: String,
    pub to: String,
}

fn default_3() -> u32 {
    3
}

fn default_backoff() -> f64 {
    1.0
}

fn default_retryable_statuses() -> Vec<u16> {
    vec![500, 502, 503, 504]
}

fn default_10() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("pat-catalog/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Extra attempts after the first one, for transport errors and retryable statuses
    #[serde(default = "default_3")]
    pub max_retries: u32,

    /// Sleep before retry `n` is `backoff_factor_secs * 2^(n-1)`
    #[serde(default = "default_backoff")]
    pub backoff_factor_secs: f64,

    #[serde(default = "default_retryable_statuses")]
    pub retryable_statuses: Vec<u16>,

    /// Certificate verification. Off unless enabled here or with `--verify-tls`.
    #[serde(default)]
    pub verify_tls: bool,

    #[serde(default = "default_10")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor_secs: 1.0,
            retryable_statuses: default_retryable_statuses(),
            verify_tls: false,
            timeout_secs: 10,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            download_info_url: default_download_info_url(),
            upgrade_steps_url: default_upgrade_steps_url(),
            tracked_major: 7,
            product_marker: default_product_marker(),
            cdn_aliases: default_cdn_aliases(),
            concurrency: 1,
            transport: TransportConfig::default(),
        }
    }
}

impl CatalogConfig {
    /// Check values serde cannot reject on its own.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(CatalogError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.transport.max_retries > MAX_RETRIES {
            return Err(CatalogError::Config(format!(
                "max_retries must be at most {MAX_RETRIES}, got {}",
                self.transport.max_retries
            )));
        }
        if !self.transport.backoff_factor_secs.is_finite() || self.transport.backoff_factor_secs < 0.0
        {
            return Err(CatalogError::Config(format!(
                "invalid backoff factor: {}",
                self.transport.backoff_factor_secs
            )));
        }
        if self.transport.timeout_secs == 0 {
            return Err(CatalogError::Config(
                "timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Rewrite a package URL's host through the configured CDN aliases.
    /// Only the authority is matched; path and query are left alone.
    pub fn canonical_package_url(&self, url: &str) -> String {
        let Some((scheme, rest)) = url.split_once("://") else {
            return url.to_string();
        };
        let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let (authority, tail) = rest.split_at(end);
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        };

        let Some(alias) = self
            .cdn_aliases
            .iter()
            .find(|alias| alias.from.eq_ignore_ascii_case(host))
        else {
            return url.to_string();
        };

        match port {
            // An alias target with its own port replaces the original one
            Some(port) if !alias.to.contains(':') => {
                format!("{scheme}://{}:{port}{tail}", alias.to)
            }
            _ => format!("{scheme}://{}{tail}", alias.to),
        }
    }
}

/// Load the TOML config at `path`, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<CatalogConfig> {
    let config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                CatalogError::Config(format!("Failed to read {}: {e}", path.display()))
            })?;
            toml::from_str(&content)?
        }
        None => CatalogConfig::default(),
    };

    config.validate()?;
    Ok(config)
}
