// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! Support API response types
//!
//! Only the fields the resolvers read are modelled; everything is optional or
//! defaulted so a partial response still decodes and the resolvers decide what
//! is missing.

use serde::Deserialize;
use std::fmt;

/// A JSON value the API sends as either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Text(String),
}

impl Scalar {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s.trim()),
        }
    }
}

fn scalar_to_string(value: Option<&Scalar>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

/// `findDownloadInfo` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadInfoResponse {
    #[serde(default)]
    pub info: Option<DownloadInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadInfo {
    #[serde(default)]
    pub system: Option<SystemDownloads>,
    #[serde(default, rename = "pubVers")]
    pub pub_vers: Vec<PublicVersion>,
    #[serde(default, rename = "productVers")]
    pub product_vers: Vec<ProductVersion>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemDownloads {
    #[serde(default)]
    pub detail: Vec<DownloadDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadDetail {
    #[serde(default)]
    pub items: Vec<BuildPackage>,
}

/// A build with its files. Used by both download info items and upgrade steps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildPackage {
    #[serde(default)]
    pub build_ver: Option<String>,
    #[serde(default)]
    pub build_num: Option<Scalar>,
    #[serde(default)]
    pub nano: Option<Scalar>,
    #[serde(default)]
    pub files: Vec<PackageFile>,
}

impl BuildPackage {
    pub fn build_num_str(&self) -> String {
        scalar_to_string(self.build_num.as_ref())
    }

    pub fn nano_str(&self) -> String {
        scalar_to_string(self.nano.as_ref())
    }

    pub fn first_file(&self) -> Option<&PackageFile> {
        self.files.first().filter(|f| !f.url.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageFile {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub checksum: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublicVersion {
    #[serde(default)]
    pub build: Option<Scalar>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductVersion {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub versions: Vec<PublicVersion>,
}

/// `findUpgradeSteps` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpgradeStepsResponse {
    #[serde(default)]
    pub upgrade_steps: Vec<UpgradeStep>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpgradeStep {
    #[serde(default)]
    pub full_patch: bool,
    #[serde(flatten)]
    pub package: BuildPackage,
}
