// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! pat-catalog - DSM firmware package catalog builder
//!
//! Reads the vendor update feed to find the tracked models, asks the support
//! API for each model's published packages and upgrade-step full patches, and
//! merges everything into an architecture → model → version catalog.

pub mod aggregator;
pub mod api;
pub mod catalog;
pub mod config;
pub mod directory;
pub mod download_info;
pub mod error;
pub mod feed;
pub mod merger;
pub mod platforms;
pub mod serializer;
pub mod transport;
pub mod upgrade_steps;
pub mod version;

pub use aggregator::{Aggregator, CatalogRun};
pub use catalog::{Catalog, PatchRecord, ZERO_CHECKSUM};
pub use config::{CatalogConfig, TransportConfig, load_config};
pub use directory::{ModelDirectory, ModelEntry};
pub use error::{CatalogError, Result};
pub use platforms::ArchitectureSet;
pub use version::VersionKey;
