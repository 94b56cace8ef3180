// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! Error types for the catalog crate

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("config error: {0}")]
    Config(String),

    #[error("platform file error: {0}")]
    Platforms(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The update feed could not be fetched or understood. Always aborts the run.
    #[error("update feed unusable: {0}")]
    Feed(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("serialization error: {0}")]
    Serialize(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = CatalogError::Status {
            url: "https://example.com".to_string(),
            status: 502,
        };
        assert_eq!(
            err.to_string(),
            "unexpected status 502 from https://example.com"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CatalogError = io.into();
        assert!(matches!(err, CatalogError::Io(_)));
    }
}
