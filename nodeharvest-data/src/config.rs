//! The harvest configuration document.

use std::collections::BTreeMap;

use camino::Utf8Path;
use nodeharvest_core::{BoundingBox, HarvestSourceConfig, Role};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::enrich::GeocodingSettings;
use crate::http::HttpClientConfig;

/// Errors raised while loading or validating the configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The file does not exist.
    #[error("configuration file {path} does not exist")]
    Missing {
        /// Configuration path.
        path: String,
    },
    /// The file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Read {
        /// Configuration path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a valid configuration document.
    #[error("failed to parse configuration {path}: {source}")]
    Parse {
        /// Configuration path.
        path: String,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// No sources are configured.
    #[error("no sources configured")]
    NoSources,
    /// The page size is zero.
    #[error("page_size must be at least 1")]
    ZeroPageSize,
    /// Two sources share a name.
    #[error("source name {0} is used more than once")]
    DuplicateSource(String),
    /// A source endpoint is not an absolute URL.
    #[error("source {source_name} has an invalid endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        /// Offending source.
        source_name: String,
        /// Endpoint as configured.
        endpoint: String,
        /// URL parsing failure.
        #[source]
        source: url::ParseError,
    },
}

/// Everything a harvest or geocoding run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Sources harvested in order.
    pub sources: Vec<HarvestSourceConfig>,
    /// Records requested per page.
    pub page_size: usize,
    /// Pause between pages in milliseconds.
    pub page_delay_ms: u64,
    /// Upper bound on page requests per endpoint.
    pub max_pages: Option<usize>,
    /// HTTP client settings.
    pub http: HttpClientConfig,
    /// Plausible area for coordinates.
    pub bounds: BoundingBox,
    /// Per-role replacements for the default field candidates.
    pub field_candidates: BTreeMap<Role, Vec<String>>,
    /// Enrichment settings.
    pub geocoding: GeocodingSettings,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            page_size: 1000,
            page_delay_ms: 300,
            max_pages: None,
            http: HttpClientConfig::default(),
            bounds: BoundingBox::default(),
            field_candidates: BTreeMap::new(),
            geocoding: GeocodingSettings::default(),
        }
    }
}

impl HarvestConfig {
    /// Read the configuration at `path` without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is absent, unreadable or not
    /// valid JSON.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = nodeharvest_fs::read_optional_to_string(path)
            .map_err(|source| ConfigError::Read {
                path: path.to_string(),
                source,
            })?
            .ok_or_else(|| ConfigError::Missing {
                path: path.to_string(),
            })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Check the settings a harvest depends on.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate_for_harvest(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        let mut seen = std::collections::BTreeSet::new();
        for source in &self.sources {
            if !seen.insert(source.name.as_str()) {
                return Err(ConfigError::DuplicateSource(source.name.clone()));
            }
            for endpoint in source.endpoints() {
                Url::parse(endpoint).map_err(|err| ConfigError::InvalidEndpoint {
                    source_name: source.name.clone(),
                    endpoint: endpoint.to_owned(),
                    source: err,
                })?;
            }
        }
        Ok(())
    }
}
