//! Settings shared by the filter, its authority clients and its cache.
use crate::error::{CrateError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const TNRS_API_URL: &str = "https://tnrsapi.xyz/tnrs_api.php";
pub const GBIF_MATCH_URL: &str = "https://api.gbif.org/v1/species/match";
pub const GBIF_SEARCH_URL: &str = "https://api.gbif.org/v1/species/search";
pub const ITIS_SERVICE_URL: &str = "https://www.itis.gov/ITISWebService/services/ITISService";
pub const USER_AGENT: &str = "taxofilter/0.1 (taxonomic name screening) reqwest/0.12";
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Where one endpoint lives and how long a request to it may take.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            url: url.into(),
            timeout_secs,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(CrateError::InvalidConfig(format!("{} url is empty", name)));
        }
        if self.timeout_secs == 0 {
            return Err(CrateError::InvalidConfig(format!(
                "{} timeout must be at least one second",
                name
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ItisConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl ItisConfig {
    pub fn endpoint(&self) -> EndpointConfig {
        EndpointConfig::new(self.url.clone(), self.timeout_secs)
    }
}

impl Default for ItisConfig {
    fn default() -> Self {
        Self {
            url: ITIS_SERVICE_URL.to_string(),
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GbifConfig {
    pub match_url: String,
    pub search_url: String,
    pub timeout_secs: u64,
    pub candidate_limit: usize,
}

impl GbifConfig {
    pub fn match_endpoint(&self) -> EndpointConfig {
        EndpointConfig::new(self.match_url.clone(), self.timeout_secs)
    }

    pub fn search_endpoint(&self) -> EndpointConfig {
        EndpointConfig::new(self.search_url.clone(), self.timeout_secs)
    }
}

impl Default for GbifConfig {
    fn default() -> Self {
        Self {
            match_url: GBIF_MATCH_URL.to_string(),
            search_url: GBIF_SEARCH_URL.to_string(),
            timeout_secs: 5,
            candidate_limit: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TnrsConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub sources: Vec<String>,
    pub accuracy: f64,
}

impl TnrsConfig {
    pub fn endpoint(&self) -> EndpointConfig {
        EndpointConfig::new(self.url.clone(), self.timeout_secs)
    }
}

impl Default for TnrsConfig {
    fn default() -> Self {
        Self {
            url: TNRS_API_URL.to_string(),
            timeout_secs: 10,
            sources: vec!["wcvp".to_string(), "wfo".to_string()],
            accuracy: 0.05,
        }
    }
}

/// Everything a [`crate::filter::TaxonFilter`] needs to be built.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// When false, structural validity alone decides and no request is sent.
    pub external_validation: bool,
    /// Try partial/fuzzy resolution when every exact authority misses.
    pub partial_matching: bool,
    /// Entries kept per operation kind; `0` disables caching.
    pub cache_capacity: usize,
    pub user_agent: String,
    pub tnrs: TnrsConfig,
    pub gbif: GbifConfig,
    pub itis: ItisConfig,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            external_validation: true,
            partial_matching: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            user_agent: USER_AGENT.to_string(),
            tnrs: TnrsConfig::default(),
            gbif: GbifConfig::default(),
            itis: ItisConfig::default(),
        }
    }
}

impl FilterConfig {
    /// Structural checks only, no network.
    pub fn offline() -> Self {
        Self {
            external_validation: false,
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: FilterConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.tnrs.accuracy) {
            return Err(CrateError::InvalidConfig(format!(
                "tnrs accuracy must be within [0, 1], got {}",
                self.tnrs.accuracy
            )));
        }
        if self.tnrs.sources.is_empty() {
            return Err(CrateError::InvalidConfig(
                "at least one tnrs source is required".to_string(),
            ));
        }
        if self.gbif.candidate_limit == 0 {
            return Err(CrateError::InvalidConfig(
                "gbif candidate_limit must be positive".to_string(),
            ));
        }
        self.tnrs.endpoint().validate("tnrs")?;
        self.gbif.match_endpoint().validate("gbif match")?;
        self.gbif.search_endpoint().validate("gbif search")?;
        self.itis.endpoint().validate("itis")?;
        Ok(())
    }
}
