//! GBIF species API client (backbone name matching and species search).
use crate::authority::{Authority, CandidateSearch, GenusLookup, NameMatch, Source};
use crate::config::GbifConfig;
use crate::error::{CrateError, Result};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use urlencoding::encode;

const SERVICE: &str = "GBIF";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchResponse {
    match_type: Option<String>,
    species: Option<String>,
    genus: Option<String>,
}

impl MatchResponse {
    fn is_exact_or_fuzzy(&self) -> bool {
        self.match_type
            .as_deref()
            .map(|t| t.eq_ignore_ascii_case("exact") || t.eq_ignore_ascii_case("fuzzy"))
            .unwrap_or(false)
    }

    fn confirms_species(&self) -> bool {
        self.is_exact_or_fuzzy() && has_text(self.species.as_deref())
    }

    fn confirms_genus(&self) -> bool {
        self.is_exact_or_fuzzy() && has_text(self.genus.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    species: Option<String>,
}

fn has_text(value: Option<&str>) -> bool {
    value.map(|v| !v.trim().is_empty()).unwrap_or(false)
}

pub struct GbifClient {
    client: reqwest::Client,
    config: GbifConfig,
}

impl GbifClient {
    pub fn new(client: reqwest::Client, config: GbifConfig) -> Self {
        Self { client, config }
    }

    async fn fetch_match(&self, name: &str) -> Result<MatchResponse> {
        let url = format!("{}?name={}", self.config.match_url, encode(name));
        debug!("Querying GBIF match for {}", name);
        let response = self
            .client
            .get(&url)
            .timeout(self.config.match_endpoint().timeout())
            .send()
            .await
            .map_err(CrateError::ApiRequestError)?;

        if !response.status().is_success() {
            return Err(CrateError::ApiStatusError {
                service: SERVICE,
                status: response.status(),
            });
        }

        response
            .json::<MatchResponse>()
            .await
            .map_err(CrateError::ApiJsonDecodeError)
    }

    /// Binomial lookup: true on an exact or fuzzy match with a species.
    pub async fn match_species(&self, name: &str) -> Result<bool> {
        Ok(self.fetch_match(name).await?.confirms_species())
    }

    /// Single-token lookup: true on an exact or fuzzy match with a genus.
    pub async fn match_genus(&self, genus: &str) -> Result<bool> {
        Ok(self.fetch_match(genus).await?.confirms_genus())
    }

    /// Species names of accepted taxa matching `query`, in GBIF's ranking order.
    pub async fn search_accepted(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let params = [
            ("q", query.to_string()),
            ("limit", limit.to_string()),
            ("facet", "status".to_string()),
            ("status", "ACCEPTED".to_string()),
        ];
        debug!("Searching GBIF for accepted names like {}", query);
        let response = self
            .client
            .get(&self.config.search_url)
            .query(&params)
            .timeout(self.config.search_endpoint().timeout())
            .send()
            .await
            .map_err(CrateError::ApiRequestError)?;

        if !response.status().is_success() {
            return Err(CrateError::ApiStatusError {
                service: SERVICE,
                status: response.status(),
            });
        }

        let payload = response
            .json::<SearchResponse>()
            .await
            .map_err(CrateError::ApiJsonDecodeError)?;

        Ok(payload
            .results
            .into_iter()
            .filter_map(|r| r.species)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .take(limit)
            .collect())
    }
}

#[async_trait]
impl Authority for GbifClient {
    fn source(&self) -> Source {
        Source::LookupA
    }

    async fn attempt(&self, name: &str) -> Result<Option<NameMatch>> {
        // species matching is binomial-only
        if name.split_whitespace().count() != 2 {
            return Ok(None);
        }
        let found = self.match_species(name).await?;
        Ok(found.then(|| NameMatch::confirmed(name, Source::LookupA)))
    }
}

#[async_trait]
impl GenusLookup for GbifClient {
    async fn genus_exists(&self, genus: &str) -> Result<bool> {
        self.match_genus(genus).await
    }
}

#[async_trait]
impl CandidateSearch for GbifClient {
    fn source(&self) -> Source {
        Source::LookupA
    }

    async fn accepted_candidates(&self, name: &str, limit: usize) -> Result<Vec<String>> {
        self.search_accepted(name, limit).await
    }
}
