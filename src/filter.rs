//! Entry point used by collaborators: screens raw strings for valid taxon names.
use crate::authority::gbif::GbifClient;
use crate::authority::itis::ItisClient;
use crate::authority::tnrs::TnrsClient;
use crate::authority::{Authority, CandidateSearch, GenusLookup, NameMatch, NameResolver, Source};
use crate::cache::{ValidationCache, ValidationStats};
use crate::config::FilterConfig;
use crate::error::{CrateError, Result};
use crate::taxon::format;
use crate::taxon::fuzzy::best_candidate;
use crate::taxon::normalizer::{self, NormalizedName};
use crate::taxon::registry::KnownGenusRegistry;
use futures::stream::{self, StreamExt};
use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;

/// Verdict for one raw input, as reported by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameCheck {
    pub raw: String,
    pub normalized: Option<String>,
    pub is_valid: bool,
    pub accepted_name: Option<String>,
}

/// Normalizes and validates names against the known-genus registry and the
/// external authorities, memoizing every external answer.
///
/// Build one per process and share it by reference; the cache lives inside.
pub struct TaxonFilter {
    config: FilterConfig,
    registry: KnownGenusRegistry,
    chain: Vec<Arc<dyn Authority>>,
    resolver: Option<Arc<dyn NameResolver>>,
    genus_lookup: Option<Arc<dyn GenusLookup>>,
    candidate_search: Option<Arc<dyn CandidateSearch>>,
    cache: ValidationCache,
}

pub struct TaxonFilterBuilder {
    config: FilterConfig,
    registry: Option<KnownGenusRegistry>,
    chain: Vec<Arc<dyn Authority>>,
    resolver: Option<Arc<dyn NameResolver>>,
    genus_lookup: Option<Arc<dyn GenusLookup>>,
    candidate_search: Option<Arc<dyn CandidateSearch>>,
    cache: Option<ValidationCache>,
}

impl TaxonFilterBuilder {
    /// Appends a tier to the exact-validation chain; tiers run in insertion order.
    pub fn authority(mut self, authority: Arc<dyn Authority>) -> Self {
        self.chain.push(authority);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn genus_lookup(mut self, lookup: Arc<dyn GenusLookup>) -> Self {
        self.genus_lookup = Some(lookup);
        self
    }

    pub fn candidate_search(mut self, search: Arc<dyn CandidateSearch>) -> Self {
        self.candidate_search = Some(search);
        self
    }

    pub fn registry(mut self, registry: KnownGenusRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn cache(mut self, cache: ValidationCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> Result<TaxonFilter> {
        self.config.validate()?;
        let cache = self
            .cache
            .unwrap_or_else(|| ValidationCache::new(self.config.cache_capacity));
        Ok(TaxonFilter {
            registry: self.registry.unwrap_or_default(),
            chain: self.chain,
            resolver: self.resolver,
            genus_lookup: self.genus_lookup,
            candidate_search: self.candidate_search,
            cache,
            config: self.config,
        })
    }
}

impl TaxonFilter {
    /// Wires the TNRS, GBIF and ITIS clients in their default priority order.
    pub fn new(config: FilterConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(CrateError::ApiRequestError)?;

        let tnrs = Arc::new(TnrsClient::new(client.clone(), config.tnrs.clone()));
        let gbif = Arc::new(GbifClient::new(client.clone(), config.gbif.clone()));
        let itis = Arc::new(ItisClient::new(client, config.itis.clone()));

        Self::builder(config)
            .authority(tnrs.clone())
            .authority(gbif.clone())
            .authority(itis)
            .resolver(tnrs)
            .genus_lookup(gbif.clone())
            .candidate_search(gbif)
            .build()
    }

    /// Empty builder; add authorities explicitly.
    pub fn builder(config: FilterConfig) -> TaxonFilterBuilder {
        TaxonFilterBuilder {
            config,
            registry: None,
            chain: Vec::new(),
            resolver: None,
            genus_lookup: None,
            candidate_search: None,
            cache: None,
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn normalize(&self, raw: &str) -> Option<NormalizedName> {
        normalizer::normalize(raw)
    }

    pub async fn is_valid_genus_species(&self, raw: &str) -> bool {
        let Some(name) = normalizer::normalize(raw) else {
            debug!("Rejected during normalization: {:?}", raw);
            return false;
        };

        if name.is_abbreviated() {
            return true;
        }
        if name.is_genus_only() {
            return self.is_valid_genus_only(name.as_str()).await;
        }
        if !format::is_valid_binomial_format(name.as_str()) {
            return false;
        }
        if !self.config.external_validation {
            return true;
        }

        if let Some(found) = self.exact_match(name.as_str()).await {
            debug!("{} confirmed by {}", name, found.source);
            return true;
        }
        if name.has_hyphenated_species() {
            debug!("Accepting unconfirmed hyphenated species {}", name);
            return true;
        }
        if self.config.partial_matching {
            return self.resolve_partial_normalized(name.as_str()).await.is_some();
        }
        false
    }

    /// A single capitalized genus, confirmed by the registry or the genus lookup
    /// when external validation is on.
    pub async fn is_valid_genus_only(&self, text: &str) -> bool {
        if !format::is_valid_genus_only(text) {
            return false;
        }
        if !self.config.external_validation {
            return true;
        }

        let genus = text.trim();
        if self.registry.contains(&genus.to_lowercase()) {
            debug!("{} is a known genus", genus);
            return true;
        }
        self.lookup_genus(genus).await
    }

    /// Canonical name mapped to its accepted name where an authority knows one.
    pub async fn normalize_to_accepted_name(&self, raw: &str) -> Option<String> {
        self.cache
            .accepted_name()
            .get_or_try_insert_with(raw, || self.compute_accepted_name(raw))
            .await
            .unwrap_or_else(|degraded| {
                debug!("Accepted name for {:?} left uncached: {}", raw, degraded.cause);
                degraded.best_effort
            })
    }

    /// Partial/fuzzy resolution of a name that exact validation did not confirm.
    pub async fn resolve_partial(&self, raw: &str) -> Option<NameMatch> {
        if !self.config.external_validation {
            return None;
        }
        let name = normalizer::normalize(raw)?;
        self.resolve_partial_normalized(name.as_str()).await
    }

    /// Canonical forms of the valid entries, in input order. Blank entries are
    /// skipped; duplicates are kept.
    pub async fn filter_list<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        let mut kept = Vec::new();
        for raw in names {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            if let Some(name) = self.checked_canonical(raw).await {
                kept.push(name);
            }
        }
        info!("Kept {} of {} names", kept.len(), names.len());
        kept
    }

    /// Same result as [`Self::filter_list`], checking up to `concurrency`
    /// names at once. Each name's authority chain still runs in order.
    pub async fn filter_list_concurrent<S: AsRef<str>>(
        &self,
        names: &[S],
        concurrency: usize,
    ) -> Vec<String> {
        let checks = names
            .iter()
            .map(|raw| raw.as_ref().trim())
            .filter(|raw| !raw.is_empty())
            .map(|raw| self.checked_canonical(raw));

        let kept: Vec<String> = stream::iter(checks)
            .buffered(concurrency.max(1))
            .filter_map(|name| async move { name })
            .collect()
            .await;
        info!("Kept {} of {} names", kept.len(), names.len());
        kept
    }

    /// Full verdict for one input.
    pub async fn check(&self, raw: &str) -> NameCheck {
        let normalized = normalizer::normalize(raw).map(NormalizedName::into_string);
        let is_valid = normalized.is_some() && self.is_valid_genus_species(raw).await;
        let accepted_name = if is_valid {
            self.normalize_to_accepted_name(raw).await
        } else {
            None
        };
        NameCheck {
            raw: raw.to_string(),
            normalized,
            is_valid,
            accepted_name,
        }
    }

    pub fn validation_stats(&self) -> ValidationStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    async fn checked_canonical(&self, raw: &str) -> Option<String> {
        if self.is_valid_genus_species(raw).await {
            normalizer::normalize(raw).map(NormalizedName::into_string)
        } else {
            None
        }
    }

    /// Walks the chain and stops at the first valid match. Failures count as
    /// "no evidence" and the walk continues.
    async fn exact_match(&self, name: &str) -> Option<NameMatch> {
        for authority in &self.chain {
            let source = authority.source();
            let outcome = self
                .cache
                .for_source(source)
                .get_or_try_insert_with(name, || authority.attempt(name))
                .await;
            match outcome {
                Ok(Some(found)) if found.is_valid => return Some(found),
                Ok(_) => debug!("{} has no match for {}", source, name),
                Err(e) => debug!("{} lookup failed for {}: {}", source, name, e),
            }
        }
        None
    }

    async fn resolve_exact(&self, name: &str) -> Result<Option<NameMatch>> {
        let Some(resolver) = &self.resolver else {
            return Ok(None);
        };
        let found = self
            .cache
            .for_source(Source::ResolutionService)
            .get_or_try_insert_with(name, || resolver.resolve(name, false))
            .await?;
        Ok(found.filter(|m| m.is_valid))
    }

    async fn resolve_partial_normalized(&self, name: &str) -> Option<NameMatch> {
        match self.try_resolve_partial(name).await {
            Ok(found) => found,
            Err(e) => {
                debug!("Partial resolution failed for {}: {}", name, e);
                None
            }
        }
    }

    /// Resolver in partial mode, then candidate search. A resolver failure is
    /// reported only when the search does not produce a match either.
    async fn try_resolve_partial(&self, name: &str) -> Result<Option<NameMatch>> {
        let mut failure = None;
        if let Some(resolver) = &self.resolver {
            let outcome = self
                .cache
                .resolution_partial()
                .get_or_try_insert_with(name, || resolver.resolve(name, true))
                .await;
            match outcome {
                Ok(Some(found)) if found.is_valid => return Ok(Some(found)),
                Ok(_) => debug!("No partial resolution for {}", name),
                Err(e) => {
                    debug!("Partial resolution failed for {}: {}", name, e);
                    failure = Some(e);
                }
            }
        }

        let Some(search) = &self.candidate_search else {
            return failure.map_or(Ok(None), Err);
        };
        let limit = self.config.gbif.candidate_limit;
        let candidates = self
            .cache
            .candidate_search()
            .get_or_try_insert_with(name, || search.accepted_candidates(name, limit))
            .await?;

        let found = best_candidate(name, &candidates, search.source());
        match &found {
            Some(m) => {
                debug!("{} resolved to {} (score {:.1})", name, m.matched_name, m.confidence)
            }
            None => {
                if let Some(e) = failure {
                    return Err(e);
                }
            }
        }
        Ok(found)
    }

    async fn lookup_genus(&self, genus: &str) -> bool {
        let Some(lookup) = &self.genus_lookup else {
            return false;
        };
        match self
            .cache
            .genus_match()
            .get_or_try_insert_with(genus, || lookup.genus_exists(genus))
            .await
        {
            Ok(found) => found,
            Err(e) => {
                debug!("Genus lookup failed for {}: {}", genus, e);
                false
            }
        }
    }

    /// `Err` when an authority failed along the way; the error carries the
    /// best answer available so the caller can still use it without caching it.
    async fn compute_accepted_name(
        &self,
        raw: &str,
    ) -> std::result::Result<Option<String>, Degraded> {
        let Some(name) = normalizer::normalize(raw) else {
            return Ok(None);
        };
        if !self.config.external_validation || name.is_abbreviated() {
            return Ok(Some(name.into_string()));
        }

        let exact_failure = match self.resolve_exact(name.as_str()).await {
            Ok(Some(found)) => return Ok(Some(found.preferred_name().to_string())),
            Ok(None) => None,
            Err(e) => Some(e),
        };
        let partial = self.try_resolve_partial(name.as_str()).await;

        let cause = match (exact_failure, partial) {
            (None, Ok(Some(found))) => return Ok(Some(found.preferred_name().to_string())),
            (None, Ok(None)) => return Ok(Some(name.into_string())),
            (Some(cause), Ok(Some(found))) => {
                return Err(Degraded {
                    best_effort: Some(found.preferred_name().to_string()),
                    cause,
                });
            }
            (Some(cause), Ok(None)) | (None, Err(cause)) | (Some(cause), Err(_)) => cause,
        };
        Err(Degraded {
            best_effort: Some(name.into_string()),
            cause,
        })
    }
}

/// An accepted-name answer computed while some authority was unreachable.
struct Degraded {
    best_effort: Option<String>,
    cause: CrateError,
}
