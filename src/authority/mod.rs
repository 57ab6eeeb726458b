//! Adapters to the external taxonomic authorities.
//!
//! Each client speaks its own protocol and returns `crate::error::Result`.
//! The traits below are the seams [`crate::filter::TaxonFilter`] depends on, so
//! any authority can be swapped for an in-memory fake.
pub mod gbif;
pub mod itis;
pub mod tnrs;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which authority produced a [`NameMatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    /// TNRS name resolution.
    #[serde(rename = "resolution-service")]
    ResolutionService,
    /// GBIF species API.
    #[serde(rename = "lookup-a")]
    LookupA,
    /// ITIS web service.
    #[serde(rename = "lookup-b")]
    LookupB,
}

impl Source {
    pub fn label(&self) -> &'static str {
        match self {
            Source::ResolutionService => "resolution-service",
            Source::LookupA => "lookup-a",
            Source::LookupB => "lookup-b",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Partial,
    Fuzzy,
    Synonym,
}

impl MatchType {
    /// Classifies a free-text match summary. The first of `partial`, `fuzzy`
    /// and `synonym` found wins; anything else is an exact match.
    pub fn from_summary(summary: &str) -> Self {
        let lower = summary.to_lowercase();
        if lower.contains("partial") {
            MatchType::Partial
        } else if lower.contains("fuzzy") {
            MatchType::Fuzzy
        } else if lower.contains("synonym") {
            MatchType::Synonym
        } else {
            MatchType::Exact
        }
    }
}

/// Outcome of resolving one name against one authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameMatch {
    pub original_name: String,
    pub matched_name: String,
    pub accepted_name: String,
    pub match_type: MatchType,
    pub confidence: f64,
    pub source: Source,
    pub is_valid: bool,
    pub synonyms: Vec<String>,
}

impl NameMatch {
    /// A binary "the authority knows this name" answer from a lookup service.
    pub fn confirmed(name: &str, source: Source) -> Self {
        Self {
            original_name: name.to_string(),
            matched_name: name.to_string(),
            accepted_name: name.to_string(),
            match_type: MatchType::Exact,
            confidence: 1.0,
            source,
            is_valid: true,
            synonyms: Vec::new(),
        }
    }

    /// Accepted name if the authority reported one, otherwise the matched name.
    pub fn preferred_name(&self) -> &str {
        if self.accepted_name.trim().is_empty() {
            &self.matched_name
        } else {
            &self.accepted_name
        }
    }
}

/// One tier of the exact-validation chain.
#[async_trait]
pub trait Authority: Send + Sync {
    fn source(&self) -> Source;

    /// `Ok(None)` means the authority does not know the name.
    async fn attempt(&self, name: &str) -> Result<Option<NameMatch>>;
}

/// Full name resolution with optional partial matching.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve(&self, name: &str, allow_partial: bool) -> Result<Option<NameMatch>>;
}

/// Confirms that a single token is a known genus.
#[async_trait]
pub trait GenusLookup: Send + Sync {
    async fn genus_exists(&self, genus: &str) -> Result<bool>;
}

/// Accepted species names similar to a query, best first.
#[async_trait]
pub trait CandidateSearch: Send + Sync {
    fn source(&self) -> Source;

    async fn accepted_candidates(&self, name: &str, limit: usize) -> Result<Vec<String>>;
}
