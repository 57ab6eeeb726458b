//! Screening of free-text plant names: keeps only strings that resolve to a
//! real genus or "Genus species" binomial, in canonical form.
pub mod authority;
pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod report;
pub mod taxon;

pub use authority::{MatchType, NameMatch, Source};
pub use cache::{CacheStats, ValidationStats};
pub use config::FilterConfig;
pub use error::{CrateError, Result};
pub use filter::{NameCheck, TaxonFilter, TaxonFilterBuilder};
pub use taxon::normalizer::{NormalizedName, normalize};
