//! Turns free-form spreadsheet labels into canonical `Genus species` names.
use crate::taxon::format::{
    genus_length_ok, is_abbreviation, is_alphabetic, is_valid_hyphenated_species,
    species_length_ok,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

const MAX_INPUT_LEN: usize = 100;

/// Commercial and horticultural terms that never appear in a scientific name.
const NON_SCIENTIFIC_INDICATORS: &[&str] = &[
    "container",
    "wholesale",
    "retail",
    "cultivar",
    "bare root",
    "bareroot",
    "root ball",
    "rootball",
    "rootstock",
    "seedling",
    "commercial",
    "production",
    "nursery",
    "assorted",
    "mixed",
    "various",
    "unknown",
    "not specified",
    "n/a",
    "cuttings",
    "grafted",
    "plug plant",
    "per unit",
    "quantity",
    "invoice",
    "shipment",
    "consignment",
];

static SP_FORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z]+\s+spp?\.?$").expect("valid sp. form regex"));

static HYPHENATED_FORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]+\s+[A-Za-z]+(?:-[A-Za-z]+)+(?:\s*\([^)]*\))?$")
        .expect("valid hyphenated form regex")
});

static PLAIN_BINOMIAL_FORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]+\s+[A-Za-z]+$").expect("valid binomial form regex"));

// "Genus (=NewGenus) species"
static GENUS_SYNONYM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z]+\s*\(\s*=\s*([A-Za-z]+)\s*\)\s*([A-Za-z][A-Za-z-]*)")
        .expect("valid genus synonym regex")
});

// "Genus species (=NewGenus NewSpecies)"
static SPECIES_SYNONYM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[A-Za-z]+\s+[A-Za-z][A-Za-z-]*\s*\(\s*=\s*([A-Za-z]+)\s+([A-Za-z][A-Za-z-]*)\s*\)",
    )
    .expect("valid species synonym regex")
});

static QUOTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""[^"]*"|'[^']*'|“[^”]*”|‘[^’]*’"#).expect("valid quoted regex")
});

static PARENTHETICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)").expect("valid parenthetical regex"));

/// A canonical name produced by [`normalize`]. Cannot be built any other way.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedName {
    canonical: String,
    genus: String,
    kind: NameKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum NameKind {
    GenusOnly,
    Binomial(String),
    Abbreviated,
}

impl NormalizedName {
    fn genus_only(genus: String) -> Self {
        Self {
            canonical: genus.clone(),
            genus,
            kind: NameKind::GenusOnly,
        }
    }

    fn binomial(genus: String, species: String) -> Self {
        Self {
            canonical: format!("{} {}", genus, species),
            genus,
            kind: NameKind::Binomial(species),
        }
    }

    fn abbreviated(genus: String) -> Self {
        Self {
            canonical: format!("{} sp.", genus),
            genus,
            kind: NameKind::Abbreviated,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    pub fn genus(&self) -> &str {
        &self.genus
    }

    /// Species epithet of a binomial; `None` for genus-only and `sp.` forms.
    pub fn species(&self) -> Option<&str> {
        match &self.kind {
            NameKind::Binomial(species) => Some(species),
            _ => None,
        }
    }

    pub fn is_genus_only(&self) -> bool {
        matches!(self.kind, NameKind::GenusOnly)
    }

    pub fn is_abbreviated(&self) -> bool {
        matches!(self.kind, NameKind::Abbreviated)
    }

    pub fn is_binomial(&self) -> bool {
        matches!(self.kind, NameKind::Binomial(_))
    }

    pub fn has_hyphenated_species(&self) -> bool {
        self.species().is_some_and(is_valid_hyphenated_species)
    }

    pub fn into_string(self) -> String {
        self.canonical
    }
}

impl fmt::Display for NormalizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl AsRef<str> for NormalizedName {
    fn as_ref(&self) -> &str {
        &self.canonical
    }
}

/// Shapes that are always treated as name candidates, whatever words they contain.
fn matches_carve_out(text: &str) -> bool {
    SP_FORM.is_match(text) || HYPHENATED_FORM.is_match(text) || PLAIN_BINOMIAL_FORM.is_match(text)
}

/// Returns true when `text` cannot be a scientific name: it has a digit, or
/// (unless it has a carve-out shape) it is too long or mentions a trade term.
pub fn contains_invalid_patterns(text: &str) -> bool {
    if text.chars().any(char::is_numeric) {
        return true;
    }

    let trimmed = text.trim();
    if matches_carve_out(trimmed) {
        return false;
    }

    if text.chars().count() > MAX_INPUT_LEN {
        return true;
    }

    let lower = text.to_lowercase();
    NON_SCIENTIFIC_INDICATORS
        .iter()
        .any(|indicator| lower.contains(indicator))
}

/// Applies at most one synonym rewrite; the genus form wins over the species form.
fn rewrite_synonym(text: &str) -> String {
    if GENUS_SYNONYM.is_match(text) {
        return GENUS_SYNONYM.replace(text, "${1} ${2}").into_owned();
    }
    if SPECIES_SYNONYM.is_match(text) {
        return SPECIES_SYNONYM.replace(text, "${1} ${2}").into_owned();
    }
    text.to_string()
}

fn capitalize(token: &str) -> String {
    let lower = token.to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Normalizes a raw spreadsheet label into a [`NormalizedName`], or rejects it.
pub fn normalize(raw: &str) -> Option<NormalizedName> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || contains_invalid_patterns(trimmed) {
        return None;
    }

    let rewritten = rewrite_synonym(trimmed);
    let without_quotes = QUOTED.replace_all(&rewritten, " ");
    let without_annotations = PARENTHETICAL.replace_all(&without_quotes, " ");
    let tokens: Vec<&str> = without_annotations.split_whitespace().collect();

    match tokens.as_slice() {
        [genus] => {
            if is_alphabetic(genus) && genus_length_ok(genus) {
                Some(NormalizedName::genus_only(capitalize(genus)))
            } else {
                None
            }
        }
        [genus, species] => {
            if !is_alphabetic(genus) || !genus_length_ok(genus) {
                return None;
            }
            if is_abbreviation(species) {
                return Some(NormalizedName::abbreviated(capitalize(genus)));
            }
            let species_ok = is_alphabetic(species) || is_valid_hyphenated_species(species);
            if species_ok && species_length_ok(species) {
                Some(NormalizedName::binomial(
                    capitalize(genus),
                    species.to_ascii_lowercase(),
                ))
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(raw: &str) -> Option<String> {
        normalize(raw).map(NormalizedName::into_string)
    }

    #[test]
    fn capitalizes_binomials() {
        assert_eq!(canonical("rosa damascena").as_deref(), Some("Rosa damascena"));
        assert_eq!(canonical("ROSA DAMASCENA").as_deref(), Some("Rosa damascena"));
        assert_eq!(canonical("  Acer   palmatum ").as_deref(), Some("Acer palmatum"));
    }

    #[test]
    fn strips_cultivar_quotes() {
        assert_eq!(
            canonical("Photinia serratifolia \"Red Robin\"").as_deref(),
            Some("Photinia serratifolia")
        );
        assert_eq!(
            canonical("Acer palmatum 'Bloodgood'").as_deref(),
            Some("Acer palmatum")
        );
    }

    #[test]
    fn strips_origin_annotations() {
        assert_eq!(
            canonical("Olea europaea (Spain)").as_deref(),
            Some("Olea europaea")
        );
    }

    #[test]
    fn rewrites_species_synonym() {
        assert_eq!(
            canonical("Chamaerops excelsa (=Trachycarpus fortunei)").as_deref(),
            Some("Trachycarpus fortunei")
        );
    }

    #[test]
    fn rewrites_genus_synonym() {
        assert_eq!(
            canonical("Aster (=Symphyotrichum) novae-angliae").as_deref(),
            Some("Symphyotrichum novae-angliae")
        );
    }

    #[test]
    fn abbreviations_become_sp() {
        assert_eq!(canonical("Rosa sp").as_deref(), Some("Rosa sp."));
        assert_eq!(canonical("rosa SPP.").as_deref(), Some("Rosa sp."));
        assert_eq!(canonical("Rosa spp").as_deref(), Some("Rosa sp."));
        assert!(normalize("Rosa sp").unwrap().is_abbreviated());
    }

    #[test]
    fn genus_only() {
        let name = normalize("ginkgo").unwrap();
        assert!(name.is_genus_only());
        assert_eq!(name.as_str(), "Ginkgo");
        assert!(normalize("X").is_none());
        assert!(normalize(&"a".repeat(26)).is_none());
    }

    #[test]
    fn hyphenated_species() {
        let name = normalize("Arctostaphylos Uva-Ursi").unwrap();
        assert_eq!(name.as_str(), "Arctostaphylos uva-ursi");
        assert!(name.has_hyphenated_species());
        assert!(normalize("Arctostaphylos uva-u").is_none());
    }

    #[test]
    fn rejects_trade_descriptions() {
        assert!(normalize("Container plants for commercial production").is_none());
        assert!(normalize("Wholesale roses in pots").is_none());
        // a bare two-word label is a carve-out shape and is not screened
        assert_eq!(canonical("Wholesale roses").as_deref(), Some("Wholesale roses"));
        assert!(normalize("Roses bare root").is_none());
    }

    #[test]
    fn rejects_digits_and_noise() {
        assert!(normalize("").is_none());
        assert!(normalize("   ").is_none());
        assert!(normalize("Rosa 2").is_none());
        assert!(normalize("Rosa damascena alba").is_none());
        assert!(normalize("Rosa d@mascena").is_none());
        assert!(normalize("Rosa x").is_none());
    }

    #[test]
    fn carve_outs_bypass_indicator_words() {
        // two plain tokens are never screened for trade terms
        assert!(!contains_invalid_patterns("Mixed border"));
        assert!(contains_invalid_patterns("Mixed border plants"));
        assert!(!contains_invalid_patterns("Rosa spp."));
        assert!(!contains_invalid_patterns("Arctostaphylos uva-ursi (nursery grown)"));
        assert!(contains_invalid_patterns("Arctostaphylos uva-ursi (2 litre)"));
    }

    #[test]
    fn length_limit_applies_outside_carve_outs() {
        let long = format!("Rosa {}", "damascena ".repeat(12));
        assert!(contains_invalid_patterns(&long));
        let long_binomial = format!("Rosa {}", "a".repeat(120));
        assert!(!contains_invalid_patterns(&long_binomial));
        assert!(normalize(&long_binomial).is_none());
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in [
            "rosa damascena",
            "Photinia serratifolia \"Red Robin\"",
            "Chamaerops excelsa (=Trachycarpus fortunei)",
            "Rosa sp",
            "ginkgo",
            "Arctostaphylos uva-ursi",
        ] {
            let once = canonical(raw).unwrap();
            assert_eq!(canonical(&once).as_deref(), Some(once.as_str()), "{raw}");
        }
    }

    #[test]
    fn casing_permutations_share_a_canonical_form() {
        let expected = canonical("Rosa damascena");
        for raw in ["rosa damascena", "ROSA damascena", "rOsA DaMaScEnA", "Rosa Damascena"] {
            assert_eq!(canonical(raw), expected, "{raw}");
        }
    }
}
