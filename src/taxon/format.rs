//! Structural checks on canonical names, independent of normalization.

pub const GENUS_MIN_LEN: usize = 2;
pub const GENUS_MAX_LEN: usize = 25;
pub const SPECIES_MIN_LEN: usize = 2;
pub const SPECIES_MAX_LEN: usize = 50;
pub const HYPHEN_SEGMENT_MIN_LEN: usize = 2;
pub const HYPHEN_SEGMENT_MAX_LEN: usize = 20;

const ABBREVIATIONS: [&str; 4] = ["sp", "sp.", "spp", "spp."];

pub fn is_alphabetic(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_alphabetic())
}

/// True for `sp`, `sp.`, `spp` and `spp.` in any casing.
pub fn is_abbreviation(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    ABBREVIATIONS.contains(&lower.as_str())
}

/// At least two hyphen-separated alphabetic segments, each 2-20 letters.
pub fn is_valid_hyphenated_species(species: &str) -> bool {
    let segments: Vec<&str> = species.split('-').collect();
    segments.len() >= 2
        && segments.iter().all(|segment| {
            is_alphabetic(segment)
                && (HYPHEN_SEGMENT_MIN_LEN..=HYPHEN_SEGMENT_MAX_LEN).contains(&segment.len())
        })
}

pub fn genus_length_ok(genus: &str) -> bool {
    (GENUS_MIN_LEN..=GENUS_MAX_LEN).contains(&genus.len())
}

pub fn species_length_ok(species: &str) -> bool {
    (SPECIES_MIN_LEN..=SPECIES_MAX_LEN).contains(&species.len())
}

fn is_capitalized(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.is_ascii_uppercase() && chars.all(|c| c.is_ascii_lowercase()),
        None => false,
    }
}

fn is_lowercase(token: &str) -> bool {
    token.chars().all(|c| !c.is_ascii_uppercase())
}

/// Exactly `Genus species`: capitalized alphabetic genus, lowercase species
/// (plain, hyphenated or an abbreviation marker), within the length bounds.
pub fn is_valid_binomial_format(text: &str) -> bool {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let [genus, species] = tokens.as_slice() else {
        return false;
    };

    if !is_alphabetic(genus) || !is_capitalized(genus) || !genus_length_ok(genus) {
        return false;
    }
    if is_abbreviation(species) {
        return is_lowercase(species);
    }

    is_lowercase(species)
        && species_length_ok(species)
        && (is_alphabetic(species) || is_valid_hyphenated_species(species))
}

/// Single capitalized alphabetic token of genus length. Registry and
/// genus-lookup confirmation live in [`crate::filter::TaxonFilter::is_valid_genus_only`].
pub fn is_valid_genus_only(text: &str) -> bool {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let [genus] = tokens.as_slice() else {
        return false;
    };
    is_alphabetic(genus) && is_capitalized(genus) && genus_length_ok(genus)
}
