//! Genera accepted on their own without asking an external authority.
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Monotypic genera and genera routinely traded without a species epithet.
const KNOWN_GENERA: &[&str] = &[
    // monotypic or near-monotypic
    "ginkgo",
    "welwitschia",
    "metasequoia",
    "sciadopitys",
    "cercidiphyllum",
    "davidia",
    "franklinia",
    "amborella",
    "wollemia",
    "sequoia",
    "sequoiadendron",
    "cryptomeria",
    "cunninghamia",
    "glyptostrobus",
    "taiwania",
    "fokienia",
    "idesia",
    "poliothyrsis",
    "emmenopterys",
    "eucommia",
    "tetracentron",
    "trochodendron",
    "euptelea",
    "kirengeshoma",
    "nandina",
    "decaisnea",
    "sinojackia",
    "disanthus",
    "parrotia",
    "parrotiopsis",
    "halesia",
    "pterostyrax",
    "umbellularia",
    "lyonothamnus",
    "carnegiea",
    "dionaea",
    "darlingtonia",
    "cephalotus",
    "aldrovanda",
    "puya",
    "gunnera",
    "victoria",
    "pseudolarix",
    "keteleeria",
    "thujopsis",
    "microbiota",
    "saxegothaea",
    "tetraclinis",
    // commonly traded at genus level
    "hosta",
    "heuchera",
    "hebe",
    "lavandula",
    "rosa",
    "rhododendron",
    "camellia",
    "clematis",
    "hydrangea",
    "dahlia",
    "tulipa",
    "narcissus",
    "lilium",
    "iris",
    "paeonia",
    "pelargonium",
    "fuchsia",
    "begonia",
    "hemerocallis",
    "echinacea",
    "salvia",
    "sedum",
    "sempervivum",
    "echeveria",
    "aloe",
    "agave",
    "yucca",
    "phormium",
    "cordyline",
    "dracaena",
    "ficus",
    "philodendron",
    "anthurium",
    "spathiphyllum",
    "phalaenopsis",
    "dendrobium",
    "cymbidium",
    "tillandsia",
    "bromelia",
    "nepenthes",
    "sarracenia",
    "buxus",
    "ilex",
    "acer",
    "prunus",
    "malus",
    "pyrus",
];

static DEFAULT_REGISTRY: Lazy<KnownGenusRegistry> =
    Lazy::new(|| KnownGenusRegistry::from_names(KNOWN_GENERA.iter().copied()));

/// Immutable set of lowercase genus names.
#[derive(Debug, Clone)]
pub struct KnownGenusRegistry {
    genera: HashSet<String>,
}

impl KnownGenusRegistry {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            genera: names
                .into_iter()
                .map(|name| name.as_ref().trim().to_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }

    /// Shared process-wide instance built from the built-in list.
    pub fn builtin() -> &'static KnownGenusRegistry {
        &DEFAULT_REGISTRY
    }

    /// Expects a lowercase genus.
    pub fn contains(&self, genus_lowercase: &str) -> bool {
        self.genera.contains(genus_lowercase)
    }

    pub fn len(&self) -> usize {
        self.genera.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genera.is_empty()
    }
}

impl Default for KnownGenusRegistry {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_knows_monotypic_genera() {
        let registry = KnownGenusRegistry::builtin();
        assert!(registry.contains("ginkgo"));
        assert!(registry.contains("welwitschia"));
        assert!(!registry.contains("Ginkgo"));
        assert!(!registry.contains("notagenus"));
        assert!(registry.len() >= 90);
    }

    #[test]
    fn custom_registry_lowercases_entries() {
        let registry = KnownGenusRegistry::from_names(["Quercus", " ", "Betula "]);
        assert!(registry.contains("quercus"));
        assert!(registry.contains("betula"));
        assert_eq!(registry.len(), 2);
    }
}
