pub mod format;
pub mod fuzzy;
pub mod normalizer;
pub mod registry;
