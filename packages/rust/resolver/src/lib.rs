//! Entity resolution against a canonical knowledge base.
//!
//! This crate provides:
//! - [`similarity`] — Jaro / Jaro-Winkler scoring and name normalization
//! - [`EntityIndex`] — name, alias and type lookups over an entity snapshot
//! - [`EntityResolver`] — exact → alias → fuzzy resolution with suggestions
//! - [`corpus`] — entity providers and a TTL cache

pub mod corpus;
pub mod index;
pub mod resolver;
pub mod similarity;

pub use corpus::{CorpusCache, CorpusProvider, JsonCorpusFile, StaticCorpus};
pub use index::EntityIndex;
pub use resolver::{
    ALIAS_CONFIDENCE, EntityQuery, EntityResolver, MAX_SUGGESTIONS, ResolutionDecision,
    Suggestion, suggested_path, type_folder,
};
pub use similarity::{jaro, jaro_winkler, jaro_winkler_with_scale, normalize};
