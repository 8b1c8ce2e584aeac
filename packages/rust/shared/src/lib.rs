//! Shared types, error model, and configuration for notegraph.
//!
//! This crate is the foundation depended on by all other notegraph crates.
//! It provides:
//! - [`NoteGraphError`] — the unified error type
//! - Domain types ([`KnownEntity`], [`MatchType`], [`LinkKind`], [`ShareMode`])
//! - Configuration ([`AppConfig`], [`ResolverConfig`], [`ShareConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CorpusConfig, MAX_CONTEXT_DEPTH, MIN_CONTEXT_DEPTH, ResolverConfig, ShareConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from,
    validate_context_depth,
};
pub use error::{NoteGraphError, Result};
pub use types::{KnownEntity, LinkKind, MatchType, ShareMode};
