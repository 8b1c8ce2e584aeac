//! Markdown reference parsing and link resolution for a notes vault.
//!
//! This crate provides:
//! - [`frontmatter`] — lenient YAML frontmatter splitting
//! - [`references`] — outgoing embed / wikilink / markdown / frontmatter references
//! - [`links`] — target sanitizing, [`BasenameIndex`] and [`LinkResolver`]

pub mod frontmatter;
pub mod links;
pub mod references;

pub use frontmatter::{parse_frontmatter, split_frontmatter};
pub use links::{BasenameIndex, LinkResolver, has_extension, normalize_path, sanitize_target};
pub use references::{ExtractedReference, extract_references, wikilink_targets};
