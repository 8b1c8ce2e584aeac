//! Share payload building and document processing for notegraph.
//!
//! This crate ties the resolver and the markdown reference layer together:
//! - [`source`] — document content providers ([`FsVault`], [`MemoryVault`])
//! - [`share`] — breadth-first share payload builder with an auditable graph report
//! - [`processor`] — wikilink and frontmatter suggestions from resolved mentions

pub mod processor;
pub mod share;
pub mod source;

pub use processor::{
    DocumentProcessor, EntityMention, NewEntitySuggestion, ProcessedDocument, WikilinkSuggestion,
    apply_wikilinks,
};
pub use share::{
    BundleDocument, GraphNode, IncludeReason, NodeRole, ShareGraph, ShareGraphBuilder,
    SharePayload, ShareReference, ShareRequest, ShareSummary, SkipReason, build_share_payload,
};
pub use source::{DocumentSource, FsVault, MemoryVault};
