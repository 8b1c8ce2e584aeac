//! Core domain types shared by the resolver, the reference extractor, and the share builder.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NoteGraphError;

// ---------------------------------------------------------------------------
// KnownEntity
// ---------------------------------------------------------------------------

/// A canonical entity from the knowledge base.
///
/// `entity_type` is an open string key (`Person`, `Organization`, ...) so new
/// types configured upstream work without code changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownEntity {
    /// Display name of the entity.
    pub name: String,
    /// Open type tag.
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Canonical location in the vault (e.g. `People/Clare Attwell`).
    pub path: String,
    /// Alternative names, in declaration order.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl KnownEntity {
    pub fn new(
        name: impl Into<String>,
        entity_type: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            path: path.into(),
            aliases: Vec::new(),
        }
    }

    /// Builder-style alias list.
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }
}

// ---------------------------------------------------------------------------
// MatchType
// ---------------------------------------------------------------------------

/// Which resolution tier produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Alias,
    Fuzzy,
    New,
}

impl MatchType {
    /// Whether the decision points at an existing entity.
    pub fn is_match(self) -> bool {
        !matches!(self, MatchType::New)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Alias => "alias",
            MatchType::Fuzzy => "fuzzy",
            MatchType::New => "new",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LinkKind
// ---------------------------------------------------------------------------

/// Syntactic form of an outgoing document reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// `![[target]]`
    Embed,
    /// `[[target]]`
    Wikilink,
    /// `![label](target)`
    MarkdownEmbed,
    /// `[label](target)`
    MarkdownLink,
    /// Reference found in a frontmatter string value.
    FrontmatterRef,
}

impl LinkKind {
    /// Embed-style links inline their target, so the target is required.
    pub fn is_required(self) -> bool {
        matches!(self, LinkKind::Embed | LinkKind::MarkdownEmbed)
    }
}

// ---------------------------------------------------------------------------
// ShareMode
// ---------------------------------------------------------------------------

/// Which references a share payload pulls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareMode {
    /// Only the root document.
    RootOnly,
    /// The root plus every embed-style (required) dependency.
    RootPlusRequired,
    /// Required dependencies plus a budget of optional ones.
    ContextPack,
}

impl ShareMode {
    pub const VALID: &'static str = "root_only, root_plus_required, context_pack";

    pub fn as_str(self) -> &'static str {
        match self {
            ShareMode::RootOnly => "root_only",
            ShareMode::RootPlusRequired => "root_plus_required",
            ShareMode::ContextPack => "context_pack",
        }
    }
}

impl fmt::Display for ShareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShareMode {
    type Err = NoteGraphError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "root_only" => Ok(ShareMode::RootOnly),
            "root_plus_required" => Ok(ShareMode::RootPlusRequired),
            "context_pack" => Ok(ShareMode::ContextPack),
            other => Err(NoteGraphError::validation(format!(
                "invalid share mode '{other}': expected one of {}",
                Self::VALID
            ))),
        }
    }
}
