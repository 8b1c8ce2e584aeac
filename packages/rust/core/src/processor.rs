//! Turns resolved entity mentions into wikilink and frontmatter suggestions.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use notegraph_markdown::split_frontmatter;
use notegraph_resolver::{
    EntityQuery, EntityResolver, ResolutionDecision, Suggestion, suggested_path, type_folder,
};
use notegraph_shared::{MatchType, NoteGraphError, Result};

/// Existing `[[...]]` links and `[label](target)` links; mentions inside them are left alone.
static EXISTING_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!?\[\[[^\[\]]*\]\]|!?\[[^\[\]]*\]\([^()]*\)").expect("existing link regex")
});

/// An entity mention found in a document by an upstream extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMention {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Byte offset hint into the document text.
    #[serde(default)]
    pub offset: Option<usize>,
}

impl EntityMention {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            offset: None,
        }
    }

    pub fn at(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// A proposed replacement of a mention with a wikilink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikilinkSuggestion {
    /// Mention text as it appears in the document.
    pub mention: String,
    /// Matched entity path.
    pub target: String,
    pub offset: usize,
    pub length: usize,
    /// Rendered replacement, `[[Title]]` or `[[Title|mention]]`.
    pub link: String,
    pub match_type: MatchType,
    pub confidence: f64,
}

/// A mention that matched nothing in the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntitySuggestion {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub suggested_path: String,
    /// Candidates scored below the type threshold.
    pub near_misses: Vec<Suggestion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessedDocument {
    /// One decision per distinct mention name, in first-mention order.
    pub decisions: Vec<ResolutionDecision>,
    pub wikilinks: Vec<WikilinkSuggestion>,
    /// `people` / `organizations` / ... → `[[Title]]` links.
    pub frontmatter: BTreeMap<String, Vec<String>>,
    pub new_entities: Vec<NewEntitySuggestion>,
}

impl ProcessedDocument {
    /// The frontmatter suggestions rendered as YAML.
    pub fn frontmatter_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.frontmatter)
            .map_err(|e| NoteGraphError::Serialization(e.to_string()))
    }
}

/// Resolves a document's mentions and proposes links for them.
pub struct DocumentProcessor<'a> {
    resolver: &'a EntityResolver,
}

impl<'a> DocumentProcessor<'a> {
    pub fn new(resolver: &'a EntityResolver) -> Self {
        Self { resolver }
    }

    #[instrument(skip_all, fields(mentions = mentions.len(), bytes = text.len()))]
    pub fn process(&self, text: &str, mentions: &[EntityMention]) -> Result<ProcessedDocument> {
        let queries: Vec<EntityQuery> = mentions
            .iter()
            .map(|m| EntityQuery::new(&m.name, &m.entity_type))
            .collect();
        let mut resolved: HashMap<String, ResolutionDecision> = self.resolver.resolve_all(&queries)?;

        let (_, body) = split_frontmatter(text);
        let body_start = text.len() - body.len();
        let protected: Vec<Range<usize>> = EXISTING_LINK_RE
            .find_iter(body)
            .map(|m| body_start + m.start()..body_start + m.end())
            .collect();

        let suggest_new = self.resolver.config().suggest_new_entities;
        let mut out = ProcessedDocument::default();
        let mut linked: HashSet<String> = HashSet::new();

        for mention in mentions {
            // First mention of a name takes its decision; later duplicates reuse it.
            if let Some(decision) = resolved.remove(&mention.name) {
                out.decisions.push(decision);
            }
            let Some(decision) = out.decisions.iter().find(|d| d.queried_name == mention.name)
            else {
                continue;
            };

            let target = match (&decision.matched_target, decision.match_type.is_match()) {
                (Some(target), true) => target.clone(),
                _ => {
                    if suggest_new && !out.new_entities.iter().any(|n| n.name == mention.name) {
                        out.new_entities.push(NewEntitySuggestion {
                            name: mention.name.clone(),
                            entity_type: mention.entity_type.clone(),
                            suggested_path: suggested_path(&mention.name, &mention.entity_type),
                            near_misses: decision.suggestions.clone(),
                        });
                    }
                    continue;
                }
            };

            let title = title_of(&target);
            let matched_type = decision
                .matched_type
                .as_deref()
                .unwrap_or(mention.entity_type.as_str());
            let key = type_folder(matched_type).to_lowercase();
            let entry = out.frontmatter.entry(key).or_default();
            let fm_link = format!("[[{title}]]");
            if !entry.contains(&fm_link) {
                entry.push(fm_link);
            }

            if linked.contains(&target) {
                continue;
            }
            let Some(offset) = locate(text, body_start, &protected, mention) else {
                debug!(name = %mention.name, "mention not found in body");
                continue;
            };

            let found = &text[offset..offset + mention.name.len()];
            let link = if found == title {
                format!("[[{title}]]")
            } else {
                format!("[[{title}|{found}]]")
            };
            out.wikilinks.push(WikilinkSuggestion {
                mention: found.to_string(),
                target: target.clone(),
                offset,
                length: found.len(),
                link,
                match_type: decision.match_type,
                confidence: decision.confidence,
            });
            linked.insert(target);
        }

        out.wikilinks.sort_by_key(|w| w.offset);
        info!(
            decisions = out.decisions.len(),
            wikilinks = out.wikilinks.len(),
            new_entities = out.new_entities.len(),
            "document processed"
        );
        Ok(out)
    }
}

/// Apply wikilink suggestions to `text`, back to front. Suggestions that
/// overlap an already-applied one, or whose span no longer matches, are skipped.
pub fn apply_wikilinks(text: &str, suggestions: &[WikilinkSuggestion]) -> String {
    let mut ordered: Vec<&WikilinkSuggestion> = suggestions.iter().collect();
    ordered.sort_by(|a, b| b.offset.cmp(&a.offset));

    let mut out = text.to_string();
    let mut limit = text.len();
    for s in ordered {
        let Some(end) = s.offset.checked_add(s.length) else {
            continue;
        };
        if end > limit || text.get(s.offset..end) != Some(s.mention.as_str()) {
            continue;
        }
        out.replace_range(s.offset..end, &s.link);
        limit = s.offset;
    }
    out
}

/// `People/Clare Attwell.md` → `Clare Attwell`.
fn title_of(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.strip_suffix(".md").unwrap_or(name)
}

/// Byte offset of a linkable occurrence of the mention: the hinted offset when
/// it checks out, otherwise the first whole-word, case-insensitive hit in the body.
fn locate(
    text: &str,
    body_start: usize,
    protected: &[Range<usize>],
    mention: &EntityMention,
) -> Option<usize> {
    let len = mention.name.len();
    if len == 0 {
        return None;
    }
    let usable = |start: usize| {
        let Some(end) = start.checked_add(len) else {
            return false;
        };
        start >= body_start
            && text
                .get(start..end)
                .is_some_and(|s| s.eq_ignore_ascii_case(&mention.name))
            && is_word_boundary(text, start, end)
            && !protected.iter().any(|r| r.start < end && start < r.end)
    };

    if let Some(hint) = mention.offset.filter(|&o| usable(o)) {
        return Some(hint);
    }

    let haystack = text[body_start..].to_ascii_lowercase();
    let needle = mention.name.to_ascii_lowercase();
    haystack
        .match_indices(&needle)
        .map(|(i, _)| body_start + i)
        .find(|&start| usable(start))
}

fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}
