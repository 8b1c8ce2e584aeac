//! Multi-tier entity resolution: exact name, alias, then scoped fuzzy match.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use notegraph_shared::{KnownEntity, MatchType, NoteGraphError, ResolverConfig, Result};

use crate::corpus::{CorpusCache, CorpusProvider};
use crate::index::EntityIndex;
use crate::similarity::{jaro_winkler, normalize};

/// Confidence reported for an alias hit.
pub const ALIAS_CONFIDENCE: f64 = 0.95;

/// Maximum number of suggestions attached to a decision.
pub const MAX_SUGGESTIONS: usize = 5;

/// Characters stripped from suggested file names.
const UNSAFE_PATH_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A candidate surfaced alongside a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub path: String,
    pub confidence: f64,
    pub match_type: MatchType,
}

/// Outcome of resolving one mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionDecision {
    pub queried_name: String,
    pub queried_type: String,
    pub match_type: MatchType,
    /// In `[0, 1]`; `0` for `new`.
    pub confidence: f64,
    /// Path of the matched entity, `None` for `new`.
    pub matched_target: Option<String>,
    /// Type of the matched entity, which may differ from `queried_type`.
    #[serde(default)]
    pub matched_type: Option<String>,
    /// At most five, sorted by descending confidence.
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

/// One `(name, type)` query for [`EntityResolver::resolve_all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityQuery {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
}

impl EntityQuery {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// EntityResolver
// ---------------------------------------------------------------------------

/// Resolves free-text mentions against a loaded entity snapshot.
///
/// The index is held behind an `Arc` and replaced wholesale by
/// [`load_entities`](Self::load_entities); in-flight resolutions keep the
/// snapshot they started with.
pub struct EntityResolver {
    config: ResolverConfig,
    index: RwLock<Option<Arc<EntityIndex>>>,
}

impl EntityResolver {
    /// Create a resolver with a validated config and no entities loaded.
    pub fn new(config: ResolverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            index: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.index.read().is_some()
    }

    /// Number of entities in the current snapshot (0 before loading).
    pub fn entity_count(&self) -> usize {
        self.index.read().as_ref().map_or(0, |idx| idx.len())
    }

    /// Build a fresh index and swap it in.
    #[instrument(skip_all, fields(entity_count = entities.len()))]
    pub fn load_entities(&self, entities: Vec<KnownEntity>) {
        let index = Arc::new(EntityIndex::build(entities));
        info!(
            entities = index.len(),
            collisions = index.collisions(),
            "entity index loaded"
        );
        *self.index.write() = Some(index);
    }

    /// Reload from a corpus cache (no-op fetch when the cache is fresh).
    pub fn refresh<P: CorpusProvider>(&self, cache: &CorpusCache<P>) -> Result<()> {
        let snapshot = cache.snapshot()?;
        self.load_entities(snapshot.as_ref().clone());
        Ok(())
    }

    fn snapshot(&self) -> Result<Arc<EntityIndex>> {
        self.index
            .read()
            .as_ref()
            .cloned()
            .ok_or(NoteGraphError::NotInitialized)
    }

    /// Resolve one mention.
    #[instrument(skip(self), level = "debug")]
    pub fn resolve(&self, name: &str, entity_type: &str) -> Result<ResolutionDecision> {
        let index = self.snapshot()?;
        Ok(self.resolve_in(&index, name, entity_type))
    }

    /// Resolve many mentions against one snapshot. Duplicate names keep the
    /// last decision.
    pub fn resolve_all(&self, queries: &[EntityQuery]) -> Result<HashMap<String, ResolutionDecision>> {
        let index = self.snapshot()?;
        let mut out = HashMap::with_capacity(queries.len());
        for query in queries {
            let decision = self.resolve_in(&index, &query.name, &query.entity_type);
            out.insert(query.name.clone(), decision);
        }
        Ok(out)
    }

    fn resolve_in(&self, index: &EntityIndex, name: &str, entity_type: &str) -> ResolutionDecision {
        let query = normalize(name);
        let decision = |match_type, confidence, target: Option<&KnownEntity>, suggestions| {
            ResolutionDecision {
                queried_name: name.to_string(),
                queried_type: entity_type.to_string(),
                match_type,
                confidence,
                matched_target: target.map(|e| e.path.clone()),
                matched_type: target.map(|e| e.entity_type.clone()),
                suggestions,
            }
        };

        if let Some(entity) = index.by_name(&query) {
            debug!(%name, target = %entity.path, "exact match");
            return decision(MatchType::Exact, 1.0, Some(entity), Vec::new());
        }

        if let Some(entity) = index.by_alias(&query) {
            debug!(%name, target = %entity.path, "alias match");
            return decision(MatchType::Alias, ALIAS_CONFIDENCE, Some(entity), Vec::new());
        }

        let threshold = self.config.threshold_for(entity_type);
        let floor = self.config.min_confidence;

        // Same-type candidates first; the whole corpus when the type is empty.
        let candidates: Box<dyn Iterator<Item = &KnownEntity> + '_> = if index.has_type(entity_type) {
            Box::new(index.of_type(entity_type))
        } else {
            Box::new(index.entities().iter())
        };

        let mut best: Option<(&KnownEntity, f64)> = None;
        let mut suggestions = Vec::new();

        for candidate in candidates {
            let score = candidate_score(&query, candidate);

            if score >= threshold && best.is_none_or(|(_, s)| score > s) {
                best = Some((candidate, score));
            }
            if score >= floor {
                suggestions.push(Suggestion {
                    path: candidate.path.clone(),
                    confidence: score,
                    match_type: MatchType::Fuzzy,
                });
            }
        }

        suggestions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        suggestions.truncate(MAX_SUGGESTIONS);

        match best {
            Some((entity, score)) => {
                debug!(%name, target = %entity.path, score, threshold, "fuzzy match");
                decision(MatchType::Fuzzy, score, Some(entity), suggestions)
            }
            None => {
                debug!(%name, near_misses = suggestions.len(), "no match, new entity");
                decision(MatchType::New, 0.0, None, suggestions)
            }
        }
    }
}

/// Best Jaro-Winkler score of `query` against a candidate's name and aliases.
fn candidate_score(query: &str, candidate: &KnownEntity) -> f64 {
    std::iter::once(&candidate.name)
        .chain(&candidate.aliases)
        .map(|s| jaro_winkler(query, &normalize(s)))
        .fold(0.0, f64::max)
}

// ---------------------------------------------------------------------------
// Suggested paths
// ---------------------------------------------------------------------------

/// Canonical folder for an entity type.
pub fn type_folder(entity_type: &str) -> &'static str {
    match entity_type {
        "Person" => "People",
        "Organization" => "Organizations",
        "Location" => "Locations",
        "Project" => "Projects",
        _ => "Concepts",
    }
}

/// Where a new entity of this name and type would live. Touches no storage.
pub fn suggested_path(name: &str, entity_type: &str) -> String {
    let stripped: String = name.chars().filter(|c| !UNSAFE_PATH_CHARS.contains(c)).collect();
    let safe = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("{}/{safe}", type_folder(entity_type))
}
