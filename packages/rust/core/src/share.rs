//! Share payload builder.
//!
//! Starting from a root document, walks the reference graph breadth-first,
//! applying the share mode, an optional-reference budget, a payload byte
//! ceiling and a depth cap. Every reference evaluated along the way is kept
//! in the resulting [`ShareGraph`] with the reason it was included or skipped.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use notegraph_markdown::{
    BasenameIndex, ExtractedReference, LinkResolver, extract_references, has_extension,
    normalize_path,
};
use notegraph_shared::{
    LinkKind, NoteGraphError, Result, ShareConfig, ShareMode, validate_context_depth,
};

use crate::source::DocumentSource;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Parameters of one share build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRequest {
    /// Vault-relative path of the root document.
    pub root_path: String,
    pub mode: ShareMode,
    /// Optional dependencies allowed in `context_pack` mode, across the whole traversal.
    pub optional_limit: usize,
    /// Maximum traversal depth, in `[1, 4]`.
    pub context_depth: u8,
}

impl ShareRequest {
    /// A request using the configured defaults.
    pub fn from_config(root_path: impl Into<String>, config: &ShareConfig) -> Self {
        Self {
            root_path: root_path.into(),
            mode: config.mode,
            optional_limit: config.optional_limit,
            context_depth: config.context_depth,
        }
    }

    /// Parse and validate raw parameters; the mode is given by name.
    pub fn parse(
        root_path: impl Into<String>,
        mode: &str,
        optional_limit: usize,
        context_depth: u8,
    ) -> Result<Self> {
        let request = Self {
            root_path: root_path.into(),
            mode: mode.parse()?,
            optional_limit,
            context_depth,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        validate_context_depth(self.context_depth)?;
        if self.root_path.trim().is_empty() {
            return Err(NoteGraphError::validation("root path must not be empty"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Why a reference was included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeReason {
    RequiredReference,
    ContextPackOptional,
    /// The target was already bundled; only the edge is recorded.
    Dedup,
}

/// Why a reference was excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Unresolved,
    Mode,
    OptionalLimit,
    PayloadLimit,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::Unresolved => "unresolved",
            SkipReason::Mode => "mode",
            SkipReason::OptionalLimit => "optional_limit",
            SkipReason::PayloadLimit => "payload_limit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Root,
    Dependency,
}

/// One evaluated reference (an edge of the share graph).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareReference {
    pub source: String,
    pub source_depth: u8,
    pub raw_target: String,
    pub kind: LinkKind,
    pub required: bool,
    pub resolved_path: Option<String>,
    pub exists: bool,
    pub included: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_reason: Option<IncludeReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
}

impl ShareReference {
    fn discovered(reference: ExtractedReference, depth: u8) -> Self {
        Self {
            source: reference.source,
            source_depth: depth,
            raw_target: reference.target,
            kind: reference.kind,
            required: reference.required,
            resolved_path: None,
            exists: false,
            included: false,
            include_reason: None,
            skip_reason: None,
        }
    }

    fn include(mut self, reason: IncludeReason) -> Self {
        self.included = true;
        self.include_reason = Some(reason);
        self
    }

    fn skip(mut self, reason: SkipReason) -> Self {
        self.included = false;
        self.skip_reason = Some(reason);
        self
    }
}

/// A document discovered during traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub path: String,
    /// Minimum depth at which the document was discovered.
    pub depth: u8,
    pub included: bool,
    pub role: NodeRole,
}

/// A bundled dependency document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleDocument {
    pub path: String,
    pub depth: u8,
    pub required: bool,
    /// Document whose reference pulled this one in.
    pub parent: String,
    pub content: String,
    pub bytes: usize,
    /// Hex SHA-256 of `content`.
    pub content_hash: String,
}

/// Summary counters over all evaluated references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareSummary {
    pub total_references: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub included: usize,
    pub missing: usize,
    pub required_missing: usize,
    pub optional_missing: usize,
    /// Skip reason → count.
    pub excluded_by_reason: BTreeMap<String, usize>,
    pub node_count: usize,
    pub dependency_count: usize,
    /// Root plus bundled dependency bytes.
    pub total_bytes: usize,
}

/// Auditable report of one traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareGraph {
    /// Sorted by `(depth, path)`.
    pub nodes: Vec<GraphNode>,
    /// In evaluation order.
    pub edges: Vec<ShareReference>,
    /// Edges that were not included.
    pub missing: Vec<ShareReference>,
    pub requested_depth: u8,
    pub reached_depth: u8,
    pub summary: ShareSummary,
}

/// Result of [`ShareGraphBuilder::build`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharePayload {
    pub root_path: String,
    pub mode: ShareMode,
    pub root_content: String,
    pub references: Vec<ShareReference>,
    pub dependencies: Vec<BundleDocument>,
    pub graph: ShareGraph,
    pub built_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Traversal state
// ---------------------------------------------------------------------------

struct Traversal {
    queue: VecDeque<(String, u8)>,
    queued: HashSet<String>,
    processed: HashSet<String>,
    included: HashSet<String>,
    /// Content of queued documents awaiting processing.
    pending: HashMap<String, String>,
    nodes: BTreeMap<String, GraphNode>,
    edges: Vec<ShareReference>,
    dependencies: Vec<BundleDocument>,
    total_bytes: usize,
    optional_used: usize,
    reached_depth: u8,
}

impl Traversal {
    fn seed(root: &str, content: String) -> Self {
        let mut state = Self {
            queue: VecDeque::from([(root.to_string(), 0)]),
            queued: HashSet::from([root.to_string()]),
            processed: HashSet::new(),
            included: HashSet::from([root.to_string()]),
            pending: HashMap::new(),
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            dependencies: Vec::new(),
            total_bytes: content.len(),
            optional_used: 0,
            reached_depth: 0,
        };
        state.pending.insert(root.to_string(), content);
        state.nodes.insert(
            root.to_string(),
            GraphNode {
                path: root.to_string(),
                depth: 0,
                included: true,
                role: NodeRole::Root,
            },
        );
        state
    }

    fn discover(&mut self, path: &str, depth: u8) {
        self.nodes
            .entry(path.to_string())
            .and_modify(|node| node.depth = node.depth.min(depth))
            .or_insert_with(|| GraphNode {
                path: path.to_string(),
                depth,
                included: false,
                role: NodeRole::Dependency,
            });
    }

    fn mark_included(&mut self, path: &str) {
        self.included.insert(path.to_string());
        if let Some(node) = self.nodes.get_mut(path) {
            node.included = true;
        }
    }

    fn finish(self, requested_depth: u8) -> (ShareGraph, Vec<BundleDocument>) {
        let mut nodes: Vec<GraphNode> = self.nodes.into_values().collect();
        nodes.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.path.cmp(&b.path)));

        let missing: Vec<ShareReference> =
            self.edges.iter().filter(|e| !e.included).cloned().collect();

        let mut excluded_by_reason = BTreeMap::new();
        for reason in missing.iter().filter_map(|e| e.skip_reason) {
            *excluded_by_reason.entry(reason.as_str().to_string()).or_insert(0) += 1;
        }

        let resolved = self.edges.iter().filter(|e| e.exists).count();
        let summary = ShareSummary {
            total_references: self.edges.len(),
            resolved,
            unresolved: self.edges.len() - resolved,
            included: self.edges.len() - missing.len(),
            missing: missing.len(),
            required_missing: missing.iter().filter(|e| e.required).count(),
            optional_missing: missing.iter().filter(|e| !e.required).count(),
            excluded_by_reason,
            node_count: nodes.len(),
            dependency_count: self.dependencies.len(),
            total_bytes: self.total_bytes,
        };

        let graph = ShareGraph {
            nodes,
            edges: self.edges,
            missing,
            requested_depth,
            reached_depth: self.reached_depth,
            summary,
        };
        (graph, self.dependencies)
    }
}

// ---------------------------------------------------------------------------
// ShareGraphBuilder
// ---------------------------------------------------------------------------

/// Builds bounded share payloads over a [`DocumentSource`].
pub struct ShareGraphBuilder<'a, S> {
    source: &'a S,
    links: LinkResolver<'a>,
    max_payload_bytes: usize,
}

impl<'a, S: DocumentSource> ShareGraphBuilder<'a, S> {
    pub fn new(source: &'a S, basenames: &'a BasenameIndex, max_payload_bytes: usize) -> Self {
        Self {
            source,
            links: LinkResolver::new(basenames),
            max_payload_bytes,
        }
    }

    /// Builder honoring the configured payload ceiling.
    pub fn with_config(source: &'a S, basenames: &'a BasenameIndex, config: &ShareConfig) -> Self {
        Self::new(source, basenames, config.max_payload_bytes)
    }

    /// Traverse from `request.root_path` and assemble the payload.
    ///
    /// Fails only for an invalid request or a missing root; unreadable
    /// dependencies are reported as unresolved edges.
    #[instrument(skip_all, fields(root = %request.root_path, mode = %request.mode, depth = request.context_depth))]
    pub async fn build(&self, request: &ShareRequest) -> Result<SharePayload> {
        request.validate()?;

        let (root, root_content) = self.read_root(&request.root_path).await?;
        let mut state = Traversal::seed(&root, root_content.clone());

        while let Some((path, depth)) = state.queue.pop_front() {
            if !state.processed.insert(path.clone()) {
                continue;
            }
            state.reached_depth = state.reached_depth.max(depth);

            let Some(content) = state.pending.remove(&path) else {
                continue;
            };
            if !is_markdown(&path) {
                continue;
            }

            for reference in extract_references(&path, &content) {
                let edge = self.evaluate(request, &mut state, reference, depth).await;
                debug!(
                    source = %edge.source,
                    target = %edge.raw_target,
                    resolved = ?edge.resolved_path,
                    included = edge.included,
                    include_reason = ?edge.include_reason,
                    skip_reason = ?edge.skip_reason,
                    "reference evaluated"
                );
                state.edges.push(edge);
            }
        }

        let (graph, dependencies) = state.finish(request.context_depth);

        info!(
            dependencies = graph.summary.dependency_count,
            references = graph.summary.total_references,
            missing = graph.summary.missing,
            reached_depth = graph.reached_depth,
            total_bytes = graph.summary.total_bytes,
            "share payload built"
        );

        Ok(SharePayload {
            root_path: root,
            mode: request.mode,
            root_content,
            references: graph.edges.clone(),
            dependencies,
            graph,
            built_at: Utc::now(),
        })
    }

    /// Normalized root path and its content; an extensionless root also tries `.md`.
    async fn read_root(&self, raw: &str) -> Result<(String, String)> {
        let trimmed = raw.trim().trim_start_matches('/');
        let Some(path) = normalize_path(trimmed) else {
            return Err(NoteGraphError::validation(format!(
                "root path {raw:?} is outside the vault"
            )));
        };

        let mut candidates = vec![path.clone()];
        if !has_extension(&path) {
            candidates.push(format!("{path}.md"));
        }
        for candidate in candidates {
            if let Some(content) = self.source.read(&candidate).await {
                return Ok((candidate, content));
            }
        }
        Err(NoteGraphError::not_found(path))
    }

    async fn evaluate(
        &self,
        request: &ShareRequest,
        state: &mut Traversal,
        reference: ExtractedReference,
        depth: u8,
    ) -> ShareReference {
        let mut resolved = None;
        for candidate in self.links.candidates(&reference.target, &reference.source) {
            if self.source.exists(&candidate).await {
                resolved = Some(candidate);
                break;
            }
        }

        let parent = reference.source.clone();
        let required = reference.required;
        let mut edge = ShareReference::discovered(reference, depth);

        let Some(target) = resolved else {
            return edge.skip(SkipReason::Unresolved);
        };
        edge.resolved_path = Some(target.clone());
        edge.exists = true;
        let next_depth = depth.saturating_add(1);
        state.discover(&target, next_depth);

        let wanted = match request.mode {
            ShareMode::RootOnly => false,
            ShareMode::RootPlusRequired => required,
            ShareMode::ContextPack => required || state.optional_used < request.optional_limit,
        };
        if !wanted {
            let reason = match request.mode {
                ShareMode::ContextPack => SkipReason::OptionalLimit,
                _ => SkipReason::Mode,
            };
            return edge.skip(reason);
        }

        if state.included.contains(&target) {
            return edge.include(IncludeReason::Dedup);
        }

        let Some(content) = self.source.read(&target).await else {
            edge.exists = false;
            return edge.skip(SkipReason::Unresolved);
        };

        let bytes = content.len();
        if state.total_bytes + bytes > self.max_payload_bytes {
            return edge.skip(SkipReason::PayloadLimit);
        }

        state.total_bytes += bytes;
        if !required {
            state.optional_used += 1;
        }
        state.mark_included(&target);

        if request.context_depth > next_depth && state.queued.insert(target.clone()) {
            state.queue.push_back((target.clone(), next_depth));
            state.pending.insert(target.clone(), content.clone());
        }

        state.dependencies.push(BundleDocument {
            content_hash: content_hash(&content),
            path: target,
            depth: next_depth,
            required,
            parent,
            bytes,
            content,
        });

        edge.include(if required {
            IncludeReason::RequiredReference
        } else {
            IncludeReason::ContextPackOptional
        })
    }
}

/// Build a payload from raw parameters, rejecting an unknown mode or a depth
/// outside `[1, 4]` before any document is read.
pub async fn build_share_payload<S: DocumentSource>(
    source: &S,
    basenames: &BasenameIndex,
    config: &ShareConfig,
    root_path: &str,
    mode: &str,
    optional_limit: usize,
    context_depth: u8,
) -> Result<SharePayload> {
    let request = ShareRequest::parse(root_path, mode, optional_limit, context_depth)?;
    ShareGraphBuilder::with_config(source, basenames, config)
        .build(&request)
        .await
}

fn is_markdown(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(".md")
}

fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FsVault, MemoryVault};

    fn vault(docs: &[(&str, &str)]) -> (MemoryVault, BasenameIndex) {
        let vault: MemoryVault = docs.iter().copied().collect();
        let index = BasenameIndex::from_paths(vault.paths());
        (vault, index)
    }

    fn request(root: &str, mode: ShareMode, optional_limit: usize, depth: u8) -> ShareRequest {
        ShareRequest {
            root_path: root.to_string(),
            mode,
            optional_limit,
            context_depth: depth,
        }
    }

    async fn build(
        docs: &[(&str, &str)],
        req: ShareRequest,
        max_bytes: usize,
    ) -> Result<SharePayload> {
        let (vault, index) = vault(docs);
        ShareGraphBuilder::new(&vault, &index, max_bytes).build(&req).await
    }

    fn bundle_paths(payload: &SharePayload) -> Vec<&str> {
        payload.dependencies.iter().map(|d| d.path.as_str()).collect()
    }

    #[tokio::test]
    async fn required_embed_bundled_missing_wikilink_reported() {
        let payload = build(
            &[
                ("Root.md", "Intro ![[Embedded]] and see [[Nowhere]]."),
                ("Embedded.md", "embedded body"),
            ],
            request("Root.md", ShareMode::RootPlusRequired, 5, 1),
            1024,
        )
        .await
        .unwrap();

        assert_eq!(bundle_paths(&payload), vec!["Embedded.md"]);
        let dep = &payload.dependencies[0];
        assert!(dep.required);
        assert_eq!(dep.parent, "Root.md");
        assert_eq!(dep.depth, 1);
        assert_eq!(dep.bytes, "embedded body".len());
        assert_eq!(dep.content_hash.len(), 64);

        let nowhere = payload
            .graph
            .edges
            .iter()
            .find(|e| e.raw_target == "Nowhere")
            .unwrap();
        assert!(!nowhere.included);
        assert!(!nowhere.exists);
        assert_eq!(nowhere.skip_reason, Some(SkipReason::Unresolved));

        let summary = &payload.graph.summary;
        assert_eq!(summary.required_missing, 0);
        assert_eq!(summary.optional_missing, 1);
        assert_eq!(summary.total_references, 2);
        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.excluded_by_reason.get("unresolved"), Some(&1));
        assert_eq!(payload.references, payload.graph.edges);
    }

    #[tokio::test]
    async fn cycle_terminates_without_duplicates() {
        let payload = build(
            &[("A.md", "![[B]]"), ("B.md", "![[A]]")],
            request("A.md", ShareMode::ContextPack, 5, 4),
            1024,
        )
        .await
        .unwrap();

        assert_eq!(bundle_paths(&payload), vec!["B.md"]);
        let nodes: Vec<(&str, u8, NodeRole)> = payload
            .graph
            .nodes
            .iter()
            .map(|n| (n.path.as_str(), n.depth, n.role))
            .collect();
        assert_eq!(nodes, vec![("A.md", 0, NodeRole::Root), ("B.md", 1, NodeRole::Dependency)]);

        let back = &payload.graph.edges[1];
        assert_eq!(back.source, "B.md");
        assert_eq!(back.include_reason, Some(IncludeReason::Dedup));
        assert_eq!(payload.graph.reached_depth, 1);
    }

    #[tokio::test]
    async fn shared_dependency_bundled_once() {
        let payload = build(
            &[
                ("Root.md", "![[B]] ![[C]]"),
                ("B.md", "![[C]]"),
                ("C.md", "leaf"),
            ],
            request("Root.md", ShareMode::RootPlusRequired, 0, 3),
            1024,
        )
        .await
        .unwrap();

        assert_eq!(bundle_paths(&payload), vec!["B.md", "C.md"]);
        let dedup = payload
            .graph
            .edges
            .iter()
            .filter(|e| e.include_reason == Some(IncludeReason::Dedup))
            .count();
        assert_eq!(dedup, 1);
        assert_eq!(payload.graph.summary.missing, 0);
    }

    #[tokio::test]
    async fn payload_ceiling_counts_root() {
        // Root is 10 bytes; each dependency 20. Ceiling admits exactly one.
        let payload = build(
            &[
                ("Root.md", "![[X]]![[Y"),
                ("X.md", "xxxxxxxxxxxxxxxxxxxx"),
                ("Y.md", "yyyyyyyyyyyyyyyyyyyy"),
            ],
            request("Root.md", ShareMode::RootPlusRequired, 0, 1),
            30,
        )
        .await
        .unwrap();
        assert_eq!(bundle_paths(&payload), vec!["X.md"]);
        assert_eq!(payload.graph.summary.total_bytes, 30);

        let payload = build(
            &[
                ("Root.md", "![[X]] ![[Y]]"),
                ("X.md", "xxxxxxxxxxxxxxxxxxxx"),
                ("Y.md", "yyyyyyyyyyyyyyyyyyyy"),
            ],
            request("Root.md", ShareMode::RootPlusRequired, 0, 1),
            40,
        )
        .await
        .unwrap();
        assert_eq!(bundle_paths(&payload), vec!["X.md"]);
        let y = &payload.graph.edges[1];
        assert_eq!(y.skip_reason, Some(SkipReason::PayloadLimit));
        assert!(y.exists);
        assert_eq!(payload.graph.summary.required_missing, 1);
    }

    #[tokio::test]
    async fn oversized_root_still_returned() {
        let payload = build(
            &[("Root.md", "a long root document ![[X]]"), ("X.md", "x")],
            request("Root.md", ShareMode::RootPlusRequired, 0, 1),
            4,
        )
        .await
        .unwrap();
        assert!(payload.dependencies.is_empty());
        assert_eq!(payload.graph.edges[0].skip_reason, Some(SkipReason::PayloadLimit));
        assert!(payload.root_content.starts_with("a long root"));
    }

    #[tokio::test]
    async fn optional_budget_is_global() {
        let payload = build(
            &[
                ("Root.md", "[[P]] ![[Hub]]"),
                ("P.md", "p"),
                ("Hub.md", "[[Q]]"),
                ("Q.md", "q"),
            ],
            request("Root.md", ShareMode::ContextPack, 1, 2),
            1024,
        )
        .await
        .unwrap();

        assert_eq!(bundle_paths(&payload), vec!["P.md", "Hub.md"]);
        let q = payload.graph.edges.iter().find(|e| e.raw_target == "Q").unwrap();
        assert_eq!(q.skip_reason, Some(SkipReason::OptionalLimit));
        assert_eq!(q.source_depth, 1);
        let p = payload.graph.edges.iter().find(|e| e.raw_target == "P").unwrap();
        assert_eq!(p.include_reason, Some(IncludeReason::ContextPackOptional));
        assert_eq!(payload.graph.summary.excluded_by_reason.get("optional_limit"), Some(&1));
    }

    #[tokio::test]
    async fn root_only_includes_nothing() {
        let payload = build(
            &[("Root.md", "![[A]] [[B]] [[Gone]]"), ("A.md", "a"), ("B.md", "b")],
            request("Root.md", ShareMode::RootOnly, 5, 1),
            1024,
        )
        .await
        .unwrap();

        assert!(payload.dependencies.is_empty());
        let reasons: Vec<Option<SkipReason>> =
            payload.graph.edges.iter().map(|e| e.skip_reason).collect();
        assert_eq!(
            reasons,
            vec![
                Some(SkipReason::Mode),
                Some(SkipReason::Mode),
                Some(SkipReason::Unresolved)
            ]
        );
        // Resolved targets are still discovered as nodes.
        assert_eq!(payload.graph.nodes.len(), 3);
        assert!(payload.graph.nodes.iter().skip(1).all(|n| !n.included));
    }

    #[tokio::test]
    async fn depth_cap_stops_enqueueing() {
        let payload = build(
            &[
                ("A.md", "![[B]]"),
                ("B.md", "![[C]]"),
                ("C.md", "![[D]]"),
                ("D.md", "d"),
            ],
            request("A.md", ShareMode::RootPlusRequired, 0, 2),
            1024,
        )
        .await
        .unwrap();

        assert_eq!(bundle_paths(&payload), vec!["B.md", "C.md"]);
        assert_eq!(payload.graph.requested_depth, 2);
        assert_eq!(payload.graph.reached_depth, 1);
        assert!(payload.graph.nodes.iter().all(|n| n.path != "D.md"));
    }

    #[tokio::test]
    async fn non_markdown_dependencies_are_leaves() {
        let payload = build(
            &[("Root.md", "![diagram](img/flow.svg)"), ("img/flow.svg", "<svg>[[Nope]]</svg>")],
            request("Root.md", ShareMode::RootPlusRequired, 0, 4),
            1024,
        )
        .await
        .unwrap();
        assert_eq!(bundle_paths(&payload), vec!["img/flow.svg"]);
        assert_eq!(payload.graph.edges.len(), 1);
    }

    #[tokio::test]
    async fn missing_root_is_not_found() {
        let err = build(&[], request("Ghost.md", ShareMode::RootOnly, 0, 1), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, NoteGraphError::NotFound { .. }));
    }

    #[tokio::test]
    async fn extensionless_root_resolves_to_markdown() {
        let payload = build(
            &[("Notes/Root.md", "plain")],
            request("/Notes/Root", ShareMode::RootOnly, 0, 1),
            1024,
        )
        .await
        .unwrap();
        assert_eq!(payload.root_path, "Notes/Root.md");
    }

    #[tokio::test]
    async fn invalid_parameters_rejected_before_reading() {
        let (vault, index) = vault(&[("Root.md", "x")]);
        let config = ShareConfig::default();

        let err = build_share_payload(&vault, &index, &config, "Root.md", "everything", 0, 1)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("root_plus_required"));

        let err = build_share_payload(&vault, &index, &config, "Root.md", "context_pack", 0, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, NoteGraphError::Validation { .. }));

        let payload =
            build_share_payload(&vault, &index, &config, "Root.md", "context_pack", 0, 4)
                .await
                .unwrap();
        assert_eq!(payload.mode, ShareMode::ContextPack);
    }

    #[tokio::test]
    async fn builds_from_filesystem_vault() {
        let root = std::env::temp_dir().join(format!("ng-share-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(root.join("Projects")).unwrap();
        std::fs::create_dir_all(root.join("Archive")).unwrap();
        std::fs::write(root.join("Projects/Roadmap.md"), "---\nrelated: \"[[Plan]]\"\n---\n![[Plan]]").unwrap();
        std::fs::write(root.join("Archive/Plan.md"), "the plan").unwrap();

        let vault = FsVault::new(&root);
        let index = BasenameIndex::build(&root).unwrap();
        let payload = ShareGraphBuilder::new(&vault, &index, 1024)
            .build(&request("Projects/Roadmap.md", ShareMode::ContextPack, 5, 1))
            .await
            .unwrap();

        assert_eq!(bundle_paths(&payload), vec!["Archive/Plan.md"]);
        let kinds: Vec<(LinkKind, Option<IncludeReason>)> = payload
            .graph
            .edges
            .iter()
            .map(|e| (e.kind, e.include_reason))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (LinkKind::Embed, Some(IncludeReason::RequiredReference)),
                (LinkKind::FrontmatterRef, Some(IncludeReason::Dedup)),
            ]
        );

        let _ = std::fs::remove_dir_all(&root);
    }
}
