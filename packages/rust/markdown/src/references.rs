//! Outgoing reference extraction from a markdown document.
//!
//! Recognizes, in document order:
//! - `![[target]]` embeds and `[[target]]` wikilinks (alias and anchor stripped)
//! - `![label](target)` markdown embeds and `[label](target)` links
//!
//! followed by references found in frontmatter string values. Duplicates of
//! the same `(kind, target)` collapse into one reference whose `required`
//! flag is the OR of every occurrence.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use notegraph_shared::LinkKind;

use crate::frontmatter::parse_frontmatter;
use crate::links::sanitize_target;

/// `![[target]]` or `[[target]]`; group 1 holds the `!`.
static WIKILINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(!?)\[\[([^\[\]]+)\]\]").expect("wikilink regex"));

/// `![label](target)` or `[label](target)`.
static MARKDOWN_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(!?)\[([^\[\]]*)\]\(([^()]*)\)").expect("markdown link regex")
});

/// An outgoing reference from one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedReference {
    /// Path of the referencing document.
    pub source: String,
    /// Cleaned target as written (no alias, anchor or query).
    pub target: String,
    pub kind: LinkKind,
    /// Embed-style references inline their target.
    pub required: bool,
}

/// Extract, order and deduplicate every outgoing reference of `text`.
pub fn extract_references(source_path: &str, text: &str) -> Vec<ExtractedReference> {
    let (frontmatter, body) = parse_frontmatter(text);

    let mut found: Vec<(usize, LinkKind, String)> = Vec::new();

    for caps in WIKILINK_RE.captures_iter(body) {
        let kind = if caps[1].is_empty() {
            LinkKind::Wikilink
        } else {
            LinkKind::Embed
        };
        if let Some(target) = wikilink_target(&caps[2]) {
            found.push((caps.get(0).map_or(0, |m| m.start()), kind, target));
        }
    }

    for caps in MARKDOWN_LINK_RE.captures_iter(body) {
        let kind = if caps[1].is_empty() {
            LinkKind::MarkdownLink
        } else {
            LinkKind::MarkdownEmbed
        };
        if let Some(target) = markdown_target(&caps[3]) {
            found.push((caps.get(0).map_or(0, |m| m.start()), kind, target));
        }
    }

    found.sort_by_key(|(pos, _, _)| *pos);

    let mut raw: Vec<(LinkKind, String)> =
        found.into_iter().map(|(_, kind, target)| (kind, target)).collect();

    if let Some(value) = frontmatter {
        let mut targets = Vec::new();
        collect_frontmatter_targets(&value, &mut targets);
        raw.extend(targets.into_iter().map(|t| (LinkKind::FrontmatterRef, t)));
    }

    dedup(source_path, raw)
}

/// Wikilink targets from a free string (`[[a]]` → `a`), in order.
pub fn wikilink_targets(text: &str) -> Vec<String> {
    WIKILINK_RE
        .captures_iter(text)
        .filter_map(|caps| wikilink_target(&caps[2]))
        .collect()
}

/// `target|alias#anchor` → `target`.
fn wikilink_target(inner: &str) -> Option<String> {
    let target = inner.split('|').next().unwrap_or(inner);
    // Obsidian escapes the pipe inside tables as `\|`.
    let target = target.trim_end_matches('\\');
    let target = target.split('#').next().unwrap_or(target).trim();
    (!target.is_empty()).then(|| target.to_string())
}

/// `<path with spaces>` or the first token of `path "title"`, sanitized.
fn markdown_target(inner: &str) -> Option<String> {
    let inner = inner.trim();
    let token = match inner.strip_prefix('<') {
        Some(rest) => rest.split('>').next().unwrap_or(rest),
        None => inner.split_whitespace().next().unwrap_or(""),
    };
    sanitize_target(token)
}

fn collect_frontmatter_targets(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            let embedded = wikilink_targets(s);
            if !embedded.is_empty() {
                out.extend(embedded);
            } else if s.trim_end().ends_with(".md") || s.contains('/') {
                if let Some(target) = sanitize_target(s) {
                    out.push(target);
                }
            }
        }
        Value::Sequence(items) => {
            for item in items {
                collect_frontmatter_targets(item, out);
            }
        }
        Value::Mapping(map) => {
            for (_, item) in map {
                collect_frontmatter_targets(item, out);
            }
        }
        Value::Tagged(tagged) => collect_frontmatter_targets(&tagged.value, out),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

fn dedup_key(target: &str) -> String {
    target.replace('\\', "/").to_lowercase()
}

fn dedup(source_path: &str, raw: Vec<(LinkKind, String)>) -> Vec<ExtractedReference> {
    let mut seen: HashMap<(LinkKind, String), usize> = HashMap::new();
    let mut out: Vec<ExtractedReference> = Vec::new();

    for (kind, target) in raw {
        let required = kind.is_required();
        match seen.get(&(kind, dedup_key(&target))) {
            Some(&idx) => out[idx].required |= required,
            None => {
                seen.insert((kind, dedup_key(&target)), out.len());
                out.push(ExtractedReference {
                    source: source_path.to_string(),
                    target,
                    kind,
                    required,
                });
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(refs: &[ExtractedReference]) -> Vec<(LinkKind, &str, bool)> {
        refs.iter()
            .map(|r| (r.kind, r.target.as_str(), r.required))
            .collect()
    }

    #[test]
    fn extracts_all_body_forms_in_order() {
        let text = "See [[Plan|the plan]] and ![[Diagram#Top]].\n\
                    Read [the guide](docs/Guide.md) or ![chart](img/chart.png \"Chart\").";
        let refs = extract_references("Notes/Root.md", text);
        assert_eq!(
            targets(&refs),
            vec![
                (LinkKind::Wikilink, "Plan", false),
                (LinkKind::Embed, "Diagram", true),
                (LinkKind::MarkdownLink, "docs/Guide.md", false),
                (LinkKind::MarkdownEmbed, "img/chart.png", true),
            ]
        );
        assert!(refs.iter().all(|r| r.source == "Notes/Root.md"));
    }

    #[test]
    fn adjacent_wikilinks_both_found() {
        let refs = extract_references("a.md", "[[One]][[Two]]![[Three]]");
        let names: Vec<&str> = refs.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(names, vec!["One", "Two", "Three"]);
    }

    #[test]
    fn external_and_anchor_markdown_links_dropped() {
        let text = "[site](https://example.com) [top](#intro) [mail](mailto:a@b.c) \
                    [local](My%20Note.md#part) [<spaced>](<With Space.md>)";
        let refs = extract_references("a.md", text);
        assert_eq!(
            targets(&refs),
            vec![
                (LinkKind::MarkdownLink, "My Note.md", false),
                (LinkKind::MarkdownLink, "With Space.md", false),
            ]
        );
    }

    #[test]
    fn duplicates_merge_required_flag() {
        let text = "[[Plan]] then [[plan#section]] and [[Plan|again]]";
        let refs = extract_references("a.md", text);
        assert_eq!(refs.len(), 1);
        assert!(!refs[0].required);

        // Different kinds stay separate.
        let refs = extract_references("a.md", "[[Plan]] ![[Plan]]");
        assert_eq!(refs.len(), 2);
        assert!(refs[1].required);
    }

    #[test]
    fn frontmatter_references_follow_body() {
        let text = "---\n\
                    title: Root\n\
                    related: \"[[Alpha]] and [[Beta|b]]\"\n\
                    attachments:\n  - files/brief.md\n  - https://example.com/x\n\
                    nested:\n  deeper:\n    source: Archive/Old Note\n\
                    count: 3\n\
                    ---\n\
                    Body with [[Gamma]]";
        let refs = extract_references("Root.md", text);
        assert_eq!(
            targets(&refs),
            vec![
                (LinkKind::Wikilink, "Gamma", false),
                (LinkKind::FrontmatterRef, "Alpha", false),
                (LinkKind::FrontmatterRef, "Beta", false),
                (LinkKind::FrontmatterRef, "files/brief.md", false),
                (LinkKind::FrontmatterRef, "Archive/Old Note", false),
            ]
        );
    }

    #[test]
    fn malformed_frontmatter_ignored() {
        let text = "---\nrelated: [[[broken\n---\n![[Embed]]";
        let refs = extract_references("a.md", text);
        assert_eq!(targets(&refs), vec![(LinkKind::Embed, "Embed", true)]);
    }

    #[test]
    fn frontmatter_text_not_scanned_as_body() {
        let text = "---\nnote: plain text\n---\nno links here";
        assert!(extract_references("a.md", text).is_empty());
    }

    #[test]
    fn empty_targets_skipped() {
        let refs = extract_references("a.md", "[[#Heading]] [[ |alias]] [empty]()");
        assert!(refs.is_empty());
    }

    #[test]
    fn table_escaped_pipe() {
        let refs = extract_references("a.md", "| [[Plan\\|plan]] |");
        assert_eq!(refs[0].target, "Plan");
    }
}
