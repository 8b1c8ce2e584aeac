//! Link target sanitizing and resolution to vault-relative paths.
//!
//! Resolution order for a target referenced from `dir/source.md`:
//! 1. vault-root-relative when the target starts with `/`, otherwise relative
//!    to `dir/`
//! 2. the target taken from the vault root, when it contains a `/`
//! 3. for bare titles (no `/`, no extension), every note with that file name
//!
//! Extensionless targets get `.md` appended.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument, warn};
use walkdir::{DirEntry, WalkDir};

use notegraph_shared::{NoteGraphError, Result};

/// Matches a URI scheme prefix (`https:`, `mailto:`, `obsidian:`, ...).
static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("scheme regex"));

/// Clean a raw link target.
///
/// Strips angle brackets, percent-decodes, drops external-scheme and
/// anchor-only targets, and cuts any `?query` / `#anchor` suffix.
pub fn sanitize_target(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let unwrapped = trimmed
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(trimmed);

    let decoded = urlencoding::decode(unwrapped)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| unwrapped.to_string());
    let decoded = decoded.trim();

    if decoded.is_empty() || decoded.starts_with('#') || SCHEME_RE.is_match(decoded) {
        return None;
    }

    let end = decoded.find(['?', '#']).unwrap_or(decoded.len());
    let target = decoded[..end].trim();
    (!target.is_empty()).then(|| target.to_string())
}

/// Whether the last path segment carries a short alphanumeric extension.
pub fn has_extension(target: &str) -> bool {
    let name = target.rsplit('/').next().unwrap_or(target);
    match name.rfind('.') {
        Some(0) | None => false,
        Some(dot) => {
            let ext = &name[dot + 1..];
            (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
    }
}

/// Resolve `.` and `..` segments. `None` when the path climbs above the root.
pub fn normalize_path(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}

fn parent_dir(path: &str) -> &str {
    path.rfind('/').map_or("", |i| &path[..i])
}

// ---------------------------------------------------------------------------
// BasenameIndex
// ---------------------------------------------------------------------------

/// Lowercase `<name>.md` → vault-relative paths sharing that file name.
#[derive(Debug, Clone, Default)]
pub struct BasenameIndex {
    by_name: HashMap<String, Vec<String>>,
}

impl BasenameIndex {
    /// Walk `root` for markdown files. Symlinks are not followed and hidden
    /// directories are skipped; paths are listed in file-name order.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn build(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(NoteGraphError::io(
                root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "vault root is not a directory"),
            ));
        }

        let mut index = Self::default();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden_dir(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable vault entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(root) else {
                continue;
            };
            index.insert(&rel.to_string_lossy().replace('\\', "/"));
        }

        debug!(names = index.by_name.len(), "basename index built");
        Ok(index)
    }

    /// Build from known vault-relative paths (non-markdown paths are ignored).
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::default();
        for path in paths {
            index.insert(path.as_ref());
        }
        index
    }

    fn insert(&mut self, rel_path: &str) {
        let name = rel_path.rsplit('/').next().unwrap_or(rel_path).to_lowercase();
        if name.ends_with(".md") {
            self.by_name.entry(name).or_default().push(rel_path.to_string());
        }
    }

    /// Paths whose file name is `<title>.md`, case-insensitively.
    pub fn lookup(&self, title: &str) -> &[String] {
        self.by_name
            .get(&format!("{}.md", title.to_lowercase()))
            .map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name().to_string_lossy().starts_with('.')
}

// ---------------------------------------------------------------------------
// LinkResolver
// ---------------------------------------------------------------------------

/// Turns raw link targets into ordered candidate paths.
#[derive(Debug, Clone, Copy)]
pub struct LinkResolver<'a> {
    basenames: &'a BasenameIndex,
}

impl<'a> LinkResolver<'a> {
    pub fn new(basenames: &'a BasenameIndex) -> Self {
        Self { basenames }
    }

    /// Candidate vault-relative paths for `raw`, most specific first.
    pub fn candidates(&self, raw: &str, source_path: &str) -> Vec<String> {
        let Some(target) = sanitize_target(raw) else {
            return Vec::new();
        };
        let target = target.replace('\\', "/");
        let with_ext = has_extension(&target);
        let finish = |p: String| if with_ext { p } else { format!("{p}.md") };

        let mut out: Vec<String> = Vec::new();
        let mut push = |candidate: Option<String>| {
            if let Some(c) = candidate.map(&finish) {
                if !out.contains(&c) {
                    out.push(c);
                }
            }
        };

        if let Some(rooted) = target.strip_prefix('/') {
            push(normalize_path(rooted));
        } else {
            let dir = parent_dir(source_path);
            let relative = if dir.is_empty() {
                target.clone()
            } else {
                format!("{dir}/{target}")
            };
            push(normalize_path(&relative));
            if target.contains('/') {
                push(normalize_path(&target));
            }
        }

        if !target.contains('/') && !with_ext {
            for path in self.basenames.lookup(&target) {
                if !out.contains(path) {
                    out.push(path.clone());
                }
            }
        }

        out
    }

    /// First candidate accepted by `exists`.
    pub fn resolve_with<F>(&self, raw: &str, source_path: &str, mut exists: F) -> Option<String>
    where
        F: FnMut(&str) -> bool,
    {
        self.candidates(raw, source_path)
            .into_iter()
            .find(|c| exists(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_examples() {
        assert_eq!(sanitize_target("Notes/Plan.md"), Some("Notes/Plan.md".into()));
        assert_eq!(sanitize_target("<My Note.md>"), Some("My Note.md".into()));
        assert_eq!(sanitize_target("My%20Note.md#part"), Some("My Note.md".into()));
        assert_eq!(sanitize_target("doc.md?raw=1"), Some("doc.md".into()));
        assert_eq!(sanitize_target("https://example.com/a"), None);
        assert_eq!(sanitize_target("mailto:a@b.c"), None);
        assert_eq!(sanitize_target("#heading"), None);
        assert_eq!(sanitize_target("   "), None);
    }

    #[test]
    fn extension_detection() {
        assert!(has_extension("img/photo.png"));
        assert!(has_extension("Note.md"));
        assert!(!has_extension("Note"));
        assert!(!has_extension("Dr. Who"));
        assert!(!has_extension(".hidden"));
        assert!(!has_extension("v1.d/Note"));
    }

    #[test]
    fn path_normalization() {
        assert_eq!(normalize_path("a/./b/../c"), Some("a/c".into()));
        assert_eq!(normalize_path("a//b"), Some("a/b".into()));
        assert_eq!(normalize_path("../escape"), None);
        assert_eq!(normalize_path("a/../../b"), None);
    }

    #[test]
    fn relative_before_basename() {
        let index = BasenameIndex::from_paths(["Projects/Plan.md", "Archive/Plan.md", "Projects/img.png"]);
        let resolver = LinkResolver::new(&index);

        let candidates = resolver.candidates("Plan", "Projects/Roadmap.md");
        assert_eq!(candidates, vec!["Projects/Plan.md", "Archive/Plan.md"]);

        // From another folder the relative candidate is tried first, then the index.
        let candidates = resolver.candidates("plan", "Daily/2024-01-01.md");
        assert_eq!(
            candidates,
            vec!["Daily/plan.md", "Projects/Plan.md", "Archive/Plan.md"]
        );
    }

    #[test]
    fn rooted_and_nested_targets() {
        let index = BasenameIndex::default();
        let resolver = LinkResolver::new(&index);

        assert_eq!(
            resolver.candidates("/Projects/Plan", "Daily/Today.md"),
            vec!["Projects/Plan.md"]
        );
        assert_eq!(
            resolver.candidates("Projects/Plan.md", "Daily/Today.md"),
            vec!["Daily/Projects/Plan.md", "Projects/Plan.md"]
        );
        assert_eq!(
            resolver.candidates("../assets/photo.png", "Daily/Today.md"),
            vec!["assets/photo.png"]
        );
        assert!(resolver.candidates("../../outside", "Daily/Today.md").is_empty());
        assert!(resolver.candidates("https://example.com", "Today.md").is_empty());
    }

    #[test]
    fn extension_targets_skip_basename_index() {
        let index = BasenameIndex::from_paths(["Deep/Note.md"]);
        let resolver = LinkResolver::new(&index);
        assert_eq!(resolver.candidates("Note.md", "Root.md"), vec!["Note.md"]);
    }

    #[test]
    fn resolve_with_picks_first_existing() {
        let index = BasenameIndex::from_paths(["Projects/Plan.md", "Archive/Plan.md"]);
        let resolver = LinkResolver::new(&index);
        let existing = ["Archive/Plan.md", "Projects/Plan.md"];
        let resolved = resolver.resolve_with("Plan", "Daily/Today.md", |p| existing.contains(&p));
        assert_eq!(resolved.as_deref(), Some("Projects/Plan.md"));
        assert!(resolver.resolve_with("Missing", "Today.md", |_| false).is_none());
    }

    #[test]
    fn build_walks_vault_skipping_hidden_dirs() {
        let root = std::env::temp_dir().join(format!("ng-basename-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(root.join("People")).unwrap();
        std::fs::create_dir_all(root.join(".obsidian")).unwrap();
        std::fs::write(root.join("People/Clare Attwell.md"), "# Clare").unwrap();
        std::fs::write(root.join("Index.md"), "# Index").unwrap();
        std::fs::write(root.join(".obsidian/workspace.md"), "hidden").unwrap();
        std::fs::write(root.join("People/photo.png"), [0u8, 1, 2]).unwrap();

        let index = BasenameIndex::build(&root).unwrap();
        assert_eq!(index.lookup("clare attwell"), ["People/Clare Attwell.md".to_string()]);
        assert_eq!(index.lookup("INDEX"), ["Index.md".to_string()]);
        assert!(index.lookup("workspace").is_empty());
        assert_eq!(index.len(), 2);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn build_rejects_missing_root() {
        assert!(BasenameIndex::build(Path::new("/nonexistent/vault/root")).is_err());
    }
}
