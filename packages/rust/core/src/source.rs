//! Document content providers.
//!
//! The share builder only needs two questions answered about a vault-relative
//! path: does it exist, and what is its text. Reads are best-effort; any
//! failure is reported as "not found".

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::warn;

use notegraph_markdown::normalize_path;

/// Read access to vault documents by vault-relative path.
pub trait DocumentSource: Send + Sync {
    /// Whether a document exists at `path`.
    fn exists(&self, path: &str) -> impl Future<Output = bool> + Send;

    /// The document's text, or `None` when it cannot be read.
    fn read(&self, path: &str) -> impl Future<Output = Option<String>> + Send;
}

// ---------------------------------------------------------------------------
// FsVault
// ---------------------------------------------------------------------------

/// A vault directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a vault-relative one; `None` if it leaves the vault.
    fn locate(&self, path: &str) -> Option<PathBuf> {
        normalize_path(path).map(|rel| self.root.join(rel))
    }
}

impl DocumentSource for FsVault {
    async fn exists(&self, path: &str) -> bool {
        let Some(full) = self.locate(path) else {
            return false;
        };
        tokio::fs::metadata(&full)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    async fn read(&self, path: &str) -> Option<String> {
        let full = self.locate(path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %full.display(), error = %e, "failed to read document");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryVault
// ---------------------------------------------------------------------------

/// An in-memory vault keyed by vault-relative path.
#[derive(Debug, Clone, Default)]
pub struct MemoryVault {
    docs: HashMap<String, String>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.docs.insert(path.into(), content.into());
    }

    /// Paths held by this vault, for building a basename index.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.docs.keys().map(String::as_str)
    }
}

impl<P: Into<String>, C: Into<String>> FromIterator<(P, C)> for MemoryVault {
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        let mut vault = Self::new();
        for (path, content) in iter {
            vault.insert(path, content);
        }
        vault
    }
}

impl DocumentSource for MemoryVault {
    async fn exists(&self, path: &str) -> bool {
        self.docs.contains_key(path)
    }

    async fn read(&self, path: &str) -> Option<String> {
        self.docs.get(path).cloned()
    }
}
