//! Known-entity corpus providers and a TTL cache over them.
//!
//! The canonical knowledge base is external; a provider hands back a
//! point-in-time snapshot and [`CorpusCache`] decides when to ask again.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use notegraph_shared::{KnownEntity, NoteGraphError, Result};

/// Source of the current entity list.
pub trait CorpusProvider: Send + Sync {
    fn load(&self) -> Result<Vec<KnownEntity>>;
}

/// A fixed, in-memory entity list.
#[derive(Debug, Clone, Default)]
pub struct StaticCorpus {
    entities: Vec<KnownEntity>,
}

impl StaticCorpus {
    pub fn new(entities: Vec<KnownEntity>) -> Self {
        Self { entities }
    }
}

impl CorpusProvider for StaticCorpus {
    fn load(&self) -> Result<Vec<KnownEntity>> {
        Ok(self.entities.clone())
    }
}

/// A JSON file holding an array of entities.
#[derive(Debug, Clone)]
pub struct JsonCorpusFile {
    path: PathBuf,
}

impl JsonCorpusFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CorpusProvider for JsonCorpusFile {
    fn load(&self) -> Result<Vec<KnownEntity>> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| NoteGraphError::io(&self.path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            NoteGraphError::parse(format!("invalid corpus {}: {e}", self.path.display()))
        })
    }
}

/// Owns a provider plus the last snapshot it returned.
pub struct CorpusCache<P> {
    provider: P,
    ttl: Duration,
    cached: Mutex<Option<(Instant, Arc<Vec<KnownEntity>>)>>,
}

impl<P: CorpusProvider> CorpusCache<P> {
    pub fn new(provider: P, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            cached: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current snapshot, reloading from the provider when stale or empty.
    pub fn snapshot(&self) -> Result<Arc<Vec<KnownEntity>>> {
        let mut cached = self.cached.lock();
        if let Some((loaded_at, entities)) = cached.as_ref() {
            if loaded_at.elapsed() < self.ttl {
                return Ok(Arc::clone(entities));
            }
        }

        let entities = Arc::new(self.provider.load()?);
        debug!(entities = entities.len(), "corpus snapshot loaded");
        *cached = Some((Instant::now(), Arc::clone(&entities)));
        Ok(entities)
    }

    /// Drop the cached snapshot so the next call reloads.
    pub fn invalidate(&self) {
        *self.cached.lock() = None;
    }

    pub fn is_cached(&self) -> bool {
        self.cached.lock().is_some()
    }
}
