//! Application configuration for notegraph.
//!
//! User config lives at `~/.notegraph/notegraph.toml`.
//! CLI flags override config file values, which override defaults.
//! Every option and its default is declared once, here.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{NoteGraphError, Result};
use crate::types::ShareMode;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "notegraph.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".notegraph";

/// Smallest and largest accepted share traversal depth.
pub const MIN_CONTEXT_DEPTH: u8 = 1;
pub const MAX_CONTEXT_DEPTH: u8 = 4;

// ---------------------------------------------------------------------------
// Config structs (matching notegraph.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Entity resolution settings.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Share payload settings.
    #[serde(default)]
    pub share: ShareConfig,

    /// Corpus loading settings.
    #[serde(default)]
    pub corpus: CorpusConfig,
}

impl AppConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.resolver.validate()?;
        self.share.validate()?;
        Ok(())
    }
}

/// `[resolver]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Global confidence floor. Used as the threshold for unrecognized types
    /// and as the cutoff for near-miss suggestions.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Whether unresolved mentions produce new-entity suggestions.
    #[serde(default = "default_true")]
    pub suggest_new_entities: bool,

    /// Fuzzy-match threshold per entity type.
    #[serde(default = "default_thresholds")]
    pub thresholds: BTreeMap<String, f64>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            suggest_new_entities: true,
            thresholds: default_thresholds(),
        }
    }
}

impl ResolverConfig {
    /// Fuzzy threshold for `entity_type`, falling back to the global floor.
    pub fn threshold_for(&self, entity_type: &str) -> f64 {
        self.thresholds
            .get(entity_type)
            .copied()
            .unwrap_or(self.min_confidence)
    }

    /// Reject confidences outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        check_unit_interval("resolver.min_confidence", self.min_confidence)?;
        for (entity_type, threshold) in &self.thresholds {
            check_unit_interval(&format!("resolver.thresholds.{entity_type}"), *threshold)?;
        }
        Ok(())
    }
}

fn default_thresholds() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("Person".to_string(), 0.90),
        ("Organization".to_string(), 0.85),
        ("Location".to_string(), 0.85),
        ("Project".to_string(), 0.85),
        ("Concept".to_string(), 0.80),
    ])
}
fn default_min_confidence() -> f64 {
    0.70
}
fn default_true() -> bool {
    true
}

fn check_unit_interval(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(NoteGraphError::validation(format!(
            "{name} = {value} is outside [0, 1]"
        )))
    }
}

/// `[share]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareConfig {
    /// Ceiling on root + bundled dependency bytes.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    /// Default share mode.
    #[serde(default = "default_share_mode")]
    pub mode: ShareMode,

    /// Default number of optional dependencies in a context pack.
    #[serde(default = "default_optional_limit")]
    pub optional_limit: usize,

    /// Default traversal depth, in `[1, 4]`.
    #[serde(default = "default_context_depth")]
    pub context_depth: u8,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
            mode: default_share_mode(),
            optional_limit: default_optional_limit(),
            context_depth: default_context_depth(),
        }
    }
}

impl ShareConfig {
    pub fn validate(&self) -> Result<()> {
        validate_context_depth(self.context_depth)?;
        if self.max_payload_bytes == 0 {
            return Err(NoteGraphError::validation(
                "share.max_payload_bytes must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Reject a traversal depth outside `[1, 4]`.
pub fn validate_context_depth(depth: u8) -> Result<()> {
    if (MIN_CONTEXT_DEPTH..=MAX_CONTEXT_DEPTH).contains(&depth) {
        Ok(())
    } else {
        Err(NoteGraphError::validation(format!(
            "context_depth {depth} is outside [{MIN_CONTEXT_DEPTH}, {MAX_CONTEXT_DEPTH}]"
        )))
    }
}

fn default_max_payload_bytes() -> usize {
    1024 * 1024
}
fn default_share_mode() -> ShareMode {
    ShareMode::RootPlusRequired
}
fn default_optional_limit() -> usize {
    5
}
fn default_context_depth() -> u8 {
    1
}

/// `[corpus]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// How long a loaded corpus snapshot stays fresh.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl CorpusConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn default_cache_ttl_secs() -> u64 {
    300
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.notegraph/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| NoteGraphError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.notegraph/notegraph.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load and validate the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| NoteGraphError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        NoteGraphError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| NoteGraphError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| NoteGraphError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| NoteGraphError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
