//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use serde::Serialize;
use tracing::info;

use notegraph_core::{
    DocumentProcessor, EntityMention, FsVault, ShareGraphBuilder, ShareRequest, apply_wikilinks,
};
use notegraph_markdown::BasenameIndex;
use notegraph_resolver::{CorpusCache, EntityQuery, EntityResolver, JsonCorpusFile};
use notegraph_shared::{AppConfig, ShareMode, init_config, load_config, load_config_from};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// notegraph: resolve entity mentions and build share bundles for a notes vault.
#[derive(Parser)]
#[command(
    name = "notegraph",
    version,
    about = "Resolve entity mentions against a knowledge base and bundle linked notes for sharing.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.notegraph/notegraph.toml).
    #[arg(long, env = "NOTEGRAPH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Resolve one entity mention.
    Resolve {
        /// Mention text.
        name: String,

        /// Entity type (Person, Organization, Location, Project, Concept, ...).
        #[arg(short = 't', long = "type", default_value = "Concept")]
        entity_type: String,

        /// JSON array of known entities.
        #[arg(long)]
        corpus: PathBuf,
    },

    /// Resolve a JSON array of `{ "name", "type" }` mentions.
    ResolveAll {
        /// JSON array of known entities.
        #[arg(long)]
        corpus: PathBuf,

        /// Mentions file, or `-` for stdin.
        #[arg(long, default_value = "-")]
        input: String,
    },

    /// Build a share payload for a vault document.
    Share {
        /// Vault root directory.
        #[arg(long)]
        vault: PathBuf,

        /// Vault-relative path of the root document.
        root: String,

        /// Share mode: root_only, root_plus_required, or context_pack.
        #[arg(short, long)]
        mode: Option<String>,

        /// Optional dependencies allowed in context_pack mode.
        #[arg(long)]
        optional_limit: Option<usize>,

        /// Traversal depth (1-4).
        #[arg(short, long)]
        depth: Option<u8>,

        /// Print only the graph report, without document contents.
        #[arg(long)]
        graph_only: bool,
    },

    /// Resolve a document's mentions and suggest wikilinks and frontmatter.
    Process {
        /// Markdown document to process.
        document: PathBuf,

        /// JSON array of `{ "name", "type", "offset"? }` mentions.
        #[arg(long)]
        mentions: PathBuf,

        /// JSON array of known entities.
        #[arg(long)]
        corpus: PathBuf,

        /// Print the document with wikilinks applied instead of the report.
        #[arg(long)]
        apply: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries JSON output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "notegraph=info",
        1 => "notegraph=debug",
        _ => "notegraph=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Resolve {
            name,
            entity_type,
            corpus,
        } => {
            let config = app_config(config_path.as_deref())?;
            cmd_resolve(&config, &corpus, &name, &entity_type)
        }
        Command::ResolveAll { corpus, input } => {
            let config = app_config(config_path.as_deref())?;
            cmd_resolve_all(&config, &corpus, &input)
        }
        Command::Share {
            vault,
            root,
            mode,
            optional_limit,
            depth,
            graph_only,
        } => {
            let config = app_config(config_path.as_deref())?;
            let mut request = ShareRequest::from_config(root, &config.share);
            if let Some(mode) = mode {
                request.mode = mode.parse::<ShareMode>()?;
            }
            if let Some(limit) = optional_limit {
                request.optional_limit = limit;
            }
            if let Some(depth) = depth {
                request.context_depth = depth;
            }
            cmd_share(&config, &vault, &request, graph_only).await
        }
        Command::Process {
            document,
            mentions,
            corpus,
            apply,
        } => {
            let config = app_config(config_path.as_deref())?;
            cmd_process(&config, &document, &mentions, &corpus, apply).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

fn app_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

/// Load the corpus through a TTL cache and hand back a ready resolver.
fn load_resolver(config: &AppConfig, corpus: &Path) -> Result<EntityResolver> {
    let cache = CorpusCache::new(JsonCorpusFile::new(corpus), config.corpus.cache_ttl());
    let resolver = EntityResolver::new(config.resolver.clone())?;
    resolver.refresh(&cache)?;
    info!(
        entities = resolver.entity_count(),
        corpus = %corpus.display(),
        "corpus loaded"
    );
    Ok(resolver)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        std::io::read_to_string(std::io::stdin()).wrap_err("failed to read stdin")
    } else {
        std::fs::read_to_string(input).wrap_err_with(|| format!("failed to read {input}"))
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_resolve(config: &AppConfig, corpus: &Path, name: &str, entity_type: &str) -> Result<()> {
    let resolver = load_resolver(config, corpus)?;
    let decision = resolver.resolve(name, entity_type)?;
    print_json(&decision)
}

fn cmd_resolve_all(config: &AppConfig, corpus: &Path, input: &str) -> Result<()> {
    let queries: Vec<EntityQuery> = serde_json::from_str(&read_input(input)?)
        .wrap_err("mentions must be a JSON array of {\"name\", \"type\"} objects")?;
    let resolver = load_resolver(config, corpus)?;
    let decisions = resolver.resolve_all(&queries)?;

    // Sorted for stable output.
    let sorted: std::collections::BTreeMap<_, _> = decisions.into_iter().collect();
    print_json(&sorted)
}

async fn cmd_share(
    config: &AppConfig,
    vault_root: &Path,
    request: &ShareRequest,
    graph_only: bool,
) -> Result<()> {
    request.validate()?;
    if !vault_root.is_dir() {
        return Err(eyre!("vault root '{}' is not a directory", vault_root.display()));
    }

    let index = BasenameIndex::build(vault_root)?;
    let vault = FsVault::new(vault_root);
    let payload = ShareGraphBuilder::with_config(&vault, &index, &config.share)
        .build(request)
        .await?;

    if graph_only {
        print_json(&payload.graph)
    } else {
        print_json(&payload)
    }
}

async fn cmd_process(
    config: &AppConfig,
    document: &Path,
    mentions: &Path,
    corpus: &Path,
    apply: bool,
) -> Result<()> {
    let text = tokio::fs::read_to_string(document)
        .await
        .wrap_err_with(|| format!("failed to read {}", document.display()))?;
    let mentions: Vec<EntityMention> = serde_json::from_str(
        &tokio::fs::read_to_string(mentions)
            .await
            .wrap_err_with(|| format!("failed to read {}", mentions.display()))?,
    )
    .wrap_err("mentions must be a JSON array of {\"name\", \"type\", \"offset\"?} objects")?;

    let resolver = load_resolver(config, corpus)?;
    let processed = DocumentProcessor::new(&resolver).process(&text, &mentions)?;

    if apply {
        print!("{}", apply_wikilinks(&text, &processed.wikilinks));
        Ok(())
    } else {
        print_json(&processed)
    }
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = app_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
