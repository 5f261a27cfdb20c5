//! recall: note memory from the command line.
//!
//! Stores and recalls notes through the remote memory API when an API key
//! is configured, and through a local JSON file otherwise (or after the
//! remote fails once). Results are printed as JSON on stdout; logs go to
//! stderr.

mod backfill;
mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use recall_core::{
    Category, Confidence, Container, DecisionOptions, Impact, LearningOptions, LocalStore,
    MemoryClient, MemorySystem, PreferenceOptions, RecallConfig, RemoteMemory, SearchOptions,
    StoreOptions,
};
use recall_remote::SupermemoryClient;
use serde::Serialize;
use serde_json::json;

/// Config file picked up from the working directory when `--config` is not
/// given.
const DEFAULT_CONFIG_FILE: &str = "recall.toml";

#[derive(Parser)]
#[command(name = "recall")]
#[command(version)]
#[command(about = "Remember notes and recall them by keyword or intent")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "RECALL_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick a backend and report status
    Init,

    /// Store a value under a key
    Remember {
        /// Key; becomes the entry id
        key: String,
        /// Text to remember
        value: String,
        /// Target container
        #[arg(long, default_value = "blake")]
        container: Container,
        /// Category
        #[arg(long)]
        category: Option<Category>,
        /// Topic label (repeatable)
        #[arg(long = "topic")]
        topics: Vec<String>,
    },

    /// Keyword search
    Recall {
        /// Query text
        query: String,
        /// Restrict to a container (repeatable)
        #[arg(long = "container")]
        containers: Vec<Container>,
        /// Restrict to a category
        #[arg(long)]
        category: Option<Category>,
        /// Maximum results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Search the containers the query's intent points at
    Smart {
        /// Query text
        query: String,
    },

    /// Store a preference
    Preference {
        /// What the preference is about
        topic: String,
        /// The preference itself
        value: String,
        /// Confidence
        #[arg(long)]
        confidence: Option<Confidence>,
        /// Where it was stated
        #[arg(long)]
        source: Option<String>,
    },

    /// Record a decision and its rationale
    Decision {
        /// What was decided
        decision: String,
        /// Why
        rationale: String,
        /// Alternative considered (repeatable)
        #[arg(long = "alternative")]
        alternatives: Vec<String>,
        /// Surrounding context
        #[arg(long)]
        context: Option<String>,
        /// Mark the decision as not reversible
        #[arg(long)]
        irreversible: bool,
    },

    /// Record a lesson learned
    Learning {
        /// The insight
        insight: String,
        /// Where it came from
        context: String,
        /// Free-form category
        #[arg(long)]
        category: Option<String>,
        /// Impact
        #[arg(long)]
        impact: Option<Impact>,
    },

    /// Count local entries per container
    Stats,

    /// Delete every local entry
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Seed the store with baseline context
    Backfill,
}

/// Result of a store command.
#[derive(Debug, Serialize)]
struct StoreOutcome {
    success: bool,
    id: Option<String>,
    error: Option<String>,
}

impl StoreOutcome {
    fn from_result(result: recall_core::error::Result<String>) -> Self {
        match result {
            Ok(id) => Self {
                success: true,
                id: Some(id),
                error: None,
            },
            Err(e) => Self {
                success: false,
                id: None,
                error: Some(e.to_string()),
            },
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<RecallConfig> {
    let mut config = match path {
        Some(path) => RecallConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            RecallConfig::from_file(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => RecallConfig::default(),
    };
    config.apply_env(|name| std::env::var(name).ok());
    config.validate()?;
    Ok(config)
}

fn build_system(config: &RecallConfig) -> Result<MemorySystem> {
    let store = LocalStore::open(&config.local.path);
    let remote = SupermemoryClient::from_config(&config.remote)?
        .map(|client| Arc::new(client) as Arc<dyn RemoteMemory>);
    Ok(MemorySystem::new(MemoryClient::new(store, remote), config))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    logging::init(&config.general.log_level, cli.verbose, cli.log_json);

    let memory = build_system(&config)?;
    tracing::debug!(mode = ?memory.mode(), path = %config.local.path.display(), "Memory system built");

    Ok(if run(&memory, cli.command).await? {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Execute one command. `Ok(false)` means it ran but did not succeed.
async fn run(memory: &MemorySystem, command: Commands) -> Result<bool> {
    match command {
        Commands::Init => {
            print_json(&memory.init().await)?;
        }
        Commands::Remember {
            key,
            value,
            container,
            category,
            topics,
        } => {
            let options = StoreOptions {
                category,
                topics,
                ..StoreOptions::new(container)
            };
            let outcome = StoreOutcome::from_result(memory.remember(&key, value, options).await);
            print_json(&outcome)?;
            return Ok(outcome.success);
        }
        Commands::Recall {
            query,
            containers,
            category,
            limit,
        } => {
            let mut options = if containers.len() == 1 {
                SearchOptions::in_container(containers[0].clone())
            } else {
                SearchOptions::in_containers(containers)
            };
            options.category = category;
            options.limit = limit;
            print_json(&memory.recall(&query, options).await?)?;
        }
        Commands::Smart { query } => {
            print_json(&memory.smart_recall(&query).await?)?;
        }
        Commands::Preference {
            topic,
            value,
            confidence,
            source,
        } => {
            let options = PreferenceOptions { confidence, source };
            let outcome = StoreOutcome::from_result(memory.store_preference(&topic, &value, options).await);
            print_json(&outcome)?;
            return Ok(outcome.success);
        }
        Commands::Decision {
            decision,
            rationale,
            alternatives,
            context,
            irreversible,
        } => {
            let options = DecisionOptions {
                alternatives,
                context,
                reversible: Some(!irreversible),
                confidence: None,
            };
            let outcome = StoreOutcome::from_result(memory.store_decision(&decision, &rationale, options).await);
            print_json(&outcome)?;
            return Ok(outcome.success);
        }
        Commands::Learning {
            insight,
            context,
            category,
            impact,
        } => {
            let options = LearningOptions {
                category,
                impact,
                related_decisions: Vec::new(),
            };
            let outcome = StoreOutcome::from_result(memory.store_learning(&insight, &context, options).await);
            print_json(&outcome)?;
            return Ok(outcome.success);
        }
        Commands::Stats => {
            print_json(&json!({ "mode": memory.mode(), "stats": memory.stats() }))?;
        }
        Commands::Clear { yes } => {
            if !yes {
                eprintln!("Refusing to clear local memories without --yes");
                return Ok(false);
            }
            memory.clear_local()?;
            print_json(&json!({ "success": true }))?;
        }
        Commands::Backfill => {
            let report = backfill::run(memory).await?;
            let failed = !report.failed.is_empty();
            print_json(&report)?;
            return Ok(!failed);
        }
    }
    Ok(true)
}
