//! Mission engine operator CLI
//!
//! Reads and repairs the durable mission tables offline.
//!
//! # Usage
//!
//! ```bash
//! # List the configured missions
//! mission-cli --config missions.toml catalog
//!
//! # Show a user's session and what it waits for
//! mission-cli --config missions.toml inspect --user U1
//! mission-cli --config missions.toml step --user U1
//!
//! # Rebuild prompt handlers the way a restarting service would
//! RUST_LOG=debug mission-cli --config missions.toml --json-logs recover
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use mission_core::collaborators::{Action, RequirementsCatalog, StaticCatalog, Transport};
use mission_core::{EngineConfig, PromptRegistry, TransportError};
use mission_engine::resolve_step;
use mission_store::Stores;
use mission_types::{PromptRef, UserId};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mission-cli")]
#[command(version)]
#[command(about = "Inspect and repair mission engine state")]
struct Cli {
    /// Engine configuration (TOML); defaults apply when omitted
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Override the configured store directory
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the mission catalog
    Catalog,

    /// Print a user's stored session as JSON
    Inspect {
        #[arg(long)]
        user: String,
    },

    /// Print the next step of a user's mission
    Step {
        #[arg(long)]
        user: String,
    },

    /// List a user's outstanding prompts
    Entries {
        #[arg(long)]
        user: String,
    },

    /// Run prompt recovery against the store and print the report
    Recover,

    /// Delete a user's session and questionnaire progress
    Reset {
        #[arg(long)]
        user: String,
    },
}

/// Transport used offline: every prompt is taken to still exist and nothing
/// is delivered.
struct OfflineTransport;

#[async_trait]
impl Transport for OfflineTransport {
    async fn send(&self, user: &UserId, content: &str) -> Result<(), TransportError> {
        debug!(user = %user, content, "offline: message not delivered");
        Ok(())
    }

    async fn edit(&self, prompt: &PromptRef, _content: &str) -> Result<(), TransportError> {
        debug!(prompt = %prompt, "offline: edit not delivered");
        Ok(())
    }

    async fn send_prompt(&self, _user: &UserId, _content: &str, _actions: &[Action]) -> Result<PromptRef, TransportError> {
        Err(TransportError::SendFailed("offline transport cannot send prompts".into()))
    }

    async fn prompt_exists(&self, _prompt: &PromptRef) -> Result<bool, TransportError> {
        Ok(true)
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::new(),
    };
    Ok(match &cli.store_dir {
        Some(dir) => config.with_store_dir(dir),
        None => config,
    })
}

async fn open_stores(config: &EngineConfig) -> Result<Stores> {
    let stores = Stores::open(&config.store_dir)
        .await
        .with_context(|| format!("opening store at {}", config.store_dir.display()))?;
    Ok(stores.with_entry_limits(config.max_entries_per_user, config.prompt_ttl()))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = load_config(&cli)?;
    let catalog = StaticCatalog::from_config(&config);

    match &cli.command {
        Commands::Catalog => {
            for spec in catalog.missions() {
                let r = spec.requirements;
                println!(
                    "{:>6}  {:<24} {:<14} {:<22} photo={} video={} audio={} text={}",
                    spec.id,
                    spec.name,
                    format!("{:?}", spec.flow).to_lowercase(),
                    spec.category,
                    r.photo,
                    r.video,
                    r.audio,
                    r.aside_text
                );
            }
            info!(missions = catalog.len(), "catalog listed");
        }
        Commands::Inspect { user } => {
            let stores = open_stores(&config).await?;
            match stores.sessions.get(&UserId::new(user.as_str())).await? {
                Some(record) => print_json(&record)?,
                None => {
                    eprintln!("no active mission for {user}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Step { user } => {
            let stores = open_stores(&config).await?;
            let Some(record) = stores.sessions.get(&UserId::new(user.as_str())).await? else {
                eprintln!("no active mission for {user}");
                return Ok(ExitCode::FAILURE);
            };
            let spec = catalog
                .get(record.mission_id)
                .with_context(|| format!("mission {} is not in the catalog", record.mission_id))?;
            println!("{}", resolve_step(spec, &record));
        }
        Commands::Entries { user } => {
            let stores = open_stores(&config).await?;
            print_json(&stores.entries.list(&UserId::new(user.as_str())).await?)?;
        }
        Commands::Recover => {
            let stores = open_stores(&config).await?;
            let registry = PromptRegistry::new(stores.entries.clone());
            let report = registry.recover(&OfflineTransport).await?;
            print_json(&report)?;
        }
        Commands::Reset { user } => {
            let stores = open_stores(&config).await?;
            let user = UserId::new(user.as_str());
            let removed = stores.sessions.delete(&user).await?;
            stores.quizzes.clear(&user).await?;
            info!(user = %user, removed, "session reset");
            println!("{}", if removed { "session removed" } else { "no session" });
        }
    }
    Ok(ExitCode::SUCCESS)
}
