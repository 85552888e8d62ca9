use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use snippetfix::auth::ApiKeyAuthenticator;
use snippetfix::config::{Config, DEFAULT_CONFIG_PATH};
use snippetfix::db::Db;
use snippetfix::patch::PatchRule;
use snippetfix::runner::PatchRunner;
use snippetfix::server::{self, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snippetfix", version, about = "One-shot WPCode snippet patcher")]
struct Cli {
    /// Path to the JSON config file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the patch endpoint until Ctrl-C
    Serve,
    /// Show what the patch would do, without writing
    Preview,
    /// Write a config template
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::InitConfig => {
            Config::default().save(&cli.config)?;
            info!("Wrote config template to {}", cli.config);
            Ok(())
        }
        Command::Serve => {
            info!("Starting snippetfix v{}...", env!("CARGO_PKG_VERSION"));
            let (config, db) = load(&cli.config)?;
            let state = AppState::new(&config, db)?;
            server::serve(&config, state).await
        }
        Command::Preview => {
            let (config, db) = load(&cli.config)?;
            preview(&config, &db)
        }
    }
}

/// Load and validate the config, then open the host database it names.
fn load(config_path: &str) -> Result<(Config, Db)> {
    let config = Config::load(config_path)?;
    config.validate().context("invalid configuration")?;

    let db = Db::open(&config.db_path, &config.table_prefix)
        .with_context(|| format!("failed to open database {}", config.db_path))?;
    Ok((config, db))
}

fn preview(config: &Config, db: &Db) -> Result<()> {
    let rule = PatchRule::from_config(&config.patch).context("failed to compile patch rule")?;
    // Local dry run: no caller to authenticate.
    let runner = PatchRunner::new(config, rule, Arc::new(ApiKeyAuthenticator::default()));
    let transformed = runner.preview(db)?;

    println!(
        "snippet {}: {} occurrence(s) of the broken pattern",
        runner.snippet_id(),
        transformed.matches
    );
    if transformed.is_changed() {
        println!("--- patched code ---\n{}", transformed.code);
    }
    Ok(())
}
