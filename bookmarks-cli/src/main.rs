//! bookmarks CLI - run and manage the bookmarks REST service
//!
//! - `serve`: run the HTTP API (Postgres, or `--in-memory` for local use)
//! - `migrate`: create the schema and exit
//! - `config`: inspect or initialize ~/.bookmarks/config.toml

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod tracing_setup;

use config::BookmarksConfig;

#[derive(Parser, Debug)]
#[command(name = "bookmarks", version, about = "Bookmark management REST service")]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Export traces via OpenTelemetry (requires the `telemetry` feature)
    #[arg(long, global = true)]
    otel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Create database tables and exit
    Migrate(commands::migrate::MigrateArgs),
    /// Manage the config file (path, show, init)
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    // A broken file must stay repairable via `config init --force`
    let settings = match &cli.command {
        Commands::Config(_) => BookmarksConfig::load().unwrap_or_default(),
        _ => BookmarksConfig::load()?,
    };

    tracing_setup::init(&tracing_setup::TracingConfig {
        debug: cli.debug,
        otel: cli.otel,
        default_level: settings.log_level.clone(),
    })
    .ok();

    let result = match cli.command {
        Commands::Serve(args) => commands::run_serve(args, &settings).await,
        Commands::Migrate(args) => commands::run_migrate(args, &settings).await,
        Commands::Config(args) => config::run_config(args),
    };

    tracing_setup::shutdown_otel();
    result
}
