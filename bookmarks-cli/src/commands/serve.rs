//! HTTP server command
//!
//! Resolves settings from flags, environment and the config file, then runs
//! the bookmarks API until shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use bookmarks_server::db::{create_pool_with_options, migrations, pool::DEFAULT_MAX_CONNECTIONS};
use bookmarks_server::{run_server, BookmarkStore, MemoryStore, PgStore, ServerConfig};

use crate::config::BookmarksConfig;

/// Arguments for the serve command
#[derive(Parser, Debug, Default)]
pub struct ServeArgs {
    /// Address to bind to (default: 127.0.0.1:8082)
    #[arg(long, short = 'b', env = "BOOKMARKS_BIND")]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Database URL (overrides config file)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Maximum pooled database connections
    #[arg(long)]
    pub max_connections: Option<u32>,

    /// Keep everything in memory instead of Postgres (lost on exit)
    #[arg(long)]
    pub in_memory: bool,

    /// Do not create tables on startup
    #[arg(long)]
    pub skip_migrations: bool,
}

/// Merge flags over the config file over built-in defaults.
fn server_config(args: &ServeArgs, config: &BookmarksConfig) -> ServerConfig {
    let defaults = ServerConfig::default();
    ServerConfig {
        bind_addr: args.bind.or(config.server.bind).unwrap_or(defaults.bind_addr),
        cors_permissive: args.cors_permissive || config.server.cors_permissive,
        request_timeout: args
            .timeout
            .or(config.server.request_timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout),
    }
}

pub(crate) fn database_url(arg: Option<String>, config: &BookmarksConfig) -> Result<String> {
    arg.or_else(|| config.database.url.clone()).context(
        "DATABASE_URL not set. Set via --database-url, DATABASE_URL env, or ~/.bookmarks/config.toml",
    )
}

async fn open_store(args: &ServeArgs, config: &BookmarksConfig) -> Result<Arc<dyn BookmarkStore>> {
    if args.in_memory {
        tracing::warn!("Using in-memory store - data is lost on exit");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let database_url = database_url(args.database_url.clone(), config)?;
    let max_connections = args
        .max_connections
        .or(config.database.max_connections)
        .unwrap_or(DEFAULT_MAX_CONNECTIONS);

    let pool = create_pool_with_options(&database_url, max_connections)
        .await
        .context("Failed to create database pool")?;

    if !args.skip_migrations {
        migrations::run(&pool).await.context("Failed to run migrations")?;
    }

    Ok(Arc::new(PgStore::new(pool)))
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs, config: &BookmarksConfig) -> Result<()> {
    let server_config = server_config(&args, config);
    tracing::info!("Starting bookmarks server on {}", server_config.bind_addr);

    let store = open_store(&args, config).await?;

    // Blocks until shutdown
    run_server(store, server_config)
        .await
        .context("Server error")?;

    Ok(())
}
