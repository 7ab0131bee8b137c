//! Create the bookmark schema without starting the server

use anyhow::{Context, Result};
use clap::Parser;

use bookmarks_server::db::{create_pool, migrations};

use super::serve::database_url;
use crate::config::BookmarksConfig;

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    /// Database URL (overrides config file)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

pub async fn run_migrate(args: MigrateArgs, config: &BookmarksConfig) -> Result<()> {
    let database_url = database_url(args.database_url, config)?;

    let pool = create_pool(&database_url)
        .await
        .context("Failed to create database pool")?;
    migrations::run(&pool).await.context("Failed to run migrations")?;

    println!("Schema is up to date");
    Ok(())
}
