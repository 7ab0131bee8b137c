//! Config file for the bookmarks server
//!
//! Lives at ~/.bookmarks/config.toml (override with BOOKMARKS_CONFIG).
//! Every key is optional; a missing file means all defaults.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookmarksConfig {
    /// Log filter used when RUST_LOG is unset (e.g. "info", "bookmarks_server=debug")
    pub log_level: Option<String>,
    pub server: ServerSection,
    pub database: DatabaseSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: Option<SocketAddr>,
    pub cors_permissive: bool,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
}

impl BookmarksConfig {
    /// Get config file path: $BOOKMARKS_CONFIG or ~/.bookmarks/config.toml
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("BOOKMARKS_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".bookmarks")
            .join("config.toml")
    }

    /// Load from the default path, falling back to defaults if absent.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file (invalid TOML): {:?}", path))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, toml_str).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show config file path
    Path,
    /// Print the effective config as TOML
    Show,
    /// Write a config file with default values
    Init(InitArgs),
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Force overwrite existing config
    #[arg(long, short)]
    pub force: bool,
}

pub fn run_config(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Path => {
            println!("{}", BookmarksConfig::config_path().display());
            Ok(())
        }
        ConfigCommands::Show => {
            let config = BookmarksConfig::load()?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigCommands::Init(args) => run_init(args),
    }
}

fn run_init(args: InitArgs) -> Result<()> {
    let config_path = BookmarksConfig::config_path();

    if config_path.exists() && !args.force {
        anyhow::bail!(
            "Config already exists at {:?}\n\nUse --force to overwrite",
            config_path
        );
    }

    let config = BookmarksConfig {
        log_level: Some("info".to_string()),
        server: ServerSection {
            bind: Some(bookmarks_server::ServerConfig::default().bind_addr),
            cors_permissive: false,
            request_timeout_secs: Some(30),
        },
        database: DatabaseSection {
            url: Some("postgres://localhost/bookmarks".to_string()),
            max_connections: Some(bookmarks_server::db::pool::DEFAULT_MAX_CONNECTIONS),
        },
    };
    config.save_to(&config_path)?;

    println!("Wrote {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = BookmarksConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, BookmarksConfig::default());
    }

    #[test]
    fn parses_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            log_level = "debug"

            [server]
            bind = "0.0.0.0:9000"

            [database]
            url = "postgres://db/bookmarks"
            "#,
        )
        .unwrap();

        let config = BookmarksConfig::load_from(&path).unwrap();
        assert_eq!(config.server.bind, Some("0.0.0.0:9000".parse().unwrap()));
        assert!(!config.server.cors_permissive);
        assert_eq!(config.database.url.as_deref(), Some("postgres://db/bookmarks"));
        assert_eq!(config.database.max_connections, None);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn invalid_toml_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "server = [").unwrap();
        assert!(BookmarksConfig::load_from(&path).is_err());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = BookmarksConfig {
            database: DatabaseSection {
                url: Some("postgres://x".into()),
                max_connections: Some(3),
            },
            ..Default::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(BookmarksConfig::load_from(&path).unwrap(), config);
    }
}
