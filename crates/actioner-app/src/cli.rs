//! CLI argument definitions for the actioner binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::{Path, PathBuf};

/// Perform configured actions for a batch of queued match messages.
#[derive(Parser, Debug)]
#[command(name = "actioner", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database holding action events.
    #[arg(short = 'd', long = "db-path")]
    pub db_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Batch file in `{"Records": [...]}` form. Reads stdin when omitted or `-`.
    pub input: Option<PathBuf>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > ACTIONER_CONFIG env var > ~/.actioner/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("ACTIONER_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the database path. `config_db_path` may start with `~/`.
    pub fn resolve_db_path(&self, config_db_path: &str) -> PathBuf {
        match self.db_path {
            Some(ref p) => p.clone(),
            None => expand_home(config_db_path),
        }
    }

    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }

    /// The batch file to read, or `None` for stdin.
    pub fn input_file(&self) -> Option<&Path> {
        self.input
            .as_deref()
            .filter(|p| p.as_os_str() != "-")
    }
}

fn home_dir() -> Option<String> {
    #[cfg(target_os = "windows")]
    let home = std::env::var("USERPROFILE");
    #[cfg(not(target_os = "windows"))]
    let home = std::env::var("HOME");
    home.ok()
}

fn expand_home(path: &str) -> PathBuf {
    if path.starts_with("~/") || path.starts_with("~\\") {
        let home = home_dir().unwrap_or_else(|| ".".to_string());
        PathBuf::from(home).join(&path[2..])
    } else {
        PathBuf::from(path)
    }
}

fn default_config_path() -> PathBuf {
    match home_dir() {
        Some(home) => PathBuf::from(home).join(".actioner").join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}
