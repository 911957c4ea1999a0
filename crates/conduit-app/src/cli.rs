//! CLI argument definitions for the Conduit binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Conduit: dispatches named actions found in agent responses.
#[derive(Parser, Debug)]
#[command(name = "conduit", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// List registered actions.
    Actions {
        /// Only show actions in this category.
        #[arg(long)]
        category: Option<String>,
    },
    /// Show how a piece of text would be interpreted.
    Parse {
        text: String,
    },
    /// Resolve a scripted exchange against the demo world.
    Run {
        /// JSON array of responder replies. The first one starts the loop.
        #[arg(short = 's', long = "script")]
        script: PathBuf,

        /// Agent the replies are spoken as.
        #[arg(short = 'a', long = "agent", default_value = "ada")]
        agent: String,

        /// Override the configured follow-up limit.
        #[arg(long = "max-depth")]
        max_depth: Option<usize>,

        /// Print the resolution as JSON instead of the transcript.
        #[arg(long)]
        json: bool,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > CONDUIT_CONFIG env var > platform default (~/.conduit/config.toml).
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("CONDUIT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".conduit").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".conduit").join("config.toml");
    }
    PathBuf::from("config.toml")
}
