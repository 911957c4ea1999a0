use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ConduitError, Result};

/// Top-level configuration for Conduit.
///
/// Loaded from `~/.conduit/config.toml` by default. Every section is
/// optional in the file and falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConduitConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl ConduitConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ConduitConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ConduitError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Dispatch engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of executions allowed in flight at once.
    pub max_concurrent_actions: usize,
    /// Timeout applied to actions that do not declare their own.
    pub default_timeout_ms: u64,
    /// Run post-execution monitors on successful results.
    pub monitoring_enabled: bool,
    /// Register the built-in action catalog during initialization.
    pub register_builtins: bool,
}

impl EngineConfig {
    /// The default timeout as a [`Duration`].
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_actions: 10,
            default_timeout_ms: 30_000,
            monitoring_enabled: true,
            register_builtins: true,
        }
    }
}

/// Resolution loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum number of follow-up responses requested per resolution.
    pub max_depth: usize,
    /// Text returned when the responder produced nothing.
    pub no_response_text: String,
    /// Text returned when the depth limit is hit with nothing else to show.
    pub depth_exhausted_text: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: 120,
            no_response_text: "<no response>".to_string(),
            depth_exhausted_text: "max recursion depth reached".to_string(),
        }
    }
}
