//! Configuration loading and config file resolution
//!
//! Config file resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. `GROK_TOPICS_CONFIG` environment variable
//! 3. `~/.config/grok-topics/config.toml`
//! 4. Compiled defaults (fallback)
//!
//! A missing or unreadable config file never aborts startup: a warning is logged and
//! compiled defaults are used.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "GROK_TOPICS_CONFIG";
/// Environment override for `api_base_url`
pub const API_URL_ENV_VAR: &str = "GROK_TOPICS_API_URL";
/// Environment override for `database_path`
pub const DATABASE_ENV_VAR: &str = "GROK_TOPICS_DATABASE";

/// Snapshot storage key; the default snapshot file is `<key>.json`
pub const SNAPSHOT_KEY: &str = "grokInterviews_topicData";

/// Default cache expiry (one hour)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60 * 60;

/// How the relational accessor reaches the content store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Direct SQL access to the content database
    #[default]
    Direct,
    /// Through the legacy HTTP API
    Http,
}

/// Alias table entry mapping a drifting category key to where its content lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    /// Category key as requested by callers
    pub key: String,
    /// Canonical subtopic key in the markdown tree
    #[serde(default)]
    pub canonical: Option<String>,
    /// Case-insensitive label fragment identifying the target node
    #[serde(default)]
    pub label: Option<String>,
    /// Label fragments of the sections to descend through before looking for `label`
    #[serde(default)]
    pub path: Vec<String>,
}

/// TOML configuration file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub database_path: PathBuf,
    pub markdown_dir: PathBuf,
    pub transport: Transport,
    pub api_base_url: String,
    pub bind_address: String,
    pub cache_ttl_secs: u64,
    pub snapshot_path: Option<PathBuf>,
    pub domain_guesses: Vec<String>,
    pub log_level: String,
    pub request_timeout_secs: u64,
    pub alias_version: u32,
    pub aliases: Vec<AliasEntry>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            database_path: data_dir.join("grok.db"),
            markdown_dir: data_dir.join("topics"),
            transport: Transport::Direct,
            api_base_url: "http://127.0.0.1:5740".to_string(),
            bind_address: "127.0.0.1:5740".to_string(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            snapshot_path: None,
            domain_guesses: vec!["ml".to_string(), "ai".to_string(), "dsa".to_string()],
            log_level: "info".to_string(),
            request_timeout_secs: 15,
            alias_version: 1,
            aliases: Vec::new(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Snapshot file location (explicit setting or next to the database)
    pub fn snapshot_file(&self) -> PathBuf {
        self.snapshot_path.clone().unwrap_or_else(|| {
            self.database_path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default()
                .join(format!("{}.json", SNAPSHOT_KEY))
        })
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV_VAR) {
            if !url.trim().is_empty() {
                self.api_base_url = url;
            }
        }
        if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
            if !path.trim().is_empty() {
                self.database_path = PathBuf::from(path);
            }
        }
    }
}

/// Resolves and loads the configuration with graceful degradation
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Locate the config file following the priority order
    pub fn resolve_path(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: User config directory
        dirs::config_dir()
            .map(|d| d.join("grok-topics").join("config.toml"))
            .filter(|p| p.exists())
    }

    /// Load configuration without logging, falling back to compiled defaults
    ///
    /// The outcome travels with the config so it can be reported once logging is up.
    pub fn resolve(&self) -> LoadedConfig {
        let (mut config, source) = match self.resolve_path() {
            Some(path) => match TomlConfig::load(&path) {
                Ok(config) => (config, ConfigSource::File(path)),
                Err(e) => (
                    TomlConfig::default(),
                    ConfigSource::Fallback {
                        path,
                        error: e.to_string(),
                    },
                ),
            },
            None => (TomlConfig::default(), ConfigSource::Defaults),
        };
        config.apply_env_overrides();
        LoadedConfig { config, source }
    }

    /// Load configuration, logging where it came from
    pub fn load(&self) -> TomlConfig {
        let loaded = self.resolve();
        loaded.report();
        loaded.config
    }
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
    /// A config file was found but could not be loaded
    Fallback { path: PathBuf, error: String },
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TomlConfig,
    pub source: ConfigSource,
}

impl LoadedConfig {
    /// Log the config source; an unusable file is a warning
    pub fn report(&self) {
        match &self.source {
            ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigSource::Defaults => info!("No config file found, using compiled defaults"),
            ConfigSource::Fallback { path, error } => warn!(
                "Could not load config file {}: {} (using defaults)",
                path.display(),
                error
            ),
        }
    }
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("grok-topics"))
        .unwrap_or_else(|| PathBuf::from("./grok_data"))
}
