//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/ticketflow/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/ticketflow/` (~/.config/ticketflow/)
//! - Data: `$XDG_DATA_HOME/ticketflow/` (~/.local/share/ticketflow/)
//! - State/Logs: `$XDG_STATE_HOME/ticketflow/` (~/.local/state/ticketflow/)
//!
//! A loaded [`Config`] is passed explicitly to every component that needs
//! it; nothing in the library reads configuration from ambient state.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable consulted when `jira.api_token` is not set.
pub const API_TOKEN_ENV: &str = "JIRA_API_TOKEN";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Jira connection and query settings
    #[serde(default)]
    pub jira: JiraConfig,

    /// Field matching rules for changelog parsing
    #[serde(default)]
    pub fields: FieldsConfig,

    /// Snapshot cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Jira connection configuration
#[derive(Debug, Deserialize, Clone)]
pub struct JiraConfig {
    /// Jira site URL (e.g., `https://example.atlassian.net`)
    pub base_url: Option<String>,

    /// Account email used for basic auth
    pub email: Option<String>,

    /// API token (can also use the `JIRA_API_TOKEN` env var)
    pub api_token: Option<String>,

    /// Query for the current ticket set
    #[serde(default = "default_jql")]
    pub jql: String,

    /// Query for the historical ticket set (optional)
    pub historical_jql: Option<String>,

    /// Stop fetching once this many issues have been collected
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Issues per search request (Jira caps this at 100)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Hard ceiling on the number of search requests per fetch
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            email: None,
            api_token: None,
            jql: default_jql(),
            historical_jql: None,
            max_results: default_max_results(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_jql() -> String {
    "\"Priority Level\" is not EMPTY ORDER BY created DESC".to_string()
}

fn default_max_results() -> usize {
    1000
}

fn default_page_size() -> usize {
    100
}

fn default_max_pages() -> usize {
    50
}

fn default_timeout_secs() -> u64 {
    10
}

impl JiraConfig {
    /// API token from config, falling back to the environment
    pub fn resolved_api_token(&self) -> Option<String> {
        self.api_token
            .clone()
            .or_else(|| std::env::var(API_TOKEN_ENV).ok())
            .filter(|t| !t.is_empty())
    }

    /// Check if enough is configured to talk to Jira
    pub fn is_ready(&self) -> bool {
        self.base_url.is_some() && self.email.is_some() && self.resolved_api_token().is_some()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_none() {
            return Err(Error::Config("jira.base_url is required".to_string()));
        }
        if self.email.is_none() {
            return Err(Error::Config("jira.email is required".to_string()));
        }
        if self.resolved_api_token().is_none() {
            return Err(Error::Config(format!(
                "jira.api_token or {} is required",
                API_TOKEN_ENV
            )));
        }
        if self.page_size == 0 || self.page_size > 100 {
            return Err(Error::Config(
                "jira.page_size must be between 1 and 100".to_string(),
            ));
        }
        if self.max_pages == 0 {
            return Err(Error::Config(
                "jira.max_pages must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// How changelog fields and labels are recognised.
///
/// The priority level is a custom field; Jira reports it in changelogs by
/// either its internal id or its display name, so both are matched.
#[derive(Debug, Deserialize, Clone)]
pub struct FieldsConfig {
    /// Internal field id of the priority level (e.g., `customfield_11129`)
    #[serde(default = "default_priority_level_id")]
    pub priority_level_id: String,

    /// Display name of the priority level field
    #[serde(default = "default_priority_level_name")]
    pub priority_level_name: String,

    /// Prefix marking a label as a source label
    #[serde(default = "default_source_label_prefix")]
    pub source_label_prefix: String,
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            priority_level_id: default_priority_level_id(),
            priority_level_name: default_priority_level_name(),
            source_label_prefix: default_source_label_prefix(),
        }
    }
}

fn default_priority_level_id() -> String {
    "customfield_11129".to_string()
}

fn default_priority_level_name() -> String {
    "Priority Level".to_string()
}

fn default_source_label_prefix() -> String {
    "src-".to_string()
}

impl FieldsConfig {
    /// True if a changelog item names the priority level field.
    ///
    /// `field_id` is the item's `fieldId` (absent on older Jira versions),
    /// `field` is its display name.
    pub fn matches_priority_level(&self, field_id: Option<&str>, field: &str) -> bool {
        field_id == Some(self.priority_level_id.as_str())
            || field == self.priority_level_id
            || field.eq_ignore_ascii_case(&self.priority_level_name)
    }

    /// True if the label is a source label
    pub fn is_source_label(&self, label: &str) -> bool {
        label.starts_with(&self.source_label_prefix)
    }
}

/// Snapshot cache configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct CacheConfig {
    /// Override for the cache directory
    pub dir: Option<PathBuf>,
}

impl CacheConfig {
    /// Directory holding snapshot files
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(Config::cache_dir)
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/ticketflow/config.toml` (~/.config/ticketflow/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("ticketflow").join("config.toml")
    }

    /// Returns the data directory path
    ///
    /// `$XDG_DATA_HOME/ticketflow/` (~/.local/share/ticketflow/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("ticketflow")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/ticketflow/` (~/.local/state/ticketflow/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("ticketflow")
    }

    /// Returns the default snapshot cache directory
    ///
    /// `$XDG_DATA_HOME/ticketflow/cache/` (~/.local/share/ticketflow/cache/)
    pub fn cache_dir() -> PathBuf {
        Self::data_dir().join("cache")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/ticketflow/ticketflow.log` (~/.local/state/ticketflow/ticketflow.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("ticketflow.log")
    }

    /// Pin unset XDG variables to their home-relative defaults.
    ///
    /// Called by the CLI before anything resolves a path, so every
    /// component sees the same directories for the life of the process.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        for (var, default) in [
            ("XDG_DATA_HOME", ".local/share"),
            ("XDG_STATE_HOME", ".local/state"),
            ("XDG_CONFIG_HOME", ".config"),
        ] {
            if std::env::var(var).is_err() {
                std::env::set_var(var, home.join(default));
            }
        }
    }
}
