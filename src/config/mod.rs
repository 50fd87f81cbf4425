//! Configuration management for zeto
//!
//! This module handles loading, parsing, and managing configuration from various sources:
//! - Configuration files (TOML format)
//! - Environment variables (`ZETO_*`)
//! - Command-line arguments (applied by the CLI)
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::error::{ConfigError, Result, ZetoError};
use crate::guard::Role;
use crate::store::Direction;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Document store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Pagination defaults
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Route guard configuration
    #[serde(default)]
    pub routes: RoutesConfig,

    /// Display configuration
    #[serde(default)]
    pub display: DisplayConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// MongoDB store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// MongoDB connection URI
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Database holding the paginated collections
    #[serde(default = "default_database")]
    pub database: String,

    /// Connection and server selection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Application name reported to the server
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

/// Defaults applied to every new pagination session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Documents per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Field the collection is ordered by
    #[serde(default = "default_order_field")]
    pub order_field: String,

    /// Sort direction of the order field
    #[serde(default = "default_direction")]
    pub direction: Direction,
}

/// Route guard configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutesConfig {
    /// Where unauthenticated users are sent
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Where users without access are sent
    #[serde(default = "default_landing_path")]
    pub default_path: String,

    /// Role name to allowed paths; the built-in table is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<HashMap<String, Vec<String>>>,
}

/// Display and output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Output format (json, json-pretty, compact)
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// Enable colored output
    #[serde(default = "default_color_output")]
    pub color_output: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Compact JSON format (single-line)
    ///
    /// Suitable for: piping to other tools
    Json,

    /// Pretty-printed JSON format (multi-line)
    JsonPretty,

    /// Compact summary format
    ///
    /// One status line plus one line per document.
    /// Example: `projects: page 2 of 3 (10 item(s), 25 total)`
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "zeto".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_app_name() -> String {
    "zeto".to_string()
}

fn default_page_size() -> usize {
    crate::pagination::DEFAULT_PAGE_SIZE
}

fn default_order_field() -> String {
    "createdAt".to_string()
}

fn default_direction() -> Direction {
    Direction::Desc
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_landing_path() -> String {
    "/".to_string()
}

fn default_format() -> OutputFormat {
    OutputFormat::JsonPretty
}

fn default_color_output() -> bool {
    true
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            database: default_database(),
            timeout: default_timeout(),
            app_name: default_app_name(),
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            order_field: default_order_field(),
            direction: default_direction(),
        }
    }
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
            default_path: default_landing_path(),
            access: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            color_output: default_color_output(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    ///
    /// With an explicit path the file must exist. Without one, the default
    /// path is tried and defaults are used when nothing is there.
    ///
    /// # Arguments
    /// * `path` - Optional path to a TOML configuration file
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (Self::default_config_path(), false),
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigError::FileNotFound(path.display().to_string()).into());
            }
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse TOML configuration content
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Load the file, then apply `ZETO_*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_vars(std::env::vars())?;
        Ok(config)
    }

    /// Apply overrides from `ZETO_URI`, `ZETO_DATABASE`, `ZETO_PAGE_SIZE`
    /// and `ZETO_LOG_LEVEL`; other variables are ignored
    pub fn apply_env_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                "ZETO_URI" => self.store.uri = value,
                "ZETO_DATABASE" => self.store.database = value,
                "ZETO_PAGE_SIZE" => {
                    self.pagination.page_size =
                        value.parse().map_err(|_| ConfigError::InvalidValue {
                            field: key.clone(),
                            value: value.clone(),
                        })?;
                }
                "ZETO_LOG_LEVEL" => self.logging.level = value.parse()?,
                _ => continue,
            }
            debug!("Applied environment override {}", key);
        }
        Ok(())
    }

    /// Get the default configuration file path (`~/.zeto/config.toml`)
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".zeto")
            .join("config.toml")
    }

    /// Serialize the configuration back to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ZetoError::Serialization(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.store.uri.starts_with("mongodb://")
            && !self.store.uri.starts_with("mongodb+srv://")
        {
            return Err(invalid("store.uri", &self.store.uri));
        }
        if self.store.database.trim().is_empty() {
            return Err(ConfigError::MissingField("store.database".to_string()).into());
        }
        if self.store.timeout == 0 {
            return Err(invalid("store.timeout", "0"));
        }
        if self.pagination.page_size == 0 {
            return Err(invalid("pagination.page_size", "0"));
        }
        if self.pagination.order_field.trim().is_empty() {
            return Err(ConfigError::MissingField("pagination.order_field".to_string()).into());
        }

        for (field, path) in [
            ("routes.login_path", &self.routes.login_path),
            ("routes.default_path", &self.routes.default_path),
        ] {
            if !path.starts_with('/') {
                return Err(invalid(field, path));
            }
        }
        if let Some(access) = &self.routes.access {
            for (name, paths) in access {
                name.parse::<Role>()?;
                if let Some(path) = paths.iter().find(|path| !path.starts_with('/')) {
                    return Err(invalid(&format!("routes.access.{name}"), path));
                }
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, value: &str) -> ZetoError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

impl LogLevel {
    /// Directive understood by `EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl OutputFormat {
    /// Check if format requires pretty printing
    pub fn is_pretty(&self) -> bool {
        matches!(self, OutputFormat::JsonPretty)
    }

    /// Check if format is JSON-based
    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::JsonPretty)
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" | "pretty" => Ok(OutputFormat::JsonPretty),
            "compact" => Ok(OutputFormat::Compact),
            _ => Err(ConfigError::InvalidValue {
                field: "display.format".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store.uri, "mongodb://localhost:27017");
        assert_eq!(config.pagination.page_size, 10);
        assert_eq!(config.pagination.order_field, "createdAt");
        assert_eq!(config.pagination.direction, Direction::Desc);
        assert_eq!(config.display.format, OutputFormat::JsonPretty);
        assert!(config.display.color_output);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [pagination]
            page_size = 25
            direction = "asc"

            [display]
            format = "compact"
            "#,
        )
        .unwrap();

        assert_eq!(config.pagination.page_size, 25);
        assert_eq!(config.pagination.direction, Direction::Asc);
        assert_eq!(config.pagination.order_field, "createdAt");
        assert_eq!(config.display.format, OutputFormat::Compact);
        assert_eq!(config.store.database, "zeto");
    }

    #[test]
    fn test_routes_access_table() {
        let config = Config::from_toml_str(
            r#"
            [routes]
            login_path = "/signin"

            [routes.access]
            client = ["/dashboard", "/factures"]
            "#,
        )
        .unwrap();

        assert_eq!(config.routes.login_path, "/signin");
        assert_eq!(config.routes.default_path, "/");
        let access = config.routes.access.as_ref().unwrap();
        assert_eq!(access["client"].len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::from_toml_str("[pagination\npage_size = 1").is_err());
        assert!(Config::from_toml_str("[display]\nformat = \"table\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env_vars(vec![
                ("ZETO_URI".to_string(), "mongodb://db:27017".to_string()),
                ("ZETO_PAGE_SIZE".to_string(), "50".to_string()),
                ("ZETO_LOG_LEVEL".to_string(), "debug".to_string()),
                ("HOME".to_string(), "/root".to_string()),
            ])
            .unwrap();

        assert_eq!(config.store.uri, "mongodb://db:27017");
        assert_eq!(config.pagination.page_size, 50);
        assert_eq!(config.logging.level, LogLevel::Debug);

        assert!(
            config
                .apply_env_vars(vec![("ZETO_PAGE_SIZE".to_string(), "many".to_string())])
                .is_err()
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.pagination.page_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.store.uri = "http://localhost".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.routes.default_path = "home".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        let mut access = HashMap::new();
        access.insert("guest".to_string(), vec!["/dashboard".to_string()]);
        config.routes.access = Some(access);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        let mut access = HashMap::new();
        access.insert("client".to_string(), vec!["contracts".to_string()]);
        config.routes.access = Some(access);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = Config::default();
        config.display.format = OutputFormat::Json;
        let text = config.to_toml().unwrap();

        assert!(text.contains("[pagination]"));
        assert!(text.contains("format = \"json\""));
        assert_eq!(Config::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_explicit_file() {
        let path = std::env::temp_dir().join(format!("zeto-missing-{}.toml", uuid::Uuid::new_v4()));
        assert!(matches!(
            Config::load_from_file(Some(&path)),
            Err(ZetoError::Config(ConfigError::FileNotFound(_)))
        ));
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("json-pretty".parse::<OutputFormat>().unwrap(), OutputFormat::JsonPretty);
        assert!(OutputFormat::Json.is_json());
        assert!(!OutputFormat::Compact.is_pretty());
        assert!("table".parse::<OutputFormat>().is_err());
        assert_eq!(LogLevel::Trace.as_filter(), "trace");
    }
}
