//! Bootstrap configuration loading and resolution
//!
//! The TOML file carries every setting a run needs. It is read once at
//! startup; the engine turns it into an immutable per-run configuration.
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `TAGBATCH_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/tagbatch/tagbatch.toml`)
//! 4. Built-in defaults (fallback)

use crate::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "TAGBATCH_CONFIG";

/// Config file name inside the platform config directory
pub const CONFIG_FILE_NAME: &str = "tagbatch.toml";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Path to the external metadata writer (exiftool)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exiftool: Option<PathBuf>,

    /// Hard ceiling on concurrent writer processes
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Descend into sub-directories when discovering files
    #[serde(default)]
    pub recursive: bool,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// File name → record key matching rules
    #[serde(default)]
    pub matching: MatchingConfig,

    /// Resolution tags applied to every file
    #[serde(default)]
    pub resolution: ResolutionConfig,

    /// Spreadsheet layout
    #[serde(default)]
    pub spreadsheet: SpreadsheetConfig,

    /// Ordered logical field → writer tag table
    #[serde(default = "default_tags")]
    pub tags: Vec<TagMapping>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Name matching configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Regex fragments removed from file names before matching (e.g. `_VERSO?$`)
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Drop a two-digit page number from the end of file names
    #[serde(default)]
    pub ignore_trailing_digits: bool,
}

/// Resolution tag configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Unit name: `none`, `inches` or `cm`
    #[serde(default = "default_resolution_unit")]
    pub unit: String,

    #[serde(default = "default_resolution")]
    pub x: f64,

    #[serde(default = "default_resolution")]
    pub y: f64,
}

/// Spreadsheet column layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadsheetConfig {
    /// Column holding the record key (file name stem)
    #[serde(default = "default_key_column")]
    pub key_column: String,

    /// First non-empty row is a header and is not read as data
    #[serde(default = "default_true")]
    pub has_header: bool,

    /// Logical field → column letter; fields without a column are left empty
    #[serde(default = "default_columns")]
    pub columns: IndexMap<String, String>,
}

/// One row of the field → tag table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagMapping {
    /// Logical field name as produced by the spreadsheet reader
    pub field: String,
    /// External writer tag name, without the leading dash
    pub tag: String,
}

impl TagMapping {
    pub fn new(field: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            tag: tag.into(),
        }
    }
}

fn default_max_concurrency() -> usize {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_resolution_unit() -> String {
    "inches".to_string()
}

fn default_resolution() -> f64 {
    300.0
}

fn default_true() -> bool {
    true
}

fn default_key_column() -> String {
    "B".to_string()
}

fn default_columns() -> IndexMap<String, String> {
    let mut columns = IndexMap::new();
    columns.insert("title".to_string(), "K".to_string());
    columns.insert("keywords".to_string(), "B".to_string());
    columns.insert("copyright".to_string(), "EG".to_string());
    columns
}

/// Default field → tag table (XMP tags understood by exiftool)
pub fn default_tags() -> Vec<TagMapping> {
    vec![
        TagMapping::new("title", "Title"),
        TagMapping::new("author", "Creator"),
        TagMapping::new("description", "Description"),
        TagMapping::new("keywords", "Subject"),
        TagMapping::new("copyright", "Rights"),
    ]
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            exiftool: None,
            max_concurrency: default_max_concurrency(),
            recursive: false,
            logging: LoggingConfig::default(),
            matching: MatchingConfig::default(),
            resolution: ResolutionConfig::default(),
            spreadsheet: SpreadsheetConfig::default(),
            tags: default_tags(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            unit: default_resolution_unit(),
            x: default_resolution(),
            y: default_resolution(),
        }
    }
}

impl Default for SpreadsheetConfig {
    fn default() -> Self {
        Self {
            key_column: default_key_column(),
            has_header: true,
            columns: default_columns(),
        }
    }
}

/// Platform default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tagbatch").join(CONFIG_FILE_NAME))
}

/// Pick the config file to load, if any
///
/// An explicit path (CLI or environment) is returned even when it does not
/// exist so that loading reports the problem. The platform default is only
/// returned when the file is present.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|p| p.exists())
}

/// Load a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Resolve and load the bootstrap config, falling back to built-in defaults
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) => {
            let config = load_toml_config(&path)?;
            info!("Configuration loaded from {}", path.display());
            Ok(config)
        }
        None => {
            info!("No configuration file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Write config to TOML file (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize config failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}
