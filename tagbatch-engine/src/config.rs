//! Per-run configuration
//!
//! `RunConfig` is built once from the bootstrap TOML plus command-line
//! overrides, validated, and handed to `start` by value. Nothing here is
//! process-wide; two runs with different settings cannot interfere.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use tagbatch_common::config::{default_tags, TagMapping, TomlConfig};
use tagbatch_common::{Error, Result};
use tracing::{info, warn};

/// Environment variable naming the writer binary
pub const EXIFTOOL_ENV_VAR: &str = "TAGBATCH_EXIFTOOL";

/// Writer binary looked up on PATH when nothing else is configured
pub const DEFAULT_EXIFTOOL: &str = "exiftool";

/// Share of available parallelism handed to writer processes
///
/// The writer is bound by storage throughput rather than CPU.
const PARALLELISM_FACTOR: f64 = 0.75;

/// Unit written to the ResolutionUnit tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionUnit {
    None,
    Inches,
    Centimeters,
}

impl ResolutionUnit {
    /// Value understood by the writer
    pub fn code(self) -> &'static str {
        match self {
            ResolutionUnit::None => "None",
            ResolutionUnit::Inches => "inches",
            ResolutionUnit::Centimeters => "cm",
        }
    }
}

impl FromStr for ResolutionUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ResolutionUnit::None),
            "inches" | "inch" | "in" => Ok(ResolutionUnit::Inches),
            "cm" | "centimeters" | "centimetres" => Ok(ResolutionUnit::Centimeters),
            other => Err(Error::Config(format!(
                "Unknown resolution unit '{}' (expected none, inches or cm)",
                other
            ))),
        }
    }
}

/// Resolution tags applied to every file regardless of record data
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionSettings {
    pub enabled: bool,
    pub unit: ResolutionUnit,
    pub x: f64,
    pub y: f64,
}

impl ResolutionSettings {
    pub fn new(unit: ResolutionUnit, x: f64, y: f64) -> Self {
        Self {
            enabled: true,
            unit,
            x,
            y,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            unit: ResolutionUnit::Inches,
            x: 300.0,
            y: 300.0,
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        for (axis, value) in [("x", self.x), ("y", self.y)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Config(format!(
                    "Resolution {} must be a positive number, got {}",
                    axis, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for ResolutionSettings {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Ordered logical field → writer tag correspondence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagTable {
    entries: Vec<TagMapping>,
}

impl TagTable {
    /// Validate and build a table
    ///
    /// Field and tag names must be non-blank and fields unique. A leading
    /// dash on a tag is accepted and dropped.
    pub fn new(entries: Vec<TagMapping>) -> Result<Self> {
        let mut cleaned: Vec<TagMapping> = Vec::with_capacity(entries.len());

        for entry in entries {
            let field = entry.field.trim();
            let tag = entry.tag.trim().trim_start_matches('-');

            if field.is_empty() || tag.is_empty() {
                return Err(Error::Config(format!(
                    "Tag table entry needs both field and tag (field '{}', tag '{}')",
                    entry.field, entry.tag
                )));
            }
            if cleaned.iter().any(|m| m.field == field) {
                return Err(Error::Config(format!(
                    "Field '{}' appears more than once in the tag table",
                    field
                )));
            }
            cleaned.push(TagMapping::new(field, tag));
        }

        Ok(Self { entries: cleaned })
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagMapping> {
        self.entries.iter()
    }

    pub fn tag_for(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|m| m.field == field)
            .map(|m| m.tag.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TagTable {
    fn default() -> Self {
        Self {
            entries: default_tags(),
        }
    }
}

/// File name matching rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSettings {
    pub ignore_patterns: Vec<String>,
    pub ignore_trailing_digits: bool,
}

/// Immutable configuration of one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Hard ceiling on concurrent writer processes
    pub max_concurrency: usize,
    pub matching: MatchSettings,
    pub resolution: ResolutionSettings,
    pub tag_table: TagTable,
    /// Match files against the record store; when false every file is
    /// written without record data
    pub update_from_store: bool,
    pub recursive: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            matching: MatchSettings::default(),
            resolution: ResolutionSettings::disabled(),
            tag_table: TagTable::default(),
            update_from_store: true,
            recursive: false,
        }
    }
}

impl RunConfig {
    /// Build from bootstrap TOML
    pub fn from_toml(toml: &TomlConfig) -> Result<Self> {
        let unit = toml.resolution.unit.parse::<ResolutionUnit>()?;

        let config = Self {
            max_concurrency: toml.max_concurrency,
            matching: MatchSettings {
                ignore_patterns: toml.matching.ignore_patterns.clone(),
                ignore_trailing_digits: toml.matching.ignore_trailing_digits,
            },
            resolution: ResolutionSettings {
                enabled: toml.resolution.enabled,
                unit,
                x: toml.resolution.x,
                y: toml.resolution.y,
            },
            tag_table: TagTable::new(toml.tags.clone())?,
            update_from_store: true,
            recursive: toml.recursive,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that `from_toml` and later overrides must keep
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(Error::Config(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.update_from_store && self.tag_table.is_empty() {
            return Err(Error::Config(
                "Tag table is empty; nothing could be written from records".to_string(),
            ));
        }
        self.resolution.validate()
    }

    /// Concurrency bound for this machine
    pub fn effective_concurrency(&self) -> usize {
        effective_concurrency(self.max_concurrency, num_cpus::get())
    }
}

/// `max(1, min(configured_max, round(available * 0.75)))`
pub fn effective_concurrency(configured_max: usize, available_parallelism: usize) -> usize {
    let scaled = (available_parallelism as f64 * PARALLELISM_FACTOR).round() as usize;
    scaled.min(configured_max.max(1)).max(1)
}

/// Resolve the writer binary
///
/// **Priority:** CLI → ENV → TOML → `exiftool` on PATH
pub fn resolve_exiftool_binary(cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    let env_value = std::env::var(EXIFTOOL_ENV_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty());

    let sources: Vec<&str> = [
        cli_arg.map(|_| "command line"),
        env_value.as_ref().map(|_| "environment"),
        toml.exiftool.as_ref().map(|_| "TOML"),
    ]
    .into_iter()
    .flatten()
    .collect();

    if sources.len() > 1 {
        warn!(
            "Writer binary configured in multiple sources: {}. Using {}.",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(path) = cli_arg {
        info!("Writer binary from command line: {}", path.display());
        return path.to_path_buf();
    }
    if let Some(value) = env_value {
        info!("Writer binary from {}: {}", EXIFTOOL_ENV_VAR, value);
        return PathBuf::from(value);
    }
    if let Some(path) = &toml.exiftool {
        info!("Writer binary from TOML config: {}", path.display());
        return path.clone();
    }

    PathBuf::from(DEFAULT_EXIFTOOL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_effective_concurrency_bound() {
        // round(8 * 0.75) = 6, clamped to the ceiling
        assert_eq!(effective_concurrency(4, 8), 4);
        // round(2 * 0.75) = round(1.5) = 2
        assert_eq!(effective_concurrency(4, 2), 2);
        // round(1 * 0.75) = 1
        assert_eq!(effective_concurrency(4, 1), 1);
        assert_eq!(effective_concurrency(4, 0), 1);
        assert_eq!(effective_concurrency(0, 16), 1);
        assert_eq!(effective_concurrency(16, 16), 12);
    }

    #[test]
    fn test_resolution_unit_parse() {
        assert_eq!("inches".parse::<ResolutionUnit>().unwrap(), ResolutionUnit::Inches);
        assert_eq!("CM".parse::<ResolutionUnit>().unwrap(), ResolutionUnit::Centimeters);
        assert_eq!("none".parse::<ResolutionUnit>().unwrap(), ResolutionUnit::None);
        assert!(matches!("furlongs".parse::<ResolutionUnit>(), Err(Error::Config(_))));
    }

    #[test]
    fn test_tag_table_validation() {
        let table = TagTable::new(vec![TagMapping::new("title", "-Title")]).unwrap();
        assert_eq!(table.tag_for("title"), Some("Title"));

        assert!(TagTable::new(vec![TagMapping::new("title", " ")]).is_err());
        assert!(TagTable::new(vec![
            TagMapping::new("title", "Title"),
            TagMapping::new("title", "ObjectName"),
        ])
        .is_err());
    }

    #[test]
    fn test_from_toml_rejects_bad_resolution() {
        let mut toml = TomlConfig::default();
        toml.resolution.enabled = true;
        toml.resolution.x = 0.0;
        assert!(matches!(RunConfig::from_toml(&toml), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_toml_defaults() {
        let config = RunConfig::from_toml(&TomlConfig::default()).unwrap();
        assert_eq!(config.max_concurrency, 4);
        assert!(config.update_from_store);
        assert!(!config.resolution.enabled);
        assert_eq!(config.tag_table.len(), 5);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = RunConfig {
            max_concurrency: 0,
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_exiftool_resolution_priority() {
        let mut toml = TomlConfig::default();
        toml.exiftool = Some(PathBuf::from("/toml/exiftool"));

        std::env::remove_var(EXIFTOOL_ENV_VAR);
        assert_eq!(
            resolve_exiftool_binary(None, &toml),
            PathBuf::from("/toml/exiftool")
        );

        std::env::set_var(EXIFTOOL_ENV_VAR, "/env/exiftool");
        assert_eq!(
            resolve_exiftool_binary(None, &toml),
            PathBuf::from("/env/exiftool")
        );
        assert_eq!(
            resolve_exiftool_binary(Some(Path::new("/cli/exiftool")), &toml),
            PathBuf::from("/cli/exiftool")
        );
        std::env::remove_var(EXIFTOOL_ENV_VAR);

        assert_eq!(
            resolve_exiftool_binary(None, &TomlConfig::default()),
            PathBuf::from(DEFAULT_EXIFTOOL)
        );
    }
}
