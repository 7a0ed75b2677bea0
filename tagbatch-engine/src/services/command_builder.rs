//! Writer directives for one work item
//!
//! Directive order is fixed:
//! 1. Resolution unit, X and Y resolution (when enabled)
//! 2. One tag per non-blank record field, in tag-table order
//! 3. Backup suppression
//! 4. The target file path

use crate::config::{ResolutionSettings, RunConfig, TagTable};
use crate::models::{DispatchJob, WorkItem};
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

/// Writer flag that stops it from leaving `*_original` copies behind
pub const NO_BACKUP_FLAG: &str = "-overwrite_original";

/// One writer argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Set `tag` to `value`
    Tag { tag: String, value: String },
    /// Do not create a backup copy
    NoBackup,
    /// File to modify
    Target(PathBuf),
}

impl Directive {
    fn tag(tag: &str, value: impl Into<String>) -> Self {
        Directive::Tag {
            tag: tag.to_string(),
            value: value.into(),
        }
    }

    /// Writer argument; paths are passed through without re-encoding
    pub fn to_arg(&self) -> OsString {
        match self {
            Directive::Target(path) => path.clone().into_os_string(),
            other => OsString::from(other.to_string()),
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Tag { tag, value } => write!(f, "-{}={}", tag, value),
            Directive::NoBackup => f.write_str(NO_BACKUP_FLAG),
            Directive::Target(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Build the ordered directives for a work item
pub fn build(
    work_item: &WorkItem,
    tag_table: &TagTable,
    resolution: &ResolutionSettings,
) -> Vec<Directive> {
    let mut directives = Vec::with_capacity(tag_table.len() + 5);

    if resolution.enabled {
        directives.push(Directive::tag("ResolutionUnit", resolution.unit.code()));
        directives.push(Directive::tag("XResolution", format!("{:.2}", resolution.x)));
        directives.push(Directive::tag("YResolution", format!("{:.2}", resolution.y)));
    }

    if let Some(record) = &work_item.record {
        for mapping in tag_table.iter() {
            if let Some(value) = record.field(&mapping.field) {
                directives.push(Directive::tag(&mapping.tag, value));
            }
        }
    }

    directives.push(Directive::NoBackup);
    directives.push(Directive::Target(work_item.file.path.clone()));
    directives
}

/// Builds dispatch jobs with a fixed tag table and resolution settings
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    tag_table: TagTable,
    resolution: ResolutionSettings,
}

impl CommandBuilder {
    pub fn new(tag_table: TagTable, resolution: ResolutionSettings) -> Self {
        Self {
            tag_table,
            resolution,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.tag_table.clone(), config.resolution.clone())
    }

    pub fn build(&self, work_item: &WorkItem) -> Vec<Directive> {
        build(work_item, &self.tag_table, &self.resolution)
    }

    /// Render a work item into a writer invocation
    pub fn job(&self, work_item: &WorkItem) -> DispatchJob {
        DispatchJob {
            file_name: work_item.file.file_name(),
            target: work_item.file.path.clone(),
            args: self.build(work_item).iter().map(Directive::to_arg).collect(),
        }
    }
}
