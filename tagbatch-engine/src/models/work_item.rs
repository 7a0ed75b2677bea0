//! Discovered files and the work derived from them

use crate::models::record::Record;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Image extensions accepted by the scanner (compared case-insensitively)
pub const ACCEPTED_EXTENSIONS: [&str; 4] = ["tif", "tiff", "jpg", "jpeg"];

pub(crate) fn is_accepted_extension(ext: &str) -> bool {
    ACCEPTED_EXTENSIONS
        .iter()
        .any(|accepted| accepted.eq_ignore_ascii_case(ext))
}

/// An image file found on disk
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiscoveredFile {
    /// Full path as discovered (absolute when the scanner produced it)
    pub path: PathBuf,
    /// File name without extension
    pub base_name: String,
    /// Extension as found on disk (original case)
    pub extension: String,
}

impl DiscoveredFile {
    /// Describe a path, or `None` if it lacks an accepted image extension
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let extension = path.extension()?.to_string_lossy().into_owned();
        if !is_accepted_extension(&extension) {
            return None;
        }
        let base_name = path.file_stem()?.to_string_lossy().into_owned();

        Some(Self {
            path,
            base_name,
            extension,
        })
    }

    /// File name with extension, as shown to the user
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.{}", self.base_name, self.extension))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A file paired with its record, or with none in record-free mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub file: DiscoveredFile,
    pub record: Option<Arc<Record>>,
}

impl WorkItem {
    pub fn matched(file: DiscoveredFile, record: Arc<Record>) -> Self {
        Self {
            file,
            record: Some(record),
        }
    }

    pub fn record_free(file: DiscoveredFile) -> Self {
        Self { file, record: None }
    }
}

/// One writer invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchJob {
    /// File name reported with the outcome
    pub file_name: String,
    /// File the writer modifies
    pub target: PathBuf,
    /// Ordered writer arguments; the target path is always last and keeps
    /// its on-disk bytes
    pub args: Vec<OsString>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_filter_case_insensitive() {
        assert!(DiscoveredFile::from_path("/img/A01.TIF").is_some());
        assert!(DiscoveredFile::from_path("/img/A01.Jpeg").is_some());
        assert!(DiscoveredFile::from_path("/img/A01.png").is_none());
        assert!(DiscoveredFile::from_path("/img/A01").is_none());
    }

    #[test]
    fn test_base_name_and_file_name() {
        let file = DiscoveredFile::from_path("/img/Page_VERSO.tiff").unwrap();
        assert_eq!(file.base_name, "Page_VERSO");
        assert_eq!(file.extension, "tiff");
        assert_eq!(file.file_name(), "Page_VERSO.tiff");
    }

    #[test]
    fn test_dotted_base_name() {
        let file = DiscoveredFile::from_path("/img/scan.v2.jpg").unwrap();
        assert_eq!(file.base_name, "scan.v2");
    }
}
