//! Image file discovery
//!
//! Walks a directory (one level by default) and keeps files whose extension is
//! in the accepted image list. Enumeration order is whatever the filesystem
//! yields; no sorting is applied.

use crate::models::DiscoveredFile;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// File scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Root could not be resolved
    #[error("File access error {0}: {1}")]
    FileAccessError(PathBuf, String),
}

impl From<ScanError> for tagbatch_common::Error {
    fn from(err: ScanError) -> Self {
        tagbatch_common::Error::InvalidInput(err.to_string())
    }
}

/// Image file scanner
pub struct FileScanner {
    ignore_names: Vec<String>,
    recursive: bool,
}

impl FileScanner {
    /// Create a non-recursive scanner that skips common system files
    pub fn new() -> Self {
        Self {
            ignore_names: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
                ".svn".to_string(),
            ],
            recursive: false,
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Scan a directory for image files
    ///
    /// Returned paths are absolute (the root is canonicalized first).
    pub fn scan(&self, root_path: &Path) -> Result<Vec<DiscoveredFile>, ScanError> {
        if !root_path.exists() {
            return Err(ScanError::PathNotFound(root_path.to_path_buf()));
        }
        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory(root_path.to_path_buf()));
        }

        let root = root_path
            .canonicalize()
            .map_err(|e| ScanError::FileAccessError(root_path.to_path_buf(), e.to_string()))?;

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut symlink_visited = HashSet::new();
        let mut files = Vec::new();

        let walker = WalkDir::new(&root)
            .follow_links(false)
            .max_depth(max_depth)
            .into_iter()
            .filter_entry(|e| self.should_process_entry(e, &mut symlink_visited));

        for entry in walker {
            match entry {
                Ok(entry) => {
                    // Symlinks are listed unresolved; keep those pointing at a file
                    let is_file = entry.file_type().is_file()
                        || (entry.path_is_symlink() && entry.path().is_file());
                    if !is_file {
                        continue;
                    }
                    if let Some(file) = DiscoveredFile::from_path(entry.path()) {
                        files.push(file);
                    }
                }
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                }
            }
        }

        tracing::debug!(
            root = %root.display(),
            count = files.len(),
            "Image file scan complete"
        );

        Ok(files)
    }

    fn should_process_entry(
        &self,
        entry: &DirEntry,
        symlink_visited: &mut HashSet<PathBuf>,
    ) -> bool {
        if entry.depth() == 0 {
            return true;
        }

        let file_name = entry.file_name().to_string_lossy();
        if file_name.starts_with('.') || self.ignore_names.iter().any(|n| n.as_str() == file_name.as_ref()) {
            return false;
        }

        // Detect symlink loops; several links to one file are fine
        if entry.file_type().is_symlink() && entry.path().is_dir() {
            if let Ok(canonical) = entry.path().canonicalize() {
                if !symlink_visited.insert(canonical) {
                    tracing::warn!("Symlink loop detected: {}", entry.path().display());
                    return false;
                }
            }
        }

        true
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}
