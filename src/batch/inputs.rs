//! Resolve launch arguments into an ordered list of source paths.
//!
//! Each argument is either a file (kept as given, even if it does not exist,
//! so the run reports it as a per-item failure) or a directory, which expands
//! to its supported raster files, one level deep, sorted by file name.

use super::BatchError;
use crate::codec::is_supported_image;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Supported image files directly inside `dir`, sorted by file name.
pub fn enumerate_directory(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| BatchError::Enumerate {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        if entry.file_type().is_file() && is_supported_image(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Expand directories and drop repeated paths, keeping first occurrences.
pub fn resolve_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>, BatchError> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();
    for path in paths {
        let expanded = if path.is_dir() {
            enumerate_directory(path)?
        } else {
            vec![path.clone()]
        };
        for source in expanded {
            if seen.insert(source.clone()) {
                resolved.push(source);
            } else {
                tracing::debug!(source = %source.display(), "skipping duplicate input");
            }
        }
    }
    Ok(resolved)
}
