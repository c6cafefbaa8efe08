//! Output path policy for batch items.
//!
//! The default keeps the source's base name and extension and appends the
//! filter name: `photos/cat.jpg` + `sharpen` → `{output_dir}/cat_sharpen.jpg`.

use crate::filters::FilterKind;
use std::path::{Path, PathBuf};

/// Maps a source path to the path its filtered result is written to.
pub trait OutputNaming: Send + Sync {
    fn output_path(&self, source: &Path, filter: FilterKind, output_dir: &Path) -> PathBuf;
}

/// `{stem}_{filter}{.ext}` inside the output directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuffixNaming;

impl OutputNaming for SuffixNaming {
    fn output_path(&self, source: &Path, filter: FilterKind, output_dir: &Path) -> PathBuf {
        output_dir.join(suffixed_file_name(source, filter))
    }
}

/// File name with the filter suffix inserted before the extension.
///
/// The suffix is always the lowercase [`FilterKind::name`], however the
/// filter was spelled when it was selected.
pub fn suffixed_file_name(source: &Path, filter: FilterKind) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    match source.extension() {
        Some(ext) => format!("{}_{}.{}", stem, filter.name(), ext.to_string_lossy()),
        None => format!("{}_{}", stem, filter.name()),
    }
}
