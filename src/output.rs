//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Apply
//!
//! ```text
//! cat.jpg → output/cat_sharpen.jpg (sharpen)
//!     Similarity: 87% (sensitivity 16, tolerance 16)
//! ```
//!
//! ## Compare
//!
//! ```text
//! cat.jpg vs cat_sharpen.jpg
//!     Similarity: 87% (sensitivity 16, tolerance 16)
//! ```
//!
//! ## Batch
//!
//! ```text
//! Progress: 0%
//! 001 cat.jpg
//!     Source: photos/cat.jpg
//!     Output: output/cat_average.jpg
//! Progress: 50%
//! 002 dog.jpg
//!     Source: photos/dog.jpg
//!     Failed: source not found
//! Progress: 100%
//! Processed 2 of 2 images: 1 succeeded, 1 failed
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::batch::{BatchEvent, BatchItem, BatchSummary, ItemStatus};
use crate::filters::FilterKind;
use crate::similarity::Sensitivity;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn similarity_line(score: u8, sensitivity: Sensitivity) -> String {
    format!(
        "    Similarity: {}% (sensitivity {}, tolerance {})",
        score,
        sensitivity,
        sensitivity.tolerance()
    )
}

// ============================================================================
// Single image
// ============================================================================

/// Format the result of filtering one image.
pub fn format_apply_output(
    source: &Path,
    output: &Path,
    filter: FilterKind,
    similarity: Option<(u8, Sensitivity)>,
) -> Vec<String> {
    let mut lines = vec![format!(
        "{} → {} ({})",
        file_label(source),
        output.display(),
        filter
    )];
    if let Some((score, sensitivity)) = similarity {
        lines.push(similarity_line(score, sensitivity));
    }
    lines
}

pub fn print_apply_output(
    source: &Path,
    output: &Path,
    filter: FilterKind,
    similarity: Option<(u8, Sensitivity)>,
) {
    for line in format_apply_output(source, output, filter, similarity) {
        println!("{}", line);
    }
}

/// Format a two-image comparison.
pub fn format_compare_output(
    original: &Path,
    candidate: &Path,
    score: u8,
    sensitivity: Sensitivity,
) -> Vec<String> {
    vec![
        format!("{} vs {}", file_label(original), file_label(candidate)),
        similarity_line(score, sensitivity),
    ]
}

pub fn print_compare_output(original: &Path, candidate: &Path, score: u8, sensitivity: Sensitivity) {
    for line in format_compare_output(original, candidate, score, sensitivity) {
        println!("{}", line);
    }
}

// ============================================================================
// Batch
// ============================================================================

/// Format one finished batch item: index and file name, then its source and
/// either the output path or the failure reason as indented context.
pub fn format_batch_item(index: usize, item: &BatchItem) -> Vec<String> {
    let mut lines = vec![
        format!("{} {}", format_index(index + 1), file_label(&item.source)),
        format!("    Source: {}", item.source.display()),
    ];
    match &item.status {
        ItemStatus::Pending => lines.push("    Pending".to_string()),
        ItemStatus::Succeeded { similarity } => {
            lines.push(format!("    Output: {}", item.output.display()));
            if let Some(score) = similarity {
                lines.push(format!("    Similarity: {}%", score));
            }
        }
        ItemStatus::Failed { error } => lines.push(format!("    Failed: {}", error)),
    }
    lines
}

/// Format the end-of-run summary.
pub fn format_batch_summary(summary: &BatchSummary) -> Vec<String> {
    let processed = summary.succeeded + summary.failed;
    let mut lines = vec![format!(
        "Processed {} of {} images: {} succeeded, {} failed",
        processed, summary.total, summary.succeeded, summary.failed
    )];
    if summary.canceled {
        lines.push(format!("Canceled: {} not started", summary.pending));
    }
    lines
}

/// Format a single batch event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Progress { percent } => vec![format!("Progress: {}%", percent)],
        BatchEvent::ItemDone { index, item, .. } => format_batch_item(*index, item),
        BatchEvent::Finished { summary } => format_batch_summary(summary),
    }
}

pub fn print_batch_event(event: &BatchEvent) {
    for line in format_batch_event(event) {
        println!("{}", line);
    }
}
