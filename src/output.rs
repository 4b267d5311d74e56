//! CLI output formatting for ingestion runs.
//!
//! Run results print as a short entity block: a header line naming the
//! archive, then indented context lines for counts, per-entry failures, and
//! any catalog metadata:
//!
//! ```text
//! acdc_images.zip
//!     Processed: 9 images
//!     Errors: 1
//!         raw/public/acdc/fog/train/frame3.jpg: invalid or corrupt image payload
//! ```
//!
//! Indexing runs append the inventory totals:
//!
//! ```text
//! raw
//!     Processed: 120 images
//!     Inventory: 120 rows appended
//! ```
//!
//! Each shape has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.

use crate::ingest::RunSummary;
use crate::inventory::InventoryStats;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn pluralize(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

// ============================================================================
// Run summaries
// ============================================================================

/// Format one run summary as display lines.
pub fn format_run_summary(summary: &RunSummary) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(summary.archive.clone());
    lines.push(format!(
        "{}Processed: {}",
        indent(1),
        pluralize(summary.processed, "image")
    ));

    if !summary.errors.is_empty() {
        lines.push(format!("{}Errors: {}", indent(1), summary.errors.len()));
        for entry in &summary.errors {
            lines.push(format!("{}{}: {}", indent(2), entry.path, entry.error));
        }
    }

    if let Some(info) = &summary.archive_info {
        if let Some(title) = &info.title {
            lines.push(format!("{}Title: {}", indent(1), title));
        }
        if let Some(url) = &info.url {
            lines.push(format!("{}Source: {}", indent(1), url));
        }
    }

    lines
}

/// Format an indexing run: the summary plus inventory totals.
pub fn format_index_summary(summary: &RunSummary, stats: &InventoryStats) -> Vec<String> {
    let mut lines = format_run_summary(summary);
    lines.push(format!("{}Inventory: {}", indent(1), stats));
    lines
}

/// Print a run summary to stdout.
pub fn print_run_summary(summary: &RunSummary) {
    for line in format_run_summary(summary) {
        println!("{}", line);
    }
}

/// Print an indexing run to stdout.
pub fn print_index_summary(summary: &RunSummary, stats: &InventoryStats) {
    for line in format_index_summary(summary, stats) {
        println!("{}", line);
    }
}
