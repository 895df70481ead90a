//! CLI output formatting for `convert` and `verify`.
//!
//! # Information-First Display
//!
//! Every item leads with its semantic identity (collection and item id);
//! filesystem paths follow as indented context lines. The output reads as an
//! inventory of the catalog while still letting users trace each line back to
//! a file.
//!
//! # Output Format
//!
//! ## Convert (per item, streamed as workers finish)
//!
//! ```text
//! Vacation p1
//!     Source: a/x.jpg
//!     converted: timeliner_repo/processed/a/p1.webp
//! Vacation p2
//!     Source: a/y.jpg
//!     missing source
//! ```
//!
//! ## Convert (after the batch)
//!
//! ```text
//! Failures (1)
//!     Vacation p3: open image 'timeliner_repo/a/z.jpg': ...
//!
//! Collections
//!     Family (1 image)
//!     Vacation (2 images)
//!
//! 2 converted, 1 already converted, 1 missing, 1 failed (5 total)
//! Manifest: index.json
//! ```
//!
//! ## Verify
//!
//! ```text
//! Checked 3 images against 1920x1080
//!     Vacation: missing timeliner_repo/processed/a/p1.webp
//!     Vacation: timeliner_repo/processed/a/p3.webp is 640x480
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::aggregate::{BatchError, Manifest};
use crate::imaging::Frame;
use crate::manifest::{VerifyProblem, VerifyReport};
use crate::process::{ItemStatus, ProcessEvent, ProcessResult};
use std::path::Path;

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Convert: per-item progress
// ============================================================================

/// Format a single progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::ItemProcessed {
            collection,
            item_id,
            source_path,
            status,
        } => {
            let status_line = match status {
                ItemStatus::Converted(path) => format!("converted: {}", path.display()),
                ItemStatus::AlreadyConverted(path) => {
                    format!("already converted: {}", path.display())
                }
                ItemStatus::MissingSource(_) => "missing source".to_string(),
                ItemStatus::Failed(message) => format!("failed: {message}"),
            };
            vec![
                format!("{collection} {item_id}"),
                format!("    Source: {}", source_path.display()),
                format!("    {status_line}"),
            ]
        }
    }
}

// ============================================================================
// Convert: end of batch
// ============================================================================

/// Format per-item failures. Empty when nothing failed.
pub fn format_failures(errors: &BatchError) -> Vec<String> {
    if errors.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![format!("Failures ({})", errors.len())];
    for failure in errors.failures() {
        lines.push(format!(
            "    {} {}: {}",
            failure.collection, failure.item_id, failure.error
        ));
    }
    lines
}

/// Format the per-collection image counts of a manifest.
pub fn format_collections(manifest: &Manifest) -> Vec<String> {
    let mut lines = vec!["Collections".to_string()];
    if manifest.is_empty() {
        lines.push("    (none)".to_string());
    }
    for (name, paths) in manifest.iter() {
        lines.push(format!("    {} ({})", name, plural(paths.len(), "image")));
    }
    lines
}

/// Format the closing summary of a `convert` run.
pub fn format_convert_summary(result: &ProcessResult, manifest_path: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    let failures = format_failures(&result.report.errors);
    if !failures.is_empty() {
        lines.extend(failures);
        lines.push(String::new());
    }

    lines.extend(format_collections(&result.report.manifest));
    lines.push(String::new());
    lines.push(result.report.stats.to_string());

    if result.enumeration.skipped_rows > 0 {
        lines.push(format!(
            "Skipped {} of {} catalog rows (malformed)",
            result.enumeration.skipped_rows, result.enumeration.rows
        ));
    }
    if result.stopped_early() {
        lines.push(format!(
            "Deadline reached after {}; remaining items were not submitted",
            plural(result.submitted, "item")
        ));
    }
    lines.push(format!("Manifest: {}", manifest_path.display()));
    lines
}

pub fn print_convert_summary(result: &ProcessResult, manifest_path: &Path) {
    for line in format_convert_summary(result, manifest_path) {
        println!("{}", line);
    }
}

// ============================================================================
// Verify
// ============================================================================

pub fn format_verify_report(report: &VerifyReport, frame: Frame) -> Vec<String> {
    let mut lines = vec![format!(
        "Checked {} against {}",
        plural(report.checked, "image"),
        frame
    )];
    for problem in &report.problems {
        let line = match problem {
            VerifyProblem::Missing { collection, path } => {
                format!("    {}: missing {}", collection, path.display())
            }
            VerifyProblem::Unreadable {
                collection,
                path,
                message,
            } => format!("    {}: unreadable {}: {}", collection, path.display(), message),
            VerifyProblem::WrongDimensions {
                collection,
                path,
                width,
                height,
            } => format!(
                "    {}: {} is {}x{}",
                collection,
                path.display(),
                width,
                height
            ),
        };
        lines.push(line);
    }
    if report.is_ok() {
        lines.push("All images present with the expected dimensions".to_string());
    } else {
        lines.push(plural(report.problems.len(), "problem"));
    }
    lines
}

pub fn print_verify_report(report: &VerifyReport, frame: Frame) {
    for line in format_verify_report(report, frame) {
        println!("{}", line);
    }
}
