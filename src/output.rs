//! CLI output formatting.
//!
//! Routes are the primary entities: each one is shown by its canonical path
//! with a positional index, and the file it came from (or what it carries)
//! as indented context lines underneath.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Routes
//! 001 /
//!     Source: index.html
//! 002 /about
//!     Source: about.html
//!
//! Assets
//!     Fonts: 1
//!     Images: 1
//!     Stylesheets: 1
//!     Scripts: 1
//!
//! Build
//!     fixture-build
//! ```
//!
//! ## Build
//!
//! ```text
//! Routes
//! 001 /
//! 002 /about
//!
//! Inlined 4 assets (12.4 KB encoded)
//! Wrote dist/index.html (48.1 KB)
//! ```
//!
//! ## Routes (embedded table of a produced document)
//!
//! ```text
//! 001 / (Home | Fixture Site)
//!     head: 1.2 KB, body: 3.4 KB
//! ```
//!
//! ## Benchmark
//!
//! ```text
//! Runs
//! 001 4.21 ms
//! 002 3.87 ms
//!
//! Average: 4.04 ms over 2 runs
//! Output: 48.1 KB (5 routes, 4 assets)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::compose::extract_title;
use crate::pipeline::{AssetCounts, BuildOutput};
use crate::router::RouteTable;
use crate::scan::SourceTree;
use std::path::Path;
use std::time::Duration;

const TITLE_WIDTH: usize = 60;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count.
///
/// ```text
/// 512 B
/// 12.4 KB
/// 3.1 MB
/// ```
fn format_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < MB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / MB)
    }
}

/// Truncate to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn format_duration(duration: Duration) -> String {
    format!("{:.2} ms", duration.as_secs_f64() * 1000.0)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}

fn asset_lines(assets: &AssetCounts) -> Vec<String> {
    vec![
        format!("{}Fonts: {}", indent(1), assets.fonts),
        format!("{}Images: {}", indent(1), assets.images),
        format!("{}Stylesheets: {}", indent(1), assets.styles),
        format!("{}Scripts: {}", indent(1), assets.scripts),
    ]
}

// ============================================================================
// Scan
// ============================================================================

pub fn format_scan_output(tree: &SourceTree) -> Vec<String> {
    let mut lines = vec!["Routes".to_string()];
    if tree.routes.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for (i, route) in tree.routes.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), route.path));
        lines.push(format!("{}Source: {}", indent(1), route.html_file));
    }

    lines.push(String::new());
    lines.push("Assets".to_string());
    lines.extend(asset_lines(&AssetCounts::of(tree)));

    lines.push(String::new());
    lines.push("Build".to_string());
    lines.push(format!("{}{}", indent(1), tree.build_id));
    lines
}

/// Print scan output to stdout.
pub fn print_scan_output(tree: &SourceTree) {
    for line in format_scan_output(tree) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

pub fn format_build_output(output: &BuildOutput, destination: &Path) -> Vec<String> {
    let mut lines = vec!["Routes".to_string()];
    for (i, route) in output.routes.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), route));
    }
    lines.push(String::new());
    lines.push(format!(
        "Inlined {} ({} encoded)",
        plural(output.assets.total(), "asset", "assets"),
        format_size(output.encoded_asset_bytes)
    ));
    lines.push(format!(
        "Wrote {} ({})",
        destination.display(),
        format_size(output.size())
    ));
    lines
}

pub fn print_build_output(output: &BuildOutput, destination: &Path) {
    for line in format_build_output(output, destination) {
        println!("{}", line);
    }
}

// ============================================================================
// Benchmark
// ============================================================================

/// Per-run timings of repeated builds, their average, and the size of the
/// document the last run produced.
pub fn format_benchmark_output(runs: &[Duration], output: &BuildOutput) -> Vec<String> {
    let mut lines = vec!["Runs".to_string()];
    for (i, run) in runs.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), format_duration(*run)));
    }

    let average = match u32::try_from(runs.len()) {
        Ok(n) if n > 0 => runs.iter().sum::<Duration>() / n,
        _ => Duration::ZERO,
    };
    lines.push(String::new());
    lines.push(format!(
        "Average: {} over {}",
        format_duration(average),
        plural(runs.len(), "run", "runs")
    ));
    lines.push(format!(
        "Output: {} ({}, {})",
        format_size(output.size()),
        plural(output.routes.len(), "route", "routes"),
        plural(output.assets.total(), "asset", "assets")
    ));
    lines
}

pub fn print_benchmark_output(runs: &[Duration], output: &BuildOutput) {
    for line in format_benchmark_output(runs, output) {
        println!("{}", line);
    }
}

// ============================================================================
// Embedded route table
// ============================================================================

pub fn format_route_table(table: &RouteTable) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, (path, entry)) in table.iter().enumerate() {
        let header = match extract_title(&entry.head) {
            Some(title) => format!(
                "{} {} ({})",
                format_index(i + 1),
                path,
                truncate(title.trim(), TITLE_WIDTH)
            ),
            None => format!("{} {}", format_index(i + 1), path),
        };
        lines.push(header);
        lines.push(format!(
            "{}head: {}, body: {}",
            indent(1),
            format_size(entry.head.len()),
            format_size(entry.body.len())
        ));
    }
    lines.push(String::new());
    lines.push(plural(table.len(), "route", "routes"));
    lines
}

pub fn print_route_table(table: &RouteTable) {
    for line in format_route_table(table) {
        println!("{}", line);
    }
}
