use colored::Colorize;
use driftkit::{CycleReport, DeclaredInstance, DriftReport};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Drift Reports
// ============================================================================

/// One-line summary of a drift report.
pub fn report_summary(report: &DriftReport) -> String {
    match report.drift_count() {
        0 => format!("{}: in sync", report.source),
        1 => format!("{}: 1 drift", report.source),
        n => format!("{}: {n} drifts", report.source),
    }
}

/// Print a full cycle report.
pub fn cycle_report(report: &CycleReport) {
    let checked_at = report
        .checked_at
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M:%S");
    header(&format!("Drift check for {}", report.instance_id));
    dim(&format!("checked at {checked_at}"));

    for drift in report.reports() {
        section(&report_summary(drift));
        if drift.has_drift() {
            for finding in drift.findings() {
                println!("  {} {}", "•".yellow(), finding);
            }
        } else if let Some(sentinel) = drift.findings().first() {
            dim(sentinel.message());
        }
    }

    println!();
    if report.has_drift() {
        warn("Drift detected");
    } else {
        success("No drift detected");
    }
}

/// Print what a config file declares.
pub fn declared(resource_type: &str, declared: &DeclaredInstance) {
    header(&format!("Declared {resource_type}"));
    if declared.is_empty() {
        dim("Nothing declared");
        return;
    }

    kv("ami", or_unset(&declared.ami));
    kv("instance_type", or_unset(&declared.instance_type));
    if !declared.tags.is_empty() {
        section("Tags");
        for (key, value) in &declared.tags {
            kv(key, value);
        }
    }
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() { "(unset)" } else { value }
}

// ============================================================================
// Tests
// ============================================================================
