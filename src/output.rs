//! Operator-facing progress output.
//!
//! Progress lines go to an injected writer (stderr in production) so tests can
//! capture them. Write failures are ignored: progress output must never abort
//! a release.

use crate::orchestrator::RunReport;
use std::fmt::Display;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Banner printed before any work starts.
///
/// # Example
///
/// ```
/// use xsql_npm_release::output::start_banner;
///
/// assert_eq!(start_banner("xsql", "1.2.3", true), "Publishing xsql v1.2.3 to npm (dry-run)...");
/// ```
#[must_use]
pub fn start_banner(tool: &str, version: &str, dry_run: bool) -> String {
    let mode = if dry_run { " (dry-run)" } else { "" };
    format!("Publishing {tool} v{version} to npm{mode}...")
}

/// Heading printed when a stage begins.
#[must_use]
pub fn stage_heading(title: &str) -> String {
    format!("==> {title}...")
}

/// Closing line for a successful run.
#[must_use]
pub fn completion_line(umbrella: &str, report: &RunReport) -> String {
    let mode = if report.dry_run() { " (dry-run)" } else { "" };
    let mut line = format!(
        "Done! {umbrella} v{} published to npm{mode}.",
        report.version()
    );
    if !report.skipped().is_empty() {
        line.push_str(&format!(
            " Skipped {} package(s) already published: {}.",
            report.skipped().len(),
            report.skipped().join(", ")
        ));
    }
    line
}
