//! CLI argument definitions for `xsql-npm-publish`.
//!
//! The binary takes one positional version argument plus a small set of
//! flags. A missing version is not a clap error: the run prints its own usage
//! line and exits with status 1.

use crate::error::{ReleaseError, Result};
use crate::orchestrator::ReleaseRequest;
use crate::version::ReleaseVersion;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::LevelFilter;

/// Publish the xsql release binaries to npm.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "xsql-npm-publish")]
#[command(version, about)]
#[command(long_about = concat!(
    "Publish the xsql release binaries to npm.\n\n",
    "Sets the version in every package manifest under npm/, downloads the ",
    "per-platform archives of the matching GitHub release, extracts each binary ",
    "into its platform package, publishes the platform packages and finally ",
    "publishes the umbrella package.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Publish a release:\n",
    "    $ xsql-npm-publish 1.2.3\n\n",
    "  Rehearse without publishing:\n",
    "    $ xsql-npm-publish v1.2.3 --dry-run\n\n",
    "  Continue after a failed publish:\n",
    "    $ xsql-npm-publish 1.2.3 --resume",
))]
pub struct Cli {
    /// Release version, with or without a leading `v`.
    #[arg(value_name = "VERSION")]
    pub release: Option<String>,

    /// Pass --dry-run to every npm publish.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip packages already published by an earlier run of this version.
    #[arg(long)]
    pub resume: bool,

    /// Project root holding the npm package trees [default: current directory].
    #[arg(long, value_name = "DIR")]
    pub root: Option<Utf8PathBuf>,

    /// Configuration file [default: <root>/npm-release.toml when present].
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Default log filter implied by `-v`/`-q`.
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::Parser;
    /// use log::LevelFilter;
    /// use xsql_npm_release::cli::Cli;
    ///
    /// let cli = Cli::parse_from(["xsql-npm-publish", "1.2.3", "-vv"]);
    /// assert_eq!(cli.log_level(), LevelFilter::Debug);
    /// ```
    #[must_use]
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Project root, defaulting to the current directory.
    #[must_use]
    pub fn root_dir(&self) -> &Utf8Path {
        self.root.as_deref().unwrap_or_else(|| Utf8Path::new("."))
    }

    /// Build the run request from the arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Usage`] when no version was given and
    /// [`ReleaseError::InvalidVersion`] when it is malformed.
    pub fn release_request(&self) -> Result<ReleaseRequest> {
        let raw = self
            .release
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(ReleaseError::missing_version)?;
        Ok(ReleaseRequest {
            version: ReleaseVersion::try_from(raw)?,
            dry_run: self.dry_run,
            resume: self.resume,
            quiet: self.quiet,
        })
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
