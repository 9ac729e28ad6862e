//! npm release fan-out for the xsql command-line tool.
//!
//! One logical release of xsql is distributed on npm as an umbrella package
//! plus one package per supported platform, each carrying a single prebuilt
//! binary. This crate drives that release: it pins the version in every
//! manifest, downloads the per-platform archives from the GitHub release,
//! extracts each binary into its package, and publishes the platform packages
//! before the umbrella package. It backs the `xsql-npm-publish` binary and can
//! be driven programmatically for testing.
//!
//! # Modules
//!
//! - [`artefact`] - Archive naming, HTTP retrieval, and binary extraction
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - `npm-release.toml` loading and path layout
//! - [`error`] - Error types aggregated into `ReleaseError`
//! - [`manifest`] - `package.json` version synchronization
//! - [`orchestrator`] - Release run driver and report
//! - [`output`] - Operator progress lines
//! - [`plan`] - Ordered task list and pipeline stages
//! - [`platform`] - Platform targets and the validated matrix
//! - [`registry`] - Command execution and `npm publish`
//! - [`run_log`] - Resumable record of published packages
//! - [`staging`] - Transient download directory
//! - [`version`] - Release version newtype

pub mod artefact;
pub mod cli;
pub mod config;
pub mod error;
pub mod manifest;
pub mod orchestrator;
pub mod output;
pub mod plan;
pub mod platform;
pub mod registry;
pub mod run_log;
pub mod staging;
pub mod version;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
