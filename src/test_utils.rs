//! Shared test utilities for the release crate.

use crate::config::ReleaseConfig;
use crate::error::{ReleaseError, Result};
use crate::registry::CommandExecutor;
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use tempfile::TempDir;

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "npm").
    pub cmd: &'static str,
    /// The arguments to pass to the command.
    pub args: Vec<&'static str>,
    /// Expected working directory; `None` accepts any directory.
    pub cwd: Option<PathBuf>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

impl ExpectedCall {
    /// Expect a successful `npm <args>` in `cwd`.
    #[must_use]
    pub fn npm(args: Vec<&'static str>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            cmd: "npm",
            args,
            cwd: Some(cwd.into()),
            result: Ok(success_output()),
        }
    }
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects. An
/// unexpected or mismatched invocation yields
/// [`ReleaseError::StubMismatch`].
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Number of expected invocations not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.expected.borrow().len()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        let remaining = self.remaining();
        assert!(
            remaining == 0,
            "expected no further command invocations, {remaining} remain"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str], cwd: &Path) -> Result<Output> {
        let Some(call) = self.expected.borrow_mut().pop_front() else {
            return Err(mismatch(format!(
                "unexpected invocation: {cmd} {}",
                args.join(" ")
            )));
        };

        if call.cmd != cmd || call.args.as_slice() != args {
            return Err(mismatch(format!(
                "expected `{} {}`, got `{cmd} {}`",
                call.cmd,
                call.args.join(" "),
                args.join(" ")
            )));
        }
        if let Some(expected_cwd) = &call.cwd {
            if expected_cwd != cwd {
                return Err(mismatch(format!(
                    "expected cwd {}, got {}",
                    expected_cwd.display(),
                    cwd.display()
                )));
            }
        }

        call.result
    }
}

fn mismatch(message: String) -> ReleaseError {
    ReleaseError::StubMismatch { message }
}

/// Write a gzip-compressed tarball holding `members` as `(name, content)`.
///
/// # Errors
///
/// Returns any I/O error raised while writing the archive.
pub fn write_tar_gz(path: &Path, members: &[(&str, &str)]) -> io::Result<()> {
    let encoder = flate2::write::GzEncoder::new(File::create(path)?, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, content) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, *name, content.as_bytes())?;
    }
    builder.into_inner()?.finish()?;
    Ok(())
}

/// Write a zip archive holding `members` as `(name, content)`.
///
/// # Errors
///
/// Returns any I/O or zip error raised while writing the archive.
pub fn write_zip(path: &Path, members: &[(&str, &str)]) -> io::Result<()> {
    let mut writer = zip::ZipWriter::new(File::create(path)?);
    let options = zip::write::SimpleFileOptions::default();
    for (name, content) in members {
        writer.start_file(*name, options).map_err(io::Error::other)?;
        writer.write_all(content.as_bytes())?;
    }
    writer.finish().map_err(io::Error::other)?;
    Ok(())
}

/// A temporary project holding the npm package trees described by a
/// configuration.
///
/// The umbrella manifest declares every platform package under
/// `optionalDependencies`, all at version `0.0.0`.
#[derive(Debug)]
pub struct NpmTree {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl NpmTree {
    /// Create the tree in a fresh temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the tree cannot be written or the temporary
    /// path is not UTF-8.
    pub fn new(config: &ReleaseConfig) -> io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).map_err(|path| {
            io::Error::other(format!("temporary path {} is not UTF-8", path.display()))
        })?;
        let layout = config.layout(&root);

        let dependencies: serde_json::Map<String, serde_json::Value> = config
            .platforms
            .iter()
            .map(|t| (config.platform_package_name(t), "0.0.0".into()))
            .collect();
        write_json(
            &layout.manifest_path(&config.umbrella_package),
            &serde_json::json!({
                "name": config.umbrella_package,
                "version": "0.0.0",
                "bin": { (config.tool_name.clone()): format!("bin/{}.js", config.tool_name) },
                "optionalDependencies": dependencies,
            }),
        )?;
        for target in &config.platforms {
            write_json(
                &layout.manifest_path(target.package()),
                &serde_json::json!({
                    "name": config.platform_package_name(target),
                    "version": "0.0.0",
                    "os": [target.os()],
                }),
            )?;
        }

        Ok(Self { _dir: dir, root })
    }

    /// Project root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Parsed manifest of a package directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the manifest is missing or not valid JSON.
    pub fn manifest(&self, config: &ReleaseConfig, package: &str) -> io::Result<serde_json::Value> {
        let path = config.layout(&self.root).manifest_path(package);
        let text = std::fs::read_to_string(&path)?;
        serde_json::from_str(&text).map_err(io::Error::other)
    }
}

fn write_json(path: &Utf8Path, value: &serde_json::Value) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    std::fs::write(path, format!("{text}\n"))
}
