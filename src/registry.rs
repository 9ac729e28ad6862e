//! Registry publication through the `npm` command-line client.
//!
//! Process execution sits behind [`CommandExecutor`] so tests can replay
//! expected invocations without touching the real registry.

use crate::error::{ReleaseError, Result};
use log::debug;
use std::path::Path;
use std::process::{Command, Output};

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments in `cwd` and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the command.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use xsql_npm_release::registry::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run("npm", &["--version"], Path::new("."))?;
    /// assert!(output.status.success());
    /// # Ok::<(), xsql_npm_release::error::ReleaseError>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str], cwd: &Path) -> Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str], cwd: &Path) -> Result<Output> {
        Command::new(cmd)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(ReleaseError::from)
    }
}

/// Registry visibility requested for a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Pass `--access public`; required for first publication of a scoped
    /// package.
    Public,
    /// Leave access to the registry default.
    Default,
}

/// Arguments for `npm publish`.
///
/// # Examples
///
/// ```
/// use xsql_npm_release::registry::{Access, publish_args};
///
/// assert_eq!(publish_args(Access::Public, true), ["publish", "--access", "public", "--dry-run"]);
/// assert_eq!(publish_args(Access::Default, false), ["publish"]);
/// ```
#[must_use]
pub fn publish_args(access: Access, dry_run: bool) -> Vec<&'static str> {
    let mut args = vec!["publish"];
    if access == Access::Public {
        args.extend(["--access", "public"]);
    }
    if dry_run {
        args.push("--dry-run");
    }
    args
}

/// Publishes package directories with `npm publish`.
pub struct NpmPublisher<'a> {
    executor: &'a dyn CommandExecutor,
    program: &'a str,
}

impl<'a> NpmPublisher<'a> {
    /// Create a publisher that runs `program` (normally `npm`).
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, program: &'a str) -> Self {
        Self { executor, program }
    }

    /// Publish the package in `dir`, reporting failures against `package`.
    ///
    /// On success returns what `npm` printed (stdout, then stderr, where npm
    /// writes its tarball notices), trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Publish`] when the command cannot be started or
    /// exits unsuccessfully.
    pub fn publish(
        &self,
        dir: &Path,
        package: &str,
        access: Access,
        dry_run: bool,
    ) -> Result<String> {
        let args = publish_args(access, dry_run);
        debug!("running {} {} in {}", self.program, args.join(" "), dir.display());

        let output = self
            .executor
            .run(self.program, &args, dir)
            .map_err(|err| match err {
                ReleaseError::Io(source) => ReleaseError::Publish {
                    package: package.to_owned(),
                    reason: format!("failed to run {}: {source}", self.program),
                },
                other => other,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!("{} stdout for {package}:\n{}", self.program, stdout.trim_end());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if output.status.success() {
            return Ok(captured_report(&stdout, &stderr));
        }

        let status = output
            .status
            .code()
            .map_or_else(|| "terminated by signal".to_owned(), |code| format!("exit code {code}"));
        let reason = match stderr.trim() {
            "" => status,
            detail => format!("{status}: {detail}"),
        };
        Err(ReleaseError::Publish {
            package: package.to_owned(),
            reason,
        })
    }
}

fn captured_report(stdout: &str, stderr: &str) -> String {
    [stdout.trim(), stderr.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
