//! Resumable record of packages already published for a version.
//!
//! The log is a small JSON document written after every successful live
//! publish:
//!
//! ```json
//! {
//!   "version": "1.2.3",
//!   "published": ["@xsql-cli/linux-x64", "@xsql-cli/linux-arm64"]
//! }
//! ```
//!
//! A rerun with `--resume` skips the recorded packages, which lets an operator
//! recover from a registry failure part-way through the publish stages
//! without tripping over "version already exists" errors.

use camino::{Utf8Path, Utf8PathBuf};
use log::warn;
use serde::{Deserialize, Serialize};

/// On-disk form of the run log.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct RunLogState {
    version: String,
    #[serde(default)]
    published: Vec<String>,
}

/// How an existing log was treated when a run started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// No usable log was consulted; the run starts from scratch.
    Fresh,
    /// A log for the same version was loaded.
    Resumed {
        /// Number of packages already recorded.
        published: usize,
    },
    /// A log existed but was discarded.
    Discarded {
        /// Why the log was not reused.
        reason: String,
    },
}

/// Errors that prevent the run log from being persisted.
#[derive(Debug, thiserror::Error)]
pub enum RunLogError {
    /// Reading the log file failed.
    #[error("failed to read run log {path}: {source}")]
    Read {
        /// Log path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Serializing the log failed.
    #[error("failed to serialize run log: {source}")]
    Serialize {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Writing the log file failed.
    #[error("failed to write run log {path}: {source}")]
    Write {
        /// Log path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Removing the log file failed.
    #[error("failed to remove run log {path}: {source}")]
    Remove {
        /// Log path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Published-package record bound to its file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLog {
    path: Utf8PathBuf,
    state: RunLogState,
}

impl RunLog {
    /// Open the log for `version`.
    ///
    /// With `resume` set, a log recorded for the same version is reused; a
    /// log for a different version or a malformed log is discarded. Without
    /// `resume` any existing log is ignored and will be replaced by the next
    /// [`Self::save`] or [`Self::record`].
    ///
    /// # Errors
    ///
    /// Returns [`RunLogError::Read`] if an existing log cannot be read.
    pub fn start(
        path: &Utf8Path,
        version: &str,
        resume: bool,
    ) -> Result<(Self, StartOutcome), RunLogError> {
        let fresh = Self {
            path: path.to_path_buf(),
            state: RunLogState {
                version: version.to_owned(),
                published: Vec::new(),
            },
        };
        if !resume || !path.exists() {
            return Ok((fresh, StartOutcome::Fresh));
        }

        let content = std::fs::read_to_string(path).map_err(|source| RunLogError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let outcome = match serde_json::from_str::<RunLogState>(&content) {
            Ok(state) if state.version == version => {
                let published = state.published.len();
                return Ok((
                    Self {
                        path: path.to_path_buf(),
                        state,
                    },
                    StartOutcome::Resumed { published },
                ));
            }
            Ok(state) => StartOutcome::Discarded {
                reason: format!("it records version {}", state.version),
            },
            Err(e) => StartOutcome::Discarded {
                reason: format!("it is malformed ({e})"),
            },
        };
        if let StartOutcome::Discarded { reason } = &outcome {
            warn!("discarding run log {path}: {reason}");
        }
        Ok((fresh, outcome))
    }

    /// Return the log file path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Return the version this log belongs to.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.state.version
    }

    /// Return the recorded packages in publish order.
    #[must_use]
    pub fn published(&self) -> &[String] {
        &self.state.published
    }

    /// Returns true when `package` has already been published.
    #[must_use]
    pub fn contains(&self, package: &str) -> bool {
        self.state.published.iter().any(|p| p == package)
    }

    /// Record a successful publish and persist the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be written.
    pub fn record(&mut self, package: &str) -> Result<(), RunLogError> {
        if !self.contains(package) {
            self.state.published.push(package.to_owned());
        }
        self.save()
    }

    /// Persist the log as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self) -> Result<(), RunLogError> {
        let write_error = |source| RunLogError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        let mut json = serde_json::to_string_pretty(&self.state)
            .map_err(|source| RunLogError::Serialize { source })?;
        json.push('\n');
        std::fs::write(&self.path, json).map_err(write_error)
    }

    /// Delete the log file. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RunLogError::Remove`] if deletion fails.
    pub fn remove(&self) -> Result<(), RunLogError> {
        match std::fs::remove_file(&self.path) {
            Err(source) if source.kind() != std::io::ErrorKind::NotFound => {
                Err(RunLogError::Remove {
                    path: self.path.clone(),
                    source,
                })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct LogDir {
        _dir: TempDir,
        path: Utf8PathBuf,
    }

    #[fixture]
    fn log_dir() -> LogDir {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
        LogDir {
            _dir: dir,
            path: root.join(".npm-release-state.json"),
        }
    }

    #[rstest]
    fn record_persists_each_package_once(log_dir: LogDir) {
        let (mut log, outcome) = RunLog::start(&log_dir.path, "1.2.3", false).expect("start");
        assert_eq!(outcome, StartOutcome::Fresh);

        log.record("@xsql-cli/linux-x64").expect("record");
        log.record("@xsql-cli/linux-x64").expect("record again");
        log.record("@xsql-cli/linux-arm64").expect("record second");

        let (resumed, outcome) = RunLog::start(&log_dir.path, "1.2.3", true).expect("resume");
        assert_eq!(outcome, StartOutcome::Resumed { published: 2 });
        assert_eq!(resumed.published(), ["@xsql-cli/linux-x64", "@xsql-cli/linux-arm64"]);
        assert!(resumed.contains("@xsql-cli/linux-arm64"));
        assert!(!resumed.contains("xsql"));
    }

    #[rstest]
    fn resume_discards_log_for_other_version(log_dir: LogDir) {
        let (mut old, _) = RunLog::start(&log_dir.path, "1.2.2", false).expect("start");
        old.record("xsql").expect("record");

        let (log, outcome) = RunLog::start(&log_dir.path, "1.2.3", true).expect("resume");
        assert!(
            matches!(&outcome, StartOutcome::Discarded { reason } if reason.contains("1.2.2")),
            "{outcome:?}"
        );
        assert_eq!(log.version(), "1.2.3");
        assert!(log.published().is_empty());
    }

    #[rstest]
    fn resume_recovers_from_malformed_log(log_dir: LogDir) {
        std::fs::write(&log_dir.path, "{ not json").expect("write corrupt log");

        let (log, outcome) = RunLog::start(&log_dir.path, "1.2.3", true).expect("resume");
        assert!(matches!(outcome, StartOutcome::Discarded { .. }), "{outcome:?}");
        assert!(log.published().is_empty());
    }

    #[rstest]
    fn without_resume_existing_log_is_ignored(log_dir: LogDir) {
        let (mut old, _) = RunLog::start(&log_dir.path, "1.2.3", false).expect("start");
        old.record("xsql").expect("record");

        let (log, outcome) = RunLog::start(&log_dir.path, "1.2.3", false).expect("restart");
        assert_eq!(outcome, StartOutcome::Fresh);
        assert!(!log.contains("xsql"));
    }

    #[rstest]
    fn remove_deletes_file_and_tolerates_absence(log_dir: LogDir) {
        let (log, _) = RunLog::start(&log_dir.path, "1.2.3", false).expect("start");
        log.save().expect("save");
        assert!(log.path().exists());

        log.remove().expect("remove");
        assert!(!log.path().exists());
        log.remove().expect("second remove is a no-op");
    }
}
