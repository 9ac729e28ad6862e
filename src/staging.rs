//! Transient download directory for one release run.
//!
//! Archives land in the staging area before their binaries are extracted into
//! the package trees. Only a successful run removes it; after a failure it
//! stays on disk for inspection.

use crate::artefact::naming::ArchiveName;
use crate::error::{ReleaseError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Handles the lifecycle of the staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingArea {
    path: Utf8PathBuf,
}

impl StagingArea {
    /// Create a handle for `path` without touching the filesystem.
    #[must_use]
    pub fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    /// Return the staging directory.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Ensure the directory exists.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Staging`] if the directory cannot be created.
    pub fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.path).map_err(|source| self.error(source))
    }

    /// Path an archive is downloaded to.
    #[must_use]
    pub fn archive_path(&self, name: &ArchiveName) -> Utf8PathBuf {
        self.path.join(name.filename())
    }

    /// Remove the directory and everything in it. A missing directory is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Staging`] if removal fails.
    pub fn remove(&self) -> Result<()> {
        match fs::remove_dir_all(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(self.error(e)),
            _ => Ok(()),
        }
    }

    fn error(&self, source: std::io::Error) -> ReleaseError {
        ReleaseError::Staging {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{ArchiveFormat, PlatformTarget};
    use crate::version::ReleaseVersion;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn temp_dir() -> TempDir {
        tempfile::tempdir().expect("temp dir")
    }

    fn staging_in(temp: &TempDir) -> StagingArea {
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 temp path");
        StagingArea::new(root.join(".npm-tmp"))
    }

    #[rstest]
    fn prepare_creates_directory_and_is_repeatable(temp_dir: TempDir) {
        let staging = staging_in(&temp_dir);
        staging.prepare().expect("first prepare");
        staging.prepare().expect("second prepare");
        assert!(staging.path().is_dir());
    }

    #[rstest]
    fn archive_path_is_inside_staging_area(temp_dir: TempDir) {
        let staging = staging_in(&temp_dir);
        let version = ReleaseVersion::try_from("1.2.3").expect("valid version");
        let target = PlatformTarget::new("darwin", "arm64", "darwin-arm64", "", ArchiveFormat::TarGz);
        let name = ArchiveName::for_target("xsql", &version, &target);

        let path = staging.archive_path(&name);
        assert_eq!(path.parent(), Some(staging.path()));
        assert_eq!(path.file_name(), Some("xsql_1.2.3_darwin_arm64.tar.gz"));
    }

    #[rstest]
    fn remove_deletes_contents_and_tolerates_absence(temp_dir: TempDir) {
        let staging = staging_in(&temp_dir);
        staging.prepare().expect("prepare");
        fs::write(staging.path().join("a.zip"), b"zip").expect("write archive");

        staging.remove().expect("remove");
        assert!(!staging.path().exists());
        staging.remove().expect("second remove is a no-op");
    }
}
