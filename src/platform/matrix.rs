//! The ordered, immutable set of platform targets for a release.

use super::target::{ArchiveFormat, PlatformTarget};
use crate::error::{ReleaseError, Result};
use std::collections::HashSet;

/// Ordered platform targets.
///
/// Order is publish order for the platform packages. Once built the matrix is
/// never mutated; the orchestrator borrows it for the whole run.
///
/// # Examples
///
/// ```
/// use xsql_npm_release::platform::PlatformMatrix;
///
/// let matrix = PlatformMatrix::default();
/// assert_eq!(matrix.len(), 6);
/// assert_eq!(matrix.targets()[0].package(), "linux-x64");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformMatrix {
    targets: Vec<PlatformTarget>,
}

impl PlatformMatrix {
    /// Build a matrix, rejecting empty lists and duplicate mappings.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::InvalidMatrix`] when `targets` is empty, when a
    /// target has a blank field, when a package name is not a single path
    /// component, or when two targets share a package directory or an
    /// (os, arch) pair.
    pub fn new(targets: Vec<PlatformTarget>) -> Result<Self> {
        validate(&targets)?;
        Ok(Self { targets })
    }

    /// Return the targets in publish order.
    #[must_use]
    pub fn targets(&self) -> &[PlatformTarget] {
        &self.targets
    }

    /// Iterate the targets in publish order.
    pub fn iter(&self) -> std::slice::Iter<'_, PlatformTarget> {
        self.targets.iter()
    }

    /// Number of targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Always false for a constructed matrix.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl Default for PlatformMatrix {
    /// The six targets the xsql release pipeline ships.
    fn default() -> Self {
        Self {
            targets: default_targets(),
        }
    }
}

impl<'a> IntoIterator for &'a PlatformMatrix {
    type Item = &'a PlatformTarget;
    type IntoIter = std::slice::Iter<'a, PlatformTarget>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.iter()
    }
}

/// Default targets in publish order.
#[must_use]
pub fn default_targets() -> Vec<PlatformTarget> {
    use ArchiveFormat::{TarGz, Zip};
    vec![
        PlatformTarget::new("linux", "amd64", "linux-x64", "", TarGz),
        PlatformTarget::new("linux", "arm64", "linux-arm64", "", TarGz),
        PlatformTarget::new("darwin", "amd64", "darwin-x64", "", TarGz),
        PlatformTarget::new("darwin", "arm64", "darwin-arm64", "", TarGz),
        PlatformTarget::new("windows", "amd64", "win32-x64", ".exe", Zip),
        PlatformTarget::new("windows", "arm64", "win32-arm64", ".exe", Zip),
    ]
}

fn validate(targets: &[PlatformTarget]) -> Result<()> {
    if targets.is_empty() {
        return Err(invalid("at least one platform target is required"));
    }

    let mut packages = HashSet::new();
    let mut pairs = HashSet::new();
    for target in targets {
        if let Some(field) = target.blank_field() {
            return Err(invalid(format!("target {target} has an empty {field}")));
        }
        if !is_single_component(target.package()) {
            return Err(invalid(format!(
                "package \"{}\" must be a plain directory name",
                target.package()
            )));
        }
        if !packages.insert(target.package()) {
            return Err(invalid(format!(
                "package \"{}\" is mapped by more than one target",
                target.package()
            )));
        }
        if !pairs.insert((target.os(), target.arch())) {
            return Err(invalid(format!("target {target} is listed twice")));
        }
    }
    Ok(())
}

fn is_single_component(name: &str) -> bool {
    !name.contains(['/', '\\']) && name != "." && name != ".."
}

fn invalid(reason: impl Into<String>) -> ReleaseError {
    ReleaseError::InvalidMatrix {
        reason: reason.into(),
    }
}
