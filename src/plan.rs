//! The ordered task list that drives a release run.
//!
//! A plan is built once from the platform matrix and never reordered. Each
//! task carries the stage it belongs to; stages appear in a fixed sequence:
//! every manifest update precedes any download, every extraction precedes any
//! publish, and the umbrella package is published after all platform packages.

use crate::platform::{PlatformMatrix, PlatformTarget};
use std::fmt;

/// Pipeline stage a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Rewriting manifest versions.
    VersionSync,
    /// Downloading archives and extracting binaries.
    FetchExtract,
    /// Publishing the per-platform packages.
    PublishPlatforms,
    /// Publishing the umbrella package.
    PublishUmbrella,
    /// Removing transient state.
    Cleanup,
}

impl Stage {
    /// Heading shown to the operator when the stage begins.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::VersionSync => "Updating versions",
            Self::FetchExtract => "Downloading binaries from release",
            Self::PublishPlatforms => "Publishing platform packages",
            Self::PublishUmbrella => "Publishing main package",
            Self::Cleanup => "Cleaning up",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::VersionSync => "version-sync",
            Self::FetchExtract => "fetch-extract",
            Self::PublishPlatforms => "publish-platforms",
            Self::PublishUmbrella => "publish-umbrella",
            Self::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// A package directory a task operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageRef<'m> {
    /// The umbrella package.
    Umbrella,
    /// The package of one platform target.
    Platform(&'m PlatformTarget),
}

/// One unit of work in a release run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseTask<'m> {
    /// Rewrite a package's manifest version.
    SyncManifest(PackageRef<'m>),
    /// Download a target's archive and extract its binary.
    FetchExtract(&'m PlatformTarget),
    /// Publish a package to the registry.
    Publish(PackageRef<'m>),
    /// Remove the staging area and run log.
    Cleanup,
}

impl ReleaseTask<'_> {
    /// Return the stage this task runs in.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::SyncManifest(_) => Stage::VersionSync,
            Self::FetchExtract(_) => Stage::FetchExtract,
            Self::Publish(PackageRef::Platform(_)) => Stage::PublishPlatforms,
            Self::Publish(PackageRef::Umbrella) => Stage::PublishUmbrella,
            Self::Cleanup => Stage::Cleanup,
        }
    }
}

/// Ordered tasks for one run over a matrix.
///
/// # Examples
///
/// ```
/// use xsql_npm_release::plan::{ReleasePlan, Stage};
/// use xsql_npm_release::platform::PlatformMatrix;
///
/// let matrix = PlatformMatrix::default();
/// let plan = ReleasePlan::new(&matrix);
/// // 7 manifests, 6 downloads, 7 publishes, 1 cleanup.
/// assert_eq!(plan.len(), 21);
/// assert_eq!(plan.tasks().last().map(|t| t.stage()), Some(Stage::Cleanup));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasePlan<'m> {
    tasks: Vec<ReleaseTask<'m>>,
}

impl<'m> ReleasePlan<'m> {
    /// Build the plan: umbrella then platform manifests, downloads in matrix
    /// order, platform publishes in matrix order, the umbrella publish, and
    /// cleanup.
    #[must_use]
    pub fn new(matrix: &'m PlatformMatrix) -> Self {
        let mut tasks = Vec::with_capacity(3 * matrix.len() + 3);
        tasks.push(ReleaseTask::SyncManifest(PackageRef::Umbrella));
        tasks.extend(
            matrix
                .iter()
                .map(|t| ReleaseTask::SyncManifest(PackageRef::Platform(t))),
        );
        tasks.extend(matrix.iter().map(ReleaseTask::FetchExtract));
        tasks.extend(
            matrix
                .iter()
                .map(|t| ReleaseTask::Publish(PackageRef::Platform(t))),
        );
        tasks.push(ReleaseTask::Publish(PackageRef::Umbrella));
        tasks.push(ReleaseTask::Cleanup);
        Self { tasks }
    }

    /// Return the tasks in execution order.
    #[must_use]
    pub fn tasks(&self) -> &[ReleaseTask<'m>] {
        &self.tasks
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Always false for a plan built from a valid matrix.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
