//! Release run driver.
//!
//! Executes a [`ReleasePlan`] task by task: manifest versions first, then
//! every download and extraction, then the platform publishes and finally the
//! umbrella publish. The first failing task aborts the run; nothing already
//! done is rolled back, and the staging area is left on disk.
//!
//! Collaborators are injected as trait objects so tests can replace the
//! network, the archive reader, and `npm` itself. [`release`] wires up the
//! production implementations.

use crate::artefact::download::{ArtefactFetcher, HttpFetcher};
use crate::artefact::extraction::{ArchiveExtractor, NativeExtractor};
use crate::artefact::naming::{ArchiveName, release_asset_url};
use crate::config::{ReleaseConfig, ReleaseLayout};
use crate::error::Result;
use crate::manifest;
use crate::output::{completion_line, stage_heading, start_banner, write_stderr_line};
use crate::plan::{PackageRef, ReleasePlan, ReleaseTask, Stage};
use crate::platform::{PlatformMatrix, PlatformTarget};
use crate::registry::{Access, CommandExecutor, NpmPublisher, SystemCommandExecutor};
use crate::run_log::{RunLog, StartOutcome};
use crate::staging::StagingArea;
use crate::version::ReleaseVersion;
use camino::Utf8Path;
use log::{debug, error, info};
use std::io::Write;

/// Parameters of one release run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    /// Version being released.
    pub version: ReleaseVersion,
    /// Pass `--dry-run` to every publish and never write the run log.
    pub dry_run: bool,
    /// Skip packages the run log records as already published.
    pub resume: bool,
    /// Suppress progress output.
    pub quiet: bool,
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    version: String,
    dry_run: bool,
    published: Vec<String>,
    skipped: Vec<String>,
}

impl RunReport {
    /// Build a report.
    #[must_use]
    pub fn new(
        version: impl Into<String>,
        dry_run: bool,
        published: Vec<String>,
        skipped: Vec<String>,
    ) -> Self {
        Self {
            version: version.into(),
            dry_run,
            published,
            skipped,
        }
    }

    /// Released version, without the tag marker.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Whether publishes ran with `--dry-run`.
    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Registry names published by this run, in order.
    #[must_use]
    pub fn published(&self) -> &[String] {
        &self.published
    }

    /// Registry names skipped because the run log recorded them.
    #[must_use]
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }
}

/// Mutable state of a run in progress.
struct Run<'r> {
    request: &'r ReleaseRequest,
    stderr: &'r mut dyn Write,
    staging: StagingArea,
    run_log: RunLog,
    published: Vec<String>,
    skipped: Vec<String>,
}

impl Run<'_> {
    fn progress(&mut self, message: impl std::fmt::Display) {
        if !self.request.quiet {
            write_stderr_line(self.stderr, message);
        }
    }
}

/// Drives a release over a platform matrix.
pub struct Orchestrator<'a> {
    config: &'a ReleaseConfig,
    layout: ReleaseLayout,
    matrix: &'a PlatformMatrix,
    fetcher: &'a dyn ArtefactFetcher,
    extractor: &'a dyn ArchiveExtractor,
    publisher: NpmPublisher<'a>,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator for the project rooted at `root`.
    #[must_use]
    pub fn new(
        config: &'a ReleaseConfig,
        root: &Utf8Path,
        matrix: &'a PlatformMatrix,
        fetcher: &'a dyn ArtefactFetcher,
        extractor: &'a dyn ArchiveExtractor,
        executor: &'a dyn CommandExecutor,
    ) -> Self {
        Self {
            config,
            layout: config.layout(root),
            matrix,
            fetcher,
            extractor,
            publisher: NpmPublisher::new(executor, &config.npm_program),
        }
    }

    /// Run every task of the plan in order.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing task. Later tasks do not run.
    pub fn run(&self, request: &ReleaseRequest, stderr: &mut dyn Write) -> Result<RunReport> {
        let version = request.version.as_str();
        let (run_log, outcome) =
            RunLog::start(self.layout.state_file(), version, request.resume)?;

        let mut run = Run {
            request,
            stderr,
            staging: StagingArea::new(self.layout.staging_dir().to_owned()),
            run_log,
            published: Vec::new(),
            skipped: Vec::new(),
        };
        run.progress(start_banner(&self.config.tool_name, version, request.dry_run));
        open_run_log(&mut run, &outcome)?;
        run.staging.prepare()?;
        debug!("staging downloads in {}", run.staging.path());

        let plan = ReleasePlan::new(self.matrix);
        let mut current: Option<Stage> = None;
        for task in plan.tasks() {
            let stage = task.stage();
            if current != Some(stage) {
                info!("entering stage {stage}");
                run.progress(stage_heading(stage.title()));
                current = Some(stage);
            }
            if let Err(err) = self.execute(task, &mut run) {
                error!("release failed during {stage}: {err}");
                return Err(err);
            }
        }

        let report = RunReport::new(version, request.dry_run, run.published, run.skipped);
        if !request.quiet {
            write_stderr_line(run.stderr, completion_line(&self.config.umbrella_package, &report));
        }
        Ok(report)
    }

    fn execute(&self, task: &ReleaseTask<'_>, run: &mut Run<'_>) -> Result<()> {
        match task {
            ReleaseTask::SyncManifest(package) => self.sync_manifest(*package, run),
            ReleaseTask::FetchExtract(target) => self.fetch_extract(target, run),
            ReleaseTask::Publish(package) => self.publish(*package, run),
            ReleaseTask::Cleanup => self.cleanup(run),
        }
    }

    fn sync_manifest(&self, package: PackageRef<'_>, run: &mut Run<'_>) -> Result<()> {
        let request = run.request;
        let version = request.version.as_str();
        let path = self.layout.manifest_path(self.package_dir_name(package));
        manifest::synchronize(path.as_std_path(), version)?;
        run.progress(format!("  Updated {path} to v{version}"));
        Ok(())
    }

    fn fetch_extract(&self, target: &PlatformTarget, run: &mut Run<'_>) -> Result<()> {
        let request = run.request;
        let version = &request.version;
        let name = ArchiveName::for_target(&self.config.tool_name, version, target);
        let url = release_asset_url(
            &self.config.release_host,
            &self.config.repository,
            &version.tag(),
            &name.filename(),
        );

        let archive = run.staging.archive_path(&name);
        run.progress(format!("  Downloading {name}..."));
        debug!("fetching {url} into {archive}");
        self.fetcher.fetch(&url, archive.as_std_path())?;

        run.progress(format!("  Extracting to {}/bin/...", target.package()));
        let bin_dir = self.layout.bin_dir(target.package());
        let written = self.extractor.extract(
            archive.as_std_path(),
            name.format(),
            &target.binary_name(&self.config.tool_name),
            bin_dir.as_std_path(),
        )?;
        debug!("extracted {}", written.display());
        Ok(())
    }

    fn publish(&self, package: PackageRef<'_>, run: &mut Run<'_>) -> Result<()> {
        let (registry_name, access) = match package {
            PackageRef::Umbrella => (self.config.umbrella_package.clone(), Access::Default),
            PackageRef::Platform(target) => {
                (self.config.platform_package_name(target), Access::Public)
            }
        };

        if run.request.resume && run.run_log.contains(&registry_name) {
            run.progress(format!("  Skipping {registry_name} (already published)"));
            run.skipped.push(registry_name);
            return Ok(());
        }

        run.progress(format!("  Publishing {registry_name}..."));
        let dir = self.layout.package_dir(self.package_dir_name(package));
        let report = self.publisher.publish(
            dir.as_std_path(),
            &registry_name,
            access,
            run.request.dry_run,
        )?;
        if run.request.dry_run {
            for line in report.lines() {
                run.progress(format!("    {line}"));
            }
        }

        if !run.request.dry_run {
            run.run_log.record(&registry_name)?;
        }
        run.published.push(registry_name);
        Ok(())
    }

    fn cleanup(&self, run: &mut Run<'_>) -> Result<()> {
        run.staging.remove()?;
        if !run.request.dry_run {
            run.run_log.remove()?;
        }
        debug!("removed {}", run.staging.path());
        Ok(())
    }

    fn package_dir_name<'p>(&'p self, package: PackageRef<'p>) -> &'p str {
        match package {
            PackageRef::Umbrella => &self.config.umbrella_package,
            PackageRef::Platform(target) => target.package(),
        }
    }
}

/// Report how the run log was opened and replace a stale log in live runs.
fn open_run_log(run: &mut Run<'_>, outcome: &StartOutcome) -> Result<()> {
    match outcome {
        StartOutcome::Resumed { published } => {
            let request = run.request;
            let version = &request.version;
            run.progress(format!(
                "Resuming: {published} package(s) already published for v{version}"
            ));
        }
        StartOutcome::Discarded { reason } => {
            let path = run.run_log.path().to_owned();
            run.progress(format!("Warning: ignoring run log {path} because {reason}"));
        }
        StartOutcome::Fresh => {}
    }

    let replaces_stale_log = !matches!(outcome, StartOutcome::Resumed { .. })
        && run.run_log.path().exists();
    if !run.request.dry_run && replaces_stale_log {
        run.run_log.save()?;
    }
    Ok(())
}

/// Run a release with the production fetcher, extractor, and `npm`.
///
/// # Errors
///
/// Returns the first error raised by any stage.
pub fn release(
    config: &ReleaseConfig,
    root: &Utf8Path,
    request: &ReleaseRequest,
    stderr: &mut dyn Write,
) -> Result<RunReport> {
    let matrix = config.matrix()?;
    let fetcher = HttpFetcher::new(&config.fetch_settings());
    let executor = SystemCommandExecutor;
    Orchestrator::new(config, root, &matrix, &fetcher, &NativeExtractor, &executor)
        .run(request, stderr)
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
