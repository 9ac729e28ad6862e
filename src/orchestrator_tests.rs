//! Unit tests for the release run driver.

use super::*;
use crate::artefact::download::{DownloadError, MockArtefactFetcher};
use crate::artefact::extraction::{ExtractionError, MockArchiveExtractor};
use crate::error::ReleaseError;
use crate::platform::ArchiveFormat;
use crate::test_utils::{ExpectedCall, NpmTree, StubExecutor, exit_status, failure_output};
use rstest::{fixture, rstest};
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::{Arc, Mutex};

const PUBLIC: [&str; 3] = ["publish", "--access", "public"];
const PUBLIC_DRY: [&str; 4] = ["publish", "--access", "public", "--dry-run"];

fn two_target_config() -> ReleaseConfig {
    ReleaseConfig {
        platforms: vec![
            PlatformTarget::new("linux", "amd64", "linux-x64", "", ArchiveFormat::TarGz),
            PlatformTarget::new("windows", "amd64", "win32-x64", ".exe", ArchiveFormat::Zip),
        ],
        ..ReleaseConfig::default()
    }
}

fn request(version: &str, dry_run: bool) -> ReleaseRequest {
    ReleaseRequest {
        version: ReleaseVersion::try_from(version).expect("valid version"),
        dry_run,
        resume: false,
        quiet: false,
    }
}

fn write_archive(dest: &Path) -> std::result::Result<(), DownloadError> {
    std::fs::write(dest, b"archive").map_err(|source| DownloadError::Write {
        path: dest.to_path_buf(),
        source,
    })
}

fn fetcher_ok() -> MockArtefactFetcher {
    let mut fetcher = MockArtefactFetcher::new();
    fetcher
        .expect_fetch()
        .returning(|_, dest| write_archive(dest));
    fetcher
}

fn extract_into(dir: &Path, member: &str) -> std::result::Result<PathBuf, ExtractionError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(member);
    std::fs::write(&path, b"binary")?;
    Ok(path)
}

fn extractor_ok() -> MockArchiveExtractor {
    let mut extractor = MockArchiveExtractor::new();
    extractor
        .expect_extract()
        .returning(|_, _, member, dir| extract_into(dir, member));
    extractor
}

fn publish_calls(
    config: &ReleaseConfig,
    tree: &NpmTree,
    dry_run: bool,
) -> Vec<ExpectedCall> {
    let layout = config.layout(tree.root());
    let platform_args = if dry_run { PUBLIC_DRY.to_vec() } else { PUBLIC.to_vec() };
    let umbrella_args = if dry_run {
        vec!["publish", "--dry-run"]
    } else {
        vec!["publish"]
    };

    let mut calls: Vec<ExpectedCall> = config
        .platforms
        .iter()
        .map(|t| ExpectedCall::npm(platform_args.clone(), layout.package_dir(t.package())))
        .collect();
    calls.push(ExpectedCall::npm(umbrella_args, layout.umbrella_dir()));
    calls
}

struct Harness {
    config: ReleaseConfig,
    matrix: PlatformMatrix,
    tree: NpmTree,
}

impl Harness {
    fn new(config: ReleaseConfig) -> Self {
        let matrix = config.matrix().expect("valid matrix");
        let tree = NpmTree::new(&config).expect("npm tree");
        Self {
            config,
            matrix,
            tree,
        }
    }

    fn run(
        &self,
        fetcher: &dyn ArtefactFetcher,
        extractor: &dyn ArchiveExtractor,
        executor: &dyn CommandExecutor,
        request: &ReleaseRequest,
    ) -> (Result<RunReport>, String) {
        let mut stderr = Vec::new();
        let result = Orchestrator::new(
            &self.config,
            self.tree.root(),
            &self.matrix,
            fetcher,
            extractor,
            executor,
        )
        .run(request, &mut stderr);
        (result, String::from_utf8(stderr).expect("utf-8 output"))
    }

    fn layout(&self) -> ReleaseLayout {
        self.config.layout(self.tree.root())
    }

    fn manifest_version(&self, package: &str) -> String {
        self.tree.manifest(&self.config, package).expect("manifest")["version"]
            .as_str()
            .expect("version string")
            .to_owned()
    }
}

#[fixture]
fn default_harness() -> Harness {
    Harness::new(ReleaseConfig::default())
}

#[rstest]
fn live_run_updates_extracts_and_publishes_in_order(default_harness: Harness) {
    let h = default_harness;
    let executor = StubExecutor::new(publish_calls(&h.config, &h.tree, false));

    let (result, output) = h.run(&fetcher_ok(), &extractor_ok(), &executor, &request("1.2.3", false));
    let report = result.expect("release succeeds");
    executor.assert_finished();

    assert_eq!(h.manifest_version("xsql"), "1.2.3");
    for target in &h.matrix {
        assert_eq!(h.manifest_version(target.package()), "1.2.3", "{target}");
        let binary = h.layout().bin_dir(target.package()).join(target.binary_name("xsql"));
        assert!(binary.is_file(), "missing {binary}");
    }
    let umbrella = h.tree.manifest(&h.config, "xsql").expect("umbrella manifest");
    let deps = umbrella["optionalDependencies"].as_object().expect("deps");
    assert_eq!(deps.len(), 6);
    assert!(deps.values().all(|v| v == "1.2.3"), "{deps:?}");

    assert_eq!(report.published().len(), 7);
    assert_eq!(report.published().first().map(String::as_str), Some("@xsql-cli/linux-x64"));
    assert_eq!(report.published().last().map(String::as_str), Some("xsql"));
    assert!(report.skipped().is_empty());

    assert!(!h.layout().staging_dir().exists(), "staging area removed");
    assert!(!h.layout().state_file().exists(), "run log removed");
    assert!(output.contains("==> Updating versions..."), "{output}");
    assert!(output.contains("  Publishing @xsql-cli/win32-arm64..."), "{output}");
    assert!(output.contains("Done! xsql v1.2.3 published to npm."), "{output}");
}

#[rstest]
fn dry_run_passes_flag_to_every_publish_and_still_writes_files(default_harness: Harness) {
    let h = default_harness;
    let executor = StubExecutor::new(publish_calls(&h.config, &h.tree, true));

    let (result, output) = h.run(&fetcher_ok(), &extractor_ok(), &executor, &request("2.0.0", true));
    let report = result.expect("dry run succeeds");
    executor.assert_finished();

    assert!(report.dry_run());
    assert_eq!(h.manifest_version("win32-arm64"), "2.0.0");
    assert!(h.layout().bin_dir("win32-arm64").join("xsql.exe").is_file());
    assert!(!h.layout().state_file().exists(), "dry run never writes the run log");
    assert!(output.contains("(dry-run)"), "{output}");
}

#[rstest]
fn tag_form_is_used_only_in_the_download_url() {
    let h = Harness::new(two_target_config());
    let executor = StubExecutor::new(publish_calls(&h.config, &h.tree, false));
    let urls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&urls);
    let mut fetcher = MockArtefactFetcher::new();
    fetcher.expect_fetch().times(2).returning(move |url, dest| {
        sink.lock().expect("lock").push(url.to_owned());
        write_archive(dest)
    });

    let (result, _) = h.run(&fetcher, &extractor_ok(), &executor, &request("v1.2.3", false));
    result.expect("release succeeds");

    let urls = urls.lock().expect("lock");
    assert_eq!(
        urls.as_slice(),
        [
            "https://github.com/zx06/xsql/releases/download/v1.2.3/xsql_1.2.3_linux_amd64.tar.gz",
            "https://github.com/zx06/xsql/releases/download/v1.2.3/xsql_1.2.3_windows_amd64.zip",
        ]
    );
    assert_eq!(h.manifest_version("xsql"), "1.2.3");
}

#[rstest]
fn extractor_receives_format_member_and_bin_dir() {
    let h = Harness::new(two_target_config());
    let executor = StubExecutor::new(publish_calls(&h.config, &h.tree, false));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut extractor = MockArchiveExtractor::new();
    extractor
        .expect_extract()
        .times(2)
        .returning(move |archive, format, member, dir| {
            let name = archive.file_name().map(|n| n.to_string_lossy().into_owned());
            sink.lock()
                .expect("lock")
                .push((name, format, member.to_owned(), dir.to_path_buf()));
            extract_into(dir, member)
        });

    let (result, _) = h.run(&fetcher_ok(), &extractor, &executor, &request("1.0.0", false));
    result.expect("release succeeds");

    let seen = seen.lock().expect("lock");
    let layout = h.layout();
    assert_eq!(
        seen.as_slice(),
        [
            (
                Some("xsql_1.0.0_linux_amd64.tar.gz".to_owned()),
                ArchiveFormat::TarGz,
                "xsql".to_owned(),
                layout.bin_dir("linux-x64").into_std_path_buf(),
            ),
            (
                Some("xsql_1.0.0_windows_amd64.zip".to_owned()),
                ArchiveFormat::Zip,
                "xsql.exe".to_owned(),
                layout.bin_dir("win32-x64").into_std_path_buf(),
            ),
        ]
    );
}

#[rstest]
fn fetch_failure_on_third_target_stops_before_any_publish(default_harness: Harness) {
    let h = default_harness;
    let executor = StubExecutor::new(Vec::new());
    let mut calls = 0;
    let mut fetcher = MockArtefactFetcher::new();
    fetcher.expect_fetch().times(3).returning(move |url, dest| {
        calls += 1;
        if calls == 3 {
            return Err(DownloadError::Status {
                status: 404,
                url: url.to_owned(),
            });
        }
        write_archive(dest)
    });
    let mut extractor = MockArchiveExtractor::new();
    extractor
        .expect_extract()
        .times(2)
        .returning(|_, _, member, dir| extract_into(dir, member));

    let (result, _) = h.run(&fetcher, &extractor, &executor, &request("1.2.3", false));
    let err = result.expect_err("third download fails");

    assert!(
        matches!(&err, ReleaseError::Download(DownloadError::Status { status: 404, url }) if url.contains("darwin_amd64")),
        "{err:?}"
    );
    assert_eq!(h.manifest_version("xsql"), "1.2.3");
    for target in &h.matrix {
        assert_eq!(h.manifest_version(target.package()), "1.2.3", "{target}");
    }
    assert!(h.layout().bin_dir("linux-x64").join("xsql").is_file());
    assert!(h.layout().bin_dir("linux-arm64").join("xsql").is_file());
    assert!(!h.layout().bin_dir("darwin-x64").join("xsql").exists());
    assert!(h.layout().staging_dir().exists(), "staging area kept after failure");
    executor.assert_finished();
}

#[rstest]
fn missing_manifest_fails_before_any_download() {
    let h = Harness::new(two_target_config());
    std::fs::remove_file(h.layout().manifest_path("win32-x64")).expect("remove manifest");
    let mut fetcher = MockArtefactFetcher::new();
    fetcher.expect_fetch().never();
    let executor = StubExecutor::new(Vec::new());

    let (result, _) = h.run(&fetcher, &MockArchiveExtractor::new(), &executor, &request("1.2.3", false));
    let err = result.expect_err("manifest missing");

    assert!(matches!(err, ReleaseError::Manifest(_)), "{err:?}");
    assert_eq!(h.manifest_version("xsql"), "1.2.3", "earlier manifests stay updated");
    assert!(
        h.layout().staging_dir().is_dir(),
        "staging area exists from the start of the run"
    );
}

#[rstest]
fn publish_failure_is_recorded_and_resume_skips_published_packages() {
    let h = Harness::new(two_target_config());
    let layout = h.layout();

    let failing = StubExecutor::new(vec![
        ExpectedCall::npm(PUBLIC.to_vec(), layout.package_dir("linux-x64")),
        ExpectedCall {
            cmd: "npm",
            args: PUBLIC.to_vec(),
            cwd: Some(layout.package_dir("win32-x64").into()),
            result: Ok(failure_output("npm ERR! 503 Service Unavailable")),
        },
    ]);
    let (result, _) = h.run(&fetcher_ok(), &extractor_ok(), &failing, &request("1.2.3", false));
    let err = result.expect_err("second publish fails");
    assert!(
        matches!(&err, ReleaseError::Publish { package, .. } if package == "@xsql-cli/win32-x64"),
        "{err:?}"
    );
    failing.assert_finished();
    assert!(layout.state_file().is_file(), "run log kept for resume");

    let resumed = StubExecutor::new(vec![
        ExpectedCall::npm(PUBLIC.to_vec(), layout.package_dir("win32-x64")),
        ExpectedCall::npm(vec!["publish"], layout.umbrella_dir()),
    ]);
    let resume_request = ReleaseRequest {
        resume: true,
        ..request("1.2.3", false)
    };
    let (result, output) = h.run(&fetcher_ok(), &extractor_ok(), &resumed, &resume_request);
    let report = result.expect("resumed run succeeds");
    resumed.assert_finished();

    assert_eq!(report.skipped(), ["@xsql-cli/linux-x64"]);
    assert_eq!(report.published(), ["@xsql-cli/win32-x64", "xsql"]);
    assert!(output.contains("Resuming: 1 package(s)"), "{output}");
    assert!(output.contains("Skipping @xsql-cli/linux-x64"), "{output}");
    assert!(!layout.state_file().exists(), "run log removed on success");
}

#[rstest]
fn resume_with_log_for_other_version_publishes_everything() {
    let h = Harness::new(two_target_config());
    let layout = h.layout();
    std::fs::write(
        layout.state_file(),
        r#"{"version":"1.2.2","published":["@xsql-cli/linux-x64"]}"#,
    )
    .expect("write stale log");

    let executor = StubExecutor::new(publish_calls(&h.config, &h.tree, false));
    let resume_request = ReleaseRequest {
        resume: true,
        ..request("1.2.3", false)
    };
    let (result, output) = h.run(&fetcher_ok(), &extractor_ok(), &executor, &resume_request);
    let report = result.expect("run succeeds");
    executor.assert_finished();

    assert!(report.skipped().is_empty());
    assert!(output.contains("Warning: ignoring run log"), "{output}");
}

#[rstest]
fn dry_run_echoes_npm_packaging_report() {
    let h = Harness::new(two_target_config());
    let mut calls = publish_calls(&h.config, &h.tree, true);
    if let Some(first) = calls.first_mut() {
        first.result = Ok(Output {
            status: exit_status(0),
            stdout: Vec::new(),
            stderr: b"npm notice Tarball Contents\nnpm notice 4.2MB bin/xsql\n".to_vec(),
        });
    }
    let executor = StubExecutor::new(calls);

    let (result, output) = h.run(&fetcher_ok(), &extractor_ok(), &executor, &request("1.2.3", true));
    result.expect("dry run succeeds");
    executor.assert_finished();

    assert!(output.contains("    npm notice Tarball Contents\n"), "{output}");
    assert!(output.contains("    npm notice 4.2MB bin/xsql\n"), "{output}");
}

#[rstest]
fn live_run_keeps_npm_report_out_of_progress() {
    let h = Harness::new(two_target_config());
    let mut calls = publish_calls(&h.config, &h.tree, false);
    if let Some(first) = calls.first_mut() {
        first.result = Ok(Output {
            status: exit_status(0),
            stdout: b"+ @xsql-cli/linux-x64@1.2.3\n".to_vec(),
            stderr: Vec::new(),
        });
    }
    let executor = StubExecutor::new(calls);

    let (result, output) = h.run(&fetcher_ok(), &extractor_ok(), &executor, &request("1.2.3", false));
    result.expect("run succeeds");
    assert!(!output.contains("@xsql-cli/linux-x64@1.2.3"), "{output}");
}

#[rstest]
fn quiet_run_writes_no_progress() {
    let h = Harness::new(two_target_config());
    let executor = StubExecutor::new(publish_calls(&h.config, &h.tree, true));
    let quiet = ReleaseRequest {
        quiet: true,
        ..request("1.2.3", true)
    };

    let (result, output) = h.run(&fetcher_ok(), &extractor_ok(), &executor, &quiet);
    result.expect("run succeeds");
    assert!(output.is_empty(), "{output}");
}
