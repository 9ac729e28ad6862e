//! Release configuration loaded from `npm-release.toml`.
//!
//! Every key is optional; omitted keys fall back to the values the xsql
//! release pipeline uses. The file is looked up as `--config FILE` when given,
//! else `<root>/npm-release.toml` when present, else the built-in defaults
//! apply. Unknown keys are rejected so that typos fail loudly.
//!
//! ```toml
//! tool_name = "xsql"
//! repository = "zx06/xsql"
//! max_redirects = 5
//!
//! [[platforms]]
//! os = "linux"
//! arch = "amd64"
//! package = "linux-x64"
//! archive = "tar.gz"
//! ```

use crate::artefact::download::{DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT, FetchSettings};
use crate::error::{ReleaseError, Result};
use crate::platform::matrix::default_targets;
use crate::platform::{PlatformMatrix, PlatformTarget};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::time::Duration;

/// Configuration file looked up under the project root.
pub const CONFIG_FILENAME: &str = "npm-release.toml";

const MANIFEST_FILENAME: &str = "package.json";
const BIN_DIRNAME: &str = "bin";

/// Settings for a release run.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseConfig {
    /// Executable name inside each archive, without extension.
    pub tool_name: String,
    /// `owner/name` of the repository hosting the releases.
    pub repository: String,
    /// Base URL of the release host.
    pub release_host: String,
    /// Directory holding the npm package trees, relative to the root.
    pub npm_dir: String,
    /// Directory name (and registry name) of the umbrella package.
    pub umbrella_package: String,
    /// Registry scope prefixed to platform package names. May be empty.
    pub package_scope: String,
    /// Download staging directory, relative to the root.
    pub staging_dir: String,
    /// Run log file, relative to the root.
    pub state_file: String,
    /// Program invoked for `publish`.
    pub npm_program: String,
    /// `User-Agent` sent to the release host.
    pub user_agent: String,
    /// Maximum redirect hops per download.
    pub max_redirects: u32,
    /// Global timeout per download, in seconds.
    pub download_timeout_secs: u64,
    /// Platform targets in publish order.
    pub platforms: Vec<PlatformTarget>,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            tool_name: "xsql".to_owned(),
            repository: "zx06/xsql".to_owned(),
            release_host: "https://github.com".to_owned(),
            npm_dir: "npm".to_owned(),
            umbrella_package: "xsql".to_owned(),
            package_scope: "@xsql-cli".to_owned(),
            staging_dir: ".npm-tmp".to_owned(),
            state_file: ".npm-release-state.json".to_owned(),
            npm_program: "npm".to_owned(),
            user_agent: "xsql-npm-publish".to_owned(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            download_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            platforms: default_targets(),
        }
    }
}

impl ReleaseConfig {
    /// Load the configuration for a project root.
    ///
    /// A relative `explicit` path resolves against `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Config`] if an explicit file is missing, if a
    /// file cannot be read or parsed, or if the loaded values are invalid.
    pub fn load(root: &Utf8Path, explicit: Option<&Utf8Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => root.join(path),
            None => {
                let candidate = root.join(CONFIG_FILENAME);
                if !candidate.is_file() {
                    log::debug!("no {CONFIG_FILENAME} under {root}; using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|e| ReleaseError::Config {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let config = Self::from_toml(&text).map_err(|reason| ReleaseError::Config {
            path: path.clone(),
            reason,
        })?;
        log::debug!("loaded release configuration from {path}");
        Ok(config)
    }

    /// Parse and validate TOML text.
    ///
    /// # Errors
    ///
    /// Returns a description of the first parse or validation failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use xsql_npm_release::config::ReleaseConfig;
    ///
    /// let config = ReleaseConfig::from_toml("max_redirects = 3").expect("valid config");
    /// assert_eq!(config.max_redirects, 3);
    /// assert_eq!(config.tool_name, "xsql");
    /// ```
    pub fn from_toml(text: &str) -> std::result::Result<Self, String> {
        let config: Self = toml::from_str(text).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let required = [
            ("tool_name", &self.tool_name),
            ("repository", &self.repository),
            ("release_host", &self.release_host),
            ("npm_dir", &self.npm_dir),
            ("umbrella_package", &self.umbrella_package),
            ("staging_dir", &self.staging_dir),
            ("state_file", &self.state_file),
            ("npm_program", &self.npm_program),
        ];
        if let Some((key, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(format!("{key} must not be empty"));
        }
        if self.download_timeout_secs == 0 {
            return Err("download_timeout_secs must be greater than zero".to_owned());
        }
        self.matrix().map(|_| ()).map_err(|e| e.to_string())
    }

    /// Build the platform matrix.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::InvalidMatrix`] for an empty or ambiguous list.
    pub fn matrix(&self) -> Result<PlatformMatrix> {
        PlatformMatrix::new(self.platforms.clone())
    }

    /// Network settings for the fetcher.
    #[must_use]
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.download_timeout_secs),
            max_redirects: self.max_redirects,
        }
    }

    /// Registry name of a platform package (`@scope/package`).
    #[must_use]
    pub fn platform_package_name(&self, target: &PlatformTarget) -> String {
        let scope = self.package_scope.trim_end_matches('/');
        if scope.is_empty() {
            target.package().to_owned()
        } else {
            format!("{scope}/{}", target.package())
        }
    }

    /// Resolve configured paths against `root`.
    #[must_use]
    pub fn layout(&self, root: &Utf8Path) -> ReleaseLayout {
        ReleaseLayout {
            npm_dir: root.join(&self.npm_dir),
            staging_dir: root.join(&self.staging_dir),
            state_file: root.join(&self.state_file),
            umbrella_package: self.umbrella_package.clone(),
        }
    }
}

/// Filesystem locations of one project.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use xsql_npm_release::config::ReleaseConfig;
///
/// let layout = ReleaseConfig::default().layout(Utf8Path::new("/repo"));
/// assert_eq!(layout.manifest_path("linux-x64"), "/repo/npm/linux-x64/package.json");
/// assert_eq!(layout.umbrella_dir(), "/repo/npm/xsql");
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReleaseLayout {
    npm_dir: Utf8PathBuf,
    staging_dir: Utf8PathBuf,
    state_file: Utf8PathBuf,
    umbrella_package: String,
}

impl ReleaseLayout {
    /// Directory of a package tree.
    #[must_use]
    pub fn package_dir(&self, package: &str) -> Utf8PathBuf {
        self.npm_dir.join(package)
    }

    /// `package.json` of a package tree.
    #[must_use]
    pub fn manifest_path(&self, package: &str) -> Utf8PathBuf {
        self.package_dir(package).join(MANIFEST_FILENAME)
    }

    /// Directory binaries are extracted into.
    #[must_use]
    pub fn bin_dir(&self, package: &str) -> Utf8PathBuf {
        self.package_dir(package).join(BIN_DIRNAME)
    }

    /// Directory of the umbrella package.
    #[must_use]
    pub fn umbrella_dir(&self) -> Utf8PathBuf {
        self.package_dir(&self.umbrella_package)
    }

    /// Download staging directory.
    #[must_use]
    pub fn staging_dir(&self) -> &Utf8Path {
        &self.staging_dir
    }

    /// Run log file.
    #[must_use]
    pub fn state_file(&self) -> &Utf8Path {
        &self.state_file
    }
}
