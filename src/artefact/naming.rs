//! Release archive naming and download URL construction.
//!
//! Archive names follow the GoReleaser convention used by the release host:
//! `<tool>_<version>_<os>_<arch>.<tar.gz|zip>`, where `<version>` is the
//! stripped release version.

use crate::platform::{ArchiveFormat, PlatformTarget};
use crate::version::ReleaseVersion;
use std::fmt;

/// A fully-qualified release archive name.
///
/// # Examples
///
/// ```
/// use xsql_npm_release::artefact::naming::ArchiveName;
/// use xsql_npm_release::platform::{ArchiveFormat, PlatformTarget};
/// use xsql_npm_release::version::ReleaseVersion;
///
/// let version: ReleaseVersion = "v1.2.3".try_into().expect("valid version");
/// let target = PlatformTarget::new("linux", "amd64", "linux-x64", "", ArchiveFormat::TarGz);
///
/// let name = ArchiveName::for_target("xsql", &version, &target);
/// assert_eq!(name.to_string(), "xsql_1.2.3_linux_amd64.tar.gz");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    tool: String,
    version: String,
    os: String,
    arch: String,
    format: ArchiveFormat,
}

impl ArchiveName {
    /// Build the archive name a target is published under.
    #[must_use]
    pub fn for_target(tool: &str, version: &ReleaseVersion, target: &PlatformTarget) -> Self {
        Self {
            tool: tool.to_owned(),
            version: version.as_str().to_owned(),
            os: target.os().to_owned(),
            arch: target.arch().to_owned(),
            format: target.archive(),
        }
    }

    /// Return the archive format implied by the name.
    #[must_use]
    pub const fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// Return the filename as a string without consuming the value.
    #[must_use]
    pub fn filename(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}.{}",
            self.tool,
            self.version,
            self.os,
            self.arch,
            self.format.extension()
        )
    }
}

/// Construct the download URL of a release asset.
///
/// `tag` is the tag form of the version (`v1.2.3`), never the stripped form.
///
/// # Examples
///
/// ```
/// use xsql_npm_release::artefact::naming::release_asset_url;
///
/// let url = release_asset_url("https://github.com/", "zx06/xsql", "v1.2.3", "a.zip");
/// assert_eq!(url, "https://github.com/zx06/xsql/releases/download/v1.2.3/a.zip");
/// ```
#[must_use]
pub fn release_asset_url(host: &str, repository: &str, tag: &str, filename: &str) -> String {
    let host = host.trim_end_matches('/');
    let repository = repository.trim_matches('/');
    format!("{host}/{repository}/releases/download/{tag}/{filename}")
}
