//! A single operating-system/architecture target and its packaging rules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Container format of a release archive.
///
/// The release host only ever ships these two formats, so dispatch on this
/// type is a closed match rather than a registry of handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveFormat {
    /// Gzip-compressed tarball (`.tar.gz`).
    #[serde(rename = "tar.gz")]
    TarGz,
    /// Zip archive (`.zip`).
    #[serde(rename = "zip")]
    Zip,
}

impl ArchiveFormat {
    /// Return the filename extension without a leading dot.
    ///
    /// # Examples
    ///
    /// ```
    /// use xsql_npm_release::platform::ArchiveFormat;
    ///
    /// assert_eq!(ArchiveFormat::TarGz.extension(), "tar.gz");
    /// assert_eq!(ArchiveFormat::Zip.extension(), "zip");
    /// ```
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One supported platform.
///
/// `os` and `arch` are the identifiers used by the release host in archive
/// names; `package` is the npm package directory for the platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformTarget {
    os: String,
    arch: String,
    package: String,
    #[serde(default)]
    binary_extension: String,
    archive: ArchiveFormat,
}

impl PlatformTarget {
    /// Create a target from its components.
    #[must_use]
    pub fn new(
        os: &str,
        arch: &str,
        package: &str,
        binary_extension: &str,
        archive: ArchiveFormat,
    ) -> Self {
        Self {
            os: os.to_owned(),
            arch: arch.to_owned(),
            package: package.to_owned(),
            binary_extension: binary_extension.to_owned(),
            archive,
        }
    }

    /// Release-host operating system identifier (e.g. `linux`).
    #[must_use]
    pub fn os(&self) -> &str {
        &self.os
    }

    /// Release-host architecture identifier (e.g. `amd64`).
    #[must_use]
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// npm package directory name (e.g. `linux-x64`).
    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Executable suffix, empty except on Windows.
    #[must_use]
    pub fn binary_extension(&self) -> &str {
        &self.binary_extension
    }

    /// Archive format shipped for this target.
    #[must_use]
    pub const fn archive(&self) -> ArchiveFormat {
        self.archive
    }

    /// Name of the executable inside the archive for `tool_name`.
    ///
    /// # Examples
    ///
    /// ```
    /// use xsql_npm_release::platform::{ArchiveFormat, PlatformTarget};
    ///
    /// let win = PlatformTarget::new("windows", "amd64", "win32-x64", ".exe", ArchiveFormat::Zip);
    /// assert_eq!(win.binary_name("xsql"), "xsql.exe");
    /// ```
    #[must_use]
    pub fn binary_name(&self, tool_name: &str) -> String {
        format!("{tool_name}{}", self.binary_extension)
    }

    pub(crate) fn blank_field(&self) -> Option<&'static str> {
        if self.os.trim().is_empty() {
            Some("os")
        } else if self.arch.trim().is_empty() {
            Some("arch")
        } else if self.package.trim().is_empty() {
            Some("package")
        } else {
            None
        }
    }
}

impl fmt::Display for PlatformTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::unix("", "xsql")]
    #[case::windows(".exe", "xsql.exe")]
    fn binary_name_appends_extension(#[case] ext: &str, #[case] expected: &str) {
        let target = PlatformTarget::new("os", "arch", "pkg", ext, ArchiveFormat::TarGz);
        assert_eq!(target.binary_name("xsql"), expected);
    }

    #[test]
    fn display_joins_os_and_arch() {
        let target =
            PlatformTarget::new("darwin", "arm64", "darwin-arm64", "", ArchiveFormat::TarGz);
        assert_eq!(target.to_string(), "darwin/arm64");
    }

    #[test]
    fn deserializes_archive_format_by_extension() {
        let target: PlatformTarget = toml::from_str(
            r#"
            os = "windows"
            arch = "arm64"
            package = "win32-arm64"
            binary_extension = ".exe"
            archive = "zip"
            "#,
        )
        .expect("valid target");
        assert_eq!(target.archive(), ArchiveFormat::Zip);
        assert_eq!(target.package(), "win32-arm64");
    }

    #[test]
    fn binary_extension_defaults_to_empty() {
        let target: PlatformTarget = toml::from_str(
            r#"
            os = "linux"
            arch = "amd64"
            package = "linux-x64"
            archive = "tar.gz"
            "#,
        )
        .expect("valid target");
        assert_eq!(target.binary_extension(), "");
    }

    #[rstest]
    #[case::os("", "amd64", "pkg", Some("os"))]
    #[case::arch("linux", " ", "pkg", Some("arch"))]
    #[case::package("linux", "amd64", "", Some("package"))]
    #[case::complete("linux", "amd64", "pkg", None)]
    fn blank_field_names_the_first_empty_field(
        #[case] os: &str,
        #[case] arch: &str,
        #[case] package: &str,
        #[case] expected: Option<&str>,
    ) {
        let target = PlatformTarget::new(os, arch, package, "", ArchiveFormat::TarGz);
        assert_eq!(target.blank_field(), expected);
    }
}
