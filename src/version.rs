//! Release version newtype.
//!
//! The version argument may carry a leading `v` tag marker. Filenames,
//! archive names and manifest fields use the stripped form; the release
//! download URL uses the tag form.

use crate::error::ReleaseError;
use std::fmt;

/// The tag marker prefixed to versions in release tags.
const TAG_MARKER: char = 'v';

/// A validated release version (e.g. `1.2.3`).
///
/// # Examples
///
/// ```
/// use xsql_npm_release::version::ReleaseVersion;
///
/// let version: ReleaseVersion = "v1.2.3".try_into().expect("valid version");
/// assert_eq!(version.as_str(), "1.2.3");
/// assert_eq!(version.tag(), "v1.2.3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseVersion(String);

fn is_valid_version_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+' | '_')
}

impl ReleaseVersion {
    /// Return the stripped version used in filenames and manifests.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the release tag used in the download URL path.
    #[must_use]
    pub fn tag(&self) -> String {
        format!("{TAG_MARKER}{}", self.0)
    }
}

impl TryFrom<&str> for ReleaseVersion {
    type Error = ReleaseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let stripped = value.strip_prefix(TAG_MARKER).unwrap_or(value);
        if stripped.is_empty() {
            return Err(ReleaseError::InvalidVersion {
                value: value.to_owned(),
                reason: "version must not be empty".to_owned(),
            });
        }
        if let Some(bad) = stripped.chars().find(|c| !is_valid_version_char(*c)) {
            return Err(ReleaseError::InvalidVersion {
                value: value.to_owned(),
                reason: format!("invalid character '{bad}'"),
            });
        }
        Ok(Self(stripped.to_owned()))
    }
}

impl AsRef<str> for ReleaseVersion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
