//! `package.json` version synchronization.
//!
//! Rewrites the `version` field of a manifest and pins every
//! `optionalDependencies` entry to the same version. The document is handled
//! as an untyped JSON value so that every other key survives the rewrite in
//! its original order.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

const VERSION_KEY: &str = "version";
const OPTIONAL_DEPENDENCIES_KEY: &str = "optionalDependencies";

/// Errors that prevent a manifest from being synchronized.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The manifest file does not exist.
    #[error("manifest not found: {path}")]
    NotFound {
        /// Expected manifest location.
        path: PathBuf,
    },

    /// Reading the manifest failed.
    #[error("failed to read manifest {path}: {source}")]
    Read {
        /// Manifest path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid JSON.
    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        /// Manifest path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The manifest parsed, but its top level is not an object.
    #[error("manifest {path} is not a JSON object")]
    NotAnObject {
        /// Manifest path.
        path: PathBuf,
    },

    /// Serializing the updated manifest failed.
    #[error("failed to serialize manifest {path}: {source}")]
    Serialize {
        /// Manifest path.
        path: PathBuf,
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Writing the manifest failed.
    #[error("failed to write manifest {path}: {source}")]
    Write {
        /// Manifest path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Set `version` and pin every optional dependency to it, in place.
///
/// Output is two-space-indented JSON followed by a newline, matching what
/// `npm` itself writes.
///
/// # Errors
///
/// Returns a [`ManifestError`] when the file is missing, unreadable, not a
/// JSON object, or cannot be written back.
///
/// # Examples
///
/// ```
/// use xsql_npm_release::manifest::synchronize;
///
/// let dir = tempfile::tempdir()?;
/// let path = dir.path().join("package.json");
/// std::fs::write(&path, r#"{"name":"xsql","version":"0.0.0"}"#)?;
///
/// synchronize(&path, "1.2.3")?;
/// let text = std::fs::read_to_string(&path)?;
/// assert!(text.contains(r#""version": "1.2.3""#));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn synchronize(path: &Path, version: &str) -> Result<(), ManifestError> {
    let mut document = load(path)?;
    let Some(fields) = document.as_object_mut() else {
        return Err(ManifestError::NotAnObject {
            path: path.to_path_buf(),
        });
    };
    apply_version(fields, version);
    persist(path, &document)
}

fn apply_version(fields: &mut Map<String, Value>, version: &str) {
    fields.insert(VERSION_KEY.to_owned(), Value::String(version.to_owned()));
    if let Some(Value::Object(dependencies)) = fields.get_mut(OPTIONAL_DEPENDENCIES_KEY) {
        for pinned in dependencies.values_mut() {
            *pinned = Value::String(version.to_owned());
        }
    }
}

fn load(path: &Path) -> Result<Value, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ManifestError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ManifestError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn persist(path: &Path, document: &Value) -> Result<(), ManifestError> {
    let mut json =
        serde_json::to_string_pretty(document).map_err(|source| ManifestError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
    json.push('\n');
    std::fs::write(path, json).map_err(|source| ManifestError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
