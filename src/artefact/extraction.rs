//! Binary extraction from release archives.
//!
//! Each archive holds a single executable at its root. Only that member is
//! written to the destination directory; every other entry is ignored. Entry
//! paths are validated before use to prevent zip-slip attacks.

use crate::platform::ArchiveFormat;
use log::debug;
use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Trait for extracting one named member from an archive, enabling test
/// mocking.
///
/// # Examples
///
/// ```
/// use xsql_npm_release::artefact::extraction::NativeExtractor;
///
/// let extractor = NativeExtractor;
/// // Use extractor.extract(archive, format, "xsql", dest_dir) in production
/// # let _ = extractor;
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Extract `member` from the archive into `dest_dir`, overwriting any
    /// existing file of the same name.
    ///
    /// Returns the path of the written file. A member without an extension
    /// is marked executable on Unix.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::MemberNotFound`] if the archive has no such
    /// member, [`ExtractionError::PathTraversal`] if an inspected entry
    /// escapes the destination, and I/O or format errors otherwise.
    fn extract(
        &self,
        archive: &Path,
        format: ArchiveFormat,
        member: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] io::Error),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The requested member is absent from the archive.
    #[error("{member} not found in {archive}")]
    MemberNotFound {
        /// Name of the requested member.
        member: String,
        /// Archive that was searched.
        archive: String,
    },

    /// The zip container could not be read.
    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Default extractor using the `tar`, `flate2`, and `zip` crates.
pub struct NativeExtractor;

impl ArchiveExtractor for NativeExtractor {
    fn extract(
        &self,
        archive: &Path,
        format: ArchiveFormat,
        member: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, ExtractionError> {
        validate_entry_path(Path::new(member))?;
        std::fs::create_dir_all(dest_dir)?;
        let dest = dest_dir.join(member);
        remove_if_present(&dest)?;

        let found = match format {
            ArchiveFormat::TarGz => extract_tar_gz(archive, member, &dest)?,
            ArchiveFormat::Zip => extract_zip(archive, member, &dest)?,
        };
        if !found {
            return Err(ExtractionError::MemberNotFound {
                member: member.to_owned(),
                archive: archive.display().to_string(),
            });
        }

        if Path::new(member).extension().is_none() {
            mark_executable(&dest)?;
        }
        debug!("extracted {member} from {} to {}", archive.display(), dest.display());
        Ok(dest)
    }
}

fn extract_tar_gz(archive: &Path, member: &str, dest: &Path) -> Result<bool, ExtractionError> {
    let decoder = flate2::read::GzDecoder::new(File::open(archive)?);
    let mut entries = tar::Archive::new(decoder);

    for entry_result in entries.entries()? {
        let mut entry = entry_result?;
        let entry_path = entry.path()?.into_owned();
        validate_entry_path(&entry_path)?;

        if !entry.header().entry_type().is_file() || !is_member(&entry_path, member) {
            continue;
        }
        entry.unpack(dest)?;
        return Ok(true);
    }
    Ok(false)
}

fn extract_zip(archive: &Path, member: &str, dest: &Path) -> Result<bool, ExtractionError> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;

    for index in 0..zip.len() {
        let mut file = zip.by_index(index)?;
        let Some(entry_path) = file.enclosed_name() else {
            return Err(ExtractionError::PathTraversal {
                path: file.name().to_owned(),
            });
        };

        if !file.is_file() || !is_member(&entry_path, member) {
            continue;
        }
        let mut out = File::create(dest)?;
        io::copy(&mut file, &mut out)?;
        out.sync_all()?;
        return Ok(true);
    }
    Ok(false)
}

/// Compare an entry path with the member name, ignoring a leading `./`.
fn is_member(entry_path: &Path, member: &str) -> bool {
    let mut components = entry_path
        .components()
        .filter(|c| !matches!(c, Component::CurDir));
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name == member
    )
}

/// Validate that an entry path does not escape the destination directory
/// via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
