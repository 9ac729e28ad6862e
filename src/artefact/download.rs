//! Release archive retrieval over HTTP(S).
//!
//! Provides a trait-based abstraction for fetching a release asset into a
//! local file, enabling dependency injection for testing. The production
//! implementation follows redirects itself, in a loop bounded by a maximum
//! hop count, because release hosts answer asset URLs with a redirect to a
//! storage backend.

use log::debug;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use ureq::http::{Response, Uri, header::LOCATION};

/// Default bound on redirect hops for a single fetch.
pub const DEFAULT_MAX_REDIRECTS: u32 = 10;

/// Default global timeout for a single fetch, redirects included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Trait for fetching a remote file into a local path.
///
/// # Examples
///
/// ```
/// use xsql_npm_release::artefact::download::{FetchSettings, HttpFetcher};
///
/// let fetcher = HttpFetcher::new(&FetchSettings::default());
/// // Use fetcher.fetch(url, dest) in production
/// # let _ = fetcher;
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArtefactFetcher {
    /// Download `url` into `dest`, overwriting any existing file.
    ///
    /// Returns only once the file is fully written and synced.
    ///
    /// # Errors
    ///
    /// Returns an error on a non-success status, on a redirect chain longer
    /// than the configured bound, on transport failure, or when the file
    /// cannot be written.
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError>;
}

/// Errors arising from artefact download operations.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The server answered with a non-success, non-redirect status.
    #[error("download failed: {status} for {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// The URL that produced the status.
        url: String,
    },

    /// The request could not be completed.
    #[error("download failed for {url}: {reason}")]
    Transport {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The redirect chain exceeded the hop bound.
    #[error("too many redirects (limit {max_redirects}) fetching {url}")]
    TooManyRedirects {
        /// The URL the chain started from.
        url: String,
        /// The configured hop bound.
        max_redirects: u32,
    },

    /// A redirect pointed somewhere that could not be resolved.
    #[error("cannot follow redirect from {url} to \"{location}\"")]
    InvalidRedirect {
        /// The URL that issued the redirect.
        url: String,
        /// The raw `Location` header value.
        location: String,
    },

    /// The downloaded file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Destination path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Network settings for [`HttpFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Global timeout per fetch.
    pub timeout: Duration,
    /// Maximum redirect hops before failing.
    pub max_redirects: u32,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_owned(),
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// HTTP-based fetcher using `ureq`.
pub struct HttpFetcher {
    agent: ureq::Agent,
    user_agent: String,
    max_redirects: u32,
}

impl HttpFetcher {
    /// Build a fetcher whose agent never follows redirects on its own.
    #[must_use]
    pub fn new(settings: &FetchSettings) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(settings.timeout))
            .max_redirects(0)
            .max_redirects_will_error(false)
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            user_agent: settings.user_agent.clone(),
            max_redirects: settings.max_redirects,
        }
    }
}

impl ArtefactFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        let mut current = url.to_owned();
        for hop in 0..=self.max_redirects {
            let response = self
                .agent
                .get(&current)
                .header("User-Agent", self.user_agent.as_str())
                .call()
                .map_err(|e| DownloadError::Transport {
                    url: current.clone(),
                    reason: e.to_string(),
                })?;

            let status = response.status();
            if status.is_redirection() {
                if let Some(location) = location_header(&response) {
                    let next = resolve_location(&current, location)?;
                    debug!("redirect {} ({status}): {current} -> {next}", hop + 1);
                    current = next;
                    continue;
                }
            }

            if !status.is_success() {
                return Err(DownloadError::Status {
                    status: status.as_u16(),
                    url: current,
                });
            }

            return write_body(response, &current, dest);
        }

        Err(DownloadError::TooManyRedirects {
            url: url.to_owned(),
            max_redirects: self.max_redirects,
        })
    }
}

fn location_header<B>(response: &Response<B>) -> Option<&str> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

/// Resolve a `Location` header against the URL that returned it.
fn resolve_location(base: &str, location: &str) -> Result<String, DownloadError> {
    if location
        .parse::<Uri>()
        .is_ok_and(|uri| uri.scheme().is_some())
    {
        return Ok(location.to_owned());
    }

    let invalid = || DownloadError::InvalidRedirect {
        url: base.to_owned(),
        location: location.to_owned(),
    };
    let uri: Uri = base.parse().map_err(|_| invalid())?;
    let scheme = uri.scheme_str().ok_or_else(invalid)?;
    let authority = uri.authority().ok_or_else(invalid)?;

    if let Some(rest) = location.strip_prefix("//") {
        return Ok(format!("{scheme}://{rest}"));
    }
    if location.starts_with('/') {
        return Ok(format!("{scheme}://{authority}{location}"));
    }
    let directory = uri.path().rsplit_once('/').map_or("", |(dir, _)| dir);
    Ok(format!("{scheme}://{authority}{directory}/{location}"))
}

/// Stream the body into a temporary sibling of `dest`, then persist it.
fn write_body(
    response: Response<ureq::Body>,
    url: &str,
    dest: &Path,
) -> Result<(), DownloadError> {
    let write_error = |source: std::io::Error| DownloadError::Write {
        path: dest.to_path_buf(),
        source,
    };

    let parent = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged = tempfile::NamedTempFile::new_in(parent).map_err(write_error)?;

    let mut body = response.into_body();
    let bytes = std::io::copy(&mut body.as_reader(), &mut staged).map_err(|e| {
        DownloadError::Transport {
            url: url.to_owned(),
            reason: e.to_string(),
        }
    })?;
    staged.flush().map_err(write_error)?;
    staged.as_file().sync_all().map_err(write_error)?;
    staged
        .persist(dest)
        .map_err(|e| write_error(e.error))?;

    debug!("wrote {bytes} bytes from {url} to {}", dest.display());
    Ok(())
}
