//! Remote file download
//!
//! The pipeline only needs "URL in, local file out". The trait keeps that
//! seam swappable so tests can serve remote sources from disk.
//! [`RemoteFetcher`] is the default: HTTP(S) in process, FTP through curl.

use crate::discovery::is_ftp;
use crate::error::{BookbinderError, Result};
use crate::tools::{self, Tool};
use std::cell::OnceCell;
use std::ffi::OsStr;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Download backend
pub trait Fetcher {
    /// Download `url` into the file at `dest`, replacing it if present
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;

    /// Get the name of this fetcher (for logging)
    fn name(&self) -> &'static str;
}

/// Blocking HTTP(S) fetcher
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Connect timeout; transfers themselves are not time-limited
    const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Self::CONNECT_TIMEOUT)
            .timeout(None)
            .build()
            .map_err(|e| BookbinderError::Download {
                url: String::new(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let download_error = |reason: String| BookbinderError::Download {
            url: url.to_string(),
            reason,
        };

        if !url.to_ascii_lowercase().starts_with("http") {
            return Err(download_error(
                "only http and https downloads are supported".to_string(),
            ));
        }

        info!("Downloading {}", url);

        let mut response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| download_error(e.to_string()))?;

        let file = File::create(dest).map_err(|e| {
            download_error(format!("Failed to create {}: {}", dest.display(), e))
        })?;
        let mut writer = BufWriter::new(file);

        let bytes = response
            .copy_to(&mut writer)
            .map_err(|e| download_error(e.to_string()))?;

        writer
            .into_inner()
            .map_err(|e| download_error(e.to_string()))?
            .sync_all()
            .map_err(|e| download_error(e.to_string()))?;

        debug!("Downloaded {} bytes to {}", bytes, dest.display());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// FTP downloads through the curl collaborator
pub struct CurlFetcher {
    program: PathBuf,
}

impl CurlFetcher {
    pub fn new(program: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
        }
    }
}

impl Fetcher for CurlFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let download_error = |reason: String| BookbinderError::Download {
            url: url.to_string(),
            reason,
        };

        info!("Downloading {}", url);

        // -f: fail on server errors instead of saving the error page
        let args = [
            OsStr::new("-f"),
            OsStr::new("-s"),
            OsStr::new("-S"),
            OsStr::new("--output"),
            dest.as_os_str(),
            OsStr::new("--url"),
            OsStr::new(url),
        ];
        let output = tools::run(&self.program, args)
            .map_err(|e| download_error(format!("Failed to run {}: {}", Tool::Curl, e)))?;
        if !output.success() {
            return Err(download_error(format!("{} {}", Tool::Curl, output.failure_reason())));
        }
        if !dest.is_file() {
            return Err(download_error(format!(
                "{} reported success but wrote no file",
                Tool::Curl
            )));
        }

        debug!("Downloaded {} to {}", url, dest.display());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "curl"
    }
}

/// Picks the backend from the URL scheme
///
/// The HTTP client is only built the first time an HTTP(S) URL is fetched.
pub struct RemoteFetcher {
    http: OnceCell<HttpFetcher>,
    ftp: CurlFetcher,
}

impl RemoteFetcher {
    pub fn new(curl: &Path) -> Self {
        Self {
            http: OnceCell::new(),
            ftp: CurlFetcher::new(curl),
        }
    }

    fn http(&self) -> Result<&HttpFetcher> {
        if let Some(fetcher) = self.http.get() {
            return Ok(fetcher);
        }
        let fetcher = HttpFetcher::new()?;
        Ok(self.http.get_or_init(|| fetcher))
    }

    /// Backend that will serve `url`
    pub fn backend(&self, url: &str) -> Result<&dyn Fetcher> {
        if is_ftp(url) {
            Ok(&self.ftp)
        } else {
            Ok(self.http()?)
        }
    }
}

impl Fetcher for RemoteFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let backend = self.backend(url)?;
        debug!("Fetching {} with {} backend", url, backend.name());
        backend.fetch(url, dest)
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
