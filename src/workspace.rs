//! Per-job temporary workspace
//!
//! Every Job owns one directory holding its intermediate artifacts. The
//! directory is created owner-only, its name carries the process id so
//! concurrent invocations never collide, and it is removed when the
//! [`Workspace`] is dropped, whichever way the Job ends.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Subdirectory receiving extracted tracks
pub const TRACKS_DIR: &str = "mp3s";

/// Exclusively-owned temporary directory for one Job
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a workspace under `root`
    pub fn create(root: &Path, job_index: usize) -> Result<Self> {
        let prefix = format!("bookbinder-{}-{}-", std::process::id(), job_index);

        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(std::fs::Permissions::from_mode(0o700));
        }

        let dir = builder.tempdir_in(root)?;
        debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Downloaded copy of a remote source archive (keeps its file name)
    pub fn archive_path(&self, file_name: &str) -> PathBuf {
        self.path().join(format!("source-{}", file_name))
    }

    /// Directory receiving extracted tracks
    pub fn tracks_dir(&self) -> PathBuf {
        self.path().join(TRACKS_DIR)
    }

    /// Canonical name of the concatenated stream
    pub fn merged_path(&self) -> PathBuf {
        self.path().join("merged.mp3")
    }

    /// Raw sample stream written by the decoder
    pub fn decoded_path(&self) -> PathBuf {
        self.path().join("decoded.pcm")
    }

    /// Decoder diagnostics
    pub fn decode_log_path(&self) -> PathBuf {
        self.path().join("decode.log")
    }

    /// Cover art as fetched or referenced, before any resize
    pub fn cover_source_path(&self, extension: &str) -> PathBuf {
        self.path().join(format!("cover-source.{}", extension))
    }

    /// Cover art after resizing
    pub fn cover_path(&self, extension: &str) -> PathBuf {
        self.path().join(format!("cover.{}", extension))
    }

    /// Remove the workspace now, logging instead of failing if removal fails
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!("Removed workspace {}", path.display()),
            Err(e) => warn!("Could not remove workspace {}: {}", path.display(), e),
        }
    }
}
