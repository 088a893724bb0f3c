//! Source acquisition
//!
//! Materializes a Source locally: remote archives are downloaded into the
//! workspace, local archives are used where they are, and archives are then
//! extracted into the workspace's `mp3s` directory. Directory sources are
//! read in place and never copied.

pub mod fetch;

pub use fetch::{CurlFetcher, Fetcher, HttpFetcher, RemoteFetcher};

use crate::error::{BookbinderError, Result};
use crate::tools::{self, Tool, Toolchain};
use crate::types::{ArchiveFormat, Source, SourceKind};
use crate::workspace::Workspace;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A source available on the local filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalSource {
    Archive { path: PathBuf, format: ArchiveFormat },
    Directory(PathBuf),
}

/// Make the source available locally, downloading it if remote
pub fn materialize(source: &Source, workspace: &Workspace, fetcher: &dyn Fetcher) -> Result<LocalSource> {
    match source.kind {
        SourceKind::Directory => Ok(LocalSource::Directory(PathBuf::from(&source.location))),
        SourceKind::Archive(format) if source.remote => {
            let dest = workspace.archive_path(&source.file_name);
            debug!("Fetching {} with {} fetcher", source.location, fetcher.name());
            fetcher.fetch(&source.location, &dest)?;
            Ok(LocalSource::Archive { path: dest, format })
        }
        SourceKind::Archive(format) => Ok(LocalSource::Archive {
            path: PathBuf::from(&source.location),
            format,
        }),
    }
}

/// Extract an archive into the workspace's track directory
///
/// Returns the track directory.
pub fn extract(
    archive: &Path,
    format: ArchiveFormat,
    workspace: &Workspace,
    tools: &Toolchain,
) -> Result<PathBuf> {
    let dest = workspace.tracks_dir();
    std::fs::create_dir_all(&dest).map_err(|e| BookbinderError::Extraction {
        archive: archive.to_path_buf(),
        reason: format!("Failed to create {}: {}", dest.display(), e),
    })?;

    info!("Extracting {}", archive.display());

    let (tool, args): (Tool, Vec<OsString>) = match format {
        ArchiveFormat::Zip => (
            Tool::Unzip,
            vec![
                "-q".into(),
                "-o".into(),
                archive.into(),
                "-d".into(),
                dest.clone().into(),
            ],
        ),
        ArchiveFormat::Tar => (
            Tool::Tar,
            vec!["-xf".into(), archive.into(), "-C".into(), dest.clone().into()],
        ),
    };

    let output = tools::run(tools.program(tool), &args).map_err(|e| BookbinderError::Extraction {
        archive: archive.to_path_buf(),
        reason: format!("Failed to run {}: {}", tool, e),
    })?;

    if !output.success() {
        return Err(BookbinderError::Extraction {
            archive: archive.to_path_buf(),
            reason: format!("{} {}", tool, output.failure_reason()),
        });
    }

    Ok(dest)
}

/// Materialize and, for archives, extract; returns the track directory
pub fn acquire(
    source: &Source,
    workspace: &Workspace,
    fetcher: &dyn Fetcher,
    tools: &Toolchain,
) -> Result<PathBuf> {
    match materialize(source, workspace, fetcher)? {
        LocalSource::Directory(dir) => Ok(dir),
        LocalSource::Archive { path, format } => extract(&path, format, workspace, tools),
    }
}
