//! Cover art resolution
//!
//! Produces a single square image for embedding. The image comes from `-p`
//! (local path or URL) or, failing that, a well-known default URL. Images
//! that are not exactly `COVER_SIZE`×`COVER_SIZE` are resized once into the
//! workspace; correctly sized images are used unchanged.

use crate::acquire::Fetcher;
use crate::discovery::classifier::{is_remote, remote_file_name};
use crate::error::{BookbinderError, Result};
use crate::tools::{self, Tool, Toolchain};
use crate::types::{CoverArt, CoverOrigin, COVER_SIZE};
use crate::workspace::Workspace;
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Image extensions the encoder can embed
pub const COVER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];

/// Resolve the cover art for one Job
pub fn resolve(
    picture: Option<&str>,
    default_url: &str,
    workspace: &Workspace,
    fetcher: &dyn Fetcher,
    tools: &Toolchain,
) -> Result<CoverArt> {
    let (location, origin) = match picture {
        Some(p) if is_remote(p) => (p, CoverOrigin::UserRemote),
        Some(p) => (p, CoverOrigin::UserLocal),
        None => (default_url, CoverOrigin::Default),
    };

    let extension = cover_extension(location)?;

    let path = match origin {
        CoverOrigin::UserLocal => validate_local(location)?,
        CoverOrigin::Default | CoverOrigin::UserRemote => {
            let dest = workspace.cover_source_path(&extension);
            fetcher.fetch(location, &dest)?;
            dest
        }
    };

    let (width, height) = identify(&path, tools)?;
    debug!("Cover art {} is {}x{}", path.display(), width, height);

    if width == COVER_SIZE && height == COVER_SIZE {
        return Ok(CoverArt {
            path,
            width,
            height,
            origin,
        });
    }

    info!(
        "Resizing cover art from {}x{} to {}x{}",
        width, height, COVER_SIZE, COVER_SIZE
    );
    let resized = workspace.cover_path(&extension);
    resize(&path, &resized, tools)?;

    let (width, height) = identify(&resized, tools)?;
    if width != COVER_SIZE || height != COVER_SIZE {
        return Err(BookbinderError::invalid_cover(
            location,
            format!("resize produced {}x{} instead of {}x{}", width, height, COVER_SIZE, COVER_SIZE),
        ));
    }

    Ok(CoverArt {
        path: resized,
        width,
        height,
        origin,
    })
}

/// Lowercased extension of a cover location, checked against the allow-list
fn cover_extension(location: &str) -> Result<String> {
    let name = if is_remote(location) {
        remote_file_name(location).unwrap_or_default()
    } else {
        location.to_string()
    };

    let extension = Path::new(&name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .ok_or_else(|| BookbinderError::invalid_cover(location, "file has no extension"))?;

    if COVER_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(BookbinderError::invalid_cover(
            location,
            format!("unsupported image type '.{}'", extension),
        ))
    }
}

/// Check that a local cover exists, is a regular file and can be opened
fn validate_local(location: &str) -> Result<PathBuf> {
    let path = PathBuf::from(location);
    let metadata = std::fs::metadata(&path)
        .map_err(|e| BookbinderError::invalid_cover(location, format!("cannot access file: {}", e)))?;
    if !metadata.is_file() {
        return Err(BookbinderError::invalid_cover(location, "not a regular file"));
    }
    File::open(&path)
        .map_err(|e| BookbinderError::invalid_cover(location, format!("file is not readable: {}", e)))?;
    Ok(path)
}

/// Query pixel dimensions of the first frame
fn identify(path: &Path, tools: &Toolchain) -> Result<(u32, u32)> {
    let mut frame = OsString::from(path.as_os_str());
    frame.push("[0]");

    let args: [OsString; 3] = ["-format".into(), "%wx%h".into(), frame];
    let output = tools::run(tools.program(Tool::Identify), &args).map_err(|e| {
        BookbinderError::invalid_cover(path.display().to_string(), format!("Failed to run identify: {}", e))
    })?;

    if !output.success() {
        return Err(BookbinderError::invalid_cover(
            path.display().to_string(),
            format!("identify {}", output.failure_reason()),
        ));
    }

    parse_geometry(&output.stdout).ok_or_else(|| {
        BookbinderError::invalid_cover(
            path.display().to_string(),
            format!("unexpected identify output '{}'", output.stdout.trim()),
        )
    })
}

/// Force an image to `COVER_SIZE` square, ignoring aspect ratio
fn resize(src: &Path, dest: &Path, tools: &Toolchain) -> Result<()> {
    let geometry = format!("{}x{}!", COVER_SIZE, COVER_SIZE);
    let args: [OsString; 4] = [src.into(), "-resize".into(), geometry.into(), dest.into()];

    let output = tools::run(tools.program(Tool::Convert), &args).map_err(|e| {
        BookbinderError::invalid_cover(src.display().to_string(), format!("Failed to run convert: {}", e))
    })?;

    if !output.success() {
        return Err(BookbinderError::invalid_cover(
            src.display().to_string(),
            format!("convert {}", output.failure_reason()),
        ));
    }
    Ok(())
}

/// Parse `WIDTHxHEIGHT` from identify output
pub fn parse_geometry(text: &str) -> Option<(u32, u32)> {
    let token = text.split_whitespace().next()?;
    let (width, height) = token.split_once('x')?;
    Some((width.parse().ok()?, height.parse().ok()?))
}
