//! Track concatenation
//!
//! Joins every track of a directory into one stream with mp3wrap. mp3wrap
//! insists on appending `_MP3WRAP` to the name it is given, so the produced
//! file is moved back to the workspace's canonical name afterwards.

use crate::discovery::scan_tracks;
use crate::error::{BookbinderError, Result};
use crate::tools::{self, Tool, Toolchain};
use crate::workspace::Workspace;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Suffix the concatenation tool adds to its output stem
pub const WRAP_SUFFIX: &str = "_MP3WRAP";

/// Delay between size checks of the merged file
const STABLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Size checks before giving up on the merged file settling
const STABLE_MAX_POLLS: usize = 50;

/// Concatenate all tracks under `track_dir`; returns the merged file path
pub fn concatenate(track_dir: &Path, workspace: &Workspace, tools: &Toolchain) -> Result<PathBuf> {
    let concat_error = |reason: String| BookbinderError::Concatenation {
        dir: track_dir.to_path_buf(),
        reason,
    };

    let tracks = scan_tracks(track_dir);
    let target = workspace.merged_path();

    match tracks.len() {
        0 => return Err(concat_error("no .mp3 tracks found".to_string())),
        1 => {
            debug!("Single track, copying {} as merged stream", tracks[0].path.display());
            std::fs::copy(&tracks[0].path, &target).map_err(|e| concat_error(e.to_string()))?;
        }
        n => {
            info!("Concatenating {} tracks", n);
            let mut args: Vec<OsString> = Vec::with_capacity(n + 1);
            args.push(target.clone().into());
            args.extend(tracks.iter().map(|t| t.path.clone().into_os_string()));

            let output = tools::run(tools.program(Tool::Mp3wrap), &args)
                .map_err(|e| concat_error(format!("Failed to run {}: {}", Tool::Mp3wrap, e)))?;
            if !output.success() {
                return Err(concat_error(format!("{} {}", Tool::Mp3wrap, output.failure_reason())));
            }

            adopt_output(&target).map_err(concat_error)?;
        }
    }

    let size = wait_until_stable(&target, STABLE_POLL_INTERVAL, STABLE_MAX_POLLS).map_err(concat_error)?;
    debug!("Merged stream {} is {} bytes", target.display(), size);

    Ok(target)
}

/// Name the concatenation tool actually writes for `target`
pub fn suffixed_path(target: &Path) -> PathBuf {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match target.extension() {
        Some(ext) => format!("{}{}.{}", stem, WRAP_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, WRAP_SUFFIX),
    };
    target.with_file_name(name)
}

/// Move the tool's output to `target`, accepting either name
fn adopt_output(target: &Path) -> std::result::Result<(), String> {
    if target.is_file() {
        return Ok(());
    }

    let suffixed = suffixed_path(target);
    if suffixed.is_file() {
        debug!("Renaming {} to {}", suffixed.display(), target.display());
        return std::fs::rename(&suffixed, target).map_err(|e| {
            format!("Failed to rename {}: {}", suffixed.display(), e)
        });
    }

    Err(format!(
        "expected output {} (or {}) was never produced",
        target.display(),
        suffixed.display()
    ))
}

/// Wait until two consecutive checks see the same non-zero size
///
/// Returns the final size.
pub fn wait_until_stable(
    path: &Path,
    interval: Duration,
    max_polls: usize,
) -> std::result::Result<u64, String> {
    let mut previous = None;

    for _ in 0..max_polls {
        let size = std::fs::metadata(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?
            .len();

        if size > 0 && previous == Some(size) {
            return Ok(size);
        }

        previous = Some(size);
        thread::sleep(interval);
    }

    Err(format!(
        "{} did not reach a stable non-zero size after {} checks",
        path.display(),
        max_polls
    ))
}
