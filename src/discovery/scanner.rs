//! Track scanning

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Extension of the only track format the concatenation step understands
pub const TRACK_EXTENSION: &str = "mp3";

/// Audio track found in a track directory
#[derive(Debug, Clone)]
pub struct DiscoveredTrack {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Scan a directory recursively for tracks, sorted by path
///
/// Archives often nest their tracks one level down, so the whole tree is
/// walked. Hidden files (e.g. `._01.mp3` resource forks) are skipped.
pub fn scan_tracks(dir: &Path) -> Vec<DiscoveredTrack> {
    let mut tracks: Vec<DiscoveredTrack> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| try_discover_track(entry.path()))
        .collect();

    tracks.sort_by(|a, b| a.path.cmp(&b.path));

    info!("Discovered {} tracks in {}", tracks.len(), dir.display());
    if tracks.is_empty() {
        warn!("No .{} tracks found in {}", TRACK_EXTENSION, dir.display());
    }

    tracks
}

fn try_discover_track(path: &Path) -> Option<DiscoveredTrack> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with('.') {
        return None;
    }
    let ext = path.extension()?.to_str()?;
    if !ext.eq_ignore_ascii_case(TRACK_EXTENSION) {
        return None;
    }

    let size_bytes = std::fs::metadata(path).ok()?.len();
    debug!("Discovered: {}", path.display());

    Some(DiscoveredTrack {
        path: path.to_path_buf(),
        size_bytes,
    })
}
