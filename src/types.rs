//! Core data types for bookbinder
//!
//! These types represent the domain model and flow through the pipeline.
//! Every value here is produced once per Job and never mutated afterwards.

use std::fmt;
use std::path::PathBuf;

/// File extension of the produced audiobook container
pub const CONTAINER_EXTENSION: &str = "m4b";

/// Cover art edge length expected by the encoder, in pixels
pub const COVER_SIZE: u32 = 300;

// =============================================================================
// Sources
// =============================================================================

/// Archive families understood by the extraction step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    Zip,
    Tar,
}

/// Recognized archive suffixes, longest first so compound suffixes win
const ARCHIVE_SUFFIXES: &[(&str, ArchiveFormat)] = &[
    (".tar.bz2", ArchiveFormat::Tar),
    (".tar.gz", ArchiveFormat::Tar),
    (".tar.xz", ArchiveFormat::Tar),
    (".tbz2", ArchiveFormat::Tar),
    (".tgz", ArchiveFormat::Tar),
    (".txz", ArchiveFormat::Tar),
    (".tar", ArchiveFormat::Tar),
    (".zip", ArchiveFormat::Zip),
];

impl ArchiveFormat {
    /// Split a file name into its stem and archive format (case-insensitive)
    ///
    /// `"Book.TAR.gz"` → `Some(("Book", Tar))`; names without a recognized
    /// suffix, or consisting only of the suffix, yield `None`.
    pub fn split_name(name: &str) -> Option<(&str, ArchiveFormat)> {
        let lower = name.to_ascii_lowercase();
        ARCHIVE_SUFFIXES.iter().find_map(|(suffix, format)| {
            if lower.len() > suffix.len() && lower.ends_with(suffix) {
                Some((&name[..name.len() - suffix.len()], *format))
            } else {
                None
            }
        })
    }

    /// Detect the format of a file name, ignoring the stem
    pub fn from_name(name: &str) -> Option<Self> {
        Self::split_name(name).map(|(_, format)| format)
    }
}

/// What a Source is, derived from its location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Archive(ArchiveFormat),
    Directory,
}

/// One input of a Run: an archive (local or remote) or a local track directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Path or URL as supplied on the command line
    pub location: String,
    /// Derived kind, never user-declared
    pub kind: SourceKind,
    /// True for http/https/ftp locations
    pub remote: bool,
    /// Final path component (URL path segment for remote sources, percent-decoded)
    pub file_name: String,
}

impl Source {
    pub fn is_directory(&self) -> bool {
        self.kind == SourceKind::Directory
    }

    pub fn archive_format(&self) -> Option<ArchiveFormat> {
        match self.kind {
            SourceKind::Archive(format) => Some(format),
            SourceKind::Directory => None,
        }
    }

    /// Archive file name without its archive suffix
    pub fn archive_stem(&self) -> Option<&str> {
        match self.kind {
            SourceKind::Archive(_) => {
                ArchiveFormat::split_name(&self.file_name).map(|(stem, _)| stem)
            }
            SourceKind::Directory => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}

// =============================================================================
// Metadata and artwork
// =============================================================================

/// Resolved tag values for one audiobook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub writer: String,
    pub title: String,
    pub album: String,
    pub year: String,
}

/// Where the cover art came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverOrigin {
    Default,
    UserLocal,
    UserRemote,
}

/// A cover image ready for embedding (always `COVER_SIZE` square)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArt {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub origin: CoverOrigin,
}

// =============================================================================
// Audio
// =============================================================================

/// Raw sample layout reported by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    /// Sample rate in Hz
    pub rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
}

impl fmt::Display for PcmFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Hz {}ch {}-bit", self.rate, self.channels, self.bit_depth)
    }
}

/// Decoded stream on disk plus its format
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub raw_path: PathBuf,
    pub format: PcmFormat,
}
