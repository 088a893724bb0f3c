//! Unified error types for bookbinder
//!
//! Error strategy:
//! - Usage errors (arguments, sources, metadata, cover art): print a usage hint, exit 1
//! - Dependency errors (missing collaborator binaries): report all missing tools, exit 1
//! - Pipeline errors (extraction, concatenation, format detection, encoding):
//!   abort the Run unless `--keep-going` was requested
//!
//! All errors include actionable suggestions where possible.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for bookbinder operations
#[derive(Debug, Error)]
pub enum BookbinderError {
    // =========================================================================
    // Usage-style errors - rejected before any collaborator runs
    // =========================================================================
    #[error("{0}")]
    Usage(String),

    #[error("Invalid source '{location}': {reason}\n  Tip: Sources are .zip/.tar archives (local or http/https/ftp) or local directories")]
    InvalidSource { location: String, reason: String },

    #[error("Missing metadata: {}\n  Tip: Supply -t, -w, -a and -y, or use -i to infer them from an archive name", .fields.join(", "))]
    MissingMetadata { fields: Vec<&'static str> },

    #[error("Conflicting metadata options: {0}")]
    ConflictingMetadata(String),

    #[error("Invalid cover art '{location}': {reason}\n  Supported formats: {SUPPORTED_COVER_FORMATS}")]
    InvalidCoverArt { location: String, reason: String },

    // =========================================================================
    // Environment errors
    // =========================================================================
    #[error("Required tools not found: {}\n  Tip: Install them with your package manager or point the matching BOOKBINDER_* variable at the binary", .tools.join(", "))]
    MissingDependency { tools: Vec<String> },

    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the destination directory")]
    Output { path: PathBuf, reason: String },

    // =========================================================================
    // Pipeline errors - abort the Run
    // =========================================================================
    #[error("Download of '{url}' failed: {reason}")]
    Download { url: String, reason: String },

    #[error("Extraction of '{archive}' failed: {reason}")]
    Extraction { archive: PathBuf, reason: String },

    #[error("Concatenation of tracks in '{dir}' failed: {reason}")]
    Concatenation { dir: PathBuf, reason: String },

    #[error("Could not detect audio format of '{path}': {reason}")]
    FormatDetection { path: PathBuf, reason: String },

    #[error("Encoding '{output}' failed: {reason}")]
    Encoding { output: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Cover art formats accepted by the encoder
pub const SUPPORTED_COVER_FORMATS: &str = "JPG, JPEG, PNG, GIF, BMP";

/// Result type alias for bookbinder operations
pub type Result<T> = std::result::Result<T, BookbinderError>;

impl BookbinderError {
    /// Returns true if the error stems from how the tool was invoked
    /// (the binary follows these with a usage hint)
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            BookbinderError::Usage(_)
                | BookbinderError::InvalidSource { .. }
                | BookbinderError::MissingMetadata { .. }
                | BookbinderError::ConflictingMetadata(_)
                | BookbinderError::InvalidCoverArt { .. }
        )
    }

    pub fn invalid_source(location: impl Into<String>, reason: impl Into<String>) -> Self {
        BookbinderError::InvalidSource {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_cover(location: impl Into<String>, reason: impl Into<String>) -> Self {
        BookbinderError::InvalidCoverArt {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("Permission denied. Check that you have write access to {}", path.display())
            }
            std::io::ErrorKind::NotFound => {
                format!(
                    "Parent directory does not exist: {}",
                    path.parent().map(|p| p.display().to_string()).unwrap_or_default()
                )
            }
            _ => err.to_string(),
        };
        BookbinderError::Output { path, reason }
    }
}
