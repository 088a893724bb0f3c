//! Runtime configuration settings

use crate::error::{BookbinderError, Result};
use crate::tools::Toolchain;
use std::path::PathBuf;

/// Cover art used when no -p is given
pub const DEFAULT_COVER_URL: &str = "https://librivox.org/images/librivox-logo.jpg";

/// Environment override for the default cover art URL
pub const DEFAULT_COVER_ENV: &str = "BOOKBINDER_DEFAULT_COVER_URL";

/// Environment override for the directory that holds job workspaces
pub const WORKSPACE_ROOT_ENV: &str = "BOOKBINDER_TMPDIR";

/// Metadata supplied on the command line (-t, -w, -a, -y)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplicitMetadata {
    pub title: Option<String>,
    pub writer: Option<String>,
    pub album: Option<String>,
    pub year: Option<String>,
}

/// How each Job obtains its metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataRequest {
    /// Derive everything from the source name
    Infer,
    /// Use caller-supplied values; all of them must be present
    Explicit(ExplicitMetadata),
}

/// Runtime settings for one Run
#[derive(Debug, Clone)]
pub struct Settings {
    /// Source locations, in command-line order
    pub sources: Vec<String>,
    /// Directory receiving the audiobooks
    pub destination: PathBuf,
    pub metadata: MetadataRequest,
    /// Cover art location (-p)
    pub picture: Option<String>,
    /// Cover art fetched when no picture is given
    pub default_cover_url: String,
    /// Collaborator binaries
    pub tools: Toolchain,
    /// Parent directory for per-job workspaces
    pub workspace_root: PathBuf,
    /// Continue with remaining sources after a failure
    pub keep_going: bool,
    /// Show progress spinner
    pub show_progress: bool,
}

impl Settings {
    /// Create settings from CLI arguments
    ///
    /// Applies the argument-level Run rules: infer mode excludes explicit
    /// metadata, and several sources force infer mode.
    pub fn from_cli(cli: &super::cli::Cli) -> Result<Self> {
        let (destination, sources) = match cli.paths.split_last() {
            Some((destination, sources)) if !sources.is_empty() => {
                (PathBuf::from(destination), sources.to_vec())
            }
            _ => {
                return Err(BookbinderError::Usage(
                    "At least one source and a destination directory are required".to_string(),
                ))
            }
        };

        let metadata = select_metadata_request(cli, sources.len())?;

        Ok(Self {
            sources,
            destination,
            metadata,
            picture: cli.picture.clone(),
            default_cover_url: std::env::var(DEFAULT_COVER_ENV)
                .unwrap_or_else(|_| DEFAULT_COVER_URL.to_string()),
            tools: Toolchain::from_env(),
            workspace_root: std::env::var_os(WORKSPACE_ROOT_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            keep_going: cli.keep_going,
            show_progress: !cli.quiet,
        })
    }

    /// True when every Job infers its metadata
    pub fn infers_metadata(&self) -> bool {
        self.metadata == MetadataRequest::Infer
    }
}

fn select_metadata_request(cli: &super::cli::Cli, source_count: usize) -> Result<MetadataRequest> {
    let explicit = cli.has_explicit_metadata();

    if cli.infer && explicit {
        return Err(BookbinderError::ConflictingMetadata(
            "-i cannot be combined with -t, -w, -a or -y".to_string(),
        ));
    }

    if source_count > 1 {
        if explicit {
            return Err(BookbinderError::ConflictingMetadata(format!(
                "{} sources given; metadata is inferred per source, so -t, -w, -a and -y are not allowed",
                source_count
            )));
        }
        return Ok(MetadataRequest::Infer);
    }

    if cli.infer {
        Ok(MetadataRequest::Infer)
    } else {
        Ok(MetadataRequest::Explicit(ExplicitMetadata {
            title: cli.title.clone(),
            writer: cli.writer.clone(),
            album: cli.album.clone(),
            year: cli.year.clone(),
        }))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            destination: PathBuf::from("."),
            metadata: MetadataRequest::Infer,
            picture: None,
            default_cover_url: DEFAULT_COVER_URL.to_string(),
            tools: Toolchain::default(),
            workspace_root: std::env::temp_dir(),
            keep_going: false,
            show_progress: true,
        }
    }
}
