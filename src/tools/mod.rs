//! External collaborator binaries
//!
//! FTP downloads, archive extraction, image identify/resize, concatenation, decoding and
//! encoding are delegated to command-line tools. This module knows their
//! names, how to override them, and how to check that they are installed.

pub mod process;

pub use process::{run, ToolOutput};

use crate::error::{BookbinderError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A collaborator the pipeline may invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Curl,
    Unzip,
    Tar,
    Identify,
    Convert,
    Mp3wrap,
    Mplayer,
    Faac,
}

impl Tool {
    pub const ALL: [Tool; 8] = [
        Tool::Curl,
        Tool::Unzip,
        Tool::Tar,
        Tool::Identify,
        Tool::Convert,
        Tool::Mp3wrap,
        Tool::Mplayer,
        Tool::Faac,
    ];

    /// Program name looked up on PATH by default
    pub fn default_program(self) -> &'static str {
        match self {
            Tool::Curl => "curl",
            Tool::Unzip => "unzip",
            Tool::Tar => "tar",
            Tool::Identify => "identify",
            Tool::Convert => "convert",
            Tool::Mp3wrap => "mp3wrap",
            Tool::Mplayer => "mplayer",
            Tool::Faac => "faac",
        }
    }

    /// Environment variable overriding the program path
    pub fn env_var(self) -> &'static str {
        match self {
            Tool::Curl => "BOOKBINDER_CURL",
            Tool::Unzip => "BOOKBINDER_UNZIP",
            Tool::Tar => "BOOKBINDER_TAR",
            Tool::Identify => "BOOKBINDER_IDENTIFY",
            Tool::Convert => "BOOKBINDER_CONVERT",
            Tool::Mp3wrap => "BOOKBINDER_MP3WRAP",
            Tool::Mplayer => "BOOKBINDER_MPLAYER",
            Tool::Faac => "BOOKBINDER_FAAC",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_program())
    }
}

/// Program paths for every collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub curl: PathBuf,
    pub unzip: PathBuf,
    pub tar: PathBuf,
    pub identify: PathBuf,
    pub convert: PathBuf,
    pub mp3wrap: PathBuf,
    pub mplayer: PathBuf,
    pub faac: PathBuf,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            curl: Tool::Curl.default_program().into(),
            unzip: Tool::Unzip.default_program().into(),
            tar: Tool::Tar.default_program().into(),
            identify: Tool::Identify.default_program().into(),
            convert: Tool::Convert.default_program().into(),
            mp3wrap: Tool::Mp3wrap.default_program().into(),
            mplayer: Tool::Mplayer.default_program().into(),
            faac: Tool::Faac.default_program().into(),
        }
    }
}

impl Toolchain {
    /// Defaults, overridden by any `BOOKBINDER_*` variables that are set
    pub fn from_env() -> Self {
        let mut tools = Self::default();
        for tool in Tool::ALL {
            if let Some(path) = std::env::var_os(tool.env_var()) {
                debug!("Using {} from {}", tool, tool.env_var());
                *tools.program_mut(tool) = PathBuf::from(path);
            }
        }
        tools
    }

    pub fn program(&self, tool: Tool) -> &Path {
        match tool {
            Tool::Curl => &self.curl,
            Tool::Unzip => &self.unzip,
            Tool::Tar => &self.tar,
            Tool::Identify => &self.identify,
            Tool::Convert => &self.convert,
            Tool::Mp3wrap => &self.mp3wrap,
            Tool::Mplayer => &self.mplayer,
            Tool::Faac => &self.faac,
        }
    }

    fn program_mut(&mut self, tool: Tool) -> &mut PathBuf {
        match tool {
            Tool::Curl => &mut self.curl,
            Tool::Unzip => &mut self.unzip,
            Tool::Tar => &mut self.tar,
            Tool::Identify => &mut self.identify,
            Tool::Convert => &mut self.convert,
            Tool::Mp3wrap => &mut self.mp3wrap,
            Tool::Mplayer => &mut self.mplayer,
            Tool::Faac => &mut self.faac,
        }
    }

    /// Check that every listed tool can be found, reporting all missing ones at once
    pub fn verify(&self, required: &[Tool]) -> Result<()> {
        let missing: Vec<String> = required
            .iter()
            .filter(|tool| locate(self.program(**tool)).is_none())
            .map(|tool| self.program(*tool).display().to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(BookbinderError::MissingDependency { tools: missing })
        }
    }
}

/// Resolve a program to an existing file
///
/// Paths with more than one component are checked directly; bare names are
/// searched on `PATH`.
pub fn locate(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
