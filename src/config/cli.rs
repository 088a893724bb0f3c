//! CLI argument parsing and configuration

use clap::{ArgAction, Parser};

/// bookbinder - Turn spoken-word recordings into tagged m4b audiobooks
///
/// Each SOURCE is a .zip/.tar archive of mp3 tracks (local path or
/// http/https/ftp URL) or a local directory of mp3 tracks. One audiobook is
/// written to DESTINATION per source.
#[derive(Parser, Debug, Default)]
#[command(name = "bookbinder")]
#[command(author, version, about, long_about = None)]
#[command(disable_help_flag = true)]
pub struct Cli {
    /// Album tag
    #[arg(short = 'a', value_name = "ALBUM")]
    pub album: Option<String>,

    /// Infer title, writer, album and year from each archive name
    #[arg(short = 'i', long = "infer")]
    pub infer: bool,

    /// Cover art image (local path or URL); a default image is used otherwise
    #[arg(short = 'p', value_name = "PICTURE")]
    pub picture: Option<String>,

    /// Title tag
    #[arg(short = 't', value_name = "TITLE")]
    pub title: Option<String>,

    /// Writer tag
    #[arg(short = 'w', value_name = "WRITER")]
    pub writer: Option<String>,

    /// Year tag
    #[arg(short = 'y', value_name = "YEAR")]
    pub year: Option<String>,

    /// Continue with the remaining sources when one fails
    #[arg(short = 'k', long = "keep-going")]
    pub keep_going: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only, no progress spinner)
    #[arg(short, long)]
    pub quiet: bool,

    /// Print help
    #[arg(short = 'h', long = "help", action = ArgAction::Help)]
    pub help: Option<bool>,

    /// One or more sources followed by the destination directory
    #[arg(value_name = "SOURCE... DESTINATION", required = true, num_args = 2..)]
    pub paths: Vec<String>,
}

impl Cli {
    /// True when any of -t, -w, -a or -y was given
    pub fn has_explicit_metadata(&self) -> bool {
        self.title.is_some() || self.writer.is_some() || self.album.is_some() || self.year.is_some()
    }

    /// Get the log level based on verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
