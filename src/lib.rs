//! bookbinder - Spoken-word archives to tagged m4b audiobooks
//!
//! A command-line utility that turns a LibriVox-style archive of mp3 tracks
//! (local or remote) or a local track directory into a single m4b audiobook
//! carrying title, writer, album, year and cover art.
//!
//! # Architecture
//!
//! The library is organized into several key modules:
//!
//! - `config`: CLI argument parsing and runtime settings
//! - `discovery`: Source classification and track scanning
//! - `metadata`: Title inference, explicit metadata, tag read-back
//! - `artwork`: Cover art fetch, validation and resize
//! - `acquire`: Download and archive extraction
//! - `audio`: Concatenation, decoding/format detection, encoding
//! - `tools`: External collaborator invocation
//! - `workspace`: Per-job temporary directories
//! - `pipeline`: Sequential job orchestration
//!
//! # Example
//!
//! ```no_run
//! use bookbinder::{config::Settings, pipeline};
//!
//! let settings = Settings {
//!     sources: vec!["https://example.org/on_liberty_64kb_mp3_librivox.zip".into()],
//!     destination: "books".into(),
//!     ..Settings::default()
//! };
//! let result = pipeline::run(&settings).expect("Run failed");
//! println!("Wrote {} audiobooks", result.successful);
//! ```

pub mod acquire;
pub mod artwork;
pub mod audio;
pub mod config;
pub mod discovery;
pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod tools;
pub mod types;
pub mod workspace;

#[cfg(test)]
mod test_fixtures;

// Re-export key types at crate root
pub use error::{BookbinderError, Result};
pub use types::{CoverArt, Metadata, PcmFormat, Source, SourceKind};
