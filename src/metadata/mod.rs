//! Metadata resolution
//!
//! Produces the writer/title/album/year tuple for one Job, either from the
//! caller's explicit values or inferred from the source name. Mode selection
//! (and the infer-versus-explicit conflict) is settled by
//! [`Settings::from_cli`](crate::config::Settings::from_cli) and the
//! orchestrator's validation, so the resolver only ever sees one mode.

pub mod infer;
pub mod tags;

pub use infer::infer_title;
pub use tags::{read_tags, ContainerTags};

use crate::config::{ExplicitMetadata, MetadataRequest};
use crate::error::{BookbinderError, Result};
use crate::types::{Metadata, Source};
use chrono::Datelike;
use tracing::debug;

/// Resolve metadata for a source
pub fn resolve(request: &MetadataRequest, source: &Source) -> Result<Metadata> {
    let metadata = match request {
        MetadataRequest::Infer => infer(source),
        MetadataRequest::Explicit(explicit) => from_explicit(explicit)?,
    };

    debug!(
        "Metadata for {}: title={:?} writer={:?} album={:?} year={}",
        source, metadata.title, metadata.writer, metadata.album, metadata.year
    );

    Ok(metadata)
}

/// Infer metadata from the source's base name
///
/// Writer and album default to the inferred title; year is the current year.
pub fn infer(source: &Source) -> Metadata {
    let title = infer_title(&source.file_name);
    Metadata {
        writer: title.clone(),
        album: title.clone(),
        title,
        year: current_year(),
    }
}

/// Build metadata from explicit values, reporting every missing field
pub fn from_explicit(explicit: &ExplicitMetadata) -> Result<Metadata> {
    fn present(value: &Option<String>) -> Option<String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    let title = present(&explicit.title);
    let writer = present(&explicit.writer);
    let album = present(&explicit.album);
    let year = present(&explicit.year);

    match (title, writer, album, year) {
        (Some(title), Some(writer), Some(album), Some(year)) => Ok(Metadata {
            writer,
            title,
            album,
            year,
        }),
        (title, writer, album, year) => {
            let fields = [
                ("title (-t)", title.is_none()),
                ("writer (-w)", writer.is_none()),
                ("album (-a)", album.is_none()),
                ("year (-y)", year.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, missing)| missing.then_some(name))
            .collect();
            Err(BookbinderError::MissingMetadata { fields })
        }
    }
}

fn current_year() -> String {
    chrono::Local::now().year().to_string()
}
