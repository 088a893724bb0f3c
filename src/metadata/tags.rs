//! Container tag read-back
//!
//! Uses lofty to read the iTunes-style atoms the encoder wrote, so a finished
//! audiobook can be checked against the metadata it was built from.

use crate::types::Metadata;
use lofty::{Accessor, ItemKey, Probe, TaggedFileExt};
use std::path::Path;
use tracing::debug;

/// Tag values found in an encoded container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerTags {
    pub title: Option<String>,
    pub writer: Option<String>,
    pub album: Option<String>,
    pub year: Option<String>,
    pub genre: Option<String>,
    pub track: Option<u32>,
}

impl ContainerTags {
    /// Names of the fields that differ from `expected`
    pub fn mismatches(&self, expected: &Metadata) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.title.as_deref() != Some(expected.title.as_str()) {
            fields.push("title");
        }
        if self.writer.as_deref() != Some(expected.writer.as_str()) {
            fields.push("writer");
        }
        if self.album.as_deref() != Some(expected.album.as_str()) {
            fields.push("album");
        }
        if self.year.as_deref() != Some(expected.year.as_str()) {
            fields.push("year");
        }
        fields
    }
}

/// Read the tags of an encoded container
pub fn read_tags(path: &Path) -> Result<ContainerTags, lofty::error::LoftyError> {
    let tagged_file = Probe::open(path)?.read()?;
    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

    let tags = match tag {
        Some(tag) => ContainerTags {
            title: tag.title().map(|s| s.to_string()),
            writer: tag
                .artist()
                .map(|s| s.to_string())
                .or_else(|| tag.get_string(&ItemKey::Composer).map(str::to_string)),
            album: tag.album().map(|s| s.to_string()),
            year: tag
                .get_string(&ItemKey::RecordingDate)
                .map(str::to_string)
                .or_else(|| tag.year().map(|y| y.to_string())),
            genre: tag.genre().map(|s| s.to_string()),
            track: tag.track(),
        },
        None => {
            debug!("No tags found in {}", path.display());
            ContainerTags::default()
        }
    };

    Ok(tags)
}
