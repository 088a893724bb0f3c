//! Final m4b encoding with faac

use crate::error::{BookbinderError, Result};
use crate::metadata::read_tags;
use crate::tools::{self, Tool, Toolchain};
use crate::types::{CoverArt, DecodedAudio, Metadata, Source, SourceKind, CONTAINER_EXTENSION};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Genre tag written to every audiobook
pub const GENRE: &str = "Spoken Word";

/// faac VBR quality (-q)
pub const QUALITY: u32 = 80;

/// Track number tag; the whole book is one track
pub const TRACK_NUMBER: u32 = 1;

/// Where the audiobook for `source` is written
///
/// Archives keep their base name with the container extension; directories
/// are named after the resolved title.
pub fn output_path(destination: &Path, source: &Source, metadata: &Metadata) -> PathBuf {
    let stem = match source.kind {
        SourceKind::Archive(_) => source
            .archive_stem()
            .map(str::to_string)
            .unwrap_or_else(|| metadata.title.clone()),
        SourceKind::Directory => metadata.title.clone(),
    };
    destination.join(format!("{}.{}", sanitize_file_stem(&stem), CONTAINER_EXTENSION))
}

/// Replace path separators so a title cannot escape the destination
fn sanitize_file_stem(stem: &str) -> String {
    stem.chars()
        .map(|c| if c == '/' || c == '\\' || c == '\0' { '-' } else { c })
        .collect()
}

/// Encode decoded audio with tags and cover art into `output`
pub fn encode(
    decoded: &DecodedAudio,
    metadata: &Metadata,
    cover: &CoverArt,
    output: &Path,
    tools: &Toolchain,
) -> Result<()> {
    let encoding_error = |reason: String| BookbinderError::Encoding {
        output: output.to_path_buf(),
        reason,
    };

    if output.exists() {
        warn!("Overwriting existing {}", output.display());
    }

    info!("Encoding {} ({})", output.display(), decoded.format);
    let args = encoder_args(decoded, metadata, &cover.path, output);

    let result = tools::run(tools.program(Tool::Faac), &args)
        .map_err(|e| encoding_error(format!("Failed to run {}: {}", Tool::Faac, e)))?;
    if !result.success() {
        return Err(encoding_error(format!("{} {}", Tool::Faac, result.failure_reason())));
    }
    if !output.is_file() {
        return Err(encoding_error("encoder reported success but wrote no file".to_string()));
    }

    verify_tags(output, metadata);
    Ok(())
}

/// Command line for faac reading raw PCM
pub fn encoder_args(
    decoded: &DecodedAudio,
    metadata: &Metadata,
    cover: &Path,
    output: &Path,
) -> Vec<OsString> {
    let format = decoded.format;
    // -P: raw input, -w: MP4 container
    let mut args: Vec<OsString> = vec!["-P".into(), "-w".into()];
    let mut push = |flag: &str, value: OsString| {
        args.push(flag.into());
        args.push(value);
    };

    push("-R", format.rate.to_string().into());
    push("-C", format.channels.to_string().into());
    push("-B", format.bit_depth.to_string().into());
    push("-q", QUALITY.to_string().into());
    push("--artist", metadata.writer.as_str().into());
    push("--writer", metadata.writer.as_str().into());
    push("--album", metadata.album.as_str().into());
    push("--title", metadata.title.as_str().into());
    push("--year", metadata.year.as_str().into());
    push("--genre", GENRE.into());
    push("--track", TRACK_NUMBER.to_string().into());
    push("--cover-art", cover.into());
    push("-o", output.into());

    args.push(decoded.raw_path.clone().into_os_string());
    args
}

/// Read the tags back and log any field that did not survive encoding
fn verify_tags(output: &Path, metadata: &Metadata) {
    match read_tags(output) {
        Ok(tags) => {
            let mismatches = tags.mismatches(metadata);
            if mismatches.is_empty() {
                debug!("Tags verified for {}", output.display());
            } else {
                warn!(
                    "Tags in {} differ from requested metadata: {}",
                    output.display(),
                    mismatches.join(", ")
                );
            }
        }
        Err(e) => debug!("Could not read back tags from {}: {}", output.display(), e),
    }
}
