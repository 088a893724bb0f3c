//! Source classification
//!
//! A location is an archive when its name ends in a recognized archive
//! suffix, a directory when it has no extension and exists as a directory.
//! Remote locations (http, https, ftp) are always archives.

use crate::error::{BookbinderError, Result};
use crate::types::{ArchiveFormat, Source, SourceKind};
use percent_encoding::percent_decode_str;
use std::path::Path;
use tracing::debug;

/// URL schemes treated as remote
const REMOTE_SCHEMES: &[&str] = &["http", "https", "ftp"];

/// True if the location starts with a remote scheme (case-insensitive)
pub fn is_remote(location: &str) -> bool {
    location
        .split_once("://")
        .map(|(scheme, _)| REMOTE_SCHEMES.iter().any(|s| scheme.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

/// Last path segment of a URL, without query or fragment, percent-decoded
pub fn remote_file_name(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("://")?;
    let path = rest.split(['?', '#']).next().unwrap_or(rest);
    let (_, path) = path.split_once('/')?;
    let segment = path.rsplit('/').find(|s| !s.is_empty())?;
    Some(percent_decode_str(segment).decode_utf8_lossy().into_owned())
}

/// True for `ftp://` locations, which need a different download backend
pub fn is_ftp(location: &str) -> bool {
    location
        .split_once("://")
        .map(|(scheme, _)| scheme.eq_ignore_ascii_case("ftp"))
        .unwrap_or(false)
}

/// Name of the directory a path resolves to
fn directory_name(path: &Path) -> Option<String> {
    let resolved = path.canonicalize().ok()?;
    resolved.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Classify a source location
pub fn classify(location: &str) -> Result<Source> {
    if is_remote(location) {
        let file_name = remote_file_name(location)
            .ok_or_else(|| BookbinderError::invalid_source(location, "URL has no file name"))?;
        let format = ArchiveFormat::from_name(&file_name).ok_or_else(|| {
            BookbinderError::invalid_source(
                location,
                "remote sources must be archives; directories cannot be remote",
            )
        })?;
        debug!("Classified {} as remote {:?} archive", location, format);
        return Ok(Source {
            location: location.to_string(),
            kind: SourceKind::Archive(format),
            remote: true,
            file_name,
        });
    }

    let path = Path::new(location);
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());

    if let Some(format) = file_name.as_deref().and_then(ArchiveFormat::from_name) {
        if !path.is_file() {
            return Err(BookbinderError::invalid_source(
                location,
                "archive does not exist or is not a regular file",
            ));
        }
        debug!("Classified {} as local {:?} archive", location, format);
        return Ok(Source {
            location: location.to_string(),
            kind: SourceKind::Archive(format),
            remote: false,
            file_name: file_name.unwrap_or_default(),
        });
    }

    if path.extension().is_none() && path.is_dir() {
        // ".", ".." and "/" have no file name of their own
        let file_name = file_name
            .or_else(|| directory_name(path))
            .unwrap_or_else(|| location.to_string());
        debug!("Classified {} as directory {}", location, file_name);
        return Ok(Source {
            location: location.to_string(),
            kind: SourceKind::Directory,
            remote: false,
            file_name,
        });
    }

    Err(BookbinderError::invalid_source(
        location,
        "not a recognized archive and not an existing directory",
    ))
}
