//! Decoding the merged stream to raw PCM
//!
//! mplayer writes headerless PCM and announces the output format on a
//! single diagnostic line:
//!
//! ```text
//! AO: [pcm] 44100Hz 2ch s16le (2 bytes per sample)
//! ```
//!
//! That line is the only thing parsed; anything else mplayer prints is kept
//! in the workspace's `decode.log` for troubleshooting.

use crate::error::{BookbinderError, Result};
use crate::tools::{self, Tool, Toolchain};
use crate::types::{DecodedAudio, PcmFormat};
use crate::workspace::Workspace;
use std::ffi::OsString;
use std::path::Path;
use tracing::{debug, info, warn};

/// Token opening the decoder's format line
pub const FORMAT_MARKER: &str = "AO:";

/// Decode `merged` into the workspace and detect its sample format
pub fn decode(merged: &Path, workspace: &Workspace, tools: &Toolchain) -> Result<DecodedAudio> {
    let detection_error = |reason: String| BookbinderError::FormatDetection {
        path: merged.to_path_buf(),
        reason,
    };

    let raw_path = workspace.decoded_path();
    let args = decoder_args(merged, &raw_path);

    info!("Decoding {}", merged.display());
    let output = tools::run(tools.program(Tool::Mplayer), &args)
        .map_err(|e| detection_error(format!("Failed to run {}: {}", Tool::Mplayer, e)))?;

    // Builds differ on which stream carries the format line
    let diagnostics = format!("{}\n{}", output.stdout, output.stderr);
    let log_path = workspace.decode_log_path();
    if let Err(e) = std::fs::write(&log_path, &diagnostics) {
        warn!("Could not write decoder log {}: {}", log_path.display(), e);
    }

    if !output.success() {
        return Err(detection_error(format!("{} {}", Tool::Mplayer, output.failure_reason())));
    }

    let format = detect_format(&diagnostics).map_err(detection_error)?;

    if !raw_path.is_file() {
        return Err(detection_error(format!(
            "decoder reported {} but wrote no samples to {}",
            format,
            raw_path.display()
        )));
    }

    debug!("Decoded {} as {}", merged.display(), format);
    Ok(DecodedAudio { raw_path, format })
}

/// Arguments for a headerless PCM dump of `input` to `raw`
fn decoder_args(input: &Path, raw: &Path) -> Vec<OsString> {
    // %len% quoting keeps ':' and ',' in the path out of suboption parsing
    let raw = raw.to_string_lossy();
    let ao = format!("pcm:fast:nowaveheader:file=%{}%{}", raw.len(), raw);
    vec![
        "-vc".into(),
        "null".into(),
        "-vo".into(),
        "null".into(),
        "-ao".into(),
        ao.into(),
        input.into(),
    ]
}

/// Find the marker line in decoder output and parse it
pub fn detect_format(diagnostics: &str) -> std::result::Result<PcmFormat, String> {
    let line = diagnostics
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with(FORMAT_MARKER))
        .ok_or_else(|| format!("decoder printed no '{}' format line", FORMAT_MARKER))?;

    parse_format_line(line)
        .ok_or_else(|| format!("format line '{}' does not match the expected shape", line))
}

/// Parse `AO: [driver] <rate>Hz <n>ch <fmt> (<n> bytes per sample)`
pub fn parse_format_line(line: &str) -> Option<PcmFormat> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [marker, driver, rate, channels, _sample_format, bytes, unit, "per", "sample)"] =
        tokens.as_slice()
    else {
        return None;
    };

    if *marker != FORMAT_MARKER || !(driver.starts_with('[') && driver.ends_with(']')) {
        return None;
    }
    if *unit != "bytes" && *unit != "byte" {
        return None;
    }

    let rate: u32 = rate.strip_suffix("Hz")?.parse().ok()?;
    let channels: u16 = channels.strip_suffix("ch")?.parse().ok()?;
    let bytes: u16 = bytes.strip_prefix('(')?.parse().ok()?;

    if rate == 0 || channels == 0 || bytes == 0 {
        return None;
    }

    Some(PcmFormat {
        rate,
        channels,
        bit_depth: bytes * 8,
    })
}
