//! Title inference from source names
//!
//! LibriVox-style archive names carry a title followed by noise tokens:
//! `on_liberty_64kb_mp3_librivox.zip`. Noise is peeled off the end token by
//! token, then the rest is title-cased.

use crate::types::ArchiveFormat;

/// Audio format tokens that trail archive names
const AUDIO_FORMAT_TOKENS: &[&str] = &["mp3", "ogg", "m4a", "m4b", "flac", "wav", "vbr", "cbr"];

/// Publisher tokens that trail archive names
const PUBLISHER_TOKENS: &[&str] = &["librivox"];

/// Infer a display title from a source file or directory name
pub fn infer_title(name: &str) -> String {
    let stem = ArchiveFormat::split_name(name)
        .map(|(stem, _)| stem)
        .unwrap_or(name);

    let mut tokens: Vec<&str> = stem
        .split(|c: char| c == '_' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect();

    while let Some(last) = tokens.last() {
        if is_noise_token(last) {
            tokens.pop();
        } else {
            break;
        }
    }

    if tokens.is_empty() {
        return capitalize_words(&stem.replace('_', " "));
    }

    capitalize_words(&tokens.join(" "))
}

/// Bitrate markers, format names, publisher names and bare numbers
fn is_noise_token(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    is_bitrate_marker(&lower)
        || AUDIO_FORMAT_TOKENS.contains(&lower.as_str())
        || PUBLISHER_TOKENS.contains(&lower.as_str())
        || lower.chars().all(|c| c.is_ascii_digit())
}

/// `64kb`, `128kb`, `32kbps`
fn is_bitrate_marker(lower: &str) -> bool {
    let digits = lower
        .strip_suffix("kbps")
        .or_else(|| lower.strip_suffix("kb"));
    match digits {
        Some(d) => (2..=3).contains(&d.len()) && d.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Uppercase the first letter of every word, leaving the rest untouched
pub fn capitalize_words(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
