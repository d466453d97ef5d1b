//! Filesystem-safe naming: component sanitization, extension labels, and
//! collision-free output paths.

use std::path::{Path, PathBuf};

/// Characters never allowed in an output path component.
const ILLEGAL_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Longest sanitized component, counted in characters.
const MAX_COMPONENT_CHARS: usize = 200;

/// Placeholder when sanitization leaves nothing behind.
const UNNAMED: &str = "unnamed";

/// Bucket for files without an extension when classifying by extension.
const NO_EXTENSION_LABEL: &str = "other";

/// Sanitize a single path component (a folder or file name).
///
/// Illegal characters become `_`, leading/trailing whitespace and dots are
/// trimmed, and the result is capped at 200 characters. A name that
/// sanitizes to nothing becomes `unnamed`.
pub fn sanitize_component(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if ILLEGAL_CHARS.contains(&c) { '_' } else { c })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| c.is_whitespace() || c == '.');
    let truncated: String = trimmed.chars().take(MAX_COMPONENT_CHARS).collect();

    if truncated.is_empty() {
        UNNAMED.to_string()
    } else {
        truncated
    }
}

/// Classification label for a filename, derived from its extension.
///
/// The extension is lowercased; names with no extension fall into the fixed
/// `other` bucket.
pub fn extension_label(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_lowercase())
        .unwrap_or_else(|| NO_EXTENSION_LABEL.to_string())
}

/// Return a collision-free path for `filename` inside `dir`.
///
/// If the name is taken, probes `name_1.ext`, `name_2.ext`, and so on until
/// a free path is found. The pipeline is the only writer of the output tree,
/// so exists-then-create is not racy here.
pub fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = split_name(filename);
    let mut counter = 1u64;
    loop {
        let next = if ext.is_empty() {
            format!("{stem}_{counter}")
        } else {
            format!("{stem}_{counter}.{ext}")
        };
        let candidate = dir.join(next);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Split a filename into stem and extension (without the dot).
///
/// A leading dot does not start an extension, so `.config` has no extension.
fn split_name(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos + 1..]),
        _ => (filename, ""),
    }
}
