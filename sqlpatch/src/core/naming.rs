//! Name derivation shared by discovery, the loader and the scaffolder.
//!
//! Patch files are named `YYYY_MM_DD_HHMMSS_<Name>.<ext>`. The patch name is the
//! basename without extension; the unit type identifier is the `<Name>` part in
//! StudlyCase.

use std::path::Path;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};

/// Number of `_`-separated tokens in the date prefix.
pub const DATE_PREFIX_TOKENS: usize = 4;

/// Derive the patch name from a path: basename with the final extension removed.
pub fn patch_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Derive the unit type identifier for a patch name.
///
/// Drops the four date-prefix tokens and StudlyCases the remainder. Names with no
/// remainder yield an empty identifier, which never matches a registration.
pub fn unit_type_name(patch_name: &str) -> String {
    let remainder: Vec<&str> = patch_name.split('_').skip(DATE_PREFIX_TOKENS).collect();
    studly(&remainder.join("_"))
}

/// Convert `snake_case`, `kebab-case` or spaced words to `StudlyCase`.
///
/// Only the first character of each word is changed; the rest is kept as written.
pub fn studly(value: &str) -> String {
    value
        .split(|ch: char| ch == '_' || ch == '-' || ch.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect()
}

/// Turn a human-readable patch title into the `<Name>` part of a file name.
///
/// Splits on anything that is not an ASCII letter or digit and StudlyCases the
/// words, so `"add users index"` becomes `AddUsersIndex`.
pub fn sanitize_patch_name(input: &str) -> Result<String> {
    let name: String = input
        .trim()
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect();
    if name.is_empty() {
        bail!("patch name must contain at least one letter or digit (got '{input}')");
    }
    Ok(name)
}

/// Render the `YYYY_MM_DD_HHMMSS` prefix for a new patch file.
pub fn date_prefix(at: DateTime<Utc>) -> String {
    at.format("%Y_%m_%d_%H%M%S").to_string()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
