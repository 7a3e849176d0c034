//! Shared text helpers for tag references and report files.
//!
//! These functions are reused across the CLI, the TUI and the service layer.

use std::path::Path;

use time::{OffsetDateTime, macros::format_description};

use crate::error::{ReportDbError, Result};
use crate::models::PATH_SEPARATOR;

/// Reads a UTF-8 text file, replacing invalid byte sequences with U+FFFD
/// instead of failing.
///
/// # Errors
///
/// Returns `ReportDbError::Io` if the file cannot be read.
pub fn read_text_lossy(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|source| ReportDbError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            log::warn!(
                "{} is not valid UTF-8, replacing undecodable bytes",
                path.display()
            );
            Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
        }
    }
}

/// Splits a tag path such as `finance/revenue` into its segments.
///
/// Surrounding whitespace is trimmed and empty segments are dropped, so
/// `a//b/` splits like `a/b`.
///
/// # Examples
///
/// ```
/// use reportdb::utils::tag_path_segments;
///
/// assert_eq!(tag_path_segments("財報/收入"), vec!["財報", "收入"]);
/// assert_eq!(tag_path_segments(" a // b /"), vec!["a", "b"]);
/// ```
pub fn tag_path_segments(path: &str) -> Vec<&str> {
    path.split(PATH_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Formats a timestamp as `YYYY-MM-DD HH:MM:SS` for display.
pub fn format_timestamp(timestamp: OffsetDateTime) -> String {
    timestamp
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .unwrap_or_else(|_| "????-??-?? ??:??:??".to_string())
}

/// Parses comma-separated tags from a string.
///
/// Splits on commas, trims whitespace from each tag, and filters out empty strings.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
