//! Download filename derivation.
//!
//! `https://example.com/report.svg` with suffix `-result-utc()` becomes
//! `report-result-20240131235959.svg`.

// ============================================================================
// Imports
// ============================================================================

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

// ============================================================================
// Constants
// ============================================================================

/// Filename used when the URL has no usable path segment.
pub const UNTITLED: &str = "untitled";

/// Last path segment, ignoring a trailing slash, query and fragment.
static LAST_SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^#?]*?([^/#?]+)/?(?:[#?].*)?$").expect("Is a valid regex")
});

/// `utc()` placeholder, case-insensitive, blanks allowed inside.
static UTC_PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)utc\s*\(\s*\)").expect("Is a valid regex"));

/// Name and extension (including the dot, possibly empty).
static EXTENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^(.*?)(\.[^.]*|)$").expect("Is a valid regex"));

// ============================================================================
// Public Functions
// ============================================================================

/// Derives the download filename for `url`.
///
/// The last path segment is percent-decoded; a segment with malformed
/// escapes is used verbatim. A non-empty `suffix` is expanded with
/// [`expand_suffix`] and inserted before the extension.
#[must_use]
pub fn derive_filename(url: &str, suffix: &str, now: DateTime<Utc>) -> String {
    let filename = last_segment(url);

    if suffix.is_empty() {
        return filename;
    }

    let suffix = expand_suffix(suffix, now);
    match EXTENSION_RE.captures(&filename) {
        Some(parts) => format!("{}{suffix}{}", &parts[1], &parts[2]),
        None => format!("{filename}{suffix}"),
    }
}

/// Replaces every `utc()` in `suffix` with a `YYYYMMDDhhmmss` timestamp.
#[must_use]
pub fn expand_suffix(suffix: &str, now: DateTime<Utc>) -> String {
    let timestamp = utc_timestamp(now);
    UTC_PLACEHOLDER_RE
        .replace_all(suffix, timestamp.as_str())
        .into_owned()
}

/// Formats `now` as 14 digits, `YYYYMMDDhhmmss`.
#[must_use]
pub fn utc_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

// ============================================================================
// Internal Functions
// ============================================================================

fn last_segment(url: &str) -> String {
    let Some(segment) = LAST_SEGMENT_RE
        .captures(url)
        .and_then(|captures| captures.get(1))
    else {
        return UNTITLED.to_string();
    };

    let raw = segment.as_str();
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 5)
            .single()
            .expect("valid date")
    }

    #[test]
    fn test_report_svg_scenario() {
        let name = derive_filename("https://example.com/report.svg", "-result-utc()", fixed_now());
        assert_eq!(name, "report-result-20240131235905.svg");
    }

    #[test]
    fn test_timestamp_is_fourteen_digits() {
        let stamp = utc_timestamp(Utc::now());
        assert_eq!(stamp.len(), 14);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_placeholder_variants() {
        assert_eq!(
            expand_suffix("-UTC ( )-Utc()", fixed_now()),
            "-20240131235905-20240131235905"
        );
        assert_eq!(expand_suffix("-result", fixed_now()), "-result");
    }

    #[test]
    fn test_empty_suffix_keeps_name() {
        assert_eq!(
            derive_filename("https://example.com/a/b.html?x=1#top", "", fixed_now()),
            "b.html"
        );
    }

    #[test]
    fn test_trailing_slash_and_host_only() {
        assert_eq!(
            derive_filename("https://example.com/docs/", "", fixed_now()),
            "docs"
        );
        assert_eq!(
            derive_filename("https://example.com/", "-x", fixed_now()),
            "example-x.com"
        );
    }

    #[test]
    fn test_percent_decoding() {
        assert_eq!(
            derive_filename("file:///tmp/my%20page.xhtml", "", fixed_now()),
            "my page.xhtml"
        );
        assert_eq!(
            derive_filename("https://example.com/bad%E0%A4%A.html", "", fixed_now()),
            "bad%E0%A4%A.html"
        );
    }

    #[test]
    fn test_suffix_goes_before_last_extension() {
        assert_eq!(
            derive_filename("https://example.com/archive.tar.gz", "-r", fixed_now()),
            "archive.tar-r.gz"
        );
        assert_eq!(
            derive_filename("https://example.com/README", "-r", fixed_now()),
            "README-r"
        );
    }

    #[test]
    fn test_untitled_without_segment() {
        assert_eq!(derive_filename("", "", fixed_now()), UNTITLED);
        assert_eq!(derive_filename("?q=1", "", fixed_now()), UNTITLED);
    }
}
