//! MIME type resolution for the captured blob.

/// MIME type used when the document reports none.
pub const DEFAULT_MIME_TYPE: &str = "text/plain";

/// Strips parameters from a content type, falling back to `text/plain`.
///
/// `"text/html; charset=utf-8"` resolves to `"text/html"`; an absent, empty
/// or blank content type resolves to [`DEFAULT_MIME_TYPE`].
#[must_use]
pub fn resolve_mime_type(content_type: Option<&str>) -> String {
    content_type
        .and_then(|value| value.split(';').next())
        .map(str::trim)
        .filter(|essence| !essence.is_empty())
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string()
}
