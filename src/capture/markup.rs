//! Turning a document snapshot into text in the selected mode.

use crate::dom::DocumentSnapshot;
use crate::error::Result;

use super::mode::SerializationMode;

// ============================================================================
// LineEnding
// ============================================================================

/// A line-break convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
    /// `\r`
    Cr,
}

impl LineEnding {
    /// Detects the convention from the first line break in `text`.
    ///
    /// A `\r` directly followed by `\n` counts as one `\r\n` break. Text
    /// without any break yields [`LineEnding::Lf`].
    #[must_use]
    pub fn detect(text: &str) -> Self {
        let bytes = text.as_bytes();
        match bytes.iter().position(|&b| b == b'\r' || b == b'\n') {
            Some(i) if bytes[i] == b'\r' && bytes.get(i + 1) == Some(&b'\n') => Self::CrLf,
            Some(i) if bytes[i] == b'\r' => Self::Cr,
            _ => Self::Lf,
        }
    }

    /// Returns the break sequence.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Cr => "\r",
        }
    }
}

// ============================================================================
// Public Functions
// ============================================================================

/// Serializes `document` in `mode`.
///
/// # Errors
///
/// Propagates the snapshot's accessor failure.
pub fn serialize<D>(document: &D, mode: SerializationMode) -> Result<String>
where
    D: DocumentSnapshot + ?Sized,
{
    match mode {
        SerializationMode::StrictXml => document.serialize_to_xml(),
        SerializationMode::PlainMarkup => plain_markup(document),
    }
}

/// Root markup as-is, preceded by `<!DOCTYPE name>` when the document has one.
fn plain_markup<D>(document: &D) -> Result<String>
where
    D: DocumentSnapshot + ?Sized,
{
    let root = document.root_outer_markup()?;

    let Some(name) = document.doctype_name() else {
        return Ok(root);
    };

    let line_ending = LineEnding::detect(&root);
    Ok(format!("<!DOCTYPE {name}>{}{root}", line_ending.as_str()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dom::{Doctype, Document, Element};

    fn html_with_text(text: &str) -> Document {
        Document::html(
            Element::html("html")
                .with_child(Element::html("head"))
                .with_text(text)
                .with_child(Element::html("body")),
        )
    }

    #[test]
    fn test_detect_line_endings() {
        assert_eq!(LineEnding::detect("a\r\nb\nc"), LineEnding::CrLf);
        assert_eq!(LineEnding::detect("a\nb\r\nc"), LineEnding::Lf);
        assert_eq!(LineEnding::detect("a\rb\r\n"), LineEnding::Cr);
        assert_eq!(LineEnding::detect("trailing\r"), LineEnding::Cr);
        assert_eq!(LineEnding::detect("none"), LineEnding::Lf);
        assert_eq!(LineEnding::detect(""), LineEnding::Lf);
    }

    #[test]
    fn test_doctype_line_follows_crlf() {
        let doc = html_with_text("\r\n").with_doctype(Doctype::html());
        let text = serialize(&doc, SerializationMode::PlainMarkup).expect("serialize");
        assert_eq!(
            text,
            "<!DOCTYPE html>\r\n<html><head></head>\r\n<body></body></html>"
        );
    }

    #[test]
    fn test_doctype_line_defaults_to_lf() {
        let doc = Document::html(Element::html("html")).with_doctype(Doctype::html());
        let text = serialize(&doc, SerializationMode::PlainMarkup).expect("serialize");
        assert_eq!(text, "<!DOCTYPE html>\n<html></html>");
    }

    #[test]
    fn test_no_doctype_no_line() {
        let doc = html_with_text("\r\n");
        let text = serialize(&doc, SerializationMode::PlainMarkup).expect("serialize");
        assert_eq!(text, "<html><head></head>\r\n<body></body></html>");
        assert!(!text.contains("DOCTYPE"));
    }

    #[test]
    fn test_strict_mode_uses_xml_serializer() {
        let doc = Document::html(Element::html("html").with_child(Element::html("br")));
        let text = serialize(&doc, SerializationMode::StrictXml).expect("serialize");
        assert!(text.contains("<br/>"));
        assert!(text.contains("xmlns="));
    }

    #[test]
    fn test_plain_markup_without_root_fails() {
        let doc = Document::empty(crate::dom::DocumentKind::Html);
        assert!(serialize(&doc, SerializationMode::PlainMarkup).is_err());
    }
}
