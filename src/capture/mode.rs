//! Serialization mode selection.

use std::fmt;

use crate::dom::DocumentSnapshot;

// ============================================================================
// SerializationMode
// ============================================================================

/// How the document is turned back into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SerializationMode {
    /// Well-formed XML of the whole document.
    #[default]
    StrictXml,
    /// The root element's live markup, with a synthesized doctype line.
    PlainMarkup,
}

impl SerializationMode {
    /// Picks the mode for `document`.
    ///
    /// Plain markup is chosen only when the caller allows it and the
    /// document behaves as classic HTML:
    ///
    /// - root `tagName` is exactly `HTML`
    /// - root has no `xmlns` attribute
    /// - no doctype, or a doctype named exactly `html`
    ///
    /// Everything else is serialized as XML.
    #[must_use]
    pub fn select<D>(document: &D, respect_html_is_not_xml: bool) -> Self
    where
        D: DocumentSnapshot + ?Sized,
    {
        if !respect_html_is_not_xml {
            return Self::StrictXml;
        }

        let html_root = document.root_tag_name().as_deref() == Some("HTML");
        let no_namespace = !document.root_has_attribute("xmlns");
        let html_doctype = document.doctype_name().is_none_or(|name| name == "html");

        if html_root && no_namespace && html_doctype {
            Self::PlainMarkup
        } else {
            Self::StrictXml
        }
    }
}

impl fmt::Display for SerializationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StrictXml => f.write_str("strict-xml"),
            Self::PlainMarkup => f.write_str("plain-markup"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
