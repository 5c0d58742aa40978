//! Live document model and the snapshot view the capture component reads.
//!
//! The capture component never walks the tree itself. It asks a
//! [`DocumentSnapshot`] the handful of questions the mode decision needs,
//! then lets the snapshot render itself through one of two accessors:
//!
//! | Accessor | Browser equivalent |
//! |----------|--------------------|
//! | [`DocumentSnapshot::root_outer_markup`] | `document.documentElement.outerHTML` |
//! | [`DocumentSnapshot::serialize_to_xml`] | `new XMLSerializer().serializeToString(document)` |
//!
//! [`Document`] is the in-memory implementation shipped with the crate.

// ============================================================================
// Submodules
// ============================================================================

/// HTML fragment serialization.
pub mod html;

/// Document, element and node types.
pub mod node;

/// Well-formed XML serialization.
pub mod xml;

// ============================================================================
// Re-exports
// ============================================================================

pub use node::{
    Attribute, Doctype, Document, DocumentKind, Element, HTML_NAMESPACE, MATHML_NAMESPACE, Node,
    SVG_NAMESPACE, XLINK_NAMESPACE, XML_NAMESPACE,
};

use crate::error::{Error, Result};

// ============================================================================
// DocumentSnapshot
// ============================================================================

/// Read-only view of a live document for the duration of one capture.
pub trait DocumentSnapshot: Send + Sync {
    /// DOM `tagName` of the root element, `None` without a root.
    fn root_tag_name(&self) -> Option<String>;

    /// Returns `true` if the root element carries the named attribute.
    fn root_has_attribute(&self, name: &str) -> bool;

    /// Name of the doctype, `None` without a doctype.
    fn doctype_name(&self) -> Option<&str>;

    /// Content type the document was served with, parameters included.
    fn content_type(&self) -> Option<&str>;

    /// The root element's markup, start tag through end tag.
    ///
    /// # Errors
    ///
    /// Fails if there is no root element.
    fn root_outer_markup(&self) -> Result<String>;

    /// The whole document as well-formed XML.
    ///
    /// # Errors
    ///
    /// Fails if the tree cannot be represented as XML.
    fn serialize_to_xml(&self) -> Result<String>;
}

impl DocumentSnapshot for Document {
    fn root_tag_name(&self) -> Option<String> {
        self.root().map(|root| self.tag_name(root))
    }

    fn root_has_attribute(&self, name: &str) -> bool {
        self.root().is_some_and(|root| root.has_attribute(name))
    }

    fn doctype_name(&self) -> Option<&str> {
        self.doctype().map(|doctype| doctype.name.as_str())
    }

    fn content_type(&self) -> Option<&str> {
        self.reported_content_type()
    }

    fn root_outer_markup(&self) -> Result<String> {
        self.root()
            .map(html::outer_html)
            .ok_or_else(|| Error::serialization("document has no root element"))
    }

    fn serialize_to_xml(&self) -> Result<String> {
        xml::serialize_document(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_of_html_document() {
        let doc = Document::html(Element::html("html").with_attribute("lang", "en"))
            .with_doctype(Doctype::html())
            .with_content_type("text/html; charset=utf-8");

        assert_eq!(doc.root_tag_name().as_deref(), Some("HTML"));
        assert!(doc.root_has_attribute("lang"));
        assert!(!doc.root_has_attribute("xmlns"));
        assert_eq!(doc.doctype_name(), Some("html"));
        assert_eq!(
            DocumentSnapshot::content_type(&doc),
            Some("text/html; charset=utf-8")
        );
        assert_eq!(
            doc.root_outer_markup().expect("markup"),
            "<html lang=\"en\"></html>"
        );
    }

    #[test]
    fn test_snapshot_without_root() {
        let doc = Document::empty(DocumentKind::Html);
        assert!(doc.root_tag_name().is_none());
        assert!(!doc.root_has_attribute("xmlns"));
        assert!(doc.root_outer_markup().is_err());
    }
}
