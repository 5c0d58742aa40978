//! Document, element and node types.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// Constants
// ============================================================================

/// The HTML namespace.
pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// The SVG namespace.
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// The MathML namespace.
pub const MATHML_NAMESPACE: &str = "http://www.w3.org/1998/Math/MathML";

/// The XLink namespace, used by `xlink:href` in SVG.
pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";

/// The namespace implicitly bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

// ============================================================================
// DocumentKind
// ============================================================================

/// Whether the document was loaded as HTML or as XML.
///
/// Affects `tagName` casing: only HTML-namespace elements in HTML documents
/// report an uppercase tag name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentKind {
    /// Parsed by the HTML parser.
    #[default]
    Html,
    /// Parsed by an XML parser (XHTML, SVG, plain XML).
    Xml,
}

// ============================================================================
// Doctype
// ============================================================================

/// A document type declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Doctype {
    /// Declared name, e.g. `html` or `svg`.
    pub name: String,
    /// Public identifier (empty if absent).
    pub public_id: String,
    /// System identifier (empty if absent).
    pub system_id: String,
}

impl Doctype {
    /// Creates a doctype with only a name.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            public_id: String::new(),
            system_id: String::new(),
        }
    }

    /// The HTML5 doctype, `<!DOCTYPE html>`.
    #[inline]
    #[must_use]
    pub fn html() -> Self {
        Self::new("html")
    }

    /// Sets the public identifier.
    #[inline]
    #[must_use]
    pub fn with_public_id(mut self, public_id: impl Into<String>) -> Self {
        self.public_id = public_id.into();
        self
    }

    /// Sets the system identifier.
    #[inline]
    #[must_use]
    pub fn with_system_id(mut self, system_id: impl Into<String>) -> Self {
        self.system_id = system_id.into();
        self
    }
}

// ============================================================================
// Attribute
// ============================================================================

/// An attribute with its qualified name, e.g. `class` or `xlink:href`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Namespace URI, `None` for ordinary attributes.
    pub namespace: Option<String>,
    /// Qualified attribute name.
    pub name: String,
    /// Attribute value.
    pub value: String,
}

impl Attribute {
    /// Returns the prefix part of the qualified name.
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Returns the name without its prefix.
    #[inline]
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }
}

// ============================================================================
// Node
// ============================================================================

/// A child node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Element node.
    Element(Element),
    /// Text node.
    Text(String),
    /// Comment node.
    Comment(String),
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

// ============================================================================
// Element
// ============================================================================

/// An element and its subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    namespace: Option<String>,
    prefix: Option<String>,
    local_name: String,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
}

impl Element {
    /// Creates an element in the given namespace.
    #[must_use]
    pub fn new(namespace: Option<&str>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            prefix: None,
            local_name: local_name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Creates an element in the HTML namespace.
    #[inline]
    #[must_use]
    pub fn html(local_name: impl Into<String>) -> Self {
        Self::new(Some(HTML_NAMESPACE), local_name)
    }

    /// Creates an element in the SVG namespace.
    #[inline]
    #[must_use]
    pub fn svg(local_name: impl Into<String>) -> Self {
        Self::new(Some(SVG_NAMESPACE), local_name)
    }

    /// Sets the namespace prefix.
    #[inline]
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets an attribute, replacing any previous value.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Sets an attribute in `namespace`, e.g. `xlink:href` in the XLink
    /// namespace. The prefix of `name` is a hint; the XML serializer may
    /// pick another one if it is already taken.
    #[must_use]
    pub fn with_namespaced_attribute(
        mut self,
        namespace: &str,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.set_namespaced_attribute(Some(namespace), name, value);
        self
    }

    /// Appends a child node.
    #[inline]
    #[must_use]
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Appends a text node.
    #[inline]
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Appends a comment node.
    #[inline]
    #[must_use]
    pub fn with_comment(mut self, data: impl Into<String>) -> Self {
        self.children.push(Node::Comment(data.into()));
        self
    }

    /// Sets an attribute in place.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.set_namespaced_attribute(None, name, value);
    }

    /// Sets an attribute in `namespace` in place.
    pub fn set_namespaced_attribute(
        &mut self,
        namespace: Option<&str>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) {
        let name = name.into();
        let value = value.into();
        let namespace = namespace.map(str::to_string);
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => {
                existing.namespace = namespace;
                existing.value = value;
            }
            None => self.attributes.push(Attribute {
                namespace,
                name,
                value,
            }),
        }
    }

    /// Appends a child node in place.
    pub fn push_child(&mut self, child: impl Into<Node>) {
        self.children.push(child.into());
    }
}

// ============================================================================
// Element - Accessors
// ============================================================================

impl Element {
    /// Returns the namespace URI.
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns the namespace prefix.
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Returns the local name.
    #[inline]
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Returns `prefix:localName`, or the local name without a prefix.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.local_name),
            None => self.local_name.clone(),
        }
    }

    /// Returns `true` for elements in the HTML namespace.
    #[inline]
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.namespace() == Some(HTML_NAMESPACE)
    }

    /// Returns the attributes in document order.
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Returns an attribute value by qualified name.
    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Returns `true` if the attribute is present.
    #[inline]
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.get_attribute(name).is_some()
    }

    /// Returns the child nodes.
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }
}

// ============================================================================
// Document
// ============================================================================

/// A fully constructed document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    kind: DocumentKind,
    content_type: Option<String>,
    doctype: Option<Doctype>,
    prologue: Vec<Node>,
    root: Option<Element>,
}

impl Document {
    /// Creates an HTML document served as `text/html`.
    #[must_use]
    pub fn html(root: Element) -> Self {
        Self {
            kind: DocumentKind::Html,
            content_type: Some("text/html".to_string()),
            doctype: None,
            prologue: Vec::new(),
            root: Some(root),
        }
    }

    /// Creates an XML document served as `application/xml`.
    #[must_use]
    pub fn xml(root: Element) -> Self {
        Self {
            kind: DocumentKind::Xml,
            content_type: Some("application/xml".to_string()),
            doctype: None,
            prologue: Vec::new(),
            root: Some(root),
        }
    }

    /// Creates a document without a root element.
    #[must_use]
    pub fn empty(kind: DocumentKind) -> Self {
        Self {
            kind,
            content_type: None,
            doctype: None,
            prologue: Vec::new(),
            root: None,
        }
    }

    /// Sets the doctype.
    #[inline]
    #[must_use]
    pub fn with_doctype(mut self, doctype: Doctype) -> Self {
        self.doctype = Some(doctype);
        self
    }

    /// Sets the reported content type, parameters included.
    #[inline]
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Clears the reported content type.
    #[inline]
    #[must_use]
    pub fn without_content_type(mut self) -> Self {
        self.content_type = None;
        self
    }

    /// Appends a comment ahead of the root element.
    #[inline]
    #[must_use]
    pub fn with_prologue_comment(mut self, data: impl Into<String>) -> Self {
        self.prologue.push(Node::Comment(data.into()));
        self
    }
}

// ============================================================================
// Document - Accessors
// ============================================================================

impl Document {
    /// Returns the document kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Returns the root element.
    #[inline]
    #[must_use]
    pub fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }

    /// Returns the doctype.
    #[inline]
    #[must_use]
    pub fn doctype(&self) -> Option<&Doctype> {
        self.doctype.as_ref()
    }

    /// Returns the nodes between doctype and root element.
    #[inline]
    #[must_use]
    pub fn prologue(&self) -> &[Node] {
        &self.prologue
    }

    /// Returns the reported content type.
    #[inline]
    #[must_use]
    pub fn reported_content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns an element's DOM `tagName` within this document.
    ///
    /// HTML-namespace elements of HTML documents are uppercased.
    #[must_use]
    pub fn tag_name(&self, element: &Element) -> String {
        let name = element.qualified_name();
        if self.kind == DocumentKind::Html && element.is_html() {
            name.to_ascii_uppercase()
        } else {
            name
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Html => f.write_str("html"),
            Self::Xml => f.write_str("xml"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_name_uppercases_html_in_html_document() {
        let doc = Document::html(Element::html("html"));
        let root = doc.root().expect("root");
        assert_eq!(doc.tag_name(root), "HTML");
    }

    #[test]
    fn test_tag_name_keeps_case_in_xml_document() {
        let doc = Document::xml(Element::html("html"));
        let root = doc.root().expect("root");
        assert_eq!(doc.tag_name(root), "html");
    }

    #[test]
    fn test_tag_name_keeps_case_for_foreign_elements() {
        let doc = Document::html(Element::svg("svg"));
        let root = doc.root().expect("root");
        assert_eq!(doc.tag_name(root), "svg");
    }

    #[test]
    fn test_qualified_name_with_prefix() {
        let element = Element::new(Some("urn:x"), "item").with_prefix("x");
        assert_eq!(element.qualified_name(), "x:item");
    }

    #[test]
    fn test_set_attribute_replaces() {
        let element = Element::html("p")
            .with_attribute("class", "a")
            .with_attribute("class", "b");
        assert_eq!(element.attributes().len(), 1);
        assert_eq!(element.get_attribute("class"), Some("b"));
        assert!(!element.has_attribute("id"));
    }

    #[test]
    fn test_namespaced_attribute_parts() {
        let element =
            Element::svg("use").with_namespaced_attribute(XLINK_NAMESPACE, "xlink:href", "#a");
        let attribute = &element.attributes()[0];
        assert_eq!(attribute.namespace.as_deref(), Some(XLINK_NAMESPACE));
        assert_eq!(attribute.prefix(), Some("xlink"));
        assert_eq!(attribute.local_name(), "href");
        assert_eq!(element.get_attribute("xlink:href"), Some("#a"));

        let plain = Element::html("p").with_attribute("class", "a");
        assert_eq!(plain.attributes()[0].prefix(), None);
        assert_eq!(plain.attributes()[0].local_name(), "class");
    }

    #[test]
    fn test_document_defaults() {
        let doc = Document::html(Element::html("html"));
        assert_eq!(doc.kind(), DocumentKind::Html);
        assert_eq!(doc.reported_content_type(), Some("text/html"));
        assert!(doc.doctype().is_none());

        let empty = Document::empty(DocumentKind::Xml);
        assert!(empty.root().is_none());
        assert!(empty.reported_content_type().is_none());
    }
}
