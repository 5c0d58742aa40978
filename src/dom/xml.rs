//! XML serialization of a whole document (the `XMLSerializer` accessor).
//!
//! Output is always namespace-well-formed: default-namespace declarations are
//! synthesized where an element's namespace differs from its parent's,
//! `xmlns:<prefix>` declarations are added for prefixes not yet in scope, and
//! namespaced attributes without a usable prefix get a generated one (`ns1`,
//! `ns2`, ...). Names or comments that cannot be written as XML fail the
//! serialization instead of producing broken markup.

// ============================================================================
// Imports
// ============================================================================

use quick_xml::Writer;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};

use super::node::{Attribute, Doctype, Document, Element, Node, XML_NAMESPACE};

// ============================================================================
// Public Functions
// ============================================================================

/// Serializes the document, doctype and prologue included.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if a name or comment cannot be
/// represented in well-formed XML.
pub fn serialize_document(document: &Document) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    let scope = Scope::root();

    if let Some(doctype) = document.doctype() {
        let content = doctype_content(doctype);
        write(&mut writer, Event::DocType(BytesText::from_escaped(content)))?;
    }

    for node in document.prologue() {
        write_node(&mut writer, node, &scope)?;
    }

    if let Some(root) = document.root() {
        write_element(&mut writer, root, &scope)?;
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::serialization(format!("serializer produced invalid UTF-8: {e}")))
}

// ============================================================================
// Scope
// ============================================================================

/// Namespace bindings in effect for an element's children.
#[derive(Debug, Clone)]
struct Scope {
    default_namespace: Option<String>,
    prefixes: FxHashMap<String, String>,
}

impl Scope {
    fn root() -> Self {
        let mut prefixes = FxHashMap::default();
        prefixes.insert("xml".to_string(), XML_NAMESPACE.to_string());
        Self {
            default_namespace: None,
            prefixes,
        }
    }

    fn is_bound(&self, prefix: &str, namespace: &str) -> bool {
        self.prefixes.get(prefix).is_some_and(|bound| bound == namespace)
    }
}

// ============================================================================
// StartTag
// ============================================================================

/// Prefix bookkeeping while one start tag is assembled.
///
/// Prefixes in `fixed` are declared on this tag or used by its name and
/// cannot be rebound here.
struct StartTag {
    scope: Scope,
    fixed: FxHashSet<String>,
    declarations: Vec<(String, String)>,
}

impl StartTag {
    fn new(parent: &Scope) -> Self {
        Self {
            scope: parent.clone(),
            fixed: ["xml", "xmlns"].into_iter().map(str::to_string).collect(),
            declarations: Vec::new(),
        }
    }

    /// Returns a prefix bound to `namespace`, declaring one if needed.
    fn bind(&mut self, preferred: Option<&str>, namespace: &str) -> String {
        if let Some(prefix) = preferred {
            if self.scope.is_bound(prefix, namespace) {
                return prefix.to_string();
            }
            if !self.fixed.contains(prefix) {
                return self.declare(prefix.to_string(), namespace);
            }
        }

        let existing = self
            .scope
            .prefixes
            .iter()
            .filter(|(_, bound)| bound.as_str() == namespace)
            .map(|(prefix, _)| prefix)
            .min();
        if let Some(prefix) = existing {
            return prefix.clone();
        }

        let generated = (1..)
            .map(|index| format!("ns{index}"))
            .find(|candidate| !self.scope.prefixes.contains_key(candidate))
            .unwrap_or_default();
        self.declare(generated, namespace)
    }

    fn declare(&mut self, prefix: String, namespace: &str) -> String {
        self.scope
            .prefixes
            .insert(prefix.clone(), namespace.to_string());
        self.fixed.insert(prefix.clone());
        self.declarations
            .push((format!("xmlns:{prefix}"), namespace.to_string()));
        prefix
    }

    /// Records the declarations written literally on the element.
    fn read_declarations(&mut self, element: &Element) {
        for attribute in element.attributes() {
            if attribute.name == "xmlns" {
                self.scope.default_namespace =
                    Some(attribute.value.clone()).filter(|ns| !ns.is_empty());
            } else if let Some(prefix) = attribute.name.strip_prefix("xmlns:") {
                self.scope
                    .prefixes
                    .insert(prefix.to_string(), attribute.value.clone());
                self.fixed.insert(prefix.to_string());
            }
        }
    }

    fn element_name(&mut self, element: &Element) -> Result<String> {
        let namespace = element.namespace().filter(|ns| !ns.is_empty());

        match (element.prefix(), namespace) {
            (Some(prefix), Some(namespace)) => {
                let prefix = self.bind(Some(prefix), namespace);
                self.fixed.insert(prefix.clone());
                Ok(format!("{prefix}:{}", element.local_name()))
            }
            (Some(prefix), None) => Err(Error::serialization(format!(
                "element {:?} has prefix {prefix:?} but no namespace",
                element.local_name()
            ))),
            (None, namespace) => {
                if !element.has_attribute("xmlns")
                    && self.scope.default_namespace.as_deref() != namespace
                {
                    self.declarations
                        .push(("xmlns".to_string(), namespace.unwrap_or_default().to_string()));
                    self.scope.default_namespace = namespace.map(str::to_string);
                }
                Ok(element.local_name().to_string())
            }
        }
    }

    fn attribute_name(&mut self, attribute: &Attribute) -> String {
        let is_declaration = attribute.name == "xmlns" || attribute.name.starts_with("xmlns:");
        match attribute.namespace.as_deref().filter(|ns| !ns.is_empty()) {
            Some(namespace) if !is_declaration => {
                let prefix = self.bind(attribute.prefix(), namespace);
                format!("{prefix}:{}", attribute.local_name())
            }
            _ => attribute.name.clone(),
        }
    }

    /// Fails if `name` is not a valid qualified name in this scope.
    fn check_qualified_name(&self, name: &str) -> Result<()> {
        check_name(name)?;
        let Some((prefix, local)) = name.split_once(':') else {
            return Ok(());
        };
        if prefix.is_empty() || local.is_empty() || local.contains(':') {
            return Err(Error::serialization(format!(
                "{name:?} is not a valid qualified name"
            )));
        }
        if prefix != "xmlns" && !self.scope.prefixes.contains_key(prefix) {
            return Err(Error::serialization(format!(
                "prefix {prefix:?} of {name:?} is not bound to a namespace"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Internal Functions
// ============================================================================

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::serialization(e.to_string()))
}

fn doctype_content(doctype: &Doctype) -> String {
    let mut content = doctype.name.clone();
    if !doctype.public_id.is_empty() {
        content.push_str(&format!(" PUBLIC \"{}\"", doctype.public_id));
    } else if !doctype.system_id.is_empty() {
        content.push_str(" SYSTEM");
    }
    if !doctype.system_id.is_empty() {
        content.push_str(&format!(" \"{}\"", doctype.system_id));
    }
    content
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node, scope: &Scope) -> Result<()> {
    match node {
        Node::Element(element) => write_element(writer, element, scope),
        Node::Text(text) => write(
            writer,
            Event::Text(BytesText::from_escaped(partial_escape(text.as_str()))),
        ),
        Node::Comment(data) => {
            if data.contains("--") || data.ends_with('-') {
                return Err(Error::serialization(format!(
                    "comment cannot be serialized as XML: {data:?}"
                )));
            }
            write(writer, Event::Comment(BytesText::from_escaped(data.as_str())))
        }
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element, parent: &Scope) -> Result<()> {
    let mut tag = StartTag::new(parent);
    tag.read_declarations(element);

    let name = tag.element_name(element)?;
    let attributes: Vec<(String, &str)> = element
        .attributes()
        .iter()
        .map(|attribute| (tag.attribute_name(attribute), attribute.value.as_str()))
        .collect();

    tag.check_qualified_name(&name)?;
    let mut start = BytesStart::new(name.as_str());
    for (declaration, namespace) in &tag.declarations {
        start.push_attribute((declaration.as_str(), namespace.as_str()));
    }
    for (attribute, value) in &attributes {
        tag.check_qualified_name(attribute)?;
        start.push_attribute((attribute.as_str(), *value));
    }

    if element.children().is_empty() {
        return write(writer, Event::Empty(start));
    }

    write(writer, Event::Start(start))?;
    for child in element.children() {
        write_node(writer, child, &tag.scope)?;
    }
    write(writer, Event::End(BytesEnd::new(name.as_str())))
}

/// Checks a qualified name against the XML `Name` production.
fn check_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            is_name_start(first) && chars.all(|c| is_name_start(c) || is_name_char(c))
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::serialization(format!(
            "{name:?} is not a valid XML name"
        )))
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == ':' || (!c.is_ascii() && !c.is_whitespace())
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_digit() || c == '-' || c == '.' || c == '\u{b7}'
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use quick_xml::name::ResolveResult;
    use quick_xml::{NsReader, Reader};

    use crate::dom::node::{HTML_NAMESPACE, SVG_NAMESPACE, XLINK_NAMESPACE};

    fn minimal_html() -> Document {
        Document::html(
            Element::html("html")
                .with_child(Element::html("head"))
                .with_child(Element::html("body").with_text("x")),
        )
    }

    /// Flattens a parsed document into open/close/text markers.
    fn parse_events(xml: &str) -> Vec<String> {
        let mut reader = Reader::from_str(xml);
        let mut events = Vec::new();
        loop {
            match reader.read_event().expect("well-formed XML") {
                Event::Start(e) => {
                    events.push(format!("<{}", String::from_utf8_lossy(e.name().as_ref())));
                }
                Event::Empty(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    events.push(format!("<{name}"));
                    events.push(format!("</{name}"));
                }
                Event::End(e) => {
                    events.push(format!("</{}", String::from_utf8_lossy(e.name().as_ref())));
                }
                Event::Text(t) => {
                    events.push(t.unescape().expect("text").into_owned());
                }
                Event::Eof => break,
                _ => {}
            }
        }
        events
    }

    /// Re-parses with namespace resolution and returns every element and
    /// attribute as `(namespace, local name)`, or the unknown prefixes.
    fn resolve_names(xml: &str) -> std::result::Result<Vec<(String, String)>, Vec<String>> {
        let mut reader = NsReader::from_str(xml);
        let mut names = Vec::new();
        let mut unknown = Vec::new();

        let mut record = |resolved: ResolveResult<'_>, local: &[u8]| match resolved {
            ResolveResult::Bound(ns) => names.push((
                String::from_utf8_lossy(ns.as_ref()).into_owned(),
                String::from_utf8_lossy(local).into_owned(),
            )),
            ResolveResult::Unbound => {
                names.push((String::new(), String::from_utf8_lossy(local).into_owned()));
            }
            ResolveResult::Unknown(prefix) => {
                unknown.push(String::from_utf8_lossy(&prefix).into_owned());
            }
        };

        loop {
            let (resolved, event) = reader.read_resolved_event().expect("well-formed XML");
            let start = match event {
                Event::Start(start) | Event::Empty(start) => start,
                Event::Eof => break,
                _ => continue,
            };
            record(resolved, start.local_name().as_ref());
            for attribute in start.attributes() {
                let attribute = attribute.expect("attribute");
                if attribute.key.as_namespace_binding().is_some() {
                    continue;
                }
                let (resolved, local) = reader.resolve_attribute(attribute.key);
                record(resolved, local.as_ref());
            }
        }

        if unknown.is_empty() {
            Ok(names)
        } else {
            Err(unknown)
        }
    }

    fn bound(namespace: &str, local: &str) -> (String, String) {
        (namespace.to_string(), local.to_string())
    }

    #[test]
    fn test_minimal_document_round_trips() {
        let xml = serialize_document(&minimal_html()).expect("serialize");
        assert_eq!(
            parse_events(&xml),
            vec!["<html", "<head", "</head", "<body", "x", "</body", "</html"]
        );
    }

    #[test]
    fn test_root_gets_namespace_declaration() {
        let xml = serialize_document(&minimal_html()).expect("serialize");
        assert!(xml.starts_with(&format!("<html xmlns=\"{HTML_NAMESPACE}\">")));
        assert_eq!(xml.matches("xmlns").count(), 1);
    }

    #[test]
    fn test_foreign_subtree_redeclares_namespace() {
        let doc = Document::html(
            Element::html("html").with_child(
                Element::html("body").with_child(Element::svg("svg").with_child(Element::svg("g"))),
            ),
        );
        let xml = serialize_document(&doc).expect("serialize");
        assert!(xml.contains(&format!("<svg xmlns=\"{SVG_NAMESPACE}\"><g/></svg>")));
    }

    #[test]
    fn test_explicit_xmlns_is_not_duplicated() {
        let doc = Document::xml(Element::html("html").with_attribute("xmlns", HTML_NAMESPACE));
        let xml = serialize_document(&doc).expect("serialize");
        assert_eq!(xml.matches("xmlns").count(), 1);
    }

    #[test]
    fn test_prefixed_names_in_inline_svg_are_declared() {
        let doc = Document::html(
            Element::html("html").with_child(
                Element::html("body").with_child(
                    Element::svg("svg")
                        .with_child(Element::svg("use").with_namespaced_attribute(
                            XLINK_NAMESPACE,
                            "xlink:href",
                            "#a",
                        ))
                        .with_child(Element::new(Some("urn:x"), "item").with_prefix("x")),
                ),
            ),
        );
        let xml = serialize_document(&doc).expect("serialize");

        let names = resolve_names(&xml).expect("every prefix bound");
        assert!(names.contains(&bound(XLINK_NAMESPACE, "href")));
        assert!(names.contains(&bound("urn:x", "item")));
        assert!(xml.contains(&format!(
            "<use xmlns:xlink=\"{XLINK_NAMESPACE}\" xlink:href=\"#a\"/>"
        )));
    }

    #[test]
    fn test_bound_prefix_is_not_redeclared() {
        let doc = Document::xml(
            Element::svg("svg")
                .with_attribute("xmlns:xlink", XLINK_NAMESPACE)
                .with_child(Element::svg("use").with_namespaced_attribute(
                    XLINK_NAMESPACE,
                    "xlink:href",
                    "#a",
                ))
                .with_child(Element::svg("image").with_namespaced_attribute(
                    XLINK_NAMESPACE,
                    "xlink:href",
                    "b.png",
                )),
        );
        let xml = serialize_document(&doc).expect("serialize");

        assert_eq!(xml.matches("xmlns:xlink").count(), 1);
        assert!(resolve_names(&xml).is_ok());
    }

    #[test]
    fn test_unprefixed_namespaced_attribute_gets_generated_prefix() {
        let doc = Document::xml(
            Element::new(Some("urn:root"), "root")
                .with_namespaced_attribute("urn:a", "flag", "1")
                .with_namespaced_attribute("urn:b", "flag", "2"),
        );
        let xml = serialize_document(&doc).expect("serialize");

        assert!(xml.contains("xmlns:ns1=\"urn:a\""));
        assert!(xml.contains("xmlns:ns2=\"urn:b\""));
        let names = resolve_names(&xml).expect("every prefix bound");
        assert!(names.contains(&bound("urn:a", "flag")));
        assert!(names.contains(&bound("urn:b", "flag")));
    }

    #[test]
    fn test_conflicting_prefix_is_renamed() {
        let doc = Document::xml(
            Element::new(Some("urn:one"), "item")
                .with_prefix("p")
                .with_namespaced_attribute("urn:two", "p:flag", "1"),
        );
        let xml = serialize_document(&doc).expect("serialize");

        let names = resolve_names(&xml).expect("every prefix bound");
        assert!(names.contains(&bound("urn:one", "item")));
        assert!(names.contains(&bound("urn:two", "flag")));
    }

    #[test]
    fn test_xml_prefix_is_implicit() {
        let doc = Document::xml(
            Element::new(None, "p")
                .with_attribute("xml:lang", "en")
                .with_namespaced_attribute(XML_NAMESPACE, "xml:space", "preserve"),
        );
        let xml = serialize_document(&doc).expect("serialize");
        assert_eq!(xml, "<p xml:lang=\"en\" xml:space=\"preserve\"/>");
    }

    #[test]
    fn test_unbound_prefix_without_namespace_fails() {
        let doc = Document::html(Element::html("html").with_attribute("fb:like", "1"));
        assert!(serialize_document(&doc).is_err());

        let doc = Document::xml(Element::new(None, "item").with_prefix("x"));
        assert!(serialize_document(&doc).is_err());
    }

    #[test]
    fn test_doctype_and_prologue() {
        let doc = Document::xml(Element::svg("svg"))
            .with_doctype(
                Doctype::new("svg")
                    .with_public_id("-//W3C//DTD SVG 1.1//EN")
                    .with_system_id("http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd"),
            )
            .with_prologue_comment(" generated ");
        let xml = serialize_document(&doc).expect("serialize");
        assert!(xml.starts_with(
            "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">"
        ));
        assert!(xml.contains("<!-- generated -->"));
    }

    #[test]
    fn test_text_escaping() {
        let doc = Document::xml(Element::new(None, "p").with_text("a < b & c"));
        let xml = serialize_document(&doc).expect("serialize");
        assert_eq!(xml, "<p>a &lt; b &amp; c</p>");
    }

    #[test]
    fn test_invalid_name_fails() {
        let doc = Document::html(Element::html("html").with_attribute("1bad", "x"));
        let err = serialize_document(&doc).unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn test_double_hyphen_comment_fails() {
        let doc = Document::html(Element::html("html").with_comment("a -- b"));
        assert!(serialize_document(&doc).is_err());
    }

    #[test]
    fn test_empty_document() {
        let doc = Document::empty(crate::dom::DocumentKind::Xml);
        assert_eq!(serialize_document(&doc).expect("serialize"), "");
    }
}
