//! HTML fragment serialization (the `outerHTML` accessor).

use super::node::{Element, Node};

// ============================================================================
// Constants
// ============================================================================

/// HTML elements serialized without children or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// HTML elements whose text children are written unescaped.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

// ============================================================================
// Public Functions
// ============================================================================

/// Serializes an element and its subtree the way `outerHTML` does.
#[must_use]
pub fn outer_html(element: &Element) -> String {
    let mut out = String::new();
    write_element(&mut out, element);
    out
}

// ============================================================================
// Internal Functions
// ============================================================================

fn write_element(out: &mut String, element: &Element) {
    let name = element.qualified_name();

    out.push('<');
    out.push_str(&name);
    for attribute in element.attributes() {
        out.push(' ');
        out.push_str(&attribute.name);
        out.push_str("=\"");
        escape_into(out, &attribute.value, true);
        out.push('"');
    }
    out.push('>');

    if element.is_html() && VOID_ELEMENTS.contains(&element.local_name()) {
        return;
    }

    let raw_text = element.is_html() && RAW_TEXT_ELEMENTS.contains(&element.local_name());
    for child in element.children() {
        match child {
            Node::Element(child) => write_element(out, child),
            Node::Text(text) if raw_text => out.push_str(text),
            Node::Text(text) => escape_into(out, text, false),
            Node::Comment(data) => {
                out.push_str("<!--");
                out.push_str(data);
                out.push_str("-->");
            }
        }
    }

    out.push_str("</");
    out.push_str(&name);
    out.push('>');
}

fn escape_into(out: &mut String, text: &str, attribute_mode: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute_mode => out.push_str("&quot;"),
            '<' if !attribute_mode => out.push_str("&lt;"),
            '>' if !attribute_mode => out.push_str("&gt;"),
            c => out.push(c),
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
    fn test_nested_elements() {
        let html = Element::html("html")
            .with_child(Element::html("head"))
            .with_child(Element::html("body").with_text("x"));
        assert_eq!(
            outer_html(&html),
            "<html><head></head><body>x</body></html>"
        );
    }

    #[test]
    fn test_void_elements_have_no_end_tag() {
        let p = Element::html("p")
            .with_text("a")
            .with_child(Element::html("br"))
            .with_text("b");
        assert_eq!(outer_html(&p), "<p>a<br>b</p>");
    }

    #[test]
    fn test_text_escaping() {
        let p = Element::html("p").with_text("a < b & c > d\u{a0}\"q\"");
        assert_eq!(
            outer_html(&p),
            "<p>a &lt; b &amp; c &gt; d&nbsp;\"q\"</p>"
        );
    }

    #[test]
    fn test_attribute_escaping() {
        let a = Element::html("a").with_attribute("title", "say \"hi\" & <go>");
        assert_eq!(
            outer_html(&a),
            "<a title=\"say &quot;hi&quot; &amp; <go>\"></a>"
        );
    }

    #[test]
    fn test_script_text_is_raw() {
        let script = Element::html("script").with_text("if (a < b && c) {}");
        assert_eq!(
            outer_html(&script),
            "<script>if (a < b && c) {}</script>"
        );
    }

    #[test]
    fn test_comments_and_line_breaks_preserved() {
        let body = Element::html("body")
            .with_text("\r\n")
            .with_comment(" note ")
            .with_text("\r\n");
        assert_eq!(outer_html(&body), "<body>\r\n<!-- note -->\r\n</body>");
    }

    #[test]
    fn test_foreign_element_is_not_void() {
        let svg = Element::svg("svg").with_child(Element::svg("img"));
        assert_eq!(outer_html(&svg), "<svg><img></img></svg>");
    }
}
