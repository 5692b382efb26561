// Canonical HTML writer.
//
// Emits the tree as indented HTML suitable for diffing. Text and
// attribute values are re-escaped; raw-text elements (`pre`, `script`,
// `style`) print their content verbatim.

use super::classify::is_void;
use super::{Dom, NodeData, NodeId};

const INDENT: &str = "  ";

/// Escape `< > & "` for text and attribute positions.
fn escape_html(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

pub(crate) fn pretty_print(dom: &Dom) -> String {
    let mut out = String::new();
    // The synthetic root itself is not printed.
    for &child in &dom.node(dom.root()).children {
        print_node(dom, child, 0, &mut out);
    }
    out
}

fn print_node(dom: &Dom, id: NodeId, depth: usize, out: &mut String) {
    match &dom.node(id).data {
        NodeData::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return;
            }
            push_indent(depth, out);
            escape_html(trimmed, out);
            out.push('\n');
        }
        NodeData::Element { name, attrs } => {
            push_indent(depth, out);
            out.push('<');
            out.push_str(name);
            for attr in attrs {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                escape_html(&attr.value, out);
                out.push('"');
            }
            out.push('>');
            if is_void(name) {
                out.push('\n');
                return;
            }
            let raw = matches!(name.as_str(), "pre" | "script" | "style");
            let children = &dom.node(id).children;
            if children.is_empty() {
                // Tight form for empty elements.
                out.push_str("</");
                out.push_str(name);
                out.push_str(">\n");
                return;
            }
            out.push('\n');
            if raw {
                for &child in children {
                    if let NodeData::Text(text) = &dom.node(child).data {
                        out.push_str(text);
                        if !text.ends_with('\n') {
                            out.push('\n');
                        }
                    }
                }
            } else {
                for &child in children {
                    print_node(dom, child, depth + 1, out);
                }
            }
            push_indent(depth, out);
            out.push_str("</");
            out.push_str(name);
            out.push_str(">\n");
        }
    }
}

fn push_indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::dom::parser::parse;

    #[test]
    fn test_pretty_print_nests_and_indents() {
        let dom = parse("<div><p>hi</p></div>", false);
        assert_eq!(pretty_print(&dom), "<div>\n  <p>\n    hi\n  </p>\n</div>\n");
    }

    #[test]
    fn test_pretty_print_escapes_text_and_attrs() {
        let dom = parse(r#"<p title="a&amp;b">1 &lt; 2</p>"#, false);
        assert_eq!(
            pretty_print(&dom),
            "<p title=\"a&amp;b\">\n  1 &lt; 2\n</p>\n"
        );
    }

    #[test]
    fn test_pretty_print_void_and_empty() {
        let dom = parse("<div><br><span></span></div>", false);
        assert_eq!(
            pretty_print(&dom),
            "<div>\n  <br>\n  <span></span>\n</div>\n"
        );
    }

    #[test]
    fn test_pretty_print_raw_content() {
        let dom = parse("<script>a < b</script>", false);
        assert_eq!(pretty_print(&dom), "<script>\na < b\n</script>\n");
    }
}
