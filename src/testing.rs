//! Test-only helpers.

use crate::dom::NodeRef;

/// Serialize a node list to compact markup for assertions. Attributes
/// appear in insertion order; markers (empty text nodes) vanish.
pub(crate) fn render_to_string(nodes: &[NodeRef]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

fn write_node(out: &mut String, node: &NodeRef) {
    match node.tag() {
        Some(tag) => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in node.attributes() {
                out.push(' ');
                out.push_str(&name);
                out.push_str("=\"");
                out.push_str(&value);
                out.push('"');
            }
            out.push('>');
            for child in node.children() {
                write_node(out, &child);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        None if node.is_text() => out.push_str(&node.text()),
        // Fragments serialize as their children.
        None => {
            for child in node.children() {
                write_node(out, &child);
            }
        }
    }
}
