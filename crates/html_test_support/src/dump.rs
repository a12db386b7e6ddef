//! Indented tree dumps in the html5lib test format.

use crate::{DomStore, NodeKind};
use html::html5::Namespace;

pub(crate) fn qualified_name(ns: Namespace, name: &str) -> String {
    match ns {
        Namespace::Html => name.to_string(),
        Namespace::MathMl => format!("math {name}"),
        Namespace::Svg => format!("svg {name}"),
        Namespace::XLink => format!("xlink {name}"),
        Namespace::Xml => format!("xml {name}"),
        Namespace::Xmlns => format!("xmlns {name}"),
    }
}

/// Render the tree the way html5lib tree-construction expectations do:
///
/// ```text
/// #document
/// | <html>
/// |   <head>
/// |   <body>
/// |     "hi"
/// ```
pub fn tree_dump(store: &DomStore) -> String {
    let mut out = String::from("#document\n");
    for &child in &store.nodes[0].children {
        dump_node(store, child, 1, &mut out);
    }
    out
}

fn dump_node(store: &DomStore, id: usize, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth - 1);
    let node = &store.nodes[id];
    match &node.kind {
        NodeKind::Document => {}
        NodeKind::Element { ns, name, attrs } => {
            out.push_str(&format!("| {indent}<{}>\n", qualified_name(*ns, name)));
            let mut attrs: Vec<_> = attrs.clone();
            attrs.sort_by(|a, b| a.1.cmp(&b.1));
            for (ans, aname, avalue) in attrs {
                out.push_str(&format!(
                    "| {indent}  {}=\"{avalue}\"\n",
                    qualified_name(ans, &aname)
                ));
            }
            for &child in &node.children {
                dump_node(store, child, depth + 1, out);
            }
        }
        NodeKind::Text(text) => {
            out.push_str(&format!("| {indent}\"{text}\"\n"));
        }
        NodeKind::Comment(text) => {
            out.push_str(&format!("| {indent}<!-- {text} -->\n"));
        }
        NodeKind::Doctype { name, .. } => {
            out.push_str(&format!("| {indent}<!DOCTYPE {name}>\n"));
        }
    }
}
