//! Call graph rendering: Graphviz DOT for the layout tool and an indented
//! text tree for terminals without image support.

use std::fmt::Write as _;

use crate::graph::{CallHierarchyGraph, CallHierarchyItem, NodeId};

/// Appended to a node that was already expanded earlier in the tree.
pub const ALREADY_SHOWN: &str = " [see above]";

fn short_location(item: &CallHierarchyItem) -> String {
    let location = item.location();
    let file = location
        .file_path()
        .file_name()
        .map_or_else(|| location.file_path().display().to_string(), |n| n.to_string_lossy().into_owned());
    format!("{file}:{}", location.line())
}

fn escape_dot(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

/// DOT source with one node statement per function and one edge statement
/// per call. Node ids follow arena order, so output is stable for a graph.
#[must_use]
pub fn to_graph_description(graph: &CallHierarchyGraph) -> String {
    let mut dot = String::from("digraph calls {\n");
    dot.push_str("    rankdir=LR;\n");
    dot.push_str("    node [shape=box, fontname=\"monospace\"];\n");

    for (id, node) in graph.nodes() {
        let item = node.item();
        let label = format!("{}\n{}", item.name(), short_location(item));
        let _ = writeln!(dot, "    n{} [label=\"{}\"];", id.index(), escape_dot(&label));
    }
    for (id, node) in graph.nodes() {
        for callee in node.outgoing() {
            let _ = writeln!(dot, "    n{} -> n{};", id.index(), callee.index());
        }
    }

    dot.push_str("}\n");
    dot
}

/// Pre-order tree from the root. A node reached a second time is printed
/// with [`ALREADY_SHOWN`] and not expanded again, so cycles stay finite.
#[must_use]
pub fn to_text_tree(graph: &CallHierarchyGraph) -> String {
    let mut out = String::new();
    if let Some(root) = graph.root() {
        let mut shown = vec![false; graph.len()];
        write_subtree(graph, root, "", "", &mut shown, &mut out);
    }
    out
}

fn write_subtree(
    graph: &CallHierarchyGraph,
    id: NodeId,
    lead: &str,
    indent: &str,
    shown: &mut [bool],
    out: &mut String,
) {
    let node = graph.node(id);
    let item = node.item();
    let _ = write!(out, "{lead}{} ({})", item.name(), short_location(item));
    if shown[id.index()] {
        out.push_str(ALREADY_SHOWN);
        out.push('\n');
        return;
    }
    shown[id.index()] = true;
    out.push('\n');

    let callees = node.outgoing();
    for (i, &callee) in callees.iter().enumerate() {
        let (branch, rest) = if i + 1 == callees.len() {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        write_subtree(
            graph,
            callee,
            &format!("{indent}{branch}"),
            &format!("{indent}{rest}"),
            shown,
            out,
        );
    }
}
