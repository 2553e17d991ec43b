//! Graph rendering through the public API.

use xref_lsp::{CallHierarchyGraph, GraphView, LayoutConfig, render_graph, to_graph_description, to_text_tree};

use crate::common::{function, sample_graph};

#[test]
fn text_tree_marks_repeated_nodes() {
    let tree = to_text_tree(&sample_graph());
    let expected = "\
main (main.rs:1)
├── parse (parse.rs:12)
│   └── lex (lex.rs:30)
└── lex (lex.rs:30) [see above]
";
    assert_eq!(tree, expected);
}

#[test]
fn dot_lists_every_node_and_edge() {
    let graph = sample_graph();
    let dot = to_graph_description(&graph);
    for (id, node) in graph.nodes() {
        assert!(dot.contains(&format!("n{} [label=\"{}\\n", id.index(), node.item().name())));
    }
    assert_eq!(dot.matches(" -> ").count(), graph.edge_count());
    assert_eq!(graph.status_message(), "3 functions, 3 calls");
}

#[test]
fn coalesced_nodes_share_an_id() {
    let mut graph = CallHierarchyGraph::new();
    let (first, created) = graph.add_node(function("run", "/ws/a.rs", 3));
    assert!(created);
    let (second, created) = graph.add_node(function("run", "/ws/a.rs", 3));
    assert!(!created);
    assert_eq!(first, second);
    assert_eq!(graph.len(), 1);
}

#[tokio::test]
async fn missing_layout_tool_degrades_to_text() {
    let config = LayoutConfig {
        command: "xref-integration-no-such-dot".to_string(),
        ..LayoutConfig::default()
    };
    match render_graph(&sample_graph(), &config).await {
        GraphView::Text { tree, note } => {
            assert!(tree.starts_with("main (main.rs:1)"));
            assert!(note.is_some());
        }
        GraphView::Image { .. } => panic!("expected text fallback"),
    }
}
