//! Arena-backed call graph.
//!
//! Nodes live in a `Vec` and refer to each other by [`NodeId`], so cycles
//! need no shared ownership and the graph is released as a unit.

use std::collections::HashMap;

use crate::types::{Location, SymbolKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallHierarchyItem {
    name: String,
    location: Location,
    kind: SymbolKind,
    detail: Option<String>,
}

impl CallHierarchyItem {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        location: Location,
        kind: SymbolKind,
        detail: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            location,
            kind,
            detail,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    #[must_use]
    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct GraphNode {
    item: CallHierarchyItem,
    outgoing: Vec<NodeId>,
}

impl GraphNode {
    #[must_use]
    pub fn item(&self) -> &CallHierarchyItem {
        &self.item
    }

    /// Callees in the order they were first reported.
    #[must_use]
    pub fn outgoing(&self) -> &[NodeId] {
        &self.outgoing
    }
}

#[derive(Debug, Clone, Default)]
pub struct CallHierarchyGraph {
    nodes: Vec<GraphNode>,
    index: HashMap<Location, NodeId>,
    failed_expansions: usize,
    skipped_expansions: usize,
}

impl CallHierarchyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The first node added; `None` only for an empty graph.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        (!self.nodes.is_empty()).then_some(NodeId(0))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// # Panics
    ///
    /// If `id` did not come from this graph.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &GraphNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    #[must_use]
    pub fn find(&self, location: &Location) -> Option<NodeId> {
        self.index.get(location).copied()
    }

    /// Insert `item`, or return the existing node at the same location.
    /// The boolean is `true` when a node was created.
    pub fn add_node(&mut self, item: CallHierarchyItem) -> (NodeId, bool) {
        if let Some(&id) = self.index.get(&item.location) {
            return (id, false);
        }
        let id = NodeId(self.nodes.len());
        self.index.insert(item.location.clone(), id);
        self.nodes.push(GraphNode {
            item,
            outgoing: Vec::new(),
        });
        (id, true)
    }

    /// Record a call from `from` to `to`. Repeated edges are ignored.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        let outgoing = &mut self.nodes[from.0].outgoing;
        if !outgoing.contains(&to) {
            outgoing.push(to);
        }
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.outgoing.len()).sum()
    }

    /// Expansions whose RPC failed.
    #[must_use]
    pub fn failed_expansions(&self) -> usize {
        self.failed_expansions
    }

    /// Distinct functions left out because the node budget was exhausted.
    #[must_use]
    pub fn skipped_expansions(&self) -> usize {
        self.skipped_expansions
    }

    pub(crate) fn record_failed(&mut self, count: usize) {
        self.failed_expansions += count;
    }

    pub(crate) fn record_skipped(&mut self) {
        self.skipped_expansions += 1;
    }

    /// Status line describing what the graph holds and what it lacks.
    #[must_use]
    pub fn status_message(&self) -> String {
        if self.nodes.is_empty() {
            return "No call hierarchy at cursor".to_string();
        }
        let mut status = format!(
            "{} functions, {} calls",
            self.nodes.len(),
            self.edge_count()
        );
        if self.skipped_expansions > 0 {
            status.push_str(&format!(", {} skipped (limit)", self.skipped_expansions));
        }
        if self.failed_expansions > 0 {
            status.push_str(&format!(", {} failed", self.failed_expansions));
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, line: u32) -> CallHierarchyItem {
        CallHierarchyItem::new(
            name,
            Location::new("/src/lib.rs", line, 4),
            SymbolKind::Function,
            None,
        )
    }

    #[test]
    fn test_empty_graph_has_no_root() {
        let graph = CallHierarchyGraph::new();
        assert!(graph.root().is_none());
        assert!(graph.is_empty());
        assert_eq!(graph.status_message(), "No call hierarchy at cursor");
    }

    #[test]
    fn test_first_node_is_root() {
        let mut graph = CallHierarchyGraph::new();
        let (a, created) = graph.add_node(item("a", 1));
        assert!(created);
        graph.add_node(item("b", 10));
        assert_eq!(graph.root(), Some(a));
        assert_eq!(graph.node(a).item().name(), "a");
    }

    #[test]
    fn test_same_location_coalesces() {
        let mut graph = CallHierarchyGraph::new();
        let (a, _) = graph.add_node(item("a", 1));
        // Same position, different reported name: still one node.
        let (again, created) = graph.add_node(item("a_alias", 1));
        assert_eq!(a, again);
        assert!(!created);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.find(&Location::new("/src/lib.rs", 1, 4)), Some(a));
    }

    #[test]
    fn test_edges_are_deduplicated_and_ordered() {
        let mut graph = CallHierarchyGraph::new();
        let (a, _) = graph.add_node(item("a", 1));
        let (b, _) = graph.add_node(item("b", 10));
        let (c, _) = graph.add_node(item("c", 20));
        graph.add_edge(a, c);
        graph.add_edge(a, b);
        graph.add_edge(a, c);
        assert_eq!(graph.node(a).outgoing(), [c, b]);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_cycle_is_representable() {
        let mut graph = CallHierarchyGraph::new();
        let (a, _) = graph.add_node(item("a", 1));
        let (b, _) = graph.add_node(item("b", 10));
        graph.add_edge(a, b);
        graph.add_edge(b, a);
        assert_eq!(graph.node(b).outgoing(), [a]);
    }

    #[test]
    fn test_status_mentions_limits() {
        let mut graph = CallHierarchyGraph::new();
        let (a, _) = graph.add_node(item("a", 1));
        let (b, _) = graph.add_node(item("b", 10));
        graph.add_edge(a, b);
        assert_eq!(graph.status_message(), "2 functions, 1 calls");
        graph.record_skipped();
        graph.record_failed(2);
        assert_eq!(
            graph.status_message(),
            "2 functions, 1 calls, 1 skipped (limit), 2 failed"
        );
    }
}
