//! Call hierarchy requests and breadth-first graph construction.

use std::collections::{HashSet, VecDeque};
use std::path::Path;

use crate::error::LspError;
use crate::graph::{CallHierarchyGraph, CallHierarchyItem, NodeId};
use crate::protocol::{self, WireCallItem};
use crate::session::Session;
use crate::types::{GraphLimits, Location, SymbolKind};

/// `textDocument/prepareCallHierarchy` at a 1-indexed cursor.
async fn prepare(
    session: &mut Session,
    path: &Path,
    line: u32,
    column: u32,
) -> Result<Vec<WireCallItem>, LspError> {
    session.ensure_document_open(path).await?;
    let uri = protocol::path_to_file_uri(path)?;
    let (lsp_line, lsp_character) = Location::new(path, line, column).to_lsp();
    let result = session
        .request(
            "textDocument/prepareCallHierarchy",
            Some(protocol::position_params(
                uri.as_str(),
                lsp_line,
                lsp_character,
            )),
        )
        .await?;
    protocol::parse_call_items(result)
        .map_err(|e| LspError::InvalidResponse(format!("prepareCallHierarchy: {e}")))
}

/// First prepared item; extra candidates are logged and ignored.
async fn prepare_one(
    session: &mut Session,
    path: &Path,
    line: u32,
    column: u32,
) -> Result<Option<WireCallItem>, LspError> {
    let candidates = prepare(session, path, line, column).await?;
    if candidates.len() > 1 {
        tracing::debug!(
            ignored = candidates.len() - 1,
            "Several call hierarchy candidates at cursor, using the first"
        );
    }
    Ok(candidates.into_iter().next())
}

async fn outgoing_calls(
    session: &mut Session,
    item: &WireCallItem,
) -> Result<Vec<WireCallItem>, LspError> {
    let params = serde_json::json!({ "item": item.raw });
    let result = session
        .request("callHierarchy/outgoingCalls", Some(params))
        .await?;
    protocol::parse_calls(result, "to")
        .map_err(|e| LspError::InvalidResponse(format!("outgoingCalls: {e}")))
}

/// Callers of the symbol at the cursor. Empty when nothing is callable there.
pub async fn incoming_calls(
    session: &mut Session,
    path: &Path,
    line: u32,
    column: u32,
) -> Result<Vec<CallHierarchyItem>, LspError> {
    let Some(target) = prepare_one(session, path, line, column).await? else {
        return Ok(Vec::new());
    };
    let params = serde_json::json!({ "item": target.raw });
    let result = session
        .request("callHierarchy/incomingCalls", Some(params))
        .await?;
    let callers = protocol::parse_calls(result, "from")
        .map_err(|e| LspError::InvalidResponse(format!("incomingCalls: {e}")))?;
    Ok(callers.iter().filter_map(to_item).collect())
}

fn to_item(wire: &WireCallItem) -> Option<CallHierarchyItem> {
    let path = protocol::file_uri_to_path(&wire.uri)?;
    let start = wire.selection_range.start;
    Some(CallHierarchyItem::new(
        wire.name.clone(),
        Location::from_lsp(path, start.line, start.character),
        SymbolKind::from_lsp(wire.kind),
        wire.detail.clone(),
    ))
}

/// Build the outgoing call graph rooted at the symbol under the cursor.
///
/// Nodes deeper than `limits.max_depth` are not expanded and at most
/// `limits.node_budget` nodes are created. Failed expansions do not fail the
/// build; the partial graph records them instead.
pub async fn build_graph(
    session: &mut Session,
    path: &Path,
    line: u32,
    column: u32,
    limits: GraphLimits,
) -> Result<CallHierarchyGraph, LspError> {
    let mut graph = CallHierarchyGraph::new();
    let Some(root_wire) = prepare_one(session, path, line, column).await? else {
        return Ok(graph);
    };
    let root_item = to_item(&root_wire).ok_or_else(|| {
        LspError::InvalidResponse(format!("call hierarchy item has non-file uri {}", root_wire.uri))
    })?;
    let (root, _) = graph.add_node(root_item);

    let mut queue: VecDeque<(NodeId, WireCallItem, usize)> = VecDeque::new();
    queue.push_back((root, root_wire, 0));
    // Budget-excluded functions, counted once however many callers reach them.
    let mut over_budget: HashSet<Location> = HashSet::new();

    while let Some((id, wire, depth)) = queue.pop_front() {
        if depth >= limits.max_depth {
            continue;
        }

        let callees = match outgoing_calls(session, &wire).await {
            Ok(callees) => callees,
            Err(e) if e.is_session_fatal() => {
                let abandoned = 1 + queue
                    .iter()
                    .filter(|(_, _, d)| *d < limits.max_depth)
                    .count();
                tracing::warn!(abandoned, "Server lost during call graph expansion: {e}");
                graph.record_failed(abandoned);
                break;
            }
            Err(e) => {
                tracing::debug!(symbol = %wire.name, "Expansion failed: {e}");
                graph.record_failed(1);
                continue;
            }
        };

        for callee in callees {
            let Some(item) = to_item(&callee) else {
                tracing::debug!(uri = %callee.uri, "Skipping callee outside the file system");
                continue;
            };
            if let Some(existing) = graph.find(item.location()) {
                graph.add_edge(id, existing);
                continue;
            }
            if graph.len() >= limits.node_budget {
                if over_budget.insert(item.location().clone()) {
                    graph.record_skipped();
                }
                continue;
            }
            let (child, _) = graph.add_node(item);
            graph.add_edge(id, child);
            queue.push_back((child, callee, depth + 1));
        }
    }

    tracing::info!(
        nodes = graph.len(),
        edges = graph.edge_count(),
        failed = graph.failed_expansions(),
        skipped = graph.skipped_expansions(),
        "Built call graph"
    );
    Ok(graph)
}
