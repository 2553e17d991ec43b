//! External graph layout (Graphviz `dot` by default).
//!
//! Any failure of the layout tool degrades to the text tree; the reason is
//! kept as a one-line note for the status bar.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::graph::CallHierarchyGraph;
use crate::render::{to_graph_description, to_text_tree};
use crate::types::LayoutConfig;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("graph layout is disabled")]
    Disabled,
    #[error("layout tool `{command}` not found")]
    NotFound { command: String },
    #[error("failed to run layout tool: {0}")]
    Io(#[from] std::io::Error),
    #[error("layout tool timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("layout tool exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("layout tool output is not a PNG image")]
    NotPng,
}

/// What the UI should display for a call graph.
#[derive(Debug, Clone)]
pub enum GraphView {
    Image { png: Vec<u8>, dot: String },
    Text { tree: String, note: Option<String> },
}

impl GraphView {
    #[must_use]
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image { .. })
    }
}

/// Run the layout tool on `dot` and return the PNG it produced.
pub async fn layout_png(dot: &str, config: &LayoutConfig) -> Result<Vec<u8>, LayoutError> {
    if !config.enabled {
        return Err(LayoutError::Disabled);
    }
    let program = which::which(&config.command).map_err(|_| LayoutError::NotFound {
        command: config.command.clone(),
    })?;

    let mut child = Command::new(program)
        .args(&config.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    // Feed stdin concurrently so a chatty tool cannot deadlock on a full pipe.
    if let Some(mut stdin) = child.stdin.take() {
        let input = dot.as_bytes().to_vec();
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(&input).await {
                tracing::debug!("Writing DOT to layout tool failed: {e}");
            }
            let _ = stdin.shutdown().await;
        });
    }

    let timeout = config.timeout();
    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| LayoutError::Timeout(timeout))??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(LayoutError::Failed {
            status: output.status.to_string(),
            stderr: stderr.lines().next().unwrap_or_default().to_string(),
        });
    }
    if !output.stdout.starts_with(PNG_SIGNATURE) {
        return Err(LayoutError::NotPng);
    }
    Ok(output.stdout)
}

/// Lay out `graph` as an image, falling back to the text tree.
pub async fn render_graph(graph: &CallHierarchyGraph, config: &LayoutConfig) -> GraphView {
    if graph.is_empty() {
        return GraphView::Text {
            tree: String::new(),
            note: Some(graph.status_message()),
        };
    }

    let dot = to_graph_description(graph);
    match layout_png(&dot, config).await {
        Ok(png) => {
            tracing::debug!(bytes = png.len(), "Rendered call graph image");
            GraphView::Image { png, dot }
        }
        Err(LayoutError::Disabled) => GraphView::Text {
            tree: to_text_tree(graph),
            note: None,
        },
        Err(e) => {
            tracing::warn!("Graph layout failed, showing text tree: {e}");
            GraphView::Text {
                tree: to_text_tree(graph),
                note: Some(format!("Graph image unavailable ({e})")),
            }
        }
    }
}
