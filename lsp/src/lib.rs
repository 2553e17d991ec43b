//! LSP client for symbol references and call hierarchy graphs.
//!
//! The host drives a [`Navigator`] directly or through a [`NavigatorHandle`]
//! running it on a worker task.

pub mod codec;
pub mod error;
pub mod filter;
pub mod graph;
pub mod hierarchy;
pub mod layout;
pub mod references;
pub mod render;
pub mod rpc;
pub mod session;
pub mod transport;
pub mod types;

pub(crate) mod protocol;

mod navigator;
mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use error::LspError;
pub use filter::ReferenceFilter;
pub use graph::{CallHierarchyGraph, CallHierarchyItem, GraphNode, NodeId};
pub use layout::{GraphView, LayoutError, render_graph};
pub use navigator::Navigator;
pub use references::{CONTEXT_LINES, ReferenceList, SymbolReference};
pub use render::{to_graph_description, to_text_tree};
pub use session::{Session, SessionState};
pub use types::{
    GraphLimits, LayoutConfig, Location, NavigatorConfig, ServerConfig, SymbolKind, TimeoutConfig,
};
pub use worker::{Command, GraphOutcome, NavigatorEvent, NavigatorHandle, RequestTicket};
