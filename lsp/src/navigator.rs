//! Navigator facade, the API the host UI drives.
//!
//! Owns at most one [`Session`]. Sessions start lazily on the first
//! operation; one that has terminated (server crash, failed handshake) is
//! replaced by a fresh one on the next operation, never mid-operation.

use std::path::{Path, PathBuf};

use crate::error::LspError;
use crate::graph::{CallHierarchyGraph, CallHierarchyItem};
use crate::hierarchy;
use crate::layout::{self, GraphView};
use crate::references::{self, ReferenceList};
use crate::session::{Session, SessionState};
use crate::transport::Transport;
use crate::types::{GraphLimits, NavigatorConfig};

type Connector = Box<dyn FnMut() -> Result<Transport, LspError> + Send + Sync>;

pub struct Navigator {
    config: NavigatorConfig,
    workspace_root: PathBuf,
    session: Option<Session>,
    /// Produces transports for in-process servers. `None` spawns
    /// `config.server.command`.
    connector: Option<Connector>,
}

impl Navigator {
    #[must_use]
    pub fn new(config: NavigatorConfig, workspace_root: impl Into<PathBuf>) -> Self {
        let workspace_root = workspace_root.into();
        let workspace_root = std::path::absolute(&workspace_root).unwrap_or(workspace_root);
        Self {
            config,
            workspace_root,
            session: None,
            connector: None,
        }
    }

    /// Like [`Navigator::new`], but each session runs over a transport from
    /// `connector` instead of a spawned process.
    #[must_use]
    pub fn with_connector(
        config: NavigatorConfig,
        workspace_root: impl Into<PathBuf>,
        connector: impl FnMut() -> Result<Transport, LspError> + Send + Sync + 'static,
    ) -> Self {
        let mut navigator = Self::new(config, workspace_root);
        navigator.connector = Some(Box::new(connector));
        navigator
    }

    #[must_use]
    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// State of the current session, if one exists.
    #[must_use]
    pub fn session_state(&self) -> Option<SessionState> {
        self.session.as_ref().map(Session::state)
    }

    async fn session(&mut self) -> Result<&mut Session, LspError> {
        if self.session.as_ref().is_some_and(Session::is_terminated) {
            tracing::info!("Replacing terminated LSP session");
            self.session = None;
        }

        if self.session.is_none() {
            let mut session = Session::new(
                self.config.server.clone(),
                self.config.timeouts,
                &self.workspace_root,
            );
            match self.connector.as_mut() {
                Some(connect) => session.start_with(connect()?).await?,
                None => session.start().await?,
            }
            self.session = Some(session);
        }

        self.session.as_mut().ok_or(LspError::ServerNotRunning)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }

    pub async fn find_references(
        &mut self,
        path: &Path,
        line: u32,
        column: u32,
    ) -> Result<ReferenceList, LspError> {
        let path = self.resolve(path);
        let session = self.session().await?;
        references::find_references(session, &path, line, column).await
    }

    /// Build the call graph with the configured limits.
    pub async fn build_graph(
        &mut self,
        path: &Path,
        line: u32,
        column: u32,
    ) -> Result<CallHierarchyGraph, LspError> {
        let limits = self.config.graph;
        self.build_graph_with(path, line, column, limits).await
    }

    pub async fn build_graph_with(
        &mut self,
        path: &Path,
        line: u32,
        column: u32,
        limits: GraphLimits,
    ) -> Result<CallHierarchyGraph, LspError> {
        let path = self.resolve(path);
        let session = self.session().await?;
        hierarchy::build_graph(session, &path, line, column, limits).await
    }

    pub async fn incoming_calls(
        &mut self,
        path: &Path,
        line: u32,
        column: u32,
    ) -> Result<Vec<CallHierarchyItem>, LspError> {
        let path = self.resolve(path);
        let session = self.session().await?;
        hierarchy::incoming_calls(session, &path, line, column).await
    }

    /// Image through the configured layout tool, or the text tree.
    pub async fn render(&self, graph: &CallHierarchyGraph) -> GraphView {
        layout::render_graph(graph, &self.config.layout).await
    }

    /// Stop the current session and start a fresh one.
    pub async fn restart(&mut self) -> Result<(), LspError> {
        self.shutdown().await;
        self.session().await.map(|_| ())
    }

    pub async fn shutdown(&mut self) {
        if let Some(mut session) = self.session.take() {
            tracing::info!("Shutting down LSP session");
            session.stop().await;
        }
    }
}
