//! Session: one language server bound to one workspace root.
//!
//! Lifecycle: `Uninitialized → Starting → Ready → ShuttingDown → Terminated`.
//! A terminated session is never resurrected; the navigator replaces it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::LspError;
use crate::protocol;
use crate::rpc::RpcClient;
use crate::transport::{ServerProcess, Transport};
use crate::types::{ServerConfig, TimeoutConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Starting,
    Ready,
    ShuttingDown,
    Terminated,
}

pub struct Session {
    server: ServerConfig,
    timeouts: TimeoutConfig,
    workspace_root: PathBuf,
    state: SessionState,
    client: Option<RpcClient>,
    /// `None` for in-process transports. The child is `kill_on_drop`, so
    /// dropping a session never leaks the server.
    process: Option<ServerProcess>,
    opened_docs: HashSet<PathBuf>,
}

impl Session {
    #[must_use]
    pub fn new(server: ServerConfig, timeouts: TimeoutConfig, workspace_root: impl Into<PathBuf>) -> Self {
        let workspace_root = workspace_root.into();
        let workspace_root = std::path::absolute(&workspace_root).unwrap_or(workspace_root);
        Self {
            server,
            timeouts,
            workspace_root,
            state: SessionState::Uninitialized,
            client: None,
            process: None,
            opened_docs: HashSet::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    /// Spawn the configured server and complete the handshake.
    pub async fn start(&mut self) -> Result<(), LspError> {
        if !self.begin_start()? {
            return Ok(());
        }
        let transport = match Transport::spawn(&self.server, &self.workspace_root) {
            Ok(transport) => transport,
            Err(e) => {
                tracing::warn!(command = %self.server.command, "LSP server unavailable: {e}");
                self.state = SessionState::Terminated;
                return Err(e);
            }
        };
        self.handshake(transport).await
    }

    /// Complete the handshake over an already-connected transport.
    pub async fn start_with(&mut self, transport: Transport) -> Result<(), LspError> {
        if !self.begin_start()? {
            tracing::debug!("Session already started, ignoring transport");
            return Ok(());
        }
        self.handshake(transport).await
    }

    /// `Ok(true)` when the caller should proceed with a start.
    fn begin_start(&mut self) -> Result<bool, LspError> {
        match self.state {
            SessionState::Uninitialized => {
                self.state = SessionState::Starting;
                Ok(true)
            }
            SessionState::Ready => Ok(false),
            SessionState::Starting | SessionState::ShuttingDown | SessionState::Terminated => {
                Err(LspError::ServerNotRunning)
            }
        }
    }

    async fn handshake(&mut self, transport: Transport) -> Result<(), LspError> {
        let (client, process) = RpcClient::new(transport, self.timeouts.request());
        self.client = Some(client);
        self.process = process;

        match self.initialize().await {
            Ok(()) => {
                self.state = SessionState::Ready;
                tracing::info!(root = %self.workspace_root.display(), "LSP session ready");
                Ok(())
            }
            Err(e) => {
                tracing::warn!("LSP initialize failed: {e}");
                self.terminate().await;
                Err(e)
            }
        }
    }

    async fn initialize(&self) -> Result<(), LspError> {
        let client = self.client.as_ref().ok_or(LspError::ServerNotRunning)?;
        let root_uri = protocol::path_to_file_uri(&self.workspace_root)?;
        let params = protocol::initialize_params(root_uri.as_str());

        let result = client
            .request_with_timeout("initialize", Some(params), self.timeouts.handshake())
            .await?;
        if !result.is_object() {
            return Err(LspError::InvalidResponse(format!(
                "initialize returned {result}"
            )));
        }
        client.notify("initialized", Some(serde_json::json!({})))
    }

    /// Start lazily; fail if the session can no longer serve requests.
    pub async fn ensure_ready(&mut self) -> Result<(), LspError> {
        match self.state {
            SessionState::Uninitialized => self.start().await,
            SessionState::Ready => {
                if self.client.as_ref().is_some_and(RpcClient::is_connected) {
                    Ok(())
                } else {
                    tracing::info!("LSP server went away, session terminated");
                    self.terminate().await;
                    Err(LspError::ServerNotRunning)
                }
            }
            SessionState::Starting | SessionState::ShuttingDown | SessionState::Terminated => {
                Err(LspError::ServerNotRunning)
            }
        }
    }

    /// Send `textDocument/didOpen` for `path` unless already sent this session.
    pub async fn ensure_document_open(&mut self, path: &Path) -> Result<(), LspError> {
        self.ensure_ready().await?;
        if self.opened_docs.contains(path) {
            return Ok(());
        }

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| LspError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let uri = protocol::path_to_file_uri(path)?;
        let params = protocol::did_open_params(uri.as_str(), &self.server.language_id, 1, &text);
        self.notify("textDocument/didOpen", Some(params)).await?;

        tracing::debug!(path = %path.display(), "Opened document");
        self.opened_docs.insert(path.to_path_buf());
        Ok(())
    }

    #[must_use]
    pub fn is_document_open(&self, path: &Path) -> bool {
        self.opened_docs.contains(path)
    }

    /// Issue a request on a ready session, starting it if needed.
    pub async fn request(
        &mut self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, LspError> {
        self.ensure_ready().await?;
        let client = self.client.as_ref().ok_or(LspError::ServerNotRunning)?;
        let result = client.request(method, params).await;
        if result.is_err() {
            self.observe_disconnect().await;
        }
        result
    }

    pub async fn notify(
        &mut self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), LspError> {
        self.ensure_ready().await?;
        let client = self.client.as_ref().ok_or(LspError::ServerNotRunning)?;
        let result = client.notify(method, params);
        if result.is_err() {
            self.observe_disconnect().await;
        }
        result
    }

    async fn observe_disconnect(&mut self) {
        if self.state == SessionState::Ready
            && !self.client.as_ref().is_some_and(RpcClient::is_connected)
        {
            tracing::info!("LSP server went away, session terminated");
            self.terminate().await;
        }
    }

    /// Best-effort `shutdown` + `exit`, then kill after the grace period.
    /// Always ends in `Terminated`.
    pub async fn stop(&mut self) {
        match self.state {
            SessionState::Terminated => return,
            SessionState::Uninitialized => {
                self.state = SessionState::Terminated;
                return;
            }
            SessionState::Starting | SessionState::Ready | SessionState::ShuttingDown => {}
        }
        self.state = SessionState::ShuttingDown;

        if let Some(client) = self.client.as_ref().filter(|c| c.is_connected()) {
            let grace = self.timeouts.shutdown_grace();
            if let Err(e) = client.request_with_timeout("shutdown", None, grace).await {
                tracing::debug!("LSP shutdown request failed: {e}");
            }
            let _ = client.notify("exit", None);
        }
        self.terminate().await;
    }

    async fn terminate(&mut self) {
        if let Some(client) = self.client.take() {
            client.close();
        }
        if let Some(process) = self.process.take() {
            process.terminate(self.timeouts.shutdown_grace()).await;
        }
        self.opened_docs.clear();
        self.state = SessionState::Terminated;
    }
}
