//! JSON-RPC client over a [`Transport`].
//!
//! A dispatcher task owns the read half and routes responses to pending
//! requests by id. Ids are allocated from a monotonically increasing counter
//! and are never reused within a client, so a late response for an abandoned
//! request cannot be delivered to a newer one.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

use crate::error::LspError;
use crate::protocol::{METHOD_NOT_FOUND, Notification, Request, ResponseError};
use crate::transport::{FrameReceiver, FrameSender, ServerProcess, Transport};

type Reply = Result<serde_json::Value, LspError>;

struct PendingRequest {
    method: String,
    issued_at: Instant,
    reply: oneshot::Sender<Reply>,
}

type PendingMap = Arc<Mutex<HashMap<u64, PendingRequest>>>;

enum IncomingFrame {
    Response { id: u64, reply: Reply },
    ServerRequest { id: serde_json::Value, method: String },
    Notification { method: String },
}

fn parse_incoming(frame: &serde_json::Value) -> Option<IncomingFrame> {
    let id = frame.get("id");
    let method = frame
        .get("method")
        .and_then(|m| m.as_str())
        .map(String::from);

    match (id, method) {
        (Some(id), Some(method)) => Some(IncomingFrame::ServerRequest {
            id: id.clone(),
            method,
        }),
        (Some(id), None) => {
            let id = id.as_u64()?;
            let reply = if let Some(error) = frame.get("error") {
                match serde_json::from_value::<ResponseError>(error.clone()) {
                    Ok(err) => Err(LspError::ServerError {
                        code: err.code,
                        message: err.message,
                    }),
                    Err(e) => Err(LspError::InvalidResponse(format!(
                        "malformed error object: {e}"
                    ))),
                }
            } else if let Some(result) = frame.get("result") {
                Ok(result.clone())
            } else {
                Err(LspError::InvalidResponse(
                    "response has neither result nor error".to_string(),
                ))
            };
            Some(IncomingFrame::Response { id, reply })
        }
        (None, Some(method)) => Some(IncomingFrame::Notification { method }),
        (None, None) => None,
    }
}

/// Correlates requests and responses over one transport.
pub struct RpcClient {
    sender: FrameSender,
    pending: PendingMap,
    next_id: AtomicU64,
    default_timeout: Duration,
    dispatcher: JoinHandle<()>,
}

impl RpcClient {
    /// Start dispatching on `transport`. The server process handle (if any) is
    /// returned to the caller, who owns its lifetime.
    pub fn new(transport: Transport, default_timeout: Duration) -> (Self, Option<ServerProcess>) {
        let (sender, receiver, process) = transport.into_parts();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        let dispatcher = tokio::spawn(Self::dispatch_loop(
            receiver,
            pending.clone(),
            sender.clone(),
        ));

        let client = Self {
            sender,
            pending,
            next_id: AtomicU64::new(1),
            default_timeout,
            dispatcher,
        };
        (client, process)
    }

    async fn dispatch_loop(mut receiver: FrameReceiver, pending: PendingMap, sender: FrameSender) {
        let terminal = loop {
            match receiver.recv().await {
                Ok(body) => Self::dispatch_frame(&body, &pending, &sender).await,
                Err(e) => break e,
            }
        };

        // Server gone: every waiter learns it now instead of at its timeout.
        let mut pending = pending.lock().await;
        for (id, request) in pending.drain() {
            tracing::debug!(id, method = %request.method, "failing pending request: {terminal}");
            let err = match &terminal {
                LspError::OutOfMemory { requested } => LspError::OutOfMemory {
                    requested: *requested,
                },
                _ => LspError::ServerNotRunning,
            };
            let _ = request.reply.send(Err(err));
        }
    }

    async fn dispatch_frame(body: &[u8], pending: &Mutex<HashMap<u64, PendingRequest>>, sender: &FrameSender) {
        let frame: serde_json::Value = match serde_json::from_slice(body) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Ignoring non-JSON frame from LSP server: {e}");
                return;
            }
        };
        let Some(incoming) = parse_incoming(&frame) else {
            tracing::trace!("Ignoring malformed JSON-RPC frame");
            return;
        };

        match incoming {
            IncomingFrame::Response { id, reply } => {
                let request = pending.lock().await.remove(&id);
                match request {
                    Some(request) => {
                        tracing::debug!(
                            id,
                            method = %request.method,
                            elapsed_ms = request.issued_at.elapsed().as_millis(),
                            "LSP response"
                        );
                        let _ = request.reply.send(reply);
                    }
                    None => tracing::debug!(id, "Dropping response for unknown request id"),
                }
            }
            IncomingFrame::ServerRequest { id, method } => {
                // Servers may block until client/registerCapability etc. are answered.
                tracing::debug!("LSP server sent request: {method}, replying method not found");
                let response = serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {
                        "code": METHOD_NOT_FOUND,
                        "message": format!("Method not found: {method}")
                    }
                });
                if let Ok(body) = serde_json::to_vec(&response) {
                    let _ = sender.send(body);
                }
            }
            IncomingFrame::Notification { method } => {
                tracing::trace!("Ignoring notification: {method}");
            }
        }
    }

    /// Send a request and wait for its response with the default timeout.
    pub async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, LspError> {
        self.request_with_timeout(method, params, self.default_timeout)
            .await
    }

    /// Send a request and wait at most `timeout` for its response.
    ///
    /// On timeout the request is forgotten locally; no cancellation is sent
    /// and a late response is dropped by the dispatcher.
    pub async fn request_with_timeout(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
        timeout: Duration,
    ) -> Result<serde_json::Value, LspError> {
        if self.dispatcher.is_finished() {
            return Err(LspError::ServerNotRunning);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::to_vec(&Request::new(id, method, params))
            .map_err(|e| LspError::InvalidResponse(format!("serializing {method}: {e}")))?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(
            id,
            PendingRequest {
                method: method.to_string(),
                issued_at: Instant::now(),
                reply: tx,
            },
        );

        if let Err(e) = self.sender.send(body) {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }
        tracing::debug!(id, method, "LSP request sent");

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => reply,
            // Dispatcher dropped the sender without replying.
            Ok(Err(_)) => Err(LspError::ServerNotRunning),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                tracing::warn!(id, method, "LSP request timed out");
                Err(LspError::RequestTimeout {
                    method: method.to_string(),
                    timeout,
                })
            }
        }
    }

    /// Fire-and-forget notification.
    pub fn notify(&self, method: &str, params: Option<serde_json::Value>) -> Result<(), LspError> {
        let body = serde_json::to_vec(&Notification::new(method, params))
            .map_err(|e| LspError::InvalidResponse(format!("serializing {method}: {e}")))?;
        self.sender.send(body)
    }

    /// Whether the server side of the connection is still up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.sender.is_alive() && !self.dispatcher.is_finished()
    }

    /// Close the server's stdin once queued frames are written.
    pub fn close(&self) {
        self.sender.close();
    }

    #[cfg(test)]
    async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}
