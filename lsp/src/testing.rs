//! In-process fake language server for unit tests.
//!
//! Speaks real `Content-Length` framing over a `tokio::io::duplex` pipe, so
//! every test exercises the codec, the transport tasks, and the dispatcher.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::codec::{FrameReader, FrameWriter};
use crate::transport::Transport;

/// What the fake server does with one incoming request.
pub(crate) enum Reply {
    Result(Value),
    Error { code: i64, message: String },
    Delayed { result: Value, delay: Duration },
    /// Never answer.
    Ignore,
    /// Close the connection as if the process died.
    Exit,
    /// Send a server-to-client request first; answer with `then` once the
    /// client has replied to it.
    AskClient { method: String, then: Value },
}

#[derive(Debug, Clone)]
pub(crate) struct Received {
    pub id: Option<u64>,
    pub method: String,
    pub params: Option<Value>,
}

#[derive(Default)]
struct LogInner {
    requests: Vec<Received>,
    client_replies: Vec<Value>,
}

/// Everything the fake server saw, in arrival order.
#[derive(Clone, Default)]
pub(crate) struct ServerLog {
    inner: Arc<Mutex<LogInner>>,
}

impl ServerLog {
    pub fn requests(&self) -> Vec<Received> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.method).collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.requests().iter().filter(|r| r.method == method).count()
    }

    pub fn client_replies(&self) -> Vec<Value> {
        self.inner.lock().unwrap().client_replies.clone()
    }
}

type Handler = dyn Fn(&str, &Option<Value>) -> Reply + Send + Sync;

pub(crate) struct FakeServer {
    handler: Arc<Handler>,
    log: ServerLog,
}

fn response(id: u64, result: Value) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({"jsonrpc": "2.0", "id": id, "result": result})).unwrap()
}

impl FakeServer {
    pub fn new(handler: impl Fn(&str, &Option<Value>) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            handler: Arc::new(handler),
            log: ServerLog::default(),
        }
    }

    /// A server that completes the handshake and answers everything else
    /// with `handler`.
    pub fn with_handshake(
        handler: impl Fn(&str, &Option<Value>) -> Reply + Send + Sync + 'static,
    ) -> Self {
        Self::new(move |method, params| match method {
            "initialize" => Reply::Result(serde_json::json!({"capabilities": {}})),
            "shutdown" => Reply::Result(Value::Null),
            _ => handler(method, params),
        })
    }

    pub fn log(&self) -> ServerLog {
        self.log.clone()
    }

    /// Start serving and return the client end.
    pub fn spawn(self) -> Transport {
        let (client_io, server_io) = tokio::io::duplex(256 * 1024);
        let (client_read, client_write) = tokio::io::split(client_io);
        let (server_read, server_write) = tokio::io::split(server_io);

        // `None` closes the connection.
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Option<Vec<u8>>>();
        tokio::spawn(async move {
            let mut writer = FrameWriter::new(server_write);
            while let Some(Some(body)) = out_rx.recv().await {
                if writer.write_frame(&body).await.is_err() {
                    break;
                }
            }
            let _ = writer.close().await;
        });

        let Self { handler, log } = self;
        tokio::spawn(async move {
            let mut reader = FrameReader::new(server_read);
            let mut awaiting_client: Option<(u64, Value)> = None;

            while let Ok(Some(body)) = reader.read_frame().await {
                let Ok(frame) = serde_json::from_slice::<Value>(&body) else {
                    continue;
                };
                let id = frame.get("id").and_then(Value::as_u64);
                let Some(method) = frame.get("method").and_then(Value::as_str) else {
                    log.inner.lock().unwrap().client_replies.push(frame.clone());
                    if let Some((id, then)) = awaiting_client.take() {
                        let _ = out_tx.send(Some(response(id, then)));
                    }
                    continue;
                };
                let method = method.to_string();
                let params = frame.get("params").cloned();
                log.inner.lock().unwrap().requests.push(Received {
                    id,
                    method: method.clone(),
                    params: params.clone(),
                });

                let Some(id) = id else {
                    if method == "exit" {
                        break;
                    }
                    continue;
                };

                match handler(&method, &params) {
                    Reply::Result(result) => {
                        let _ = out_tx.send(Some(response(id, result)));
                    }
                    Reply::Error { code, message } => {
                        let body = serde_json::to_vec(&serde_json::json!({
                            "jsonrpc": "2.0",
                            "id": id,
                            "error": { "code": code, "message": message }
                        }))
                        .unwrap();
                        let _ = out_tx.send(Some(body));
                    }
                    Reply::Delayed { result, delay } => {
                        let out_tx = out_tx.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(delay).await;
                            let _ = out_tx.send(Some(response(id, result)));
                        });
                    }
                    Reply::Ignore => {}
                    Reply::Exit => break,
                    Reply::AskClient { method, then } => {
                        let body = serde_json::to_vec(&serde_json::json!({
                            "jsonrpc": "2.0",
                            "id": "server-1",
                            "method": method,
                            "params": {}
                        }))
                        .unwrap();
                        awaiting_client = Some((id, then));
                        let _ = out_tx.send(Some(body));
                    }
                }
            }
            let _ = out_tx.send(None);
        });

        Transport::from_io(client_read, client_write)
    }
}

/// One call hierarchy item in wire form, positioned at `line` (0-indexed).
pub(crate) fn call_item(name: &str, path: &str, line: u32) -> Value {
    let uri = format!("file://{path}");
    serde_json::json!({
        "name": name,
        "kind": 12,
        "uri": uri,
        "range": {
            "start": { "line": line, "character": 0 },
            "end": { "line": line + 2, "character": 1 }
        },
        "selectionRange": {
            "start": { "line": line, "character": 3 },
            "end": { "line": line, "character": 3 + name.len() }
        }
    })
}

/// Name of the item in an outgoing/incoming-calls request.
pub(crate) fn requested_item_name(params: &Option<Value>) -> Option<String> {
    params
        .as_ref()
        .and_then(|p| p["item"]["name"].as_str())
        .map(String::from)
}
