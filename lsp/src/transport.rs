//! Transport: owns the server subprocess and moves frame bodies over its pipes.
//!
//! Writes are queued to a writer task and never block the caller. Reads come
//! from a reader task through a channel. When either pipe fails the transport
//! is dead for good; respawning is the session's decision, not ours.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use crate::codec::{FrameReader, FrameWriter};
use crate::error::LspError;
use crate::types::ServerConfig;

const INCOMING_CHANNEL_CAPACITY: usize = 64;

enum WriterCommand {
    Send(Vec<u8>),
    Close,
}

/// Write half: cheap to clone, shared by the RPC client and its dispatcher.
#[derive(Clone)]
pub struct FrameSender {
    tx: mpsc::UnboundedSender<WriterCommand>,
    alive: Arc<AtomicBool>,
}

impl FrameSender {
    /// Queue one frame body. Fails with `ServerNotRunning` once the pipe is gone.
    pub fn send(&self, body: Vec<u8>) -> Result<(), LspError> {
        if !self.alive.load(Ordering::Acquire) {
            return Err(LspError::ServerNotRunning);
        }
        self.tx
            .send(WriterCommand::Send(body))
            .map_err(|_| LspError::ServerNotRunning)
    }

    /// Close the server's stdin after queued frames are flushed.
    pub fn close(&self) {
        let _ = self.tx.send(WriterCommand::Close);
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

/// Read half.
pub struct FrameReceiver {
    rx: mpsc::Receiver<Result<Vec<u8>, LspError>>,
    alive: Arc<AtomicBool>,
}

impl FrameReceiver {
    /// Wait for the next frame body.
    ///
    /// The first error is terminal: `OutOfMemory` when a frame could not be
    /// buffered, `ServerNotRunning` otherwise.
    pub async fn recv(&mut self) -> Result<Vec<u8>, LspError> {
        match self.rx.recv().await {
            Some(Ok(body)) => Ok(body),
            Some(Err(e)) => {
                self.alive.store(false, Ordering::Release);
                Err(e)
            }
            None => {
                self.alive.store(false, Ordering::Release);
                Err(LspError::ServerNotRunning)
            }
        }
    }

    /// Wait at most `timeout` for the next frame body; `Ok(None)` on timeout.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, LspError> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }
}

/// The spawned server process.
pub struct ServerProcess {
    command: String,
    child: Child,
}

impl ServerProcess {
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait up to `grace` for a voluntary exit, then kill.
    pub async fn terminate(mut self, grace: Duration) {
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(command = %self.command, %status, "LSP server exited");
            }
            Ok(Err(e)) => {
                tracing::warn!(command = %self.command, "waiting for LSP server failed: {e}");
                let _ = self.child.kill().await;
            }
            Err(_) => {
                tracing::debug!(command = %self.command, "LSP server didn't exit in time, killing");
                let _ = self.child.kill().await;
            }
        }
    }
}

/// A framed, bidirectional connection to a language server.
pub struct Transport {
    sender: FrameSender,
    receiver: FrameReceiver,
    process: Option<ServerProcess>,
}

impl Transport {
    /// Spawn `config.command` (resolved through `PATH`) in `workspace_root`.
    ///
    /// Resolution or spawn failures are reported as `ServerNotFound` without
    /// any retry.
    pub fn spawn(config: &ServerConfig, workspace_root: &Path) -> Result<Self, LspError> {
        let not_found = |reason: String| LspError::ServerNotFound {
            command: config.command.clone(),
            reason,
        };

        let resolved = which::which(&config.command)
            .map_err(|e| not_found(format!("not found in PATH ({e})")))?;

        let mut child = Command::new(&resolved)
            .args(&config.args)
            .current_dir(workspace_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| not_found(format!("spawn failed: {e}")))?;

        let (Some(stdout), Some(stdin)) = (child.stdout.take(), child.stdin.take()) else {
            return Err(not_found("child has no stdio pipes".to_string()));
        };

        tracing::info!(
            command = %config.command,
            pid = child.id().unwrap_or_default(),
            root = %workspace_root.display(),
            "Spawned LSP server"
        );

        let mut transport = Self::from_io(stdout, stdin);
        transport.process = Some(ServerProcess {
            command: config.command.clone(),
            child,
        });
        Ok(transport)
    }

    /// Frame over arbitrary streams (in-process servers, tests).
    pub fn from_io<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let alive = Arc::new(AtomicBool::new(true));

        let (writer_tx, mut writer_rx) = mpsc::unbounded_channel::<WriterCommand>();
        let writer_alive = alive.clone();
        tokio::spawn(async move {
            let mut writer = FrameWriter::new(writer);
            while let Some(cmd) = writer_rx.recv().await {
                match cmd {
                    WriterCommand::Send(body) => {
                        if let Err(e) = writer.write_frame(&body).await {
                            tracing::warn!("LSP write error: {e}");
                            writer_alive.store(false, Ordering::Release);
                            break;
                        }
                    }
                    WriterCommand::Close => {
                        let _ = writer.close().await;
                        break;
                    }
                }
            }
        });

        let (incoming_tx, incoming_rx) = mpsc::channel(INCOMING_CHANNEL_CAPACITY);
        let reader_alive = alive.clone();
        tokio::spawn(async move {
            let mut reader = FrameReader::new(reader);
            loop {
                match reader.read_frame().await {
                    Ok(Some(body)) => {
                        if incoming_tx.send(Ok(body)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        tracing::info!("LSP server closed stdout");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("LSP reader error: {e}");
                        let _ = incoming_tx.send(Err(LspError::from(e))).await;
                        break;
                    }
                }
            }
            reader_alive.store(false, Ordering::Release);
        });

        Self {
            sender: FrameSender {
                tx: writer_tx,
                alive: alive.clone(),
            },
            receiver: FrameReceiver {
                rx: incoming_rx,
                alive,
            },
            process: None,
        }
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.sender.is_alive()
    }

    #[must_use]
    pub fn into_parts(self) -> (FrameSender, FrameReceiver, Option<ServerProcess>) {
        (self.sender, self.receiver, self.process)
    }
}
