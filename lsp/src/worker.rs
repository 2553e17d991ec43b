//! Worker task running a [`Navigator`] off the UI loop.
//!
//! The UI submits commands without waiting and drains completion events each
//! tick with a budget, the same way it polls any other event source.
//! Commands run strictly one at a time, in submission order.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::LspError;
use crate::graph::{CallHierarchyGraph, CallHierarchyItem};
use crate::layout::GraphView;
use crate::navigator::Navigator;
use crate::references::ReferenceList;
use crate::types::GraphLimits;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub enum Command {
    FindReferences {
        path: PathBuf,
        line: u32,
        column: u32,
    },
    BuildGraph {
        path: PathBuf,
        line: u32,
        column: u32,
        /// Configured limits when `None`.
        limits: Option<GraphLimits>,
        /// Also lay the graph out for display.
        render: bool,
    },
    IncomingCalls {
        path: PathBuf,
        line: u32,
        column: u32,
    },
    Restart,
}

/// Identifies the command an event answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestTicket(u64);

#[derive(Debug)]
pub struct GraphOutcome {
    pub graph: CallHierarchyGraph,
    pub view: Option<GraphView>,
}

#[derive(Debug)]
pub enum NavigatorEvent {
    References {
        ticket: RequestTicket,
        result: Result<ReferenceList, LspError>,
    },
    Graph {
        ticket: RequestTicket,
        result: Result<GraphOutcome, LspError>,
    },
    Callers {
        ticket: RequestTicket,
        result: Result<Vec<CallHierarchyItem>, LspError>,
    },
    Restarted {
        ticket: RequestTicket,
        result: Result<(), LspError>,
    },
}

impl NavigatorEvent {
    #[must_use]
    pub fn ticket(&self) -> RequestTicket {
        match self {
            Self::References { ticket, .. }
            | Self::Graph { ticket, .. }
            | Self::Callers { ticket, .. }
            | Self::Restarted { ticket, .. } => *ticket,
        }
    }

    /// The error carried by this event, if the command failed.
    #[must_use]
    pub fn error(&self) -> Option<&LspError> {
        match self {
            Self::References { result, .. } => result.as_ref().err(),
            Self::Graph { result, .. } => result.as_ref().err(),
            Self::Callers { result, .. } => result.as_ref().err(),
            Self::Restarted { result, .. } => result.as_ref().err(),
        }
    }
}

enum WorkerMessage {
    Run(RequestTicket, Command),
    Shutdown,
}

async fn execute(navigator: &mut Navigator, ticket: RequestTicket, command: Command) -> NavigatorEvent {
    tracing::debug!(?ticket, ?command, "Navigator command");
    match command {
        Command::FindReferences { path, line, column } => NavigatorEvent::References {
            ticket,
            result: navigator.find_references(&path, line, column).await,
        },
        Command::BuildGraph {
            path,
            line,
            column,
            limits,
            render,
        } => {
            let limits = limits.unwrap_or(navigator.config().graph);
            let result = match navigator.build_graph_with(&path, line, column, limits).await {
                Ok(graph) => {
                    let view = if render {
                        Some(navigator.render(&graph).await)
                    } else {
                        None
                    };
                    Ok(GraphOutcome { graph, view })
                }
                Err(e) => Err(e),
            };
            NavigatorEvent::Graph { ticket, result }
        }
        Command::IncomingCalls { path, line, column } => NavigatorEvent::Callers {
            ticket,
            result: navigator.incoming_calls(&path, line, column).await,
        },
        Command::Restart => NavigatorEvent::Restarted {
            ticket,
            result: navigator.restart().await,
        },
    }
}

async fn run(
    mut navigator: Navigator,
    mut commands: mpsc::UnboundedReceiver<WorkerMessage>,
    events: mpsc::Sender<NavigatorEvent>,
) {
    while let Some(message) = commands.recv().await {
        match message {
            WorkerMessage::Run(ticket, command) => {
                let event = execute(&mut navigator, ticket, command).await;
                if let Some(e) = event.error() {
                    tracing::warn!(?ticket, "Navigator command failed: {e}");
                }
                if events.send(event).await.is_err() {
                    break;
                }
            }
            WorkerMessage::Shutdown => break,
        }
    }
    navigator.shutdown().await;
}

/// UI-side handle to a navigator running on its own task.
pub struct NavigatorHandle {
    commands: mpsc::UnboundedSender<WorkerMessage>,
    events: mpsc::Receiver<NavigatorEvent>,
    next_ticket: u64,
    task: JoinHandle<()>,
}

impl NavigatorHandle {
    #[must_use]
    pub fn spawn(navigator: Navigator) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let task = tokio::spawn(run(navigator, command_rx, event_tx));
        Self {
            commands: command_tx,
            events: event_rx,
            next_ticket: 1,
            task,
        }
    }

    /// Queue `command`; never blocks.
    pub fn submit(&mut self, command: Command) -> Result<RequestTicket, LspError> {
        let ticket = RequestTicket(self.next_ticket);
        self.next_ticket += 1;
        self.commands
            .send(WorkerMessage::Run(ticket, command))
            .map_err(|_| LspError::ServerNotRunning)?;
        Ok(ticket)
    }

    /// Drain up to `budget` completed events without waiting.
    pub fn poll_events(&mut self, budget: usize) -> Vec<NavigatorEvent> {
        let mut drained = Vec::new();
        while drained.len() < budget {
            match self.events.try_recv() {
                Ok(event) => drained.push(event),
                Err(mpsc::error::TryRecvError::Empty | mpsc::error::TryRecvError::Disconnected) => {
                    break;
                }
            }
        }
        drained
    }

    /// Wait for the next completed event; `None` once the worker has stopped.
    pub async fn next_event(&mut self) -> Option<NavigatorEvent> {
        self.events.recv().await
    }

    /// Stop the worker after the command in flight, shutting the session down.
    pub async fn shutdown(self) {
        let Self {
            commands,
            events,
            task,
            ..
        } = self;
        // Unblocks a worker waiting on a full event channel.
        drop(events);
        let _ = commands.send(WorkerMessage::Shutdown);
        if let Err(e) = task.await {
            tracing::warn!("Navigator worker ended abnormally: {e}");
        }
    }
}
