//! `xref` binary: one navigation query per invocation.
//!
//! ```text
//! main() -> Cli::parse() -> load_config() -> NavigatorHandle::spawn()
//!                                                |
//!                                   submit(Command) -> next_event()
//!                                                |
//!                                   print result | status line + exit 1
//! ```
//!
//! Logs go to `~/.xref/logs/xref.log` so stdout stays clean for piping.

use std::{
    env,
    fs::{self, OpenOptions},
    io::{Write, stdout},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Mutex,
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use xref_cli::output::{format_callers, format_references};
use xref_cli::{Cli, CliCommand, GraphFormat, config_path, load_config};
use xref_lsp::{
    Command, GraphOutcome, GraphView, LspError, Navigator, NavigatorEvent, NavigatorHandle,
    to_graph_description, to_text_tree,
};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // Results are printed on stdout; no log file means no logs.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.xref/logs/xref.log
    if let Some(config_path) = config_path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("xref.log"));
    }

    // Fallback: ./.xref/logs/xref.log
    candidates.push(PathBuf::from(".xref").join("logs").join("xref.log"));

    candidates
}

fn emit(text: &[u8], out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))
        }
        None => {
            let mut stdout = stdout().lock();
            stdout.write_all(text).context("writing to stdout")?;
            stdout.flush().context("flushing stdout")
        }
    }
}

fn fail(error: &LspError) -> ExitCode {
    tracing::warn!("Query failed: {error}");
    eprintln!("{}", error.status_message());
    ExitCode::FAILURE
}

fn print_graph(outcome: &GraphOutcome, format: GraphFormat, out: Option<&Path>) -> Result<ExitCode> {
    let graph = &outcome.graph;
    match (format, &outcome.view) {
        (GraphFormat::Dot, _) => emit(to_graph_description(graph).as_bytes(), out)?,
        (GraphFormat::Png, Some(GraphView::Image { png, .. })) => {
            emit(png, out)?;
        }
        (GraphFormat::Png, Some(GraphView::Text { note, .. })) => {
            if let Some(note) = note {
                eprintln!("{note}");
            }
            emit(to_text_tree(graph).as_bytes(), out)?;
        }
        (GraphFormat::Text | GraphFormat::Png, _) => {
            emit(to_text_tree(graph).as_bytes(), out)?;
        }
    }
    eprintln!("{}", graph.status_message());
    Ok(ExitCode::SUCCESS)
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = load_config(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    let root = match &cli.root {
        Some(root) => root.clone(),
        None => env::current_dir().context("resolving the current directory")?,
    };
    let position = cli.position().clone();

    if let CliCommand::Calls {
        format: GraphFormat::Png,
        out: None,
        ..
    } = &cli.command
    {
        anyhow::bail!("--format png needs --out");
    }

    let command = match &cli.command {
        CliCommand::Refs { .. } => Command::FindReferences {
            path: position.file,
            line: position.line,
            column: position.column,
        },
        CliCommand::Calls { format, .. } => Command::BuildGraph {
            path: position.file,
            line: position.line,
            column: position.column,
            limits: None,
            render: *format == GraphFormat::Png,
        },
        CliCommand::Callers { .. } => Command::IncomingCalls {
            path: position.file,
            line: position.line,
            column: position.column,
        },
    };

    let navigator = Navigator::new(config, &root);
    let root = navigator.workspace_root().to_path_buf();
    let mut handle = NavigatorHandle::spawn(navigator);
    handle.submit(command)?;
    let event = handle.next_event().await;
    handle.shutdown().await;

    let Some(event) = event else {
        anyhow::bail!("navigator worker stopped without answering");
    };

    match (event, &cli.command) {
        (NavigatorEvent::References { result, .. }, CliCommand::Refs { filter, .. }) => {
            let mut list = match result {
                Ok(list) => list,
                Err(e) => return Ok(fail(&e)),
            };
            if let Some(pattern) = filter
                && let Err(e) = list.apply_filter(pattern)
            {
                return Ok(fail(&e));
            }
            emit(format_references(&list, &root).as_bytes(), None)?;
            Ok(ExitCode::SUCCESS)
        }
        (NavigatorEvent::Graph { result, .. }, CliCommand::Calls { format, out, .. }) => {
            match result {
                Ok(outcome) => print_graph(&outcome, *format, out.as_deref()),
                Err(e) => Ok(fail(&e)),
            }
        }
        (NavigatorEvent::Callers { result, .. }, CliCommand::Callers { .. }) => match result {
            Ok(callers) => {
                emit(format_callers(&callers, &root).as_bytes(), None)?;
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => Ok(fail(&e)),
        },
        (event, _) => anyhow::bail!("unexpected navigator event {event:?}"),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing();
    run(cli).await
}
