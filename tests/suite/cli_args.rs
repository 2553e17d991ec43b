//! Command-line parsing and config overrides.

use std::path::PathBuf;

use clap::Parser;
use xref_cli::{Cli, CliCommand, GraphFormat, load_config};
use xref_lsp::NavigatorConfig;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("xref").chain(args.iter().copied())).unwrap()
}

#[test]
fn refs_with_filter() {
    let cli = parse(&["refs", "src/main.rs", "2", "5", "--filter", "!test src"]);
    match &cli.command {
        CliCommand::Refs { position, filter } => {
            assert_eq!(position.file, PathBuf::from("src/main.rs"));
            assert_eq!((position.line, position.column), (2, 5));
            assert_eq!(filter.as_deref(), Some("!test src"));
        }
        other => panic!("expected refs, got {other:?}"),
    }
    assert!(cli.root.is_none());
}

#[test]
fn calls_defaults_to_text() {
    let cli = parse(&["calls", "lib.rs", "10", "1"]);
    match &cli.command {
        CliCommand::Calls {
            depth,
            budget,
            format,
            out,
            ..
        } => {
            assert!(depth.is_none());
            assert!(budget.is_none());
            assert_eq!(*format, GraphFormat::Text);
            assert!(out.is_none());
        }
        other => panic!("expected calls, got {other:?}"),
    }
}

#[test]
fn global_flags_after_subcommand() {
    let cli = parse(&["callers", "a.rs", "1", "1", "--root", "/ws", "--server", "clangd"]);
    assert_eq!(cli.root, Some(PathBuf::from("/ws")));
    assert_eq!(cli.server.as_deref(), Some("clangd"));
    assert_eq!(cli.position().file, PathBuf::from("a.rs"));
}

#[test]
fn zero_line_is_rejected() {
    assert!(Cli::try_parse_from(["xref", "refs", "a.rs", "0", "1"]).is_err());
    assert!(Cli::try_parse_from(["xref", "refs", "a.rs", "1"]).is_err());
}

#[test]
fn unknown_format_is_rejected() {
    assert!(Cli::try_parse_from(["xref", "calls", "a.rs", "1", "1", "--format", "svg"]).is_err());
}

#[test]
fn flags_override_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[server]\ncommand = \"pyright\"\n\n[graph]\nmax_depth = 5\n").unwrap();

    let cli = parse(&[
        "calls", "a.py", "3", "1", "--depth", "2", "--budget", "10", "--format", "dot",
    ]);
    let mut config = load_config(Some(&path)).unwrap();
    cli.apply_overrides(&mut config);
    assert_eq!(config.server.command, "pyright");
    assert_eq!(config.graph.max_depth, 2);
    assert_eq!(config.graph.node_budget, 10);

    let cli = parse(&["--server", "ra-multiplex", "refs", "a.rs", "1", "1"]);
    let mut config = NavigatorConfig::default();
    cli.apply_overrides(&mut config);
    assert_eq!(config.server.command, "ra-multiplex");
    assert_eq!(config.graph.max_depth, 3);
}
