//! Shared test utilities and fixtures

#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;
use xref_lsp::{
    CallHierarchyGraph, CallHierarchyItem, Location, NavigatorConfig, ServerConfig, SymbolKind,
};

pub const MISSING_SERVER: &str = "xref-integration-no-such-server";

/// Config whose language server cannot be found on `PATH`.
pub fn missing_server_config() -> NavigatorConfig {
    NavigatorConfig {
        server: ServerConfig {
            command: MISSING_SERVER.to_string(),
            ..ServerConfig::default()
        },
        ..NavigatorConfig::default()
    }
}

/// Temporary workspace holding `src/main.rs`.
pub fn workspace() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    std::fs::create_dir_all(&src).unwrap();
    let file = src.join("main.rs");
    std::fs::write(&file, "fn main() {\n    run();\n}\n\nfn run() {}\n").unwrap();
    (dir, file)
}

pub fn function(name: &str, file: &str, line: u32) -> CallHierarchyItem {
    CallHierarchyItem::new(name, Location::new(file, line, 4), SymbolKind::Function, None)
}

/// `main -> parse -> lex`, `main -> lex`.
pub fn sample_graph() -> CallHierarchyGraph {
    let mut graph = CallHierarchyGraph::new();
    let (main, _) = graph.add_node(function("main", "/ws/src/main.rs", 1));
    let (parse, _) = graph.add_node(function("parse", "/ws/src/parse.rs", 12));
    let (lex, _) = graph.add_node(function("lex", "/ws/src/lex.rs", 30));
    graph.add_edge(main, parse);
    graph.add_edge(parse, lex);
    graph.add_edge(main, lex);
    graph
}
