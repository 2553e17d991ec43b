//! Navigator and worker behavior without a language server installed.

use std::time::{Duration, Instant};

use xref_lsp::{Command, LspError, Navigator, NavigatorEvent, NavigatorHandle};

use crate::common::{MISSING_SERVER, missing_server_config, workspace};

#[tokio::test]
async fn missing_server_fails_fast() {
    let (dir, file) = workspace();
    let mut navigator = Navigator::new(missing_server_config(), dir.path());

    let start = Instant::now();
    let err = navigator.find_references(&file, 2, 5).await.unwrap_err();
    assert!(start.elapsed() < Duration::from_millis(100));
    match &err {
        LspError::ServerNotFound { command, .. } => assert_eq!(command, MISSING_SERVER),
        other => panic!("expected ServerNotFound, got {other:?}"),
    }
    assert!(err.is_session_fatal());

    // Every operation reports the same error; nothing is left half-started.
    assert!(navigator.build_graph(&file, 5, 4).await.is_err());
    assert!(navigator.incoming_calls(&file, 5, 4).await.is_err());
    assert!(navigator.session_state().is_none());
    navigator.shutdown().await;
}

#[tokio::test]
async fn worker_reports_missing_server_as_event() {
    let (dir, file) = workspace();
    let mut handle = NavigatorHandle::spawn(Navigator::new(missing_server_config(), dir.path()));

    let ticket = handle
        .submit(Command::BuildGraph {
            path: file,
            line: 5,
            column: 4,
            limits: None,
            render: true,
        })
        .unwrap();
    let event = handle.next_event().await.unwrap();
    assert_eq!(event.ticket(), ticket);
    assert!(matches!(event, NavigatorEvent::Graph { .. }));
    assert_eq!(
        event.error().map(LspError::status_message).as_deref(),
        Some("Language server not available")
    );
    handle.shutdown().await;
}

#[tokio::test]
async fn relative_paths_resolve_against_root() {
    let (dir, _file) = workspace();
    let navigator = Navigator::new(missing_server_config(), dir.path());
    assert!(navigator.workspace_root().is_absolute());
    assert_eq!(navigator.config().graph.node_budget, 50);
}
