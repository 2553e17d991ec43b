//! Reference list filtering through the public API.

use std::path::Path;

use xref_lsp::{LspError, Location, ReferenceList, SymbolReference};

fn list() -> ReferenceList {
    let paths = [
        "/ws/src/main.rs",
        "/ws/src/parser/mod.rs",
        "/ws/tests/parser_test.rs",
        "/ws/src/parser/lexer.rs",
    ];
    let references = paths
        .iter()
        .enumerate()
        .map(|(i, path)| {
            SymbolReference::new(
                Location::new(*path, i as u32 + 1, 1),
                format!("parse({i});"),
                Vec::new(),
                Vec::new(),
            )
        })
        .collect();
    ReferenceList::new("parse", Path::new("/ws"), references)
}

fn visible_paths(list: &ReferenceList) -> Vec<String> {
    list.visible()
        .map(|r| r.location().file_path().display().to_string())
        .collect()
}

#[test]
fn terms_are_anded_and_negation_excludes() {
    let mut list = list();
    assert_eq!(list.apply_filter("parser !test").unwrap(), 2);
    assert_eq!(
        visible_paths(&list),
        vec!["/ws/src/parser/mod.rs", "/ws/src/parser/lexer.rs"]
    );
    assert_eq!(
        list.status_message(),
        "2 of 4 references to `parse` (filter: parser !test)"
    );
}

#[test]
fn clearing_restores_everything() {
    let mut list = list();
    list.apply_filter("*.rs !src/**").unwrap();
    assert_eq!(list.visible_len(), 1);

    list.clear_filter();
    assert_eq!(list.visible_len(), 4);
    assert!(list.active_filter().is_none());
    assert_eq!(list.status_message(), "4 references to `parse`");
}

#[test]
fn invalid_filter_keeps_previous() {
    let mut list = list();
    list.apply_filter("lexer").unwrap();
    let err = list.apply_filter("src/[").unwrap_err();
    assert!(matches!(err, LspError::InvalidFilter { .. }));
    assert_eq!(list.active_filter(), Some("lexer"));
    assert_eq!(list.visible_len(), 1);
}

#[test]
fn filter_that_matches_nothing() {
    let mut list = list();
    assert_eq!(list.apply_filter("*.py").unwrap(), 0);
    assert_eq!(list.visible().count(), 0);
    assert_eq!(list.len(), 4);
}
