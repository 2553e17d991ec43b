//! Internal LSP message serde types for JSON-RPC communication.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LspError;

pub(crate) const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, thiserror::Error)]
#[error("cannot convert path to file URI: {}", path.display())]
pub(crate) struct PathToUriError {
    path: PathBuf,
}

impl From<PathToUriError> for LspError {
    fn from(err: PathToUriError) -> Self {
        Self::Io {
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()),
            path: err.path,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Request<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl<'a> Request<'a> {
    pub fn new(id: u64, method: &'a str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Notification<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl<'a> Notification<'a> {
    pub fn new(method: &'a str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
        }
    }
}

/// Error object of a JSON-RPC response.
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

pub(crate) fn initialize_params(root_uri: &str) -> serde_json::Value {
    serde_json::json!({
        "processId": std::process::id(),
        "rootUri": root_uri,
        "capabilities": {
            "textDocument": {
                "synchronization": {
                    "dynamicRegistration": false,
                    "willSave": false,
                    "willSaveWaitUntil": false,
                    "didSave": false
                },
                "references": {
                    "dynamicRegistration": false
                },
                "callHierarchy": {
                    "dynamicRegistration": false
                }
            }
        },
        "workspaceFolders": [{
            "uri": root_uri,
            "name": "workspace"
        }]
    })
}

pub(crate) fn did_open_params(
    uri: &str,
    language_id: &str,
    version: i32,
    text: &str,
) -> serde_json::Value {
    serde_json::json!({
        "textDocument": {
            "uri": uri,
            "languageId": language_id,
            "version": version,
            "text": text
        }
    })
}

/// `TextDocumentPositionParams` from 0-indexed coordinates.
pub(crate) fn position_params(uri: &str, line: u32, character: u32) -> serde_json::Value {
    serde_json::json!({
        "textDocument": { "uri": uri },
        "position": { "line": line, "character": character }
    })
}

pub(crate) fn reference_params(uri: &str, line: u32, character: u32) -> serde_json::Value {
    let mut params = position_params(uri, line, character);
    params["context"] = serde_json::json!({ "includeDeclaration": true });
    params
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct LspPosition {
    pub line: u32,
    pub character: u32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct LspRange {
    pub start: LspPosition,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LspLocation {
    pub uri: String,
    pub range: LspRange,
}

/// A call hierarchy item as the server sent it.
///
/// The raw JSON is kept so follow-up requests echo the item back unchanged,
/// including server-private `data`.
#[derive(Debug, Clone)]
pub(crate) struct WireCallItem {
    pub name: String,
    pub kind: u32,
    pub detail: Option<String>,
    pub uri: String,
    pub selection_range: LspRange,
    pub raw: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallItemFields {
    name: String,
    kind: u32,
    #[serde(default)]
    detail: Option<String>,
    uri: String,
    selection_range: LspRange,
}

impl WireCallItem {
    pub fn from_value(raw: serde_json::Value) -> Result<Self, serde_json::Error> {
        let fields: CallItemFields = serde_json::from_value(raw.clone())?;
        Ok(Self {
            name: fields.name,
            kind: fields.kind,
            detail: fields.detail,
            uri: fields.uri,
            selection_range: fields.selection_range,
            raw,
        })
    }
}

/// Parse a `CallHierarchyItem[] | null` result.
pub(crate) fn parse_call_items(
    result: serde_json::Value,
) -> Result<Vec<WireCallItem>, serde_json::Error> {
    match result {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Array(items) => items.into_iter().map(WireCallItem::from_value).collect(),
        other => Err(serde::de::Error::custom(format!(
            "expected array of call hierarchy items, got {other}"
        ))),
    }
}

/// Parse `CallHierarchyOutgoingCall[] | null` (field `to`) or
/// `CallHierarchyIncomingCall[] | null` (field `from`).
pub(crate) fn parse_calls(
    result: serde_json::Value,
    field: &str,
) -> Result<Vec<WireCallItem>, serde_json::Error> {
    match result {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Array(calls) => calls
            .into_iter()
            .map(|mut call| {
                let item = call
                    .get_mut(field)
                    .map(serde_json::Value::take)
                    .ok_or_else(|| {
                        <serde_json::Error as serde::de::Error>::custom(format!(
                            "call entry missing `{field}`"
                        ))
                    })?;
                WireCallItem::from_value(item)
            })
            .collect(),
        other => Err(serde::de::Error::custom(format!(
            "expected array of calls, got {other}"
        ))),
    }
}

/// Parse `Location[] | null` from a references result.
pub(crate) fn parse_locations(
    result: serde_json::Value,
) -> Result<Vec<LspLocation>, serde_json::Error> {
    if result.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(result)
}

pub(crate) fn path_to_file_uri(path: &Path) -> Result<url::Url, PathToUriError> {
    url::Url::from_file_path(path).map_err(|()| PathToUriError {
        path: path.to_path_buf(),
    })
}

pub(crate) fn file_uri_to_path(uri: &str) -> Option<PathBuf> {
    url::Url::parse(uri)
        .ok()
        .and_then(|u| u.to_file_path().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_advertises_navigation_capabilities() {
        let params = initialize_params("file:///ws");
        let text_document = &params["capabilities"]["textDocument"];
        assert!(text_document["callHierarchy"].is_object());
        assert_eq!(text_document["references"]["dynamicRegistration"], false);
        assert_eq!(params["workspaceFolders"][0]["uri"], "file:///ws");
    }

    #[test]
    fn test_did_open_carries_full_text() {
        let params = did_open_params("file:///ws/lib.rs", "rust", 1, "pub fn run() {}");
        let document = &params["textDocument"];
        assert_eq!(document["languageId"], "rust");
        assert_eq!(document["version"], 1);
        assert_eq!(document["text"], "pub fn run() {}");
    }

    #[test]
    fn test_reference_params_include_declaration() {
        let params = reference_params("file:///a.rs", 4, 7);
        assert_eq!(params["position"]["line"], 4);
        assert_eq!(params["position"]["character"], 7);
        assert_eq!(params["context"]["includeDeclaration"], true);
    }

    #[test]
    fn test_request_omits_absent_params() {
        let bare = serde_json::to_value(Request::new(9, "shutdown", None)).unwrap();
        assert!(bare.get("params").is_none());

        let prepare = Request::new(
            10,
            "textDocument/prepareCallHierarchy",
            Some(position_params("file:///a.rs", 0, 3)),
        );
        let json = serde_json::to_value(&prepare).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], 10);
        assert_eq!(json["params"]["position"]["character"], 3);
    }

    #[test]
    fn test_notification_has_no_id() {
        let json = serde_json::to_value(Notification::new("exit", None)).unwrap();
        assert_eq!(json["method"], "exit");
        assert!(json.get("id").is_none());
        assert!(json.get("params").is_none());
    }

    #[test]
    fn test_parse_locations_null_is_empty() {
        assert!(parse_locations(serde_json::Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_parse_locations_array() {
        let result = serde_json::json!([{
            "uri": "file:///src/a.rs",
            "range": { "start": { "line": 2, "character": 4 }, "end": { "line": 2, "character": 9 } }
        }]);
        let locs = parse_locations(result).unwrap();
        assert_eq!(locs.len(), 1);
        assert_eq!(locs[0].range.start.line, 2);
        assert_eq!(locs[0].range.start.character, 4);
    }

    #[test]
    fn test_parse_locations_wrong_shape() {
        assert!(parse_locations(serde_json::json!({"uri": 3})).is_err());
    }

    #[test]
    fn test_call_item_keeps_raw_json() {
        let raw = serde_json::json!({
            "name": "main",
            "kind": 12,
            "uri": "file:///src/main.rs",
            "range": { "start": { "line": 0, "character": 0 }, "end": { "line": 3, "character": 1 } },
            "selectionRange": { "start": { "line": 0, "character": 3 }, "end": { "line": 0, "character": 7 } },
            "data": { "opaque": 42 }
        });
        let item = WireCallItem::from_value(raw.clone()).unwrap();
        assert_eq!(item.name, "main");
        assert_eq!(item.kind, 12);
        assert_eq!(item.selection_range.start.character, 3);
        assert_eq!(item.raw, raw);
    }

    #[test]
    fn test_parse_outgoing_calls() {
        let result = serde_json::json!([{
            "to": {
                "name": "helper",
                "kind": 12,
                "uri": "file:///src/lib.rs",
                "range": { "start": { "line": 9, "character": 0 }, "end": { "line": 12, "character": 1 } },
                "selectionRange": { "start": { "line": 9, "character": 3 }, "end": { "line": 9, "character": 9 } }
            },
            "fromRanges": []
        }]);
        let calls = parse_calls(result, "to").unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "helper");
        assert!(parse_calls(serde_json::json!([{"fromRanges": []}]), "to").is_err());
    }

    #[test]
    fn test_workspace_path_survives_uri_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("src").join("main.rs");
        let uri = path_to_file_uri(&path).unwrap();
        assert_eq!(uri.scheme(), "file");
        assert_eq!(file_uri_to_path(uri.as_str()), Some(path));
    }

    #[test]
    fn test_relative_path_has_no_uri() {
        let err = LspError::from(path_to_file_uri(Path::new("src/main.rs")).unwrap_err());
        assert!(matches!(err, LspError::Io { .. }));
    }

    #[test]
    fn test_only_file_uris_map_to_paths() {
        assert!(file_uri_to_path("untitled:Untitled-1").is_none());
        assert!(file_uri_to_path("https://example.com/a.rs").is_none());
    }
}
