//! Public types consumed by the host UI.
//!
//! The host constructs a [`NavigatorConfig`] (usually deserialised from TOML),
//! and receives [`Location`]-based results from the navigator.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Configuration for the whole navigation subsystem.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NavigatorConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub graph: GraphLimits,
    #[serde(default)]
    pub layout: LayoutConfig,
}

/// The single language server backing a session.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Executable resolved through `PATH` (e.g. "rust-analyzer").
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// LSP language identifier sent with `didOpen`.
    #[serde(default = "default_language_id")]
    pub language_id: String,
}

fn default_command() -> String {
    "rust-analyzer".to_string()
}

fn default_language_id() -> String {
    "rust".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: Vec::new(),
            language_id: default_language_id(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_handshake_ms")]
    pub handshake_ms: u64,
    #[serde(default = "default_request_ms")]
    pub request_ms: u64,
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

const fn default_handshake_ms() -> u64 {
    2000
}

const fn default_request_ms() -> u64 {
    3000
}

const fn default_shutdown_grace_ms() -> u64 {
    500
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            handshake_ms: default_handshake_ms(),
            request_ms: default_request_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl TimeoutConfig {
    #[must_use]
    pub fn handshake(&self) -> Duration {
        Duration::from_millis(self.handshake_ms)
    }

    #[must_use]
    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }

    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Bounds on call-hierarchy expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GraphLimits {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_node_budget")]
    pub node_budget: usize,
}

const fn default_max_depth() -> usize {
    3
}

const fn default_node_budget() -> usize {
    50
}

impl Default for GraphLimits {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            node_budget: default_node_budget(),
        }
    }
}

/// External graph layout tool (Graphviz `dot` by default).
#[derive(Debug, Clone, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_layout_command")]
    pub command: String,
    #[serde(default = "default_layout_args")]
    pub args: Vec<String>,
    #[serde(default = "default_layout_timeout_ms")]
    pub timeout_ms: u64,
}

const fn default_true() -> bool {
    true
}

fn default_layout_command() -> String {
    "dot".to_string()
}

fn default_layout_args() -> Vec<String> {
    vec!["-Tpng".to_string()]
}

const fn default_layout_timeout_ms() -> u64 {
    5000
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: default_layout_command(),
            args: default_layout_args(),
            timeout_ms: default_layout_timeout_ms(),
        }
    }
}

impl LayoutConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// A position in a file. Line and column are 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    file_path: PathBuf,
    line: u32,
    column: u32,
}

impl Location {
    /// Both `line` and `column` are clamped to at least 1.
    #[must_use]
    pub fn new(file_path: impl Into<PathBuf>, line: u32, column: u32) -> Self {
        Self {
            file_path: file_path.into(),
            line: line.max(1),
            column: column.max(1),
        }
    }

    /// Build from 0-indexed LSP coordinates.
    #[must_use]
    pub(crate) fn from_lsp(file_path: PathBuf, line: u32, character: u32) -> Self {
        Self::new(file_path, line.saturating_add(1), character.saturating_add(1))
    }

    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[must_use]
    pub fn column(&self) -> u32 {
        self.column
    }

    /// 0-indexed (line, character) for LSP requests.
    #[must_use]
    pub(crate) fn to_lsp(&self) -> (u32, u32) {
        (self.line - 1, self.column - 1)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file_path.display(), self.line, self.column)
    }
}

/// LSP symbol kinds (mirrors the numeric `SymbolKind` of the protocol).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    File,
    Module,
    Namespace,
    Package,
    Class,
    Method,
    Property,
    Field,
    Constructor,
    Enum,
    Interface,
    Function,
    Variable,
    Constant,
    String,
    Number,
    Boolean,
    Array,
    Object,
    Key,
    Null,
    EnumMember,
    Struct,
    Event,
    Operator,
    TypeParameter,
    Unknown,
}

impl SymbolKind {
    /// Convert from the LSP numeric kind; unknown values map to `Unknown`.
    #[must_use]
    pub fn from_lsp(value: u32) -> Self {
        match value {
            1 => Self::File,
            2 => Self::Module,
            3 => Self::Namespace,
            4 => Self::Package,
            5 => Self::Class,
            6 => Self::Method,
            7 => Self::Property,
            8 => Self::Field,
            9 => Self::Constructor,
            10 => Self::Enum,
            11 => Self::Interface,
            12 => Self::Function,
            13 => Self::Variable,
            14 => Self::Constant,
            15 => Self::String,
            16 => Self::Number,
            17 => Self::Boolean,
            18 => Self::Array,
            19 => Self::Object,
            20 => Self::Key,
            21 => Self::Null,
            22 => Self::EnumMember,
            23 => Self::Struct,
            24 => Self::Event,
            25 => Self::Operator,
            26 => Self::TypeParameter,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Module => "module",
            Self::Namespace => "namespace",
            Self::Package => "package",
            Self::Class => "class",
            Self::Method => "method",
            Self::Property => "property",
            Self::Field => "field",
            Self::Constructor => "constructor",
            Self::Enum => "enum",
            Self::Interface => "interface",
            Self::Function => "fn",
            Self::Variable => "variable",
            Self::Constant => "const",
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "bool",
            Self::Array => "array",
            Self::Object => "object",
            Self::Key => "key",
            Self::Null => "null",
            Self::EnumMember => "variant",
            Self::Struct => "struct",
            Self::Event => "event",
            Self::Operator => "operator",
            Self::TypeParameter => "type param",
            Self::Unknown => "symbol",
        }
    }
}
