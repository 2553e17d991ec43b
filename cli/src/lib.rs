//! Command-line front end for `xref-lsp`.
//!
//! The binary in `main.rs` only wires these pieces together: argument
//! parsing ([`args`]), config file loading ([`config`]) and plain-text
//! formatting of results ([`output`]).

pub mod args;
pub mod config;
pub mod output;

pub use args::{Cli, CliCommand, GraphFormat, Position};
pub use config::{ConfigError, config_path, load_config};
