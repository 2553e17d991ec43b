use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use xref_lsp::NavigatorConfig;

#[derive(Debug, Parser)]
#[command(
    name = "xref",
    version,
    about = "Find references and explore call graphs through a language server"
)]
pub struct Cli {
    /// Workspace root handed to the language server. Defaults to the
    /// current directory.
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Config file to use instead of `~/.xref/config.toml`.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Language server executable, overriding the config file.
    #[arg(long, global = true, value_name = "COMMAND")]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Cursor position, 1-indexed like editor status bars.
#[derive(Debug, Clone, Args)]
pub struct Position {
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
    #[arg(value_name = "LINE", value_parser = clap::value_parser!(u32).range(1..))]
    pub line: u32,
    #[arg(value_name = "COLUMN", value_parser = clap::value_parser!(u32).range(1..))]
    pub column: u32,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// List every reference to the symbol under the cursor.
    Refs {
        #[command(flatten)]
        position: Position,
        /// Glob filter on file paths; `!term` excludes, terms are ANDed.
        #[arg(long, short)]
        filter: Option<String>,
    },
    /// Build the outgoing call graph of the function under the cursor.
    Calls {
        #[command(flatten)]
        position: Position,
        /// Maximum expansion depth from the root function.
        #[arg(long)]
        depth: Option<usize>,
        /// Maximum number of functions in the graph.
        #[arg(long)]
        budget: Option<usize>,
        #[arg(long, value_enum, default_value_t = GraphFormat::Text)]
        format: GraphFormat,
        /// Write the result here instead of stdout. Required for `png`.
        #[arg(long, short, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// List the direct callers of the function under the cursor.
    Callers {
        #[command(flatten)]
        position: Position,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    /// Indented tree.
    Text,
    /// Graphviz DOT source.
    Dot,
    /// Image from the configured layout tool.
    Png,
}

impl Cli {
    /// Fold command-line overrides into `config`.
    pub fn apply_overrides(&self, config: &mut NavigatorConfig) {
        if let Some(server) = &self.server {
            config.server.command.clone_from(server);
        }
        if let CliCommand::Calls { depth, budget, .. } = &self.command {
            if let Some(depth) = depth {
                config.graph.max_depth = *depth;
            }
            if let Some(budget) = budget {
                config.graph.node_budget = *budget;
            }
        }
    }

    #[must_use]
    pub fn position(&self) -> &Position {
        match &self.command {
            CliCommand::Refs { position, .. }
            | CliCommand::Calls { position, .. }
            | CliCommand::Callers { position } => position,
        }
    }
}
