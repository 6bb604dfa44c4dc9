pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "catalog-facets")]
#[command(about = "Quick filter queries and facet hierarchies for a metadata catalog")]
pub struct CliConfig {
    /// Path to the catalog TOML configuration
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Base directory for input and output files
    #[arg(long, default_value = ".", global = true)]
    pub base_path: String,

    /// Write the result to this file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Build a query filter from `{label: [values]}` selections
    BuildQuery {
        #[arg(long)]
        selections: String,
    },
    /// Recover `{label: [values]}` selections from a query filter
    Recover {
        #[arg(long)]
        query: String,
    },
    /// Resolve the next hierarchy bucket and its scoping query
    NextBucket {
        #[arg(long)]
        database: bool,
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        value: Option<String>,
    },
    /// Filter a JSON array of documents with the given selections
    Search {
        #[arg(long)]
        docs: String,
        #[arg(long)]
        selections: Option<String>,
    },
}
