//! CLI command definitions.

mod table;

use clap::{Args, Parser, Subcommand, ValueEnum};

pub use table::TableArgs;

/// Explain and run panache filter queries against DynamoDB.
#[derive(Debug, Parser)]
#[command(name = "panache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Custom DynamoDB endpoint, e.g. http://localhost:8000.
    #[arg(long, global = true, env = "AWS_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// AWS region.
    #[arg(long, global = true, env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Prepended to the table name.
    #[arg(long, global = true, env = "PANACHE_TABLE_PREFIX")]
    pub table_prefix: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "pretty")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub table: TableArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Raw JSON output.
    Json,
    /// Human-readable output.
    #[default]
    Pretty,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show how a query translates, without touching the table.
    Explain {
        /// Filter query, e.g. "name = ?1 AND weight > ?2".
        query: String,
        #[command(flatten)]
        params: QueryParams,
    },
    /// Create the table with the declared key schema (pay per request).
    CreateTable,
    /// Run a query and print the matching items. Scans everything without a query.
    List {
        /// Filter query. Omit to scan the whole table.
        query: Option<String>,
        #[command(flatten)]
        params: QueryParams,
    },
    /// Print one item by key.
    Get {
        /// Partition key value, in parameter literal syntax.
        id: String,
        /// Sort key value, for tables with a sort key.
        #[arg(long)]
        sort: Option<String>,
    },
}

/// Query parameters, positional or named.
#[derive(Debug, Clone, Default, Args)]
pub struct QueryParams {
    /// Positional parameter bound to ?1, ?2, ... (repeatable).
    #[arg(long = "param", short = 'p')]
    pub positional: Vec<String>,

    /// Named parameter as name=value, bound to :name (repeatable).
    #[arg(long = "named", short = 'n')]
    pub named: Vec<String>,
}
