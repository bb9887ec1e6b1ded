//! panache CLI entry point.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use panache_cli::cli::{Cli, Commands, OutputFormat};
use panache_cli::commands;
use panache_cli::output::{format_output, pretty};
use panache_core::storage::TableProvider;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "panache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let metadata = cli.table.metadata()?;

    match &cli.command {
        Commands::Explain { query, params } => {
            let explanation = commands::explain(&metadata, query, params)?;
            match cli.format {
                OutputFormat::Json => println!("{}", format_output(&explanation, cli.format)),
                OutputFormat::Pretty => println!("{}", pretty::format_explanation(&explanation)),
            }
        }
        Commands::CreateTable => {
            let provider = commands::connect(&cli).await;
            let table = provider.table(Arc::new(metadata))?;
            commands::create_table(table.as_ref()).await?;
            println!("Created table {}", table.table_name());
        }
        Commands::List { query, params } => {
            let condition = commands::resolve_condition(&metadata, query.as_deref(), params)?;
            let provider = commands::connect(&cli).await;
            let table = provider.table(Arc::new(metadata))?;
            let items = commands::list(table, condition).await?;
            match cli.format {
                OutputFormat::Json => println!("{}", format_output(&items, cli.format)),
                OutputFormat::Pretty => println!("{}", pretty::format_items(&items)),
            }
        }
        Commands::Get { id, sort } => {
            let provider = commands::connect(&cli).await;
            let table = provider.table(Arc::new(metadata))?;
            let item = commands::get(table.as_ref(), id, sort.as_deref()).await?;
            match (cli.format, item) {
                (OutputFormat::Json, item) => println!("{}", format_output(&item, cli.format)),
                (OutputFormat::Pretty, Some(item)) => println!("{}", pretty::format_item(&item)),
                (OutputFormat::Pretty, None) => println!("No item found."),
            }
        }
    }

    Ok(())
}
