//! panache_cli - explain and run panache queries from the command line.

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
pub mod params;

pub use error::{CliError, Result};
