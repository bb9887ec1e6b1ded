//! CLI error types.

use panache_core::storage::RepositoryError;
use thiserror::Error;

/// Errors raised while turning arguments into metadata and values, or while
/// running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid parameter '{value}': {reason}")]
    InvalidParam { value: String, reason: String },

    #[error("Invalid field '{0}', expected name:type with type one of s, n, b, bool, l, m")]
    InvalidField(String),

    #[error("Invalid named parameter '{0}', expected name=value")]
    InvalidNamed(String),

    #[error("No table given, pass --table or set PANACHE_TABLE")]
    MissingTable,

    #[error("Positional and named parameters cannot be mixed")]
    MixedParams,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;
