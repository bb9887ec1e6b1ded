use thiserror::Error;

/// Errors that can occur during repository and query operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },
    #[error("Binding error: {0}")]
    Binding(String),
    #[error("Unknown field '{field}' on {entity_type}")]
    UnknownField { entity_type: String, field: String },
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Write failed: {0}")]
    WriteFailed(String),
    #[error("Batch write left {unprocessed} unprocessed items")]
    UnprocessedItems { unprocessed: usize },
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl RepositoryError {
    /// Returns true for errors raised by the query language itself, before any
    /// call reaches the table.
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            RepositoryError::Syntax { .. }
                | RepositoryError::Binding(_)
                | RepositoryError::UnknownField { .. }
        )
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
