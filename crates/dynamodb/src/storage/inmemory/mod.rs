//! In-memory storage backend.
//!
//! Keeps tables in process memory for the test suites. Follows the DynamoDB
//! backend's paging, key typing and batch limits.

mod eval;
mod table;

pub use table::{InMemoryProvider, InMemoryTable, DEFAULT_PAGE_SIZE};
