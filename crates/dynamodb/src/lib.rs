//! Imperative shell of panache: entity operations, typed repositories and
//! query execution over DynamoDB tables.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use panache_dynamodb::storage::DynamoDbProvider;
//! use panache_dynamodb::Operations;
//!
//! # async fn run() {
//! let provider = DynamoDbProvider::from_env().await;
//! let ops = Operations::new(Arc::new(provider));
//! # let _ = ops;
//! # }
//! ```

pub mod config;
pub mod executor;
pub mod operations;
pub mod query;
pub mod repository;
pub mod storage;

#[cfg(test)]
mod testing;

pub use config::DynamoDbConfig;
pub use executor::{execute, PageCursor};
pub use operations::Operations;
pub use query::PanacheQuery;
pub use repository::Repository;
