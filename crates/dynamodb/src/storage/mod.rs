//! Storage backend implementations.
//!
//! This module provides concrete implementations of the table traits
//! defined in `panache_core::storage`. Backends are selected at compile
//! time via feature flags.
//!
//! # Feature Flags
//!
//! - `dynamodb` (default): AWS DynamoDB backend using `aws-sdk-dynamodb`
//! - `inmemory` (default): process-local backend for tests and dry runs
//!
//! Both can be enabled at once; the caller picks a provider at runtime.
//!
//! # Examples
//!
//! Build without the AWS SDK:
//! ```bash
//! cargo build -p panache_dynamodb --no-default-features --features inmemory
//! ```

#[cfg(not(any(feature = "dynamodb", feature = "inmemory")))]
compile_error!(
    "No storage backend selected. Enable the 'dynamodb' or 'inmemory' feature. \
    Example: cargo build -p panache_dynamodb --features inmemory"
);

#[cfg(feature = "dynamodb")]
pub mod dynamodb;

#[cfg(feature = "inmemory")]
pub mod inmemory;

#[cfg(feature = "dynamodb")]
pub use dynamodb::{DynamoDbProvider, DynamoDbTable};

#[cfg(feature = "inmemory")]
pub use inmemory::{InMemoryProvider, InMemoryTable};
