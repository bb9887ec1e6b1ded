//! DynamoDB table backend.
//!
//! Implements the table traits from `panache_core::storage` using
//! `aws-sdk-dynamodb`.

mod conversions;
mod error;
mod table;

pub use conversions::{
    from_attribute_map, from_attribute_value, to_attribute_map, to_attribute_value,
};
pub use table::{DynamoDbProvider, DynamoDbTable};
