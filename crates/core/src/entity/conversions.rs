//! Attribute accessors for writing `Entity::from_item` implementations.
//!
//! Pure functions; each returns `InvalidData` naming the offending attribute.

use std::str::FromStr;

use crate::storage::{RepositoryError, Result};
use crate::value::{Item, Value};

/// Get a required string attribute.
pub fn get_string(item: &Item, key: &str) -> Result<String> {
    item.get(key)
        .and_then(Value::as_s)
        .map(str::to_string)
        .ok_or_else(|| missing(key))
}

/// Get an optional string attribute.
pub fn get_optional_string(item: &Item, key: &str) -> Option<String> {
    item.get(key).and_then(Value::as_s).map(str::to_string)
}

/// Get a required number attribute, parsed into `T`.
pub fn get_number<T: FromStr>(item: &Item, key: &str) -> Result<T> {
    let raw = item.get(key).and_then(Value::as_n).ok_or_else(|| missing(key))?;
    raw.trim()
        .parse()
        .map_err(|_| RepositoryError::InvalidData(format!("Invalid number {key}: {raw}")))
}

/// Get an optional number attribute, parsed into `T`.
pub fn get_optional_number<T: FromStr>(item: &Item, key: &str) -> Result<Option<T>> {
    match item.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => get_number(item, key).map(Some),
    }
}

/// Get a required boolean attribute.
pub fn get_bool(item: &Item, key: &str) -> Result<bool> {
    item.get(key)
        .and_then(Value::as_bool)
        .ok_or_else(|| missing(key))
}

/// Get a required binary attribute.
pub fn get_binary(item: &Item, key: &str) -> Result<Vec<u8>> {
    item.get(key)
        .and_then(Value::as_b)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| missing(key))
}

/// Insert an attribute only when the value is present.
pub fn put_optional(item: &mut Item, key: &str, value: Option<impl Into<Value>>) {
    if let Some(value) = value {
        item.insert(key.to_string(), value.into());
    }
}

fn missing(key: &str) -> RepositoryError {
    RepositoryError::InvalidData(format!("Missing or invalid field: {key}"))
}
