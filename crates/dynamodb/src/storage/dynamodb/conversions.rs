//! DynamoDB attribute conversion functions.
//!
//! Pure functions for converting between SDK `AttributeValue` maps and the
//! store-neutral [`Value`] model. Testable without DynamoDB access.

use std::collections::{BTreeMap, HashMap};

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use panache_core::storage::{RepositoryError, Result};
use panache_core::value::{Item, Value};

/// Convert a value to an SDK attribute value.
pub fn to_attribute_value(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::S(s) => AttributeValue::S(s.clone()),
        Value::N(n) => AttributeValue::N(n.clone()),
        Value::B(b) => AttributeValue::B(Blob::new(b.clone())),
        Value::L(values) => AttributeValue::L(values.iter().map(to_attribute_value).collect()),
        Value::M(map) => AttributeValue::M(to_attribute_map(map)),
    }
}

/// Convert an SDK attribute value to a value.
///
/// String, number and binary sets come back as lists.
pub fn from_attribute_value(attribute: &AttributeValue) -> Result<Value> {
    Ok(match attribute {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::S(s) => Value::S(s.clone()),
        AttributeValue::N(n) => Value::N(n.clone()),
        AttributeValue::B(b) => Value::B(b.as_ref().to_vec()),
        AttributeValue::L(values) => Value::L(
            values
                .iter()
                .map(from_attribute_value)
                .collect::<Result<_>>()?,
        ),
        AttributeValue::M(map) => Value::M(from_attribute_map(map)?),
        AttributeValue::Ss(values) => Value::L(values.iter().cloned().map(Value::S).collect()),
        AttributeValue::Ns(values) => Value::L(values.iter().cloned().map(Value::N).collect()),
        AttributeValue::Bs(values) => Value::L(
            values
                .iter()
                .map(|b| Value::B(b.as_ref().to_vec()))
                .collect(),
        ),
        other => {
            return Err(RepositoryError::InvalidData(format!(
                "Unsupported attribute value: {other:?}"
            )))
        }
    })
}

/// Convert an item to an SDK attribute map.
pub fn to_attribute_map(item: &Item) -> HashMap<String, AttributeValue> {
    item.iter()
        .map(|(name, value)| (name.clone(), to_attribute_value(value)))
        .collect()
}

/// Convert an SDK attribute map to an item.
pub fn from_attribute_map(map: &HashMap<String, AttributeValue>) -> Result<Item> {
    map.iter()
        .map(|(name, attribute)| Ok((name.clone(), from_attribute_value(attribute)?)))
        .collect::<Result<BTreeMap<_, _>>>()
}

/// Convert expression values (`:v0`, ...) to an SDK map, `None` when empty.
pub fn to_expression_values(
    values: &BTreeMap<String, Value>,
) -> Option<HashMap<String, AttributeValue>> {
    if values.is_empty() {
        return None;
    }
    Some(
        values
            .iter()
            .map(|(placeholder, value)| (placeholder.clone(), to_attribute_value(value)))
            .collect(),
    )
}

/// Convert expression names (`#f0`, ...) to an SDK map, `None` when empty.
pub fn to_expression_names(names: &BTreeMap<String, String>) -> Option<HashMap<String, String>> {
    if names.is_empty() {
        return None;
    }
    Some(names.clone().into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Item {
        let mut nested = BTreeMap::new();
        nested.insert("origin".to_string(), Value::from("Spain"));

        let mut item = Item::new();
        item.insert("id".to_string(), Value::from("abc"));
        item.insert("weight".to_string(), Value::from(120));
        item.insert("ripe".to_string(), Value::Bool(true));
        item.insert("blob".to_string(), Value::B(vec![0, 1, 2]));
        item.insert("nothing".to_string(), Value::Null);
        item.insert(
            "tags".to_string(),
            Value::L(vec![Value::from("red"), Value::from(3)]),
        );
        item.insert("details".to_string(), Value::M(nested));
        item
    }

    #[test]
    fn test_item_round_trip() {
        let item = sample();
        let attributes = to_attribute_map(&item);
        assert_eq!(from_attribute_map(&attributes).unwrap(), item);
    }

    #[test]
    fn test_scalar_mapping() {
        assert_eq!(
            to_attribute_value(&Value::from("x")),
            AttributeValue::S("x".to_string())
        );
        assert_eq!(
            to_attribute_value(&Value::from(1.5)),
            AttributeValue::N("1.5".to_string())
        );
        assert_eq!(to_attribute_value(&Value::Null), AttributeValue::Null(true));
    }

    #[test]
    fn test_sets_become_lists() {
        let set = AttributeValue::Ss(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            from_attribute_value(&set).unwrap(),
            Value::L(vec![Value::from("a"), Value::from("b")])
        );
    }

    #[test]
    fn test_empty_expression_maps_are_omitted() {
        assert!(to_expression_values(&BTreeMap::new()).is_none());
        assert!(to_expression_names(&BTreeMap::new()).is_none());
    }
}
