use std::collections::{BTreeMap, HashMap};

use crate::storage::{RepositoryError, Result};
use crate::value::Value;

use super::ast::{Operand, Placeholder, Predicate};

/// Named query parameters.
///
/// ```
/// use panache_core::query::Parameters;
///
/// let params = Parameters::with("name", "apple").and("max", 200);
/// assert_eq!(params.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    values: BTreeMap<String, Value>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().and(name, value)
    }

    pub fn and(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<HashMap<String, Value>> for Parameters {
    fn from(map: HashMap<String, Value>) -> Self {
        Self {
            values: map.into_iter().collect(),
        }
    }
}

/// Placeholder values for one query call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterBinding {
    values: BTreeMap<Placeholder, Value>,
}

impl ParameterBinding {
    /// Binds `?1..?N` to `params` in order.
    pub fn positional(params: &[Value]) -> Self {
        Self {
            values: params
                .iter()
                .enumerate()
                .map(|(i, v)| (Placeholder::Positional(i + 1), v.clone()))
                .collect(),
        }
    }

    /// Binds `:name` for every entry of `params`.
    pub fn named(params: &Parameters) -> Self {
        Self {
            values: params
                .iter()
                .map(|(k, v)| (Placeholder::Named(k.to_string()), v.clone()))
                .collect(),
        }
    }

    pub fn get(&self, placeholder: &Placeholder) -> Option<&Value> {
        self.values.get(placeholder)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replaces every placeholder in `predicate` with its bound value.
    ///
    /// Every referenced placeholder must have a value and every value must be
    /// referenced. A predicate may not mix `?N` and `:name` placeholders.
    pub fn bind(&self, predicate: &Predicate) -> Result<Predicate> {
        let referenced = predicate.placeholders();

        let positional = referenced
            .iter()
            .any(|p| matches!(p, Placeholder::Positional(_)));
        let named = referenced
            .iter()
            .any(|p| matches!(p, Placeholder::Named(_)));
        if positional && named {
            return Err(RepositoryError::Binding(
                "query mixes positional and named parameters".to_string(),
            ));
        }

        if let Some(missing) = referenced.iter().find(|p| !self.values.contains_key(*p)) {
            return Err(RepositoryError::Binding(format!(
                "no value supplied for parameter {missing}"
            )));
        }

        if let Some(unused) = self.values.keys().find(|p| !referenced.contains(*p)) {
            return Err(RepositoryError::Binding(format!(
                "parameter {unused} is not used in the query"
            )));
        }

        predicate.try_map_operands(&mut |operand| match operand {
            Operand::Placeholder(p) => self
                .values
                .get(p)
                .cloned()
                .map(Operand::Literal)
                .ok_or_else(|| {
                    RepositoryError::Binding(format!("no value supplied for parameter {p}"))
                }),
            Operand::Literal(value) => Ok(Operand::Literal(value.clone())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse;

    #[test]
    fn test_parameters_builder() {
        let params = Parameters::with("name", "apple").and("weight", 120);
        assert_eq!(params.get("name"), Some(&Value::from("apple")));
        assert_eq!(params.get("weight"), Some(&Value::from(120)));
        assert!(params.get("colour").is_none());
    }

    #[test]
    fn test_parameters_from_iterator() {
        let params: Parameters = vec![("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_positional_binding_is_one_based() {
        let binding = ParameterBinding::positional(&[Value::from("x"), Value::from(2)]);
        assert_eq!(
            binding.get(&Placeholder::Positional(1)),
            Some(&Value::from("x"))
        );
        assert_eq!(binding.get(&Placeholder::Positional(2)), Some(&Value::from(2)));
        assert!(binding.get(&Placeholder::Positional(0)).is_none());
    }

    #[test]
    fn test_bind_substitutes_values() {
        let predicate = parse("name = ?1 AND weight > ?2").unwrap();
        let bound = ParameterBinding::positional(&[Value::from("apple"), Value::from(100)])
            .bind(&predicate)
            .unwrap();
        assert_eq!(bound.to_string(), "name = 'apple' AND weight > 100");
        assert!(bound.placeholders().is_empty());
    }

    #[test]
    fn test_bind_named() {
        let predicate = parse("name = :name").unwrap();
        let bound = ParameterBinding::named(&Parameters::with("name", "pear"))
            .bind(&predicate)
            .unwrap();
        assert_eq!(bound.to_string(), "name = 'pear'");
    }

    #[test]
    fn test_repeated_placeholder_binds_once() {
        let predicate = parse("a = ?1 OR b = ?1").unwrap();
        let bound = ParameterBinding::positional(&[Value::from("x")])
            .bind(&predicate)
            .unwrap();
        assert_eq!(bound.to_string(), "a = 'x' OR b = 'x'");
    }

    #[test]
    fn test_parameter_count_must_match() {
        let predicate = parse("a = ?1 AND b = ?2").unwrap();
        let one = ParameterBinding::positional(&[Value::from(1)]);
        let two = ParameterBinding::positional(&[Value::from(1), Value::from(2)]);
        let three = ParameterBinding::positional(&[Value::from(1), Value::from(2), Value::from(3)]);

        assert!(matches!(one.bind(&predicate), Err(RepositoryError::Binding(_))));
        assert!(two.bind(&predicate).is_ok());
        assert!(matches!(three.bind(&predicate), Err(RepositoryError::Binding(_))));
    }

    #[test]
    fn test_extra_named_parameter_is_rejected() {
        let predicate = parse("name = :name").unwrap();
        let params = Parameters::with("name", "pear").and("colour", "green");
        assert!(matches!(
            ParameterBinding::named(&params).bind(&predicate),
            Err(RepositoryError::Binding(_))
        ));
    }

    #[test]
    fn test_mixed_styles_are_rejected() {
        let predicate = parse("a = ?1 AND b = :b").unwrap();
        assert!(matches!(
            ParameterBinding::positional(&[Value::from(1)]).bind(&predicate),
            Err(RepositoryError::Binding(message)) if message.contains("mixes")
        ));
    }

    #[test]
    fn test_literal_only_query_needs_no_parameters() {
        let predicate = parse("a = 'x'").unwrap();
        assert!(ParameterBinding::default().bind(&predicate).is_ok());
    }
}
