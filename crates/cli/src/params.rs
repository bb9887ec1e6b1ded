//! Parsing of parameter literals and field declarations.
//!
//! Literal syntax: `s:text`, `n:42`, `b:<base64>`, `bool:true`, `null`.
//! Anything without a recognised prefix is a string.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use panache_core::metadata::FieldType;
use panache_core::query::Parameters;
use panache_core::value::Value;

use crate::error::{CliError, Result};

/// Parses one parameter literal.
pub fn parse_value(raw: &str) -> Result<Value> {
    if raw == "null" {
        return Ok(Value::Null);
    }

    let invalid = |reason: &str| CliError::InvalidParam {
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    match raw.split_once(':') {
        Some(("s", text)) => Ok(Value::S(text.to_string())),
        Some(("n", number)) => {
            let number = number.trim();
            if number.is_empty() || number.parse::<f64>().is_err() {
                return Err(invalid("not a number"));
            }
            Ok(Value::N(number.to_string()))
        }
        Some(("b", encoded)) => STANDARD
            .decode(encoded)
            .map(Value::B)
            .map_err(|e| invalid(&e.to_string())),
        Some(("bool", flag)) => match flag {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid("expected true or false")),
        },
        _ => Ok(Value::S(raw.to_string())),
    }
}

/// Parses every positional parameter, in order.
pub fn parse_values(raw: &[String]) -> Result<Vec<Value>> {
    raw.iter().map(|r| parse_value(r)).collect()
}

/// Parses `name=value` pairs into named parameters.
pub fn parse_named(raw: &[String]) -> Result<Parameters> {
    raw.iter()
        .map(|pair| {
            let (name, value) = pair
                .split_once('=')
                .filter(|(name, _)| !name.is_empty())
                .ok_or_else(|| CliError::InvalidNamed(pair.clone()))?;
            Ok((name.to_string(), parse_value(value)?))
        })
        .collect::<Result<Vec<_>>>()
        .map(|pairs| pairs.into_iter().collect())
}

/// Parses `name:type`. A bare name is a string field.
pub fn parse_field(raw: &str) -> Result<(String, FieldType)> {
    let (name, field_type) = match raw.split_once(':') {
        Some((name, kind)) => (
            name,
            FieldType::parse(kind).ok_or_else(|| CliError::InvalidField(raw.to_string()))?,
        ),
        None => (raw, FieldType::String),
    };
    if name.is_empty() {
        return Err(CliError::InvalidField(raw.to_string()));
    }
    Ok((name.to_string(), field_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_literals() {
        assert_eq!(parse_value("s:apple").unwrap(), Value::from("apple"));
        assert_eq!(parse_value("n:42").unwrap(), Value::N("42".to_string()));
        assert_eq!(parse_value("n:-1.5e3").unwrap(), Value::N("-1.5e3".to_string()));
        assert_eq!(parse_value("b:AAEC").unwrap(), Value::B(vec![0, 1, 2]));
        assert_eq!(parse_value("bool:false").unwrap(), Value::Bool(false));
        assert_eq!(parse_value("null").unwrap(), Value::Null);
    }

    #[test]
    fn test_bare_values_are_strings() {
        assert_eq!(parse_value("apple").unwrap(), Value::from("apple"));
        assert_eq!(parse_value("42").unwrap(), Value::from("42"));
        assert_eq!(parse_value("x:y").unwrap(), Value::from("x:y"));
        assert_eq!(parse_value("s:").unwrap(), Value::from(""));
    }

    #[test]
    fn test_invalid_literals() {
        assert!(matches!(
            parse_value("n:abc"),
            Err(CliError::InvalidParam { .. })
        ));
        assert!(parse_value("bool:yes").is_err());
        assert!(parse_value("b:***").is_err());
    }

    #[test]
    fn test_named_pairs() {
        let params = parse_named(&["min=n:7".to_string(), "name=fig".to_string()]).unwrap();
        assert_eq!(params.get("min"), Some(&Value::N("7".to_string())));
        assert_eq!(params.get("name"), Some(&Value::from("fig")));

        assert!(matches!(
            parse_named(&["=x".to_string()]),
            Err(CliError::InvalidNamed(_))
        ));
        assert!(parse_named(&["novalue".to_string()]).is_err());
    }

    #[test]
    fn test_fields() {
        assert_eq!(
            parse_field("weight:n").unwrap(),
            ("weight".to_string(), FieldType::Number)
        );
        assert_eq!(
            parse_field("id").unwrap(),
            ("id".to_string(), FieldType::String)
        );
        assert!(matches!(
            parse_field("id:uuid"),
            Err(CliError::InvalidField(_))
        ));
        assert!(parse_field(":n").is_err());
    }
}
