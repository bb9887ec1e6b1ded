use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single typed attribute value.
///
/// Mirrors the DynamoDB attribute model. Numbers keep their decimal text form so
/// that no precision is lost between the caller and the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    #[serde(rename = "NULL")]
    Null,
    #[serde(rename = "BOOL")]
    Bool(bool),
    S(String),
    N(String),
    #[serde(with = "super::binary")]
    B(Vec<u8>),
    L(Vec<Value>),
    M(BTreeMap<String, Value>),
}

/// An item as stored in a table: attribute name to value.
pub type Item = BTreeMap<String, Value>;

impl Value {
    /// Builds a number value from anything that prints as a decimal.
    pub fn number(n: impl fmt::Display) -> Self {
        Value::N(n.to_string())
    }

    pub fn as_s(&self) -> Option<&str> {
        match self {
            Value::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_n(&self) -> Option<&str> {
        match self {
            Value::N(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_b(&self) -> Option<&[u8]> {
        match self {
            Value::B(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for the scalar types DynamoDB accepts as key attributes.
    pub fn is_key_type(&self) -> bool {
        matches!(self, Value::S(_) | Value::N(_) | Value::B(_))
    }

    /// DynamoDB type descriptor (`S`, `N`, `B`, ...).
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOL",
            Value::S(_) => "S",
            Value::N(_) => "N",
            Value::B(_) => "B",
            Value::L(_) => "L",
            Value::M(_) => "M",
        }
    }

    /// Orders two values the way the store compares them.
    ///
    /// Strings and binaries compare byte-wise, numbers numerically. Values of
    /// different types are not comparable and yield `None`.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::S(a), Value::S(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (Value::B(a), Value::B(b)) => Some(a.cmp(b)),
            (Value::N(a), Value::N(b)) => {
                let a: f64 = a.trim().parse().ok()?;
                let b: f64 = b.trim().parse().ok()?;
                a.partial_cmp(&b)
            }
            (Value::Bool(a), Value::Bool(b)) if a == b => Some(Ordering::Equal),
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            _ => None,
        }
    }

    /// Equality as the store sees it: `1` and `1.0` are the same number.
    pub fn matches(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::N(_), Value::N(_)) => self.compare(other) == Some(Ordering::Equal),
            _ => self == other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::S(s) => write!(f, "'{s}'"),
            Value::N(n) => write!(f, "{n}"),
            Value::B(b) => write!(f, "<{} bytes>", b.len()),
            Value::L(l) => write!(f, "[{} values]", l.len()),
            Value::M(m) => write!(f, "{{{} entries}}", m.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::S(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::S(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::S(s.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::B(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::B(b.to_vec())
    }
}

macro_rules! number_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::N(n.to_string())
                }
            }
        )*
    };
}

number_from!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Primary key of one item: partition value plus optional sort value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub partition: Value,
    pub sort: Option<Value>,
}

impl Key {
    pub fn partition(value: impl Into<Value>) -> Self {
        Self {
            partition: value.into(),
            sort: None,
        }
    }

    pub fn with_sort(mut self, value: impl Into<Value>) -> Self {
        self.sort = Some(value.into());
        self
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sort {
            Some(sort) => write!(f, "{}/{}", self.partition, sort),
            None => write!(f, "{}", self.partition),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_conversions_keep_decimal_text() {
        assert_eq!(Value::from(42), Value::N("42".to_string()));
        assert_eq!(Value::from(1.5f64), Value::N("1.5".to_string()));
        assert_eq!(Value::number(7u8), Value::N("7".to_string()));
    }

    #[test]
    fn test_option_none_is_null() {
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::S("a".to_string()));
    }

    #[test]
    fn test_numbers_compare_numerically() {
        let a = Value::from("10".parse::<i64>().unwrap());
        let b = Value::N("9.5".to_string());
        assert_eq!(a.compare(&b), Some(Ordering::Greater));
        assert!(Value::N("1".to_string()).matches(&Value::N("1.0".to_string())));
    }

    #[test]
    fn test_strings_compare_bytewise() {
        assert_eq!(
            Value::from("B").compare(&Value::from("a")),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_mixed_types_are_not_comparable() {
        assert_eq!(Value::from("1").compare(&Value::from(1)), None);
        assert!(!Value::from("1").matches(&Value::from(1)));
    }

    #[test]
    fn test_key_types() {
        assert!(Value::from("a").is_key_type());
        assert!(Value::from(1).is_key_type());
        assert!(Value::from(vec![1u8, 2]).is_key_type());
        assert!(!Value::Null.is_key_type());
        assert!(!Value::Bool(true).is_key_type());
    }

    #[test]
    fn test_binary_serializes_as_base64() {
        let json = serde_json::to_string(&Value::B(b"hi".to_vec())).unwrap();
        assert_eq!(json, r#"{"B":"aGk="}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::B(b"hi".to_vec()));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(Key::partition("abc").to_string(), "'abc'");
        assert_eq!(Key::partition("abc").with_sort(3).to_string(), "'abc'/3");
    }
}
