//! Condition evaluation against stored items.

use std::cmp::Ordering;

use panache_core::metadata::EntityMetadata;
use panache_core::query::{CompareOp, KeyCondition, Operand, Predicate, QueryCondition};
use panache_core::value::{Item, Key, Value};

/// How a condition selects rows: by partition (sorted by sort key) or by
/// scanning the whole table.
pub(crate) enum Selection<'a> {
    Partition {
        partition: &'a Value,
        sort: Option<(CompareOp, &'a Value)>,
    },
    All,
}

/// Splits a condition into its row selection and residual filter.
pub(crate) fn plan(condition: &QueryCondition) -> (Selection<'_>, Option<&Predicate>) {
    match condition {
        QueryCondition::ScanAll => (Selection::All, None),
        QueryCondition::KeyEquals { value } => (
            Selection::Partition {
                partition: value,
                sort: None,
            },
            None,
        ),
        QueryCondition::Filter(filter) => {
            let selection = match &filter.key {
                Some(KeyCondition { partition, sort }) => Selection::Partition {
                    partition,
                    sort: sort.as_ref().map(|s| (s.op, &s.value)),
                },
                None => Selection::All,
            };
            (selection, filter.predicate.as_ref())
        }
    }
}

/// Returns true when `item` belongs to the selection.
pub(crate) fn selects(metadata: &EntityMetadata, selection: &Selection<'_>, item: &Item) -> bool {
    match selection {
        Selection::All => true,
        Selection::Partition { partition, sort } => {
            let in_partition = item
                .get(metadata.partition_key())
                .is_some_and(|value| value.matches(partition));
            let in_range = match (sort, metadata.sort_key()) {
                (Some((op, expected)), Some(sort_key)) => {
                    compare(item.get(sort_key), *op, expected)
                }
                _ => true,
            };
            in_partition && in_range
        }
    }
}

/// Evaluates a bound predicate against an item.
pub(crate) fn evaluate(predicate: &Predicate, item: &Item) -> bool {
    match predicate {
        Predicate::Compare(c) => match &c.operand {
            Operand::Literal(expected) => compare(item.get(&c.field), c.op, expected),
            Operand::Placeholder(_) => false,
        },
        Predicate::And(children) => children.iter().all(|child| evaluate(child, item)),
        Predicate::Or(children) => children.iter().any(|child| evaluate(child, item)),
    }
}

/// A missing attribute only satisfies `<>`.
fn compare(actual: Option<&Value>, op: CompareOp, expected: &Value) -> bool {
    let Some(actual) = actual else {
        return op == CompareOp::Ne;
    };

    match op {
        CompareOp::Eq => actual.matches(expected),
        CompareOp::Ne => !actual.matches(expected),
        CompareOp::Lt => actual.compare(expected) == Some(Ordering::Less),
        CompareOp::Le => matches!(
            actual.compare(expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOp::Gt => actual.compare(expected) == Some(Ordering::Greater),
        CompareOp::Ge => matches!(
            actual.compare(expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
    }
}

/// Orders keys by partition value, then by sort value.
pub(crate) fn compare_keys(a: &Key, b: &Key) -> Ordering {
    let partition = a.partition.compare(&b.partition).unwrap_or(Ordering::Equal);
    let sort = match (&a.sort, &b.sort) {
        (Some(x), Some(y)) => x.compare(y).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    };
    partition.then(sort)
}

/// Orders rows by their primary key. Rows without a readable key go last.
pub(crate) fn sort_by_key(metadata: &EntityMetadata, rows: &mut [Item]) {
    rows.sort_by(|a, b| match (metadata.key_of(a), metadata.key_of(b)) {
        (Ok(x), Ok(y)) => compare_keys(&x, &y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use panache_core::query::parse;
    use panache_core::query::ParameterBinding;

    fn item(pairs: &[(&str, Value)]) -> Item {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn bound(text: &str, params: &[Value]) -> Predicate {
        ParameterBinding::positional(params)
            .bind(&parse(text).unwrap())
            .unwrap()
    }

    #[test]
    fn test_numeric_comparisons() {
        let row = item(&[("weight", Value::from(120))]);
        assert!(evaluate(&bound("weight > ?1", &[Value::from(99.5)]), &row));
        assert!(evaluate(&bound("weight = ?1", &[Value::N("120.0".to_string())]), &row));
        assert!(!evaluate(&bound("weight < ?1", &[Value::from(120)]), &row));
        assert!(evaluate(&bound("weight <= ?1", &[Value::from(120)]), &row));
    }

    #[test]
    fn test_type_mismatch_never_orders() {
        let row = item(&[("weight", Value::from(120))]);
        assert!(!evaluate(&bound("weight > ?1", &[Value::from("1")]), &row));
        assert!(evaluate(&bound("weight <> ?1", &[Value::from("120")]), &row));
    }

    #[test]
    fn test_missing_attribute() {
        let row = item(&[]);
        assert!(!evaluate(&bound("name = ?1", &[Value::from("x")]), &row));
        assert!(evaluate(&bound("name <> ?1", &[Value::from("x")]), &row));
    }

    #[test]
    fn test_boolean_connectives() {
        let row = item(&[("a", Value::from(1)), ("b", Value::from(2))]);
        assert!(evaluate(&bound("a = 1 AND b = 2", &[]), &row));
        assert!(evaluate(&bound("a = 5 OR b = 2", &[]), &row));
        assert!(!evaluate(&bound("(a = 5 OR b = 5) AND a = 1", &[]), &row));
    }
}
