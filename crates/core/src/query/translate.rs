use serde::Serialize;

use crate::metadata::EntityMetadata;
use crate::storage::{RepositoryError, Result};
use crate::value::Value;

use super::ast::{CompareOp, Comparison, Operand, Predicate};
use super::params::{ParameterBinding, Parameters};
use super::parser::parse;

/// Store operation a condition runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Query,
    Scan,
}

/// Sort-key part of a key condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortCondition {
    pub op: CompareOp,
    pub value: Value,
}

/// Partition equality plus an optional sort-key comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyCondition {
    pub partition: Value,
    pub sort: Option<SortCondition>,
}

/// A filtered read.
///
/// With a key condition it runs as a query whose results are then filtered,
/// without one it runs as a scan with a server-side filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterExpression {
    pub key: Option<KeyCondition>,
    pub predicate: Option<Predicate>,
}

/// Executable form of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryCondition {
    /// Every item whose partition key equals `value`.
    KeyEquals { value: Value },
    /// Every item in the table.
    ScanAll,
    Filter(FilterExpression),
}

impl QueryCondition {
    pub fn key_equals(value: impl Into<Value>) -> Self {
        QueryCondition::KeyEquals {
            value: value.into(),
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            QueryCondition::KeyEquals { .. } => Operation::Query,
            QueryCondition::Filter(FilterExpression { key: Some(_), .. }) => Operation::Query,
            QueryCondition::ScanAll | QueryCondition::Filter(_) => Operation::Scan,
        }
    }
}

/// Returns true when `text` with `param_count` positional values is a
/// shorthand key lookup: a single value and no placeholder, operator or map
/// syntax in the text.
pub fn is_shorthand(text: &str, param_count: usize) -> bool {
    param_count == 1
        && !text
            .chars()
            .any(|c| matches!(c, '?' | ':' | '=' | '<' | '>' | '!' | '{'))
}

/// Translates query text with positional parameters.
///
/// A shorthand query binds its single value to the partition key and ignores
/// the text.
pub fn bind_query(
    metadata: &EntityMetadata,
    text: &str,
    params: &[Value],
) -> Result<QueryCondition> {
    if let [value] = params {
        if is_shorthand(text, 1) {
            return Ok(QueryCondition::KeyEquals {
                value: value.clone(),
            });
        }
    }

    let predicate = parse(text)?;
    let bound = ParameterBinding::positional(params).bind(&predicate)?;
    translate(metadata, &bound)
}

/// Translates query text with named parameters.
pub fn bind_named_query(
    metadata: &EntityMetadata,
    text: &str,
    params: &Parameters,
) -> Result<QueryCondition> {
    let predicate = parse(text)?;
    let bound = ParameterBinding::named(params).bind(&predicate)?;
    translate(metadata, &bound)
}

/// Translates a bound predicate into a condition.
///
/// A lone equality on the partition key is a key lookup. A conjunction with
/// exactly one partition-key equality becomes a keyed filter, taking one
/// sort-key comparison into the key condition when it can. Anything else is
/// a filtered scan.
pub fn translate(metadata: &EntityMetadata, predicate: &Predicate) -> Result<QueryCondition> {
    let comparisons = predicate.comparisons();

    for comparison in &comparisons {
        if !metadata.has_field(&comparison.field) {
            return Err(RepositoryError::UnknownField {
                entity_type: metadata.entity_name().to_string(),
                field: comparison.field.clone(),
            });
        }
        literal(comparison)?;
    }

    let partition_key = metadata.partition_key();

    match predicate {
        Predicate::Compare(c) if c.field == partition_key && c.op == CompareOp::Eq => {
            Ok(QueryCondition::KeyEquals {
                value: literal(c)?,
            })
        }
        Predicate::And(children) => Ok(keyed_filter(metadata, children)?
            .unwrap_or_else(|| scan_filter(predicate))),
        _ => Ok(scan_filter(predicate)),
    }
}

fn scan_filter(predicate: &Predicate) -> QueryCondition {
    QueryCondition::Filter(FilterExpression {
        key: None,
        predicate: Some(predicate.clone()),
    })
}

/// Splits a conjunction into a key condition and the remaining filter.
/// Returns `None` when the conjunction does not pin a single partition.
fn keyed_filter(metadata: &EntityMetadata, children: &[Predicate]) -> Result<Option<QueryCondition>> {
    let partition_key = metadata.partition_key();

    let on_field = |name: &str| -> Vec<usize> {
        children
            .iter()
            .enumerate()
            .filter(|(_, child)| matches!(child, Predicate::Compare(c) if c.field == name))
            .map(|(i, _)| i)
            .collect()
    };

    let partition_index = match on_field(partition_key).as_slice() {
        [index] => *index,
        _ => return Ok(None),
    };
    let partition = match &children[partition_index] {
        Predicate::Compare(c) if c.op == CompareOp::Eq => literal(c)?,
        _ => return Ok(None),
    };

    let mut sort = None;
    let mut sort_index = None;
    if let Some(sort_key) = metadata.sort_key() {
        if let [index] = on_field(sort_key).as_slice() {
            if let Predicate::Compare(c) = &children[*index] {
                if c.op.is_key_condition_op() {
                    sort = Some(SortCondition {
                        op: c.op,
                        value: literal(c)?,
                    });
                    sort_index = Some(*index);
                }
            }
        }
    }

    let rest: Vec<Predicate> = children
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != partition_index && Some(*i) != sort_index)
        .map(|(_, child)| child.clone())
        .collect();

    Ok(Some(QueryCondition::Filter(FilterExpression {
        key: Some(KeyCondition { partition, sort }),
        predicate: if rest.is_empty() {
            None
        } else {
            Some(Predicate::and(rest))
        },
    })))
}

fn literal(comparison: &Comparison) -> Result<Value> {
    match &comparison.operand {
        Operand::Literal(value) => Ok(value.clone()),
        Operand::Placeholder(p) => Err(RepositoryError::Binding(format!(
            "parameter {p} is not bound"
        ))),
    }
}
