//! Renders conditions as DynamoDB expression strings.
//!
//! Attribute names are always aliased (`#f0`, `#f1`, ...) so reserved words
//! never clash, and values are bound as `:v0`, `:v1`, ...

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::metadata::EntityMetadata;
use crate::value::{Item, Value};

use super::ast::{CompareOp, Operand, Predicate};
use super::translate::{FilterExpression, KeyCondition, Operation, QueryCondition};

/// Expression strings plus their placeholder maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedExpression {
    pub operation: Operation,
    pub key_condition: Option<String>,
    pub filter: Option<String>,
    pub names: BTreeMap<String, String>,
    pub values: BTreeMap<String, Value>,
}

/// Renders `condition` against the key layout in `metadata`.
pub fn render(metadata: &EntityMetadata, condition: &QueryCondition) -> RenderedExpression {
    let mut renderer = Renderer::default();

    let (key_condition, filter) = match condition {
        QueryCondition::ScanAll => (None, None),
        QueryCondition::KeyEquals { value } => (
            Some(renderer.comparison(metadata.partition_key(), CompareOp::Eq, value)),
            None,
        ),
        QueryCondition::Filter(FilterExpression { key, predicate }) => {
            let key_condition = key.as_ref().map(|k| renderer.key(metadata, k));
            let filter = predicate.as_ref().map(|p| renderer.predicate(p));
            (key_condition, filter)
        }
    };

    RenderedExpression {
        operation: condition.operation(),
        key_condition,
        filter,
        names: renderer.names,
        values: renderer.values,
    }
}

/// Update expression for an item write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedUpdate {
    /// `SET ... REMOVE ...`, or `None` when the item only carries its key.
    pub expression: Option<String>,
    pub names: BTreeMap<String, String>,
    pub values: BTreeMap<String, Value>,
}

/// Renders the update that makes the stored item match `item`.
///
/// Every non-key attribute present is SET. Declared fields missing from
/// `item` are REMOVEd.
pub fn render_update(metadata: &EntityMetadata, item: &Item) -> RenderedUpdate {
    let mut renderer = Renderer::default();

    let sets: Vec<String> = item
        .iter()
        .filter(|(name, _)| !metadata.is_key_field(name))
        .map(|(name, value)| renderer.comparison(name, CompareOp::Eq, value))
        .collect();

    let removes: Vec<String> = metadata
        .fields()
        .iter()
        .filter(|f| !metadata.is_key_field(&f.name) && !item.contains_key(&f.name))
        .map(|f| renderer.name(&f.name))
        .collect();

    let mut clauses = Vec::new();
    if !sets.is_empty() {
        clauses.push(format!("SET {}", sets.join(", ")));
    }
    if !removes.is_empty() {
        clauses.push(format!("REMOVE {}", removes.join(", ")));
    }

    RenderedUpdate {
        expression: (!clauses.is_empty()).then(|| clauses.join(" ")),
        names: renderer.names,
        values: renderer.values,
    }
}

#[derive(Default)]
struct Renderer {
    aliases: HashMap<String, String>,
    names: BTreeMap<String, String>,
    values: BTreeMap<String, Value>,
}

impl Renderer {
    fn name(&mut self, field: &str) -> String {
        if let Some(alias) = self.aliases.get(field) {
            return alias.clone();
        }
        let alias = format!("#f{}", self.aliases.len());
        self.aliases.insert(field.to_string(), alias.clone());
        self.names.insert(alias.clone(), field.to_string());
        alias
    }

    fn value(&mut self, value: &Value) -> String {
        let placeholder = format!(":v{}", self.values.len());
        self.values.insert(placeholder.clone(), value.clone());
        placeholder
    }

    fn comparison(&mut self, field: &str, op: CompareOp, value: &Value) -> String {
        let name = self.name(field);
        let value = self.value(value);
        format!("{name} {} {value}", op.as_expression())
    }

    fn key(&mut self, metadata: &EntityMetadata, key: &KeyCondition) -> String {
        let partition = self.comparison(metadata.partition_key(), CompareOp::Eq, &key.partition);
        match (&key.sort, metadata.sort_key()) {
            (Some(sort), Some(sort_key)) => {
                let sort = self.comparison(sort_key, sort.op, &sort.value);
                format!("{partition} AND {sort}")
            }
            _ => partition,
        }
    }

    fn predicate(&mut self, predicate: &Predicate) -> String {
        match predicate {
            Predicate::Compare(c) => match &c.operand {
                Operand::Literal(value) => self.comparison(&c.field, c.op, value),
                // Unbound trees keep their placeholders verbatim.
                Operand::Placeholder(p) => {
                    let name = self.name(&c.field);
                    format!("{name} {} {p}", c.op.as_expression())
                }
            },
            Predicate::And(children) => self.group(children, " AND "),
            Predicate::Or(children) => self.group(children, " OR "),
        }
    }

    fn group(&mut self, children: &[Predicate], sep: &str) -> String {
        children
            .iter()
            .map(|child| match child {
                Predicate::Compare(_) => self.predicate(child),
                _ => format!("({})", self.predicate(child)),
            })
            .collect::<Vec<_>>()
            .join(sep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FieldType;
    use crate::query::bind_query;

    fn reading() -> EntityMetadata {
        EntityMetadata::builder("Reading")
            .field("sensor", FieldType::String)
            .field("ts", FieldType::Number)
            .field("status", FieldType::String)
            .partition_key("sensor")
            .sort_key("ts")
            .build()
            .unwrap()
    }

    #[test]
    fn test_scan_all_renders_nothing() {
        let rendered = render(&reading(), &QueryCondition::ScanAll);
        assert_eq!(rendered.operation, Operation::Scan);
        assert!(rendered.key_condition.is_none());
        assert!(rendered.filter.is_none());
        assert!(rendered.names.is_empty());
        assert!(rendered.values.is_empty());
    }

    #[test]
    fn test_key_equals() {
        let rendered = render(&reading(), &QueryCondition::key_equals("s1"));
        assert_eq!(rendered.operation, Operation::Query);
        assert_eq!(rendered.key_condition.as_deref(), Some("#f0 = :v0"));
        assert_eq!(rendered.names["#f0"], "sensor");
        assert_eq!(rendered.values[":v0"], Value::from("s1"));
    }

    #[test]
    fn test_keyed_filter() {
        let condition = bind_query(
            &reading(),
            "sensor = ?1 AND ts > ?2 AND status <> ?3",
            &[Value::from("s1"), Value::from(5), Value::from("off")],
        )
        .unwrap();
        let rendered = render(&reading(), &condition);

        assert_eq!(rendered.operation, Operation::Query);
        assert_eq!(
            rendered.key_condition.as_deref(),
            Some("#f0 = :v0 AND #f1 > :v1")
        );
        assert_eq!(rendered.filter.as_deref(), Some("#f2 <> :v2"));
        assert_eq!(rendered.names.len(), 3);
        assert_eq!(rendered.values[":v2"], Value::from("off"));
    }

    #[test]
    fn test_scan_filter_groups_and_reuses_names() {
        let condition = bind_query(
            &reading(),
            "status = ?1 OR (status = ?2 AND ts < ?3)",
            &[Value::from("on"), Value::from("idle"), Value::from(9)],
        )
        .unwrap();
        let rendered = render(&reading(), &condition);

        assert_eq!(rendered.operation, Operation::Scan);
        assert!(rendered.key_condition.is_none());
        assert_eq!(
            rendered.filter.as_deref(),
            Some("#f0 = :v0 OR (#f0 = :v1 AND #f1 < :v2)")
        );
        assert_eq!(rendered.names.len(), 2);
        assert_eq!(rendered.values.len(), 3);
    }

    #[test]
    fn test_update_sets_present_and_removes_absent_fields() {
        let mut item = Item::new();
        item.insert("sensor".to_string(), Value::from("s1"));
        item.insert("ts".to_string(), Value::from(1));
        item.insert("status".to_string(), Value::from("on"));

        let update = render_update(&reading(), &item);
        assert_eq!(update.expression.as_deref(), Some("SET #f0 = :v0"));
        assert_eq!(update.names["#f0"], "status");

        item.remove("status");
        let update = render_update(&reading(), &item);
        assert_eq!(update.expression.as_deref(), Some("REMOVE #f0"));
        assert!(update.values.is_empty());
    }

    #[test]
    fn test_update_of_key_only_entity_has_no_expression() {
        let metadata = EntityMetadata::builder("Tag")
            .field("id", FieldType::String)
            .partition_key("id")
            .build()
            .unwrap();
        let mut item = Item::new();
        item.insert("id".to_string(), Value::from("t"));
        assert!(render_update(&metadata, &item).expression.is_none());
    }
}
