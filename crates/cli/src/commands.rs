//! Command implementations, independent of argument parsing and printing.

use std::sync::Arc;

use serde::Serialize;

use panache_core::metadata::EntityMetadata;
use panache_core::query::{
    bind_named_query, bind_query, render, QueryCondition, RenderedExpression,
};
use panache_core::storage::TableHandle;
use panache_core::value::{Item, Key};
use panache_dynamodb::storage::DynamoDbProvider;
use panache_dynamodb::{execute, DynamoDbConfig};

use crate::cli::{Cli, QueryParams};
use crate::error::{CliError, Result};
use crate::params::{parse_named, parse_value, parse_values};

/// How a query translates for one table.
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub table: String,
    pub condition: QueryCondition,
    pub expression: RenderedExpression,
}

/// Builds a DynamoDB provider from the global flags.
pub async fn connect(cli: &Cli) -> DynamoDbProvider {
    let config = DynamoDbConfig {
        endpoint_url: cli.endpoint_url.clone(),
        region: cli.region.clone(),
        table_prefix: cli.table_prefix.clone(),
    };
    DynamoDbProvider::from_config(&config).await
}

/// Translates an optional query and its parameters.
///
/// No query and no parameters reads the whole table. A single positional
/// parameter without a query looks up its partition.
pub fn resolve_condition(
    metadata: &EntityMetadata,
    query: Option<&str>,
    params: &QueryParams,
) -> Result<QueryCondition> {
    if !params.positional.is_empty() && !params.named.is_empty() {
        return Err(CliError::MixedParams);
    }

    let text = match query {
        Some(text) => text,
        None if params.positional.is_empty() && params.named.is_empty() => {
            return Ok(QueryCondition::ScanAll)
        }
        None => "",
    };

    let condition = if params.named.is_empty() {
        bind_query(metadata, text, &parse_values(&params.positional)?)?
    } else {
        bind_named_query(metadata, text, &parse_named(&params.named)?)?
    };
    tracing::debug!(
        table = metadata.table_name(),
        condition = ?condition,
        "Resolved query condition"
    );
    Ok(condition)
}

/// Translates and renders a query without running it.
pub fn explain(
    metadata: &EntityMetadata,
    query: &str,
    params: &QueryParams,
) -> Result<Explanation> {
    let condition = resolve_condition(metadata, Some(query), params)?;
    let expression = render(metadata, &condition);
    Ok(Explanation {
        table: metadata.table_name().to_string(),
        condition,
        expression,
    })
}

/// Runs a condition to completion and returns every matching item.
pub async fn list(table: Arc<dyn TableHandle>, condition: QueryCondition) -> Result<Vec<Item>> {
    let mut cursor = execute(table, condition);
    let items = cursor.drain().await?;
    tracing::debug!(items = items.len(), pages = cursor.pages(), "Listed items");
    Ok(items)
}

/// Fetches one item by its key literals.
pub async fn get(table: &dyn TableHandle, id: &str, sort: Option<&str>) -> Result<Option<Item>> {
    let mut key = Key::partition(parse_value(id)?);
    if let Some(sort) = sort {
        key = key.with_sort(parse_value(sort)?);
    }
    Ok(table.get_item(&key).await?)
}

/// Creates the table described by the handle's metadata.
pub async fn create_table(table: &dyn TableHandle) -> Result<()> {
    table.create_table().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use panache_core::metadata::FieldType;
    use panache_core::query::Operation;
    use panache_core::storage::{RepositoryError, TableProvider};
    use panache_core::value::Value;
    use panache_dynamodb::storage::InMemoryProvider;

    fn metadata() -> EntityMetadata {
        EntityMetadata::builder("fruits")
            .field("id", FieldType::String)
            .field("name", FieldType::String)
            .field("weight", FieldType::Number)
            .partition_key("id")
            .build()
            .unwrap()
    }

    fn positional(values: &[&str]) -> QueryParams {
        QueryParams {
            positional: values.iter().map(|v| v.to_string()).collect(),
            named: Vec::new(),
        }
    }

    fn named(pairs: &[&str]) -> QueryParams {
        QueryParams {
            positional: Vec::new(),
            named: pairs.iter().map(|v| v.to_string()).collect(),
        }
    }

    async fn seeded() -> Arc<dyn TableHandle> {
        let table = InMemoryProvider::new().table(Arc::new(metadata())).unwrap();
        let rows = [("a", "apple", 120), ("b", "banana", 90), ("c", "cherry", 5)];
        for (id, name, weight) in rows {
            let mut item = Item::new();
            item.insert("id".to_string(), Value::from(id));
            item.insert("name".to_string(), Value::from(name));
            item.insert("weight".to_string(), Value::from(weight));
            table.put_item(item).await.unwrap();
        }
        table
    }

    #[test]
    fn test_explain_key_lookup() {
        let explanation = explain(&metadata(), "id = ?1", &positional(&["a"])).unwrap();

        assert_eq!(explanation.condition, QueryCondition::key_equals("a"));
        assert_eq!(explanation.expression.operation, Operation::Query);
        assert_eq!(
            explanation.expression.key_condition.as_deref(),
            Some("#f0 = :v0")
        );
    }

    #[test]
    fn test_explain_scan_with_named_params() {
        let explanation = explain(
            &metadata(),
            "weight > :min OR name = :name",
            &named(&["min=n:10", "name=apple"]),
        )
        .unwrap();

        assert_eq!(explanation.expression.operation, Operation::Scan);
        assert!(explanation.expression.key_condition.is_none());
        assert!(explanation.expression.filter.is_some());
    }

    #[test]
    fn test_resolve_without_query() {
        let metadata = metadata();
        assert_eq!(
            resolve_condition(&metadata, None, &QueryParams::default()).unwrap(),
            QueryCondition::ScanAll
        );
        assert_eq!(
            resolve_condition(&metadata, None, &positional(&["a"])).unwrap(),
            QueryCondition::key_equals("a")
        );
    }

    #[test]
    fn test_mixed_params_are_rejected() {
        let params = QueryParams {
            positional: vec!["a".to_string()],
            named: vec!["b=c".to_string()],
        };
        assert!(matches!(
            resolve_condition(&metadata(), Some("id = ?1"), &params),
            Err(CliError::MixedParams)
        ));
    }

    #[test]
    fn test_query_errors_surface() {
        assert!(matches!(
            explain(&metadata(), "colour = ?1", &positional(&["red"])),
            Err(CliError::Repository(RepositoryError::UnknownField { .. }))
        ));
    }

    #[tokio::test]
    async fn test_list_runs_the_condition() {
        let table = seeded().await;
        let metadata = metadata();

        let condition =
            resolve_condition(&metadata, Some("weight >= ?1"), &positional(&["n:90"])).unwrap();
        let items = list(Arc::clone(&table), condition).await.unwrap();
        assert_eq!(items.len(), 2);

        let all = list(table, QueryCondition::ScanAll).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_get_by_literal() {
        let table = seeded().await;

        let item = get(table.as_ref(), "s:b", None).await.unwrap().unwrap();
        assert_eq!(item["name"], Value::from("banana"));
        assert!(get(table.as_ref(), "z", None).await.unwrap().is_none());
    }
}
