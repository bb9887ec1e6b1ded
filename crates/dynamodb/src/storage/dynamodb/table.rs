//! DynamoDB table handle implementation.
//!
//! Implements the table traits from `panache_core::storage` using DynamoDB.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType, PutRequest,
    ScalarAttributeType, WriteRequest,
};
use aws_sdk_dynamodb::Client;

use panache_core::metadata::{EntityMetadata, FieldType};
use panache_core::query::{render, render_update, Operation, QueryCondition};
use panache_core::storage::{
    Page, RepositoryError, Result, TableHandle, TableProvider, MAX_BATCH_WRITE_ITEMS,
};
use panache_core::value::{Item, Key};

use super::conversions::{
    from_attribute_map, to_attribute_map, to_expression_names, to_expression_values,
};
use super::error::{
    map_batch_write_error, map_build_error, map_create_table_error, map_delete_item_error,
    map_get_item_error, map_put_item_error, map_query_error, map_scan_error,
    map_update_item_error,
};
use crate::config::{create_client, DynamoDbConfig};

/// One DynamoDB table bound to one entity type.
#[derive(Debug, Clone)]
pub struct DynamoDbTable {
    client: Client,
    metadata: Arc<EntityMetadata>,
    table_name: String,
}

impl DynamoDbTable {
    /// Creates a handle for the table named in `metadata`, with `prefix`
    /// prepended when given.
    pub fn new(client: Client, metadata: Arc<EntityMetadata>, prefix: Option<&str>) -> Self {
        let table_name = format!("{}{}", prefix.unwrap_or_default(), metadata.table_name());
        Self {
            client,
            metadata,
            table_name,
        }
    }

    fn key_attributes(&self, key: &Key) -> HashMap<String, AttributeValue> {
        to_attribute_map(&self.metadata.key_item(key))
    }
}

#[async_trait]
impl TableHandle for DynamoDbTable {
    fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn get_item(&self, key: &Key) -> Result<Option<Item>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(self.key_attributes(key)))
            .send()
            .await
            .map_err(|e| map_get_item_error(e, &self.table_name))?;

        result.item.as_ref().map(from_attribute_map).transpose()
    }

    async fn put_item(&self, item: Item) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_attribute_map(&item)))
            .send()
            .await
            .map_err(|e| map_put_item_error(e, &self.table_name))?;

        Ok(())
    }

    async fn update_item(&self, item: Item) -> Result<()> {
        let key = self.metadata.key_of(&item)?;
        let update = render_update(&self.metadata, &item);

        self.client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(self.key_attributes(&key)))
            .set_update_expression(update.expression)
            .set_expression_attribute_names(to_expression_names(&update.names))
            .set_expression_attribute_values(to_expression_values(&update.values))
            .send()
            .await
            .map_err(|e| map_update_item_error(e, &self.table_name))?;

        Ok(())
    }

    async fn delete_item(&self, key: &Key) -> Result<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(self.key_attributes(key)))
            .send()
            .await
            .map_err(|e| map_delete_item_error(e, &self.table_name))?;

        Ok(())
    }

    async fn batch_put(&self, items: Vec<Item>) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        if items.len() > MAX_BATCH_WRITE_ITEMS {
            return Err(RepositoryError::WriteFailed(format!(
                "Batch of {} items exceeds the limit of {MAX_BATCH_WRITE_ITEMS}",
                items.len()
            )));
        }

        let write_requests = items
            .iter()
            .map(|item| {
                let put = PutRequest::builder()
                    .set_item(Some(to_attribute_map(item)))
                    .build()
                    .map_err(map_build_error)?;
                Ok(WriteRequest::builder().put_request(put).build())
            })
            .collect::<Result<Vec<_>>>()?;

        let result = self
            .client
            .batch_write_item()
            .request_items(&self.table_name, write_requests)
            .send()
            .await
            .map_err(|e| map_batch_write_error(e, &self.table_name))?;

        let unprocessed: usize = result
            .unprocessed_items
            .unwrap_or_default()
            .values()
            .map(Vec::len)
            .sum();
        if unprocessed > 0 {
            return Err(RepositoryError::UnprocessedItems { unprocessed });
        }

        Ok(())
    }

    async fn fetch_page(&self, condition: &QueryCondition, start: Option<Item>) -> Result<Page> {
        let rendered = render(&self.metadata, condition);
        let start = start.as_ref().map(to_attribute_map);
        let names = to_expression_names(&rendered.names);
        let values = to_expression_values(&rendered.values);

        let (items, last_evaluated_key) = match rendered.operation {
            Operation::Query => {
                let key_condition = rendered.key_condition.ok_or_else(|| {
                    RepositoryError::QueryFailed("Query without a key condition".to_string())
                })?;
                let output = self
                    .client
                    .query()
                    .table_name(&self.table_name)
                    .key_condition_expression(key_condition)
                    .set_filter_expression(rendered.filter)
                    .set_expression_attribute_names(names)
                    .set_expression_attribute_values(values)
                    .set_exclusive_start_key(start)
                    .send()
                    .await
                    .map_err(|e| map_query_error(e, &self.table_name))?;
                (output.items, output.last_evaluated_key)
            }
            Operation::Scan => {
                let output = self
                    .client
                    .scan()
                    .table_name(&self.table_name)
                    .set_filter_expression(rendered.filter)
                    .set_expression_attribute_names(names)
                    .set_expression_attribute_values(values)
                    .set_exclusive_start_key(start)
                    .send()
                    .await
                    .map_err(|e| map_scan_error(e, &self.table_name))?;
                (output.items, output.last_evaluated_key)
            }
        };

        Ok(Page {
            items: items
                .unwrap_or_default()
                .iter()
                .map(from_attribute_map)
                .collect::<Result<_>>()?,
            last_evaluated_key: last_evaluated_key
                .filter(|key| !key.is_empty())
                .as_ref()
                .map(from_attribute_map)
                .transpose()?,
        })
    }

    async fn create_table(&self) -> Result<()> {
        let mut key_schema = vec![key_element(self.metadata.partition_key(), KeyType::Hash)?];
        let mut attribute_definitions = vec![attribute_definition(
            self.metadata.partition_key(),
            self.metadata.partition_key_type(),
        )?];

        if let (Some(sort_key), Some(sort_type)) =
            (self.metadata.sort_key(), self.metadata.sort_key_type())
        {
            key_schema.push(key_element(sort_key, KeyType::Range)?);
            attribute_definitions.push(attribute_definition(sort_key, sort_type)?);
        }

        self.client
            .create_table()
            .table_name(&self.table_name)
            .set_key_schema(Some(key_schema))
            .set_attribute_definitions(Some(attribute_definitions))
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(|e| map_create_table_error(e, &self.table_name))?;

        tracing::info!(table = %self.table_name, "Created table");
        Ok(())
    }
}

fn key_element(name: &str, key_type: KeyType) -> Result<KeySchemaElement> {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .map_err(map_build_error)
}

fn attribute_definition(name: &str, field_type: FieldType) -> Result<AttributeDefinition> {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(to_scalar_type(field_type)?)
        .build()
        .map_err(map_build_error)
}

fn to_scalar_type(field_type: FieldType) -> Result<ScalarAttributeType> {
    match field_type {
        FieldType::String => Ok(ScalarAttributeType::S),
        FieldType::Number => Ok(ScalarAttributeType::N),
        FieldType::Binary => Ok(ScalarAttributeType::B),
        other => Err(RepositoryError::Configuration(format!(
            "{other:?} cannot be used as a key type"
        ))),
    }
}

/// Resolves [`DynamoDbTable`] handles that share one client.
#[derive(Debug, Clone)]
pub struct DynamoDbProvider {
    client: Client,
    table_prefix: Option<String>,
}

impl DynamoDbProvider {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            table_prefix: None,
        }
    }

    /// Prepends `prefix` to every resolved table name.
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = Some(prefix.into());
        self
    }

    /// Builds a client from `config` and applies its table prefix.
    pub async fn from_config(config: &DynamoDbConfig) -> Self {
        let client = create_client(config).await;
        tracing::debug!(endpoint = %config.target_display(), "Created DynamoDB client");
        Self {
            client,
            table_prefix: config.table_prefix.clone(),
        }
    }

    /// Creates a provider from environment configuration.
    ///
    /// See [`DynamoDbConfig::from_env`] for the variables read.
    pub async fn from_env() -> Self {
        Self::from_config(&DynamoDbConfig::from_env()).await
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl TableProvider for DynamoDbProvider {
    fn table(&self, metadata: Arc<EntityMetadata>) -> Result<Arc<dyn TableHandle>> {
        Ok(Arc::new(DynamoDbTable::new(
            self.client.clone(),
            metadata,
            self.table_prefix.as_deref(),
        )))
    }
}
