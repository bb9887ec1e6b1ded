//! Entity operations over a table provider.

use std::sync::Arc;

use futures_util::stream::BoxStream;

use panache_core::entity::Entity;
use panache_core::metadata::{EntityMetadata, MetadataRegistry};
use panache_core::query::{bind_named_query, bind_query, Parameters, QueryCondition};
use panache_core::storage::{
    RepositoryError, Result, TableHandle, TableProvider, MAX_BATCH_WRITE_ITEMS,
};
use panache_core::value::{Item, Key, Value};

use crate::query::PanacheQuery;

/// Persistence operations for every [`Entity`] type.
///
/// Resolves one table per entity type through the provider and caches the
/// entity metadata. Clones share the provider and the cache.
#[derive(Clone)]
pub struct Operations {
    provider: Arc<dyn TableProvider>,
    registry: MetadataRegistry,
}

impl Operations {
    pub fn new(provider: Arc<dyn TableProvider>) -> Self {
        Self {
            provider,
            registry: MetadataRegistry::new(),
        }
    }

    /// Uses an existing metadata cache, shared with other services.
    pub fn with_registry(provider: Arc<dyn TableProvider>, registry: MetadataRegistry) -> Self {
        Self { provider, registry }
    }

    pub async fn metadata<E: Entity>(&self) -> Result<Arc<EntityMetadata>> {
        self.registry.get_or_describe::<E>().await
    }

    /// Resolves the table bound to `E`.
    pub async fn table<E: Entity>(&self) -> Result<Arc<dyn TableHandle>> {
        let metadata = self.metadata::<E>().await?;
        self.provider.table(metadata)
    }

    /// Creates the table of `E` with its key schema.
    pub async fn create_table<E: Entity>(&self) -> Result<()> {
        self.table::<E>().await?.create_table().await
    }

    // ==================== Writes ====================

    /// Writes the entity, replacing any item with the same key.
    pub async fn persist<E: Entity>(&self, entity: &E) -> Result<()> {
        self.table::<E>().await?.put_item(entity.to_item()).await
    }

    /// Writes every entity with batch writes of at most
    /// [`MAX_BATCH_WRITE_ITEMS`] items.
    ///
    /// Stops at the first batch the store does not fully accept; earlier
    /// batches stay written.
    pub async fn persist_all<'a, E, I>(&self, entities: I) -> Result<()>
    where
        E: Entity,
        I: IntoIterator<Item = &'a E>,
    {
        let items: Vec<Item> = entities.into_iter().map(Entity::to_item).collect();
        if items.is_empty() {
            return Ok(());
        }

        let table = self.table::<E>().await?;
        let total = items.len();
        let mut batches = 0;
        for chunk in items.chunks(MAX_BATCH_WRITE_ITEMS) {
            batches += 1;
            if let Err(e) = table.batch_put(chunk.to_vec()).await {
                if let RepositoryError::UnprocessedItems { unprocessed } = &e {
                    tracing::warn!(
                        table = %table.table_name(),
                        batch = batches,
                        unprocessed,
                        "Batch write left unprocessed items"
                    );
                }
                return Err(e);
            }
        }

        tracing::debug!(
            table = %table.table_name(),
            items = total,
            batches,
            "Persisted entities"
        );
        Ok(())
    }

    /// Updates the entity in place, creating it when absent.
    ///
    /// Declared fields the entity leaves out are removed from the stored item.
    pub async fn update<E: Entity>(&self, entity: &E) -> Result<()> {
        self.table::<E>().await?.update_item(entity.to_item()).await
    }

    /// Updates each entity with its own call.
    pub async fn update_all<'a, E, I>(&self, entities: I) -> Result<()>
    where
        E: Entity,
        I: IntoIterator<Item = &'a E>,
    {
        let table = self.table::<E>().await?;
        for entity in entities {
            table.update_item(entity.to_item()).await?;
        }
        Ok(())
    }

    /// Inserts or updates the entity. Same as [`update`](Self::update),
    /// which already creates missing items.
    pub async fn persist_or_update<E: Entity>(&self, entity: &E) -> Result<()> {
        self.update(entity).await
    }

    pub async fn persist_or_update_all<'a, E, I>(&self, entities: I) -> Result<()>
    where
        E: Entity,
        I: IntoIterator<Item = &'a E>,
    {
        self.update_all(entities).await
    }

    /// Deletes the entity by its key. Deleting a missing entity succeeds.
    pub async fn delete<E: Entity>(&self, entity: &E) -> Result<()> {
        let table = self.table::<E>().await?;
        let key = table.metadata().key_of(&entity.to_item())?;
        table.delete_item(&key).await
    }

    // ==================== Lookups ====================

    /// Looks an entity up by partition key.
    ///
    /// Ids that are not strings, numbers or binaries cannot name an item and
    /// yield `None`. Entities with a sort key need [`find_by_key`](Self::find_by_key).
    pub async fn find_by_id<E: Entity>(&self, id: impl Into<Value>) -> Result<Option<E>> {
        let id = id.into();
        if !id.is_key_type() {
            return Ok(None);
        }

        let table = self.table::<E>().await?;
        if let Some(sort_key) = table.metadata().sort_key() {
            return Err(RepositoryError::InvalidData(format!(
                "{} has sort key '{sort_key}'; look it up with a full key",
                table.metadata().entity_name()
            )));
        }
        fetch(table.as_ref(), &Key::partition(id)).await
    }

    /// Looks an entity up by its full primary key.
    pub async fn find_by_key<E: Entity>(&self, key: &Key) -> Result<Option<E>> {
        let table = self.table::<E>().await?;
        fetch(table.as_ref(), key).await
    }

    // ==================== Queries ====================

    /// Translates query text with positional parameters for `E`.
    pub async fn bind_filter<E: Entity>(
        &self,
        text: &str,
        params: &[Value],
    ) -> Result<QueryCondition> {
        let metadata = self.metadata::<E>().await?;
        let condition = bind_query(&metadata, text, params)?;
        tracing::debug!(
            entity = metadata.entity_name(),
            query = text,
            condition = ?condition,
            "Resolved query condition"
        );
        Ok(condition)
    }

    /// Translates query text with named parameters for `E`.
    pub async fn bind_named_filter<E: Entity>(
        &self,
        text: &str,
        params: &Parameters,
    ) -> Result<QueryCondition> {
        let metadata = self.metadata::<E>().await?;
        let condition = bind_named_query(&metadata, text, params)?;
        tracing::debug!(
            entity = metadata.entity_name(),
            query = text,
            condition = ?condition,
            "Resolved query condition"
        );
        Ok(condition)
    }

    /// Prepares a query from text with positional parameters.
    ///
    /// A single parameter with no placeholders in the text is a lookup by
    /// partition key: `find("id", &["a".into()])`.
    pub async fn find<E: Entity>(&self, text: &str, params: &[Value]) -> Result<PanacheQuery<E>> {
        let condition = self.bind_filter::<E>(text, params).await?;
        self.prepare(condition).await
    }

    /// Prepares a query from text with named parameters.
    pub async fn find_named<E: Entity>(
        &self,
        text: &str,
        params: impl Into<Parameters>,
    ) -> Result<PanacheQuery<E>> {
        let condition = self.bind_named_filter::<E>(text, &params.into()).await?;
        self.prepare(condition).await
    }

    /// Prepares a query from a structural condition. `None` reads every item.
    pub async fn find_by_condition<E: Entity>(
        &self,
        condition: Option<QueryCondition>,
    ) -> Result<PanacheQuery<E>> {
        self.prepare(condition.unwrap_or(QueryCondition::ScanAll)).await
    }

    /// Prepares a query over every item of the table.
    pub async fn find_all<E: Entity>(&self) -> Result<PanacheQuery<E>> {
        self.prepare(QueryCondition::ScanAll).await
    }

    pub async fn list<E: Entity>(&self, text: &str, params: &[Value]) -> Result<Vec<E>> {
        self.find::<E>(text, params).await?.list().await
    }

    pub async fn list_named<E: Entity>(
        &self,
        text: &str,
        params: impl Into<Parameters>,
    ) -> Result<Vec<E>> {
        self.find_named::<E>(text, params).await?.list().await
    }

    pub async fn list_by_condition<E: Entity>(
        &self,
        condition: Option<QueryCondition>,
    ) -> Result<Vec<E>> {
        self.find_by_condition::<E>(condition).await?.list().await
    }

    pub async fn list_all<E: Entity>(&self) -> Result<Vec<E>> {
        self.find_all::<E>().await?.list().await
    }

    pub async fn stream<E: Entity>(
        &self,
        text: &str,
        params: &[Value],
    ) -> Result<BoxStream<'static, Result<E>>> {
        Ok(self.find::<E>(text, params).await?.stream())
    }

    pub async fn stream_named<E: Entity>(
        &self,
        text: &str,
        params: impl Into<Parameters>,
    ) -> Result<BoxStream<'static, Result<E>>> {
        Ok(self.find_named::<E>(text, params).await?.stream())
    }

    pub async fn stream_by_condition<E: Entity>(
        &self,
        condition: Option<QueryCondition>,
    ) -> Result<BoxStream<'static, Result<E>>> {
        Ok(self.find_by_condition::<E>(condition).await?.stream())
    }

    pub async fn stream_all<E: Entity>(&self) -> Result<BoxStream<'static, Result<E>>> {
        Ok(self.find_all::<E>().await?.stream())
    }

    async fn prepare<E: Entity>(&self, condition: QueryCondition) -> Result<PanacheQuery<E>> {
        let table = self.table::<E>().await?;
        Ok(PanacheQuery::new(table, condition))
    }
}

impl std::fmt::Debug for Operations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operations")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

async fn fetch<E: Entity>(table: &dyn TableHandle, key: &Key) -> Result<Option<E>> {
    table
        .get_item(key)
        .await?
        .as_ref()
        .map(E::from_item)
        .transpose()
}
