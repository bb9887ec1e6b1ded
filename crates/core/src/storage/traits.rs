use std::sync::Arc;

use async_trait::async_trait;

use crate::metadata::EntityMetadata;
use crate::query::QueryCondition;
use crate::value::{Item, Key};

use super::{Page, Result};

/// A schema-aware accessor bound to one table and one entity type.
#[async_trait]
pub trait TableHandle: Send + Sync {
    /// Metadata of the entity type this table stores.
    fn metadata(&self) -> &EntityMetadata;

    /// Resolved table name (may differ from the metadata one when prefixed).
    fn table_name(&self) -> &str;

    /// Gets an item by its primary key.
    async fn get_item(&self, key: &Key) -> Result<Option<Item>>;

    /// Writes an item, replacing any existing item with the same key.
    async fn put_item(&self, item: Item) -> Result<()>;

    /// Updates an item in place, creating it when absent.
    ///
    /// Non-key attributes present in `item` are set. Fields declared in the
    /// metadata but absent from `item` are removed.
    async fn update_item(&self, item: Item) -> Result<()>;

    /// Deletes an item by its primary key. Deleting a missing item is not an error.
    async fn delete_item(&self, key: &Key) -> Result<()>;

    /// Writes up to [`MAX_BATCH_WRITE_ITEMS`](super::MAX_BATCH_WRITE_ITEMS) items in one call.
    async fn batch_put(&self, items: Vec<Item>) -> Result<()>;

    /// Fetches one page for the condition, resuming after `start` when given.
    async fn fetch_page(&self, condition: &QueryCondition, start: Option<Item>) -> Result<Page>;

    /// Creates the table with the key schema from the metadata.
    async fn create_table(&self) -> Result<()>;
}

/// Resolves table handles for entity metadata.
pub trait TableProvider: Send + Sync {
    /// Returns the table handle for the entity, or a configuration error when
    /// no table can be bound.
    ///
    /// Binding does not check that the table exists; a missing table shows
    /// up as a failure of the first operation on the handle.
    fn table(&self, metadata: Arc<EntityMetadata>) -> Result<Arc<dyn TableHandle>>;
}
