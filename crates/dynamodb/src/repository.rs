//! Typed repository for one entity type.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::stream::BoxStream;

use panache_core::entity::Entity;
use panache_core::metadata::EntityMetadata;
use panache_core::query::{Parameters, QueryCondition};
use panache_core::storage::{Result, TableHandle};
use panache_core::value::{Key, Value};

use crate::operations::Operations;
use crate::query::PanacheQuery;

/// Repository bound to the entity type `E`.
///
/// Every method delegates to [`Operations`] with `E` fixed, so call sites
/// read `fruits.find_by_id("a")` instead of `ops.find_by_id::<Fruit>("a")`.
pub struct Repository<E> {
    ops: Operations,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            ops: self.ops.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E> fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &std::any::type_name::<E>())
            .finish()
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(ops: Operations) -> Self {
        Self {
            ops,
            _entity: PhantomData,
        }
    }

    pub fn operations(&self) -> &Operations {
        &self.ops
    }

    pub async fn metadata(&self) -> Result<Arc<EntityMetadata>> {
        self.ops.metadata::<E>().await
    }

    pub async fn table(&self) -> Result<Arc<dyn TableHandle>> {
        self.ops.table::<E>().await
    }

    pub async fn create_table(&self) -> Result<()> {
        self.ops.create_table::<E>().await
    }

    pub async fn persist(&self, entity: &E) -> Result<()> {
        self.ops.persist(entity).await
    }

    pub async fn persist_all<'a>(&self, entities: impl IntoIterator<Item = &'a E>) -> Result<()> {
        self.ops.persist_all(entities).await
    }

    pub async fn update(&self, entity: &E) -> Result<()> {
        self.ops.update(entity).await
    }

    pub async fn update_all<'a>(&self, entities: impl IntoIterator<Item = &'a E>) -> Result<()> {
        self.ops.update_all(entities).await
    }

    pub async fn persist_or_update(&self, entity: &E) -> Result<()> {
        self.ops.persist_or_update(entity).await
    }

    pub async fn persist_or_update_all<'a>(
        &self,
        entities: impl IntoIterator<Item = &'a E>,
    ) -> Result<()> {
        self.ops.persist_or_update_all(entities).await
    }

    pub async fn delete(&self, entity: &E) -> Result<()> {
        self.ops.delete(entity).await
    }

    pub async fn find_by_id(&self, id: impl Into<Value>) -> Result<Option<E>> {
        self.ops.find_by_id::<E>(id).await
    }

    pub async fn find_by_key(&self, key: &Key) -> Result<Option<E>> {
        self.ops.find_by_key::<E>(key).await
    }

    pub async fn find(&self, text: &str, params: &[Value]) -> Result<PanacheQuery<E>> {
        self.ops.find::<E>(text, params).await
    }

    pub async fn find_named(
        &self,
        text: &str,
        params: impl Into<Parameters>,
    ) -> Result<PanacheQuery<E>> {
        self.ops.find_named::<E>(text, params).await
    }

    pub async fn find_by_condition(
        &self,
        condition: Option<QueryCondition>,
    ) -> Result<PanacheQuery<E>> {
        self.ops.find_by_condition::<E>(condition).await
    }

    pub async fn find_all(&self) -> Result<PanacheQuery<E>> {
        self.ops.find_all::<E>().await
    }

    pub async fn list(&self, text: &str, params: &[Value]) -> Result<Vec<E>> {
        self.ops.list::<E>(text, params).await
    }

    pub async fn list_named(&self, text: &str, params: impl Into<Parameters>) -> Result<Vec<E>> {
        self.ops.list_named::<E>(text, params).await
    }

    pub async fn list_by_condition(&self, condition: Option<QueryCondition>) -> Result<Vec<E>> {
        self.ops.list_by_condition::<E>(condition).await
    }

    pub async fn list_all(&self) -> Result<Vec<E>> {
        self.ops.list_all::<E>().await
    }

    pub async fn stream(
        &self,
        text: &str,
        params: &[Value],
    ) -> Result<BoxStream<'static, Result<E>>> {
        self.ops.stream::<E>(text, params).await
    }

    pub async fn stream_named(
        &self,
        text: &str,
        params: impl Into<Parameters>,
    ) -> Result<BoxStream<'static, Result<E>>> {
        self.ops.stream_named::<E>(text, params).await
    }

    pub async fn stream_by_condition(
        &self,
        condition: Option<QueryCondition>,
    ) -> Result<BoxStream<'static, Result<E>>> {
        self.ops.stream_by_condition::<E>(condition).await
    }

    pub async fn stream_all(&self) -> Result<BoxStream<'static, Result<E>>> {
        self.ops.stream_all::<E>().await
    }

    pub async fn bind_filter(&self, text: &str, params: &[Value]) -> Result<QueryCondition> {
        self.ops.bind_filter::<E>(text, params).await
    }

    pub async fn bind_named_filter(
        &self,
        text: &str,
        params: &Parameters,
    ) -> Result<QueryCondition> {
        self.ops.bind_named_filter::<E>(text, params).await
    }
}
