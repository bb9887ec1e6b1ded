//! Typed query objects returned by the `find*` operations.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio::sync::Mutex;

use panache_core::entity::Entity;
use panache_core::query::QueryCondition;
use panache_core::storage::{Result, TableHandle};

use crate::executor::{execute, PageCursor};

/// A prepared query over the table of `E`.
///
/// [`list`](Self::list) runs the query from the start on every call.
/// [`stream`](Self::stream) reads from a cursor owned by this object: once it
/// has been drained, further streams are empty and the store is not queried
/// again.
pub struct PanacheQuery<E> {
    table: Arc<dyn TableHandle>,
    condition: QueryCondition,
    cursor: Arc<Mutex<PageCursor>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> PanacheQuery<E> {
    pub(crate) fn new(table: Arc<dyn TableHandle>, condition: QueryCondition) -> Self {
        let cursor = execute(Arc::clone(&table), condition.clone());
        Self {
            table,
            condition,
            cursor: Arc::new(Mutex::new(cursor)),
            _entity: PhantomData,
        }
    }

    pub fn condition(&self) -> &QueryCondition {
        &self.condition
    }

    pub fn table_name(&self) -> &str {
        self.table.table_name()
    }

    /// Fetches every matching entity.
    pub async fn list(&self) -> Result<Vec<E>> {
        let items = execute(Arc::clone(&self.table), self.condition.clone())
            .drain()
            .await?;
        items.iter().map(E::from_item).collect()
    }

    /// Fetches the first matching entity, if any.
    pub async fn first(&self) -> Result<Option<E>> {
        let mut cursor = execute(Arc::clone(&self.table), self.condition.clone());
        cursor.next_item().await?.as_ref().map(E::from_item).transpose()
    }

    /// Lazily yields matching entities, one page at a time.
    ///
    /// Conversion and store errors are yielded in place; the stream ends
    /// after the first error. Streams taken from the same query share one
    /// cursor, so a later stream continues where an earlier one stopped.
    pub fn stream(&self) -> BoxStream<'static, Result<E>> {
        let cursor = Arc::clone(&self.cursor);
        async_stream::stream! {
            loop {
                // Never hold the cursor across a yield.
                let next = cursor.lock().await.next_item().await;
                match next {
                    Ok(Some(item)) => match E::from_item(&item) {
                        Ok(entity) => {
                            yield Ok(entity);
                        }
                        Err(e) => {
                            yield Err(e);
                            break;
                        }
                    },
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
        .boxed()
    }
}

impl<E> fmt::Debug for PanacheQuery<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanacheQuery")
            .field("table", &self.table.table_name())
            .field("condition", &self.condition)
            .finish()
    }
}
