//! Paged execution of query conditions.

use std::collections::VecDeque;
use std::sync::Arc;

use panache_core::query::{Operation, QueryCondition};
use panache_core::storage::{Result, TableHandle};
use panache_core::value::Item;

/// Starts executing `condition` against `table`.
///
/// Nothing is fetched until the cursor is polled. `ScanAll` and key-less
/// filters scan the table; `KeyEquals` and keyed filters query one partition.
pub fn execute(table: Arc<dyn TableHandle>, condition: QueryCondition) -> PageCursor {
    PageCursor::new(table, condition)
}

/// Lazy cursor over the pages of one query or scan.
///
/// Follows `last_evaluated_key` until the store reports no more pages.
pub struct PageCursor {
    table: Arc<dyn TableHandle>,
    condition: QueryCondition,
    next_start: Option<Item>,
    exhausted: bool,
    buffer: VecDeque<Item>,
    pages: usize,
}

impl PageCursor {
    pub fn new(table: Arc<dyn TableHandle>, condition: QueryCondition) -> Self {
        Self {
            table,
            condition,
            next_start: None,
            exhausted: false,
            buffer: VecDeque::new(),
            pages: 0,
        }
    }

    pub fn condition(&self) -> &QueryCondition {
        &self.condition
    }

    /// Number of pages fetched so far.
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// True once the last page has been fetched and every buffered item taken.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.buffer.is_empty()
    }

    /// Fetches the next page. Returns `None` once the store has no more pages.
    ///
    /// A page may be empty while later pages still hold matches, since
    /// filters apply after the store reads a page.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Item>>> {
        if self.exhausted {
            return Ok(None);
        }

        let start = self.next_start.take();
        let page = self.table.fetch_page(&self.condition, start).await?;
        self.pages += 1;

        tracing::trace!(
            table = %self.table.table_name(),
            operation = ?self.condition.operation(),
            page = self.pages,
            items = page.items.len(),
            "Fetched page"
        );

        match page.last_evaluated_key {
            Some(key) => self.next_start = Some(key),
            None => self.exhausted = true,
        }
        Ok(Some(page.items))
    }

    /// Returns the next item, fetching pages as needed.
    pub async fn next_item(&mut self) -> Result<Option<Item>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }
            match self.next_page().await? {
                Some(items) => self.buffer.extend(items),
                None => return Ok(None),
            }
        }
    }

    /// Collects every remaining item.
    pub async fn drain(&mut self) -> Result<Vec<Item>> {
        let mut items: Vec<Item> = self.buffer.drain(..).collect();
        while let Some(page) = self.next_page().await? {
            items.extend(page);
        }
        Ok(items)
    }

    /// Whether this cursor queries one partition or scans the table.
    pub fn operation(&self) -> Operation {
        self.condition.operation()
    }
}

impl std::fmt::Debug for PageCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCursor")
            .field("table", &self.table.table_name())
            .field("condition", &self.condition)
            .field("pages", &self.pages)
            .field("buffered", &self.buffer.len())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
