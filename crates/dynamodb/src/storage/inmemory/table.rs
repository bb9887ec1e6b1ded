//! In-memory table handle implementation.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock as StdRwLock};

use async_trait::async_trait;
use tokio::sync::RwLock;

use panache_core::metadata::EntityMetadata;
use panache_core::query::QueryCondition;
use panache_core::storage::{
    Page, RepositoryError, Result, TableHandle, TableProvider, MAX_BATCH_WRITE_ITEMS,
};
use panache_core::value::{Item, Key};

use super::eval::{compare_keys, evaluate, plan, selects, sort_by_key, Selection};

/// Default number of rows examined per page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

type Rows = Arc<RwLock<Vec<Item>>>;
type Tables = Arc<StdRwLock<HashMap<String, Rows>>>;

#[derive(Debug, Clone, Copy)]
struct Options {
    page_size: usize,
    batch_capacity: usize,
    auto_create: bool,
}

/// In-memory table backend for testing.
///
/// Tables are `Vec`s of items behind `Arc<RwLock<_>>`, shared by every handle
/// the provider resolves. Data is not persisted and is lost when the last
/// provider clone is dropped.
///
/// The backend behaves like DynamoDB where callers can observe it: batches
/// are capped at [`MAX_BATCH_WRITE_ITEMS`], reads are paged, key attributes
/// must match their declared types, and operations on a table that was never
/// created fail (unless auto-creation is on, the default).
#[derive(Debug, Clone)]
pub struct InMemoryProvider {
    tables: Tables,
    batch_writes: Arc<AtomicUsize>,
    bindings: Option<Arc<HashSet<String>>>,
    options: Options,
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProvider {
    /// Creates an empty provider. Tables are created on first use.
    pub fn new() -> Self {
        Self {
            tables: Arc::new(StdRwLock::new(HashMap::new())),
            batch_writes: Arc::new(AtomicUsize::new(0)),
            bindings: None,
            options: Options {
                page_size: DEFAULT_PAGE_SIZE,
                batch_capacity: MAX_BATCH_WRITE_ITEMS,
                auto_create: true,
            },
        }
    }

    /// Only tables created through [`TableHandle::create_table`] exist.
    pub fn without_auto_create(mut self) -> Self {
        self.options.auto_create = false;
        self
    }

    /// Binds only the named tables. Resolving any other table is a
    /// configuration error.
    pub fn with_bindings<I, S>(mut self, table_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bindings = Some(Arc::new(table_names.into_iter().map(Into::into).collect()));
        self
    }

    /// Examines at most `page_size` rows per page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.options.page_size = page_size.max(1);
        self
    }

    /// Accepts at most `capacity` items per batch write and reports the rest
    /// as unprocessed.
    pub fn with_batch_capacity(mut self, capacity: usize) -> Self {
        self.options.batch_capacity = capacity;
        self
    }

    /// Number of batch write calls issued so far, across all tables.
    pub fn batch_writes(&self) -> usize {
        self.batch_writes.load(Ordering::SeqCst)
    }

    /// Names of the tables that exist.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = match self.tables.read() {
            Ok(tables) => tables.keys().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().keys().cloned().collect(),
        };
        names.sort();
        names
    }
}

impl TableProvider for InMemoryProvider {
    fn table(&self, metadata: Arc<EntityMetadata>) -> Result<Arc<dyn TableHandle>> {
        if let Some(bindings) = &self.bindings {
            if !bindings.contains(metadata.table_name()) {
                return Err(RepositoryError::Configuration(format!(
                    "No table bound for entity {} (table {})",
                    metadata.entity_name(),
                    metadata.table_name()
                )));
            }
        }
        Ok(Arc::new(InMemoryTable {
            table_name: metadata.table_name().to_string(),
            metadata,
            tables: Arc::clone(&self.tables),
            batch_writes: Arc::clone(&self.batch_writes),
            options: self.options,
        }))
    }
}

/// One in-memory table bound to one entity type.
#[derive(Debug, Clone)]
pub struct InMemoryTable {
    metadata: Arc<EntityMetadata>,
    table_name: String,
    tables: Tables,
    batch_writes: Arc<AtomicUsize>,
    options: Options,
}

impl InMemoryTable {
    fn rows(&self, write: bool) -> Result<Rows> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        if let Some(rows) = tables.get(&self.table_name) {
            return Ok(Arc::clone(rows));
        }
        drop(tables);

        if !self.options.auto_create {
            return Err(failure(write, format!("Table not found: {}", self.table_name)));
        }

        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        Ok(Arc::clone(tables.entry(self.table_name.clone()).or_default()))
    }

    /// Rejects keys whose shape or types do not match the key schema.
    fn check_key(&self, key: &Key, write: bool) -> Result<()> {
        let metadata = &self.metadata;
        if !metadata.partition_key_type().accepts_key(&key.partition) {
            return Err(failure(
                write,
                format!(
                    "Partition key '{}' expects {:?}, got {}",
                    metadata.partition_key(),
                    metadata.partition_key_type(),
                    key.partition.type_name()
                ),
            ));
        }

        match (metadata.sort_key_type(), &key.sort) {
            (None, None) => Ok(()),
            (Some(expected), Some(value)) if expected.accepts_key(value) => Ok(()),
            (Some(expected), Some(value)) => Err(failure(
                write,
                format!(
                    "Sort key expects {expected:?}, got {}",
                    value.type_name()
                ),
            )),
            (Some(_), None) => Err(failure(write, "Missing sort key value".to_string())),
            (None, Some(_)) => Err(failure(
                write,
                "Table has no sort key but one was given".to_string(),
            )),
        }
    }

    fn item_key(&self, item: &Item) -> Result<Key> {
        let key = self
            .metadata
            .key_of(item)
            .map_err(|e| RepositoryError::WriteFailed(e.to_string()))?;
        self.check_key(&key, true)?;
        Ok(key)
    }

    fn position(&self, rows: &[Item], key: &Key) -> Option<usize> {
        rows.iter().position(|row| {
            self.metadata
                .key_of(row)
                .is_ok_and(|row_key| same_key(&row_key, key))
        })
    }
}

#[async_trait]
impl TableHandle for InMemoryTable {
    fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn get_item(&self, key: &Key) -> Result<Option<Item>> {
        self.check_key(key, false)?;
        let rows = self.rows(false)?;
        let rows = rows.read().await;
        Ok(self.position(&rows, key).map(|i| rows[i].clone()))
    }

    async fn put_item(&self, item: Item) -> Result<()> {
        let key = self.item_key(&item)?;
        let rows = self.rows(true)?;
        let mut rows = rows.write().await;
        match self.position(&rows, &key) {
            Some(i) => rows[i] = item,
            None => rows.push(item),
        }
        Ok(())
    }

    async fn update_item(&self, item: Item) -> Result<()> {
        let key = self.item_key(&item)?;
        let rows = self.rows(true)?;
        let mut rows = rows.write().await;

        let position = self.position(&rows, &key);
        let mut row = match position {
            Some(i) => rows[i].clone(),
            None => self.metadata.key_item(&key),
        };

        for field in self.metadata.fields() {
            if !self.metadata.is_key_field(&field.name) && !item.contains_key(&field.name) {
                row.remove(&field.name);
            }
        }
        for (name, value) in item {
            if !self.metadata.is_key_field(&name) {
                row.insert(name, value);
            }
        }

        match position {
            Some(i) => rows[i] = row,
            None => rows.push(row),
        }
        Ok(())
    }

    async fn delete_item(&self, key: &Key) -> Result<()> {
        self.check_key(key, true)?;
        let rows = self.rows(true)?;
        let mut rows = rows.write().await;
        if let Some(i) = self.position(&rows, key) {
            rows.remove(i);
        }
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

        let keys = items
            .iter()
            .map(|item| self.item_key(item))
            .collect::<Result<Vec<_>>>()?;

        self.batch_writes.fetch_add(1, Ordering::SeqCst);

        let total = items.len();
        let accepted = total.min(self.options.batch_capacity);

        let rows = self.rows(true)?;
        let mut rows = rows.write().await;
        for (item, key) in items.into_iter().zip(keys).take(accepted) {
            match self.position(&rows, &key) {
                Some(i) => rows[i] = item,
                None => rows.push(item),
            }
        }

        if accepted < total {
            return Err(RepositoryError::UnprocessedItems {
                unprocessed: total - accepted,
            });
        }
        Ok(())
    }

    async fn fetch_page(&self, condition: &QueryCondition, start: Option<Item>) -> Result<Page> {
        let (selection, filter) = plan(condition);
        if let Selection::Partition { partition, .. } = &selection {
            if !partition.is_key_type() {
                return Err(RepositoryError::QueryFailed(format!(
                    "Partition key value must be S, N or B, got {}",
                    partition.type_name()
                )));
            }
        }

        let rows = self.rows(false)?;
        let mut candidates: Vec<Item> = rows
            .read()
            .await
            .iter()
            .filter(|row| selects(&self.metadata, &selection, row))
            .cloned()
            .collect();
        sort_by_key(&self.metadata, &mut candidates);

        let offset = match start {
            Some(start) => {
                let key = self
                    .metadata
                    .key_of(&start)
                    .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;
                // The start row may be gone; resume after where it sorted.
                candidates
                    .iter()
                    .position(|row| {
                        self.metadata
                            .key_of(row)
                            .is_ok_and(|row_key| compare_keys(&row_key, &key).is_gt())
                    })
                    .unwrap_or(candidates.len())
            }
            None => 0,
        };

        let end = (offset + self.options.page_size).min(candidates.len());
        let examined = &candidates[offset.min(end)..end];

        let last_evaluated_key = match examined.last() {
            Some(last) if end < candidates.len() => {
                Some(self.metadata.key_item(&self.metadata.key_of(last)?))
            }
            _ => None,
        };

        let items = examined
            .iter()
            .filter(|row| filter.is_none_or(|predicate| evaluate(predicate, row)))
            .cloned()
            .collect();

        tracing::trace!(
            table = %self.table_name,
            examined = examined.len(),
            more = last_evaluated_key.is_some(),
            "Fetched in-memory page"
        );

        Ok(Page {
            items,
            last_evaluated_key,
        })
    }

    async fn create_table(&self) -> Result<()> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        if tables.contains_key(&self.table_name) {
            return Err(RepositoryError::WriteFailed(format!(
                "Table {} already exists",
                self.table_name
            )));
        }
        tables.insert(self.table_name.clone(), Rows::default());
        tracing::info!(table = %self.table_name, "Created table");
        Ok(())
    }
}

fn same_key(a: &Key, b: &Key) -> bool {
    let sort_matches = match (&a.sort, &b.sort) {
        (Some(x), Some(y)) => x.matches(y),
        (None, None) => true,
        _ => false,
    };
    a.partition.matches(&b.partition) && sort_matches
}

fn failure(write: bool, message: String) -> RepositoryError {
    if write {
        RepositoryError::WriteFailed(message)
    } else {
        RepositoryError::QueryFailed(message)
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::Configuration("In-memory table registry lock poisoned".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use panache_core::metadata::FieldType;
    use panache_core::query::bind_query;
    use panache_core::value::Value;

    fn fruit() -> Arc<EntityMetadata> {
        Arc::new(
            EntityMetadata::builder("Fruit")
                .field("id", FieldType::String)
                .field("name", FieldType::String)
                .field("weight", FieldType::Number)
                .partition_key("id")
                .build()
                .unwrap(),
        )
    }

    fn reading() -> Arc<EntityMetadata> {
        Arc::new(
            EntityMetadata::builder("Reading")
                .field("sensor", FieldType::String)
                .field("ts", FieldType::Number)
                .partition_key("sensor")
                .sort_key("ts")
                .build()
                .unwrap(),
        )
    }

    fn fruit_item(id: &str, name: &str, weight: i64) -> Item {
        let mut item = Item::new();
        item.insert("id".to_string(), Value::from(id));
        item.insert("name".to_string(), Value::from(name));
        item.insert("weight".to_string(), Value::from(weight));
        item
    }

    fn reading_item(sensor: &str, ts: i64) -> Item {
        let mut item = Item::new();
        item.insert("sensor".to_string(), Value::from(sensor));
        item.insert("ts".to_string(), Value::from(ts));
        item
    }

    async fn drain(table: &dyn TableHandle, condition: &QueryCondition) -> (Vec<Item>, usize) {
        let mut items = Vec::new();
        let mut pages = 0;
        let mut start = None;
        loop {
            let page = table.fetch_page(condition, start).await.unwrap();
            pages += 1;
            items.extend(page.items);
            match page.last_evaluated_key {
                Some(key) => start = Some(key),
                None => return (items, pages),
            }
        }
    }

    // ==================== Item CRUD Tests ====================

    #[tokio::test]
    async fn test_put_and_get() {
        let table = InMemoryProvider::new().table(fruit()).unwrap();
        table.put_item(fruit_item("a", "apple", 120)).await.unwrap();

        let item = table.get_item(&Key::partition("a")).await.unwrap();
        assert_eq!(item, Some(fruit_item("a", "apple", 120)));
        assert!(table.get_item(&Key::partition("b")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let table = InMemoryProvider::new().table(fruit()).unwrap();
        table.put_item(fruit_item("a", "apple", 120)).await.unwrap();
        table.put_item(fruit_item("a", "avocado", 200)).await.unwrap();

        let (items, _) = drain(table.as_ref(), &QueryCondition::ScanAll).await;
        assert_eq!(items, vec![fruit_item("a", "avocado", 200)]);
    }

    #[tokio::test]
    async fn test_update_creates_and_removes_absent_fields() {
        let table = InMemoryProvider::new().table(fruit()).unwrap();
        table.update_item(fruit_item("a", "apple", 120)).await.unwrap();

        let mut partial = fruit_item("a", "apple", 0);
        partial.remove("weight");
        table.update_item(partial.clone()).await.unwrap();

        let stored = table.get_item(&Key::partition("a")).await.unwrap();
        assert_eq!(stored, Some(partial));
    }

    #[tokio::test]
    async fn test_delete() {
        let table = InMemoryProvider::new().table(fruit()).unwrap();
        table.put_item(fruit_item("a", "apple", 120)).await.unwrap();
        table.delete_item(&Key::partition("a")).await.unwrap();
        table.delete_item(&Key::partition("a")).await.unwrap();
        assert!(table.get_item(&Key::partition("a")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_key_types_are_enforced() {
        let table = InMemoryProvider::new().table(fruit()).unwrap();
        let mut item = fruit_item("a", "apple", 1);
        item.insert("id".to_string(), Value::from(7));

        assert!(matches!(
            table.put_item(item).await,
            Err(RepositoryError::WriteFailed(_))
        ));
        assert!(matches!(
            table.get_item(&Key::partition(7)).await,
            Err(RepositoryError::QueryFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_sort_key_is_required() {
        let table = InMemoryProvider::new().table(reading()).unwrap();
        assert!(table.get_item(&Key::partition("s1")).await.is_err());
        assert!(table
            .get_item(&Key::partition("s1").with_sort(1))
            .await
            .unwrap()
            .is_none());
    }

    // ==================== Table Lifecycle Tests ====================

    #[tokio::test]
    async fn test_missing_table_without_auto_create() {
        let provider = InMemoryProvider::new().without_auto_create();
        let table = provider.table(fruit()).unwrap();

        assert!(matches!(
            table.put_item(fruit_item("a", "apple", 1)).await,
            Err(RepositoryError::WriteFailed(message)) if message.contains("Table not found")
        ));

        table.create_table().await.unwrap();
        table.put_item(fruit_item("a", "apple", 1)).await.unwrap();
        assert_eq!(provider.table_names(), vec!["Fruit".to_string()]);
    }

    #[test]
    fn test_unbound_table_is_a_configuration_error() {
        let provider = InMemoryProvider::new().with_bindings(["Reading"]);

        assert!(provider.table(reading()).is_ok());
        assert!(matches!(
            provider.table(fruit()),
            Err(RepositoryError::Configuration(message)) if message.contains("Fruit")
        ));
    }

    #[tokio::test]
    async fn test_create_existing_table_fails() {
        let table = InMemoryProvider::new().table(fruit()).unwrap();
        table.create_table().await.unwrap();
        assert!(table.create_table().await.is_err());
    }

    #[tokio::test]
    async fn test_handles_share_data() {
        let provider = InMemoryProvider::new();
        let writer = provider.table(fruit()).unwrap();
        let reader = provider.table(fruit()).unwrap();

        writer.put_item(fruit_item("a", "apple", 1)).await.unwrap();
        assert!(reader.get_item(&Key::partition("a")).await.unwrap().is_some());
    }

    // ==================== Batch Tests ====================

    #[tokio::test]
    async fn test_batch_limit() {
        let provider = InMemoryProvider::new();
        let table = provider.table(fruit()).unwrap();

        let items: Vec<Item> = (0..26)
            .map(|i| fruit_item(&format!("f{i}"), "fig", i))
            .collect();
        assert!(matches!(
            table.batch_put(items.clone()).await,
            Err(RepositoryError::WriteFailed(_))
        ));
        assert_eq!(provider.batch_writes(), 0);

        table.batch_put(items[..25].to_vec()).await.unwrap();
        assert_eq!(provider.batch_writes(), 1);
    }

    #[tokio::test]
    async fn test_batch_capacity_reports_unprocessed() {
        let provider = InMemoryProvider::new().with_batch_capacity(3);
        let table = provider.table(fruit()).unwrap();

        let items: Vec<Item> = (0..5)
            .map(|i| fruit_item(&format!("f{i}"), "fig", i))
            .collect();
        assert_eq!(
            table.batch_put(items).await,
            Err(RepositoryError::UnprocessedItems { unprocessed: 2 })
        );

        let (stored, _) = drain(table.as_ref(), &QueryCondition::ScanAll).await;
        assert_eq!(stored.len(), 3);
    }

    // ==================== Paging Tests ====================

    #[tokio::test]
    async fn test_scan_pages_through_all_rows() {
        let table = InMemoryProvider::new()
            .with_page_size(4)
            .table(fruit())
            .unwrap();
        for i in 0..10 {
            table
                .put_item(fruit_item(&format!("f{i}"), "fig", i))
                .await
                .unwrap();
        }

        let (items, pages) = drain(table.as_ref(), &QueryCondition::ScanAll).await;
        assert_eq!(items.len(), 10);
        assert_eq!(pages, 3);
    }

    #[tokio::test]
    async fn test_filter_applies_after_paging() {
        let table = InMemoryProvider::new()
            .with_page_size(2)
            .table(fruit())
            .unwrap();
        for i in 0..6 {
            table
                .put_item(fruit_item(&format!("f{i}"), "fig", i))
                .await
                .unwrap();
        }

        let condition = bind_query(&fruit(), "weight >= ?1", &[Value::from(4)]).unwrap();
        let first = table.fetch_page(&condition, None).await.unwrap();
        assert!(first.items.is_empty());
        assert!(first.last_evaluated_key.is_some());

        let (items, _) = drain(table.as_ref(), &condition).await;
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_resume_after_deleted_start_row() {
        let table = InMemoryProvider::new()
            .with_page_size(2)
            .table(fruit())
            .unwrap();
        for i in 0..6 {
            table
                .put_item(fruit_item(&format!("f{i}"), "fig", i))
                .await
                .unwrap();
        }

        let first = table.fetch_page(&QueryCondition::ScanAll, None).await.unwrap();
        let start = first.last_evaluated_key.unwrap();
        table.delete_item(&Key::partition("f1")).await.unwrap();

        let second = table
            .fetch_page(&QueryCondition::ScanAll, Some(start))
            .await
            .unwrap();
        let ids: Vec<_> = second.items.iter().map(|i| i["id"].clone()).collect();
        assert_eq!(ids, vec![Value::from("f2"), Value::from("f3")]);
        assert!(second.last_evaluated_key.is_some());
    }

    #[tokio::test]
    async fn test_query_orders_by_sort_key() {
        let table = InMemoryProvider::new().table(reading()).unwrap();
        for ts in [30, 10, 20] {
            table.put_item(reading_item("s1", ts)).await.unwrap();
        }
        table.put_item(reading_item("s2", 5)).await.unwrap();

        let (items, _) = drain(table.as_ref(), &QueryCondition::key_equals("s1")).await;
        let stamps: Vec<_> = items.iter().map(|i| i["ts"].clone()).collect();
        assert_eq!(
            stamps,
            vec![Value::from(10), Value::from(20), Value::from(30)]
        );

        let condition = bind_query(
            &reading(),
            "sensor = ?1 AND ts > ?2",
            &[Value::from("s1"), Value::from(15)],
        )
        .unwrap();
        let (items, _) = drain(table.as_ref(), &condition).await;
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_null_partition_value_is_rejected() {
        let table = InMemoryProvider::new().table(fruit()).unwrap();
        let condition = QueryCondition::KeyEquals { value: Value::Null };
        assert!(matches!(
            table.fetch_page(&condition, None).await,
            Err(RepositoryError::QueryFailed(_))
        ));
    }
}
