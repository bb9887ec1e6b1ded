//! Process-wide cache of entity metadata keyed by type.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::entity::Entity;
use crate::storage::Result;

use super::EntityMetadata;

/// Caches [`EntityMetadata`] per entity type.
///
/// Each type is described at most once; later lookups share the same `Arc`.
/// Clones share the underlying map.
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    entries: Arc<RwLock<HashMap<TypeId, Arc<EntityMetadata>>>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the metadata of `E`, describing it on first access.
    pub async fn get_or_describe<E: Entity>(&self) -> Result<Arc<EntityMetadata>> {
        let type_id = TypeId::of::<E>();

        if let Some(metadata) = self.entries.read().await.get(&type_id) {
            return Ok(Arc::clone(metadata));
        }

        let mut entries = self.entries.write().await;
        // Another task may have won the race between the two locks.
        if let Some(metadata) = entries.get(&type_id) {
            return Ok(Arc::clone(metadata));
        }

        let metadata = Arc::new(E::describe()?);
        tracing::debug!(
            entity = metadata.entity_name(),
            table = metadata.table_name(),
            partition_key = metadata.partition_key(),
            "Registered entity metadata"
        );
        entries.insert(type_id, Arc::clone(&metadata));
        Ok(metadata)
    }

    /// Number of entity types described so far.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::metadata::FieldType;
    use crate::storage::RepositoryError;
    use crate::value::Item;

    static DESCRIBE_CALLS: AtomicUsize = AtomicUsize::new(0);

    struct Counted;

    impl Entity for Counted {
        fn describe() -> Result<EntityMetadata> {
            DESCRIBE_CALLS.fetch_add(1, Ordering::SeqCst);
            EntityMetadata::builder_for::<Self>()
                .field("id", FieldType::String)
                .partition_key("id")
                .build()
        }

        fn to_item(&self) -> Item {
            Item::new()
        }

        fn from_item(_item: &Item) -> Result<Self> {
            Ok(Counted)
        }
    }

    struct Broken;

    impl Entity for Broken {
        fn describe() -> Result<EntityMetadata> {
            EntityMetadata::builder_for::<Self>().build()
        }

        fn to_item(&self) -> Item {
            Item::new()
        }

        fn from_item(_item: &Item) -> Result<Self> {
            Ok(Broken)
        }
    }

    #[tokio::test]
    async fn test_describes_each_type_once() {
        let registry = MetadataRegistry::new();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.get_or_describe::<Counted>().await })
            })
            .collect();

        for handle in handles {
            let metadata = handle.await.unwrap().unwrap();
            assert_eq!(metadata.table_name(), "Counted");
        }

        assert_eq!(DESCRIBE_CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_invalid_metadata_is_not_cached() {
        let registry = MetadataRegistry::new();

        let result = registry.get_or_describe::<Broken>().await;

        assert!(matches!(result, Err(RepositoryError::Configuration(_))));
        assert!(registry.is_empty().await);
    }
}
