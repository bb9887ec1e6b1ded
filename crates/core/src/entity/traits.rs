use crate::metadata::EntityMetadata;
use crate::storage::Result;
use crate::value::Item;

/// A type persisted in its own table.
///
/// Implementations describe their table layout once and convert to and from
/// stored items. The metadata is cached per type by
/// [`MetadataRegistry`](crate::metadata::MetadataRegistry).
pub trait Entity: Sized + Send + Sync + 'static {
    /// Describes the table backing this entity.
    fn describe() -> Result<EntityMetadata>;

    /// Converts the entity into a stored item.
    fn to_item(&self) -> Item;

    /// Rebuilds an entity from a stored item.
    fn from_item(item: &Item) -> Result<Self>;
}
