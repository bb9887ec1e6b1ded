mod registry;
mod types;

pub use registry::MetadataRegistry;
pub use types::{simple_type_name, EntityMetadata, EntityMetadataBuilder, FieldDef, FieldType};
