use std::collections::HashSet;

use serde::Serialize;

use crate::storage::{RepositoryError, Result};
use crate::value::{Item, Key, Value};

/// Declared type of an entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Binary,
    Bool,
    List,
    Map,
}

impl FieldType {
    /// Returns true for types usable as a partition or sort key.
    pub fn is_key_type(self) -> bool {
        matches!(self, FieldType::String | FieldType::Number | FieldType::Binary)
    }

    /// Returns true when `value` can be stored in a key attribute of this type.
    pub fn accepts_key(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (FieldType::String, Value::S(_))
                | (FieldType::Number, Value::N(_))
                | (FieldType::Binary, Value::B(_))
        )
    }

    /// Parses the short names accepted on the command line (`s`, `n`, `string`, ...).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "s" | "string" => Some(FieldType::String),
            "n" | "number" => Some(FieldType::Number),
            "b" | "binary" => Some(FieldType::Binary),
            "bool" | "boolean" => Some(FieldType::Bool),
            "l" | "list" => Some(FieldType::List),
            "m" | "map" => Some(FieldType::Map),
            _ => None,
        }
    }
}

/// A declared entity field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
}

/// Per-type persistence metadata.
///
/// Built once per entity type and immutable afterwards. Construct it through
/// [`EntityMetadata::builder`], which validates the key fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityMetadata {
    entity_name: String,
    table_name: String,
    fields: Vec<FieldDef>,
    partition_key: String,
    sort_key: Option<String>,
}

impl EntityMetadata {
    /// Starts a builder for the named entity. The table name defaults to the
    /// entity name.
    pub fn builder(entity_name: impl Into<String>) -> EntityMetadataBuilder {
        EntityMetadataBuilder {
            entity_name: entity_name.into(),
            table_name: None,
            fields: Vec::new(),
            partition_key: None,
            sort_key: None,
        }
    }

    /// Starts a builder named after the simple name of `T` (`Fruit` for `crate::model::Fruit`).
    pub fn builder_for<T: ?Sized>() -> EntityMetadataBuilder {
        Self::builder(simple_type_name::<T>())
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    pub fn sort_key(&self) -> Option<&str> {
        self.sort_key.as_deref()
    }

    pub fn is_key_field(&self, name: &str) -> bool {
        self.partition_key == name || self.sort_key.as_deref() == Some(name)
    }

    /// Declared type of the partition key.
    pub fn partition_key_type(&self) -> FieldType {
        self.field(&self.partition_key)
            .map(|f| f.field_type)
            .unwrap_or(FieldType::String)
    }

    /// Declared type of the sort key, if any.
    pub fn sort_key_type(&self) -> Option<FieldType> {
        self.sort_key
            .as_deref()
            .and_then(|name| self.field(name))
            .map(|f| f.field_type)
    }

    /// Extracts the primary key of an item.
    pub fn key_of(&self, item: &Item) -> Result<Key> {
        let partition = item.get(&self.partition_key).cloned().ok_or_else(|| {
            RepositoryError::InvalidData(format!(
                "{} item is missing partition key '{}'",
                self.entity_name, self.partition_key
            ))
        })?;

        let sort = match &self.sort_key {
            Some(name) => Some(item.get(name).cloned().ok_or_else(|| {
                RepositoryError::InvalidData(format!(
                    "{} item is missing sort key '{}'",
                    self.entity_name, name
                ))
            })?),
            None => None,
        };

        Ok(Key { partition, sort })
    }

    /// Builds the attribute map of a key, as sent to the store.
    pub fn key_item(&self, key: &Key) -> Item {
        let mut item = Item::new();
        item.insert(self.partition_key.clone(), key.partition.clone());
        if let (Some(name), Some(value)) = (&self.sort_key, &key.sort) {
            item.insert(name.clone(), value.clone());
        }
        item
    }
}

/// Builder for [`EntityMetadata`].
#[derive(Debug, Clone)]
pub struct EntityMetadataBuilder {
    entity_name: String,
    table_name: Option<String>,
    fields: Vec<FieldDef>,
    partition_key: Option<String>,
    sort_key: Option<String>,
}

impl EntityMetadataBuilder {
    /// Overrides the table name.
    pub fn table(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Declares a field. Declaration order is kept.
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            field_type,
        });
        self
    }

    /// Designates the partition-key field.
    pub fn partition_key(mut self, name: impl Into<String>) -> Self {
        self.partition_key = Some(name.into());
        self
    }

    /// Designates the sort-key field.
    pub fn sort_key(mut self, name: impl Into<String>) -> Self {
        self.sort_key = Some(name.into());
        self
    }

    /// Validates and builds the metadata.
    pub fn build(self) -> Result<EntityMetadata> {
        let entity_name = self.entity_name;
        if entity_name.is_empty() {
            return Err(RepositoryError::Configuration(
                "entity name must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(RepositoryError::Configuration(format!(
                    "{entity_name} declares field '{}' twice",
                    field.name
                )));
            }
        }

        let partition_key = self.partition_key.ok_or_else(|| {
            RepositoryError::Configuration(format!("{entity_name} has no partition key"))
        })?;
        check_key_field(&entity_name, &self.fields, &partition_key)?;

        if let Some(sort_key) = &self.sort_key {
            if *sort_key == partition_key {
                return Err(RepositoryError::Configuration(format!(
                    "{entity_name} uses '{sort_key}' as both partition and sort key"
                )));
            }
            check_key_field(&entity_name, &self.fields, sort_key)?;
        }

        Ok(EntityMetadata {
            table_name: self.table_name.unwrap_or_else(|| entity_name.clone()),
            entity_name,
            fields: self.fields,
            partition_key,
            sort_key: self.sort_key,
        })
    }
}

fn check_key_field(entity_name: &str, fields: &[FieldDef], key: &str) -> Result<()> {
    match fields.iter().find(|f| f.name == key) {
        Some(field) if field.field_type.is_key_type() => Ok(()),
        Some(field) => Err(RepositoryError::Configuration(format!(
            "{entity_name} key field '{key}' has non-scalar type {:?}",
            field.field_type
        ))),
        None => Err(RepositoryError::Configuration(format!(
            "{entity_name} key field '{key}' is not declared"
        ))),
    }
}

/// Last path segment of a type name, without generic arguments.
pub fn simple_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}
