//! Entity fixtures shared by the test modules.

use panache_core::entity::{get_number, get_optional_string, get_string, put_optional, Entity};
use panache_core::metadata::{EntityMetadata, FieldType};
use panache_core::storage::Result;
use panache_core::value::{Item, Value};

/// Entity keyed by partition only.
#[derive(Debug, Clone, PartialEq)]
pub struct Fruit {
    pub id: String,
    pub name: String,
    pub weight: i64,
    pub color: Option<String>,
}

impl Fruit {
    pub fn new(id: &str, name: &str, weight: i64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            weight,
            color: None,
        }
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }
}

impl Entity for Fruit {
    fn describe() -> Result<EntityMetadata> {
        EntityMetadata::builder_for::<Self>()
            .field("id", FieldType::String)
            .field("name", FieldType::String)
            .field("weight", FieldType::Number)
            .field("color", FieldType::String)
            .partition_key("id")
            .build()
    }

    fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert("id".to_string(), Value::from(&self.id));
        item.insert("name".to_string(), Value::from(&self.name));
        item.insert("weight".to_string(), Value::from(self.weight));
        put_optional(&mut item, "color", self.color.as_deref());
        item
    }

    fn from_item(item: &Item) -> Result<Self> {
        Ok(Self {
            id: get_string(item, "id")?,
            name: get_string(item, "name")?,
            weight: get_number(item, "weight")?,
            color: get_optional_string(item, "color"),
        })
    }
}

/// Entity keyed by partition and sort key.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub sensor: String,
    pub ts: i64,
    pub value: f64,
}

impl Reading {
    pub fn new(sensor: &str, ts: i64, value: f64) -> Self {
        Self {
            sensor: sensor.to_string(),
            ts,
            value,
        }
    }
}

impl Entity for Reading {
    fn describe() -> Result<EntityMetadata> {
        EntityMetadata::builder("Reading")
            .table("sensor_readings")
            .field("sensor", FieldType::String)
            .field("ts", FieldType::Number)
            .field("value", FieldType::Number)
            .partition_key("sensor")
            .sort_key("ts")
            .build()
    }

    fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert("sensor".to_string(), Value::from(&self.sensor));
        item.insert("ts".to_string(), Value::from(self.ts));
        item.insert("value".to_string(), Value::from(self.value));
        item
    }

    fn from_item(item: &Item) -> Result<Self> {
        Ok(Self {
            sensor: get_string(item, "sensor")?,
            ts: get_number(item, "ts")?,
            value: get_number(item, "value")?,
        })
    }
}
