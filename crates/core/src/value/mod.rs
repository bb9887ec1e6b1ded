mod binary;
mod types;

pub use types::{Item, Key, Value};
