//! Functional core of panache: entity metadata, the value model, the filter
//! query language and the storage contracts the table backends implement.

pub mod entity;
pub mod metadata;
pub mod query;
pub mod storage;
pub mod value;
