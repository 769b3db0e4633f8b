//! Storage domain - document storage abstraction shared by chains and agents

mod entity;
mod repository;

pub use entity::{StorageEntity, StorageKey};
pub use repository::Storage;
