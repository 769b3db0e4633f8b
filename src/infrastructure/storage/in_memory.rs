//! In-memory storage implementation

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::domain::storage::{Storage, StorageEntity, StorageKey};
use crate::domain::DomainError;

/// Thread-safe in-memory storage, listing entities in key order
///
/// Data is lost when the process terminates.
#[derive(Debug)]
pub struct InMemoryStorage<E>
where
    E: StorageEntity,
{
    entities: RwLock<BTreeMap<String, E>>,
}

impl<E> Default for InMemoryStorage<E>
where
    E: StorageEntity,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> InMemoryStorage<E>
where
    E: StorageEntity,
{
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(BTreeMap::new()),
        }
    }

    /// Creates storage pre-populated with entities
    pub fn with_entities(entities: Vec<E>) -> Self {
        let map = entities
            .into_iter()
            .map(|entity| (entity.key().as_str().to_string(), entity))
            .collect();

        Self {
            entities: RwLock::new(map),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, E>>, DomainError> {
        self.entities
            .read()
            .map_err(|e| DomainError::storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, E>>, DomainError> {
        self.entities
            .write()
            .map_err(|e| DomainError::storage(format!("Failed to acquire write lock: {}", e)))
    }
}

#[async_trait]
impl<E> Storage<E> for InMemoryStorage<E>
where
    E: StorageEntity + 'static,
{
    async fn get(&self, key: &E::Key) -> Result<Option<E>, DomainError> {
        Ok(self.read()?.get(key.as_str()).cloned())
    }

    async fn list(&self) -> Result<Vec<E>, DomainError> {
        Ok(self.read()?.values().cloned().collect())
    }

    async fn create(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str().to_string();
        let mut entities = self.write()?;

        if entities.contains_key(&key) {
            return Err(DomainError::conflict(format!(
                "Entity with key '{}' already exists",
                key
            )));
        }

        entities.insert(key, entity.clone());
        Ok(entity)
    }

    async fn update(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str().to_string();
        let mut entities = self.write()?;

        if !entities.contains_key(&key) {
            return Err(DomainError::not_found(format!(
                "Entity with key '{}' not found",
                key
            )));
        }

        entities.insert(key, entity.clone());
        Ok(entity)
    }

    async fn rename(&self, old_key: &E::Key, entity: E) -> Result<E, DomainError> {
        let new_key = entity.key().as_str().to_string();
        let mut entities = self.write()?;

        if !entities.contains_key(old_key.as_str()) {
            return Err(DomainError::not_found(format!(
                "Entity with key '{}' not found",
                old_key.as_str()
            )));
        }

        if new_key != old_key.as_str() {
            if entities.contains_key(&new_key) {
                return Err(DomainError::conflict(format!(
                    "Entity with key '{}' already exists",
                    new_key
                )));
            }
            entities.remove(old_key.as_str());
        }

        entities.insert(new_key, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, key: &E::Key) -> Result<bool, DomainError> {
        Ok(self.write()?.remove(key.as_str()).is_some())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.read()?.len())
    }

    async fn exists(&self, key: &E::Key) -> Result<bool, DomainError> {
        Ok(self.read()?.contains_key(key.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chain::{Chain, ChainName, StepKind};

    fn chain(name: &str) -> Chain {
        Chain::new(ChainName::new(name).unwrap())
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let storage = InMemoryStorage::<Chain>::new();
        storage.create(chain("summarize")).await.unwrap();

        let key = ChainName::new("summarize").unwrap();
        let found = storage.get(&key).await.unwrap();

        assert_eq!(found.unwrap().name().as_str(), "summarize");
        assert!(storage.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_duplicate_is_conflict() {
        let storage = InMemoryStorage::with_entities(vec![chain("a")]);
        let err = storage.create(chain("a")).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let storage = InMemoryStorage::<Chain>::new();
        let err = storage.update(chain("ghost")).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_key() {
        let storage = InMemoryStorage::with_entities(vec![chain("b"), chain("c"), chain("a")]);
        let names: Vec<String> = storage
            .list()
            .await
            .unwrap()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(storage.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_rename_moves_entity_and_keeps_steps() {
        let mut original = chain("old");
        original.add_step(1, "writer", StepKind::prompt("hi")).unwrap();
        let storage = InMemoryStorage::with_entities(vec![original.clone()]);

        let mut renamed = original;
        renamed.set_name(ChainName::new("new").unwrap());
        storage
            .rename(&ChainName::new("old").unwrap(), renamed)
            .await
            .unwrap();

        assert!(storage.get(&ChainName::new("old").unwrap()).await.unwrap().is_none());
        let moved = storage.get(&ChainName::new("new").unwrap()).await.unwrap().unwrap();
        assert_eq!(moved.len(), 1);
    }

    #[tokio::test]
    async fn test_rename_conflict_leaves_both_untouched() {
        let storage = InMemoryStorage::with_entities(vec![chain("a"), chain("b")]);

        let mut renamed = chain("a");
        renamed.set_name(ChainName::new("b").unwrap());
        let err = storage
            .rename(&ChainName::new("a").unwrap(), renamed)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Conflict { .. }));
        assert_eq!(storage.count().await.unwrap(), 2);
        assert!(storage.exists(&ChainName::new("a").unwrap()).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let storage = InMemoryStorage::with_entities(vec![chain("a")]);
        let key = ChainName::new("a").unwrap();

        assert!(storage.delete(&key).await.unwrap());
        assert!(!storage.delete(&key).await.unwrap());
    }
}
