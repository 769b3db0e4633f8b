//! Storage trait definition

use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::DomainError;

use super::entity::{StorageEntity, StorageKey};

/// Generic document storage for chains, agents and any other keyed entity
#[async_trait]
pub trait Storage<E>: Send + Sync + Debug
where
    E: StorageEntity + 'static,
{
    /// Retrieves an entity by its key
    async fn get(&self, key: &E::Key) -> Result<Option<E>, DomainError>;

    /// Retrieves all entities
    async fn list(&self) -> Result<Vec<E>, DomainError>;

    /// Creates a new entity, returns a conflict if the key is taken
    async fn create(&self, entity: E) -> Result<E, DomainError>;

    /// Updates an existing entity, returns not found if missing
    async fn update(&self, entity: E) -> Result<E, DomainError>;

    /// Creates or replaces an entity
    async fn save(&self, entity: E) -> Result<E, DomainError> {
        if self.exists(entity.key()).await? {
            self.update(entity).await
        } else {
            self.create(entity).await
        }
    }

    /// Re-keys an entity: stores `entity` under its (new) key and removes `old_key`.
    ///
    /// Fails with a conflict when the new key already exists; in that case
    /// nothing is written.
    async fn rename(&self, old_key: &E::Key, entity: E) -> Result<E, DomainError> {
        if old_key == entity.key() {
            return self.update(entity).await;
        }

        if self.exists(entity.key()).await? {
            return Err(DomainError::conflict(format!(
                "Entity with key '{}' already exists",
                entity.key().as_str()
            )));
        }

        let created = self.create(entity).await?;
        self.delete(old_key).await?;
        Ok(created)
    }

    /// Deletes an entity by its key, returns true if deleted
    async fn delete(&self, key: &E::Key) -> Result<bool, DomainError>;

    /// Checks if an entity exists by its key
    async fn exists(&self, key: &E::Key) -> Result<bool, DomainError> {
        Ok(self.get(key).await?.is_some())
    }

    /// Returns the count of entities
    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.list().await?.len())
    }
}
