//! Storage factory for runtime storage selection

use std::sync::Arc;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::domain::storage::{Storage, StorageEntity};
use crate::domain::DomainError;

use super::in_memory::InMemoryStorage;
use super::postgres::{PostgresConfig, PostgresStorage};

/// Supported storage types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageType {
    InMemory,
    Postgres,
}

impl StorageType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            _ => None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    InMemory,
    Postgres(PostgresConfig),
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    pub fn postgres(config: PostgresConfig) -> Self {
        Self::Postgres(config)
    }

    pub fn postgres_url(url: impl Into<String>) -> Self {
        Self::Postgres(PostgresConfig::new(url))
    }

    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::InMemory => StorageType::InMemory,
            Self::Postgres(_) => StorageType::Postgres,
        }
    }
}

/// Connected storage backend; every entity table shares the same pool
#[derive(Debug, Clone)]
pub enum StorageFactory {
    InMemory,
    Postgres(PgPool),
}

impl StorageFactory {
    /// Connect to the configured backend
    pub async fn connect(config: &StorageConfig) -> Result<Self, DomainError> {
        match config {
            StorageConfig::InMemory => Ok(Self::InMemory),
            StorageConfig::Postgres(pg_config) => {
                let pool = PgPoolOptions::new()
                    .max_connections(pg_config.max_connections)
                    .min_connections(pg_config.min_connections)
                    .acquire_timeout(std::time::Duration::from_secs(
                        pg_config.connect_timeout_secs,
                    ))
                    .idle_timeout(std::time::Duration::from_secs(pg_config.idle_timeout_secs))
                    .connect(&pg_config.url)
                    .await
                    .map_err(|e| {
                        DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e))
                    })?;
                Ok(Self::Postgres(pool))
            }
        }
    }

    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::InMemory => StorageType::InMemory,
            Self::Postgres(_) => StorageType::Postgres,
        }
    }

    /// Storage for one entity type, creating its table when needed
    pub async fn create<E>(&self, table_name: &str) -> Result<Arc<dyn Storage<E>>, DomainError>
    where
        E: StorageEntity + 'static,
    {
        match self {
            Self::InMemory => Ok(Arc::new(InMemoryStorage::<E>::new())),
            Self::Postgres(pool) => {
                let storage = PostgresStorage::<E>::new(pool.clone(), table_name)?;
                storage.ensure_table().await?;
                Ok(Arc::new(storage))
            }
        }
    }
}
