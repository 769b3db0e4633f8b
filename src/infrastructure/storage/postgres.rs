//! PostgreSQL storage: one JSONB document per key, one table per entity type

use std::fmt::Debug;
use std::marker::PhantomData;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::storage::{Storage, StorageEntity, StorageKey};
use crate::domain::DomainError;

/// Table names are interpolated into SQL, so only plain identifiers are accepted
static TABLE_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").unwrap());

/// SQLSTATE `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL storage configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Pool acquire timeout in seconds
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/pmp_chain_engine".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }
}

/// Statements for one document table, built once per storage
#[derive(Debug, Clone, PartialEq, Eq)]
struct TableQueries {
    create_table: String,
    get: String,
    list: String,
    insert: String,
    update: String,
    upsert: String,
    rename: String,
    delete: String,
    count: String,
    exists: String,
}

impl TableQueries {
    fn new(table: &str) -> Result<Self, DomainError> {
        if !TABLE_NAME_PATTERN.is_match(table) {
            return Err(DomainError::configuration(format!(
                "Invalid storage table name '{}'",
                table
            )));
        }

        Ok(Self {
            create_table: format!(
                "CREATE TABLE IF NOT EXISTS {table} (\
                 key VARCHAR(255) PRIMARY KEY, \
                 data JSONB NOT NULL, \
                 created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(), \
                 updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW())"
            ),
            get: format!("SELECT data FROM {table} WHERE key = $1"),
            list: format!("SELECT data FROM {table} ORDER BY key"),
            insert: format!("INSERT INTO {table} (key, data) VALUES ($1, $2)"),
            update: format!("UPDATE {table} SET data = $2, updated_at = NOW() WHERE key = $1"),
            upsert: format!(
                "INSERT INTO {table} (key, data) VALUES ($1, $2) \
                 ON CONFLICT (key) DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()"
            ),
            rename: format!(
                "UPDATE {table} SET key = $2, data = $3, updated_at = NOW() WHERE key = $1"
            ),
            delete: format!("DELETE FROM {table} WHERE key = $1"),
            count: format!("SELECT COUNT(*) AS count FROM {table}"),
            exists: format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE key = $1) AS exists"),
        })
    }
}

fn is_unique_violation(code: Option<&str>) -> bool {
    code == Some(UNIQUE_VIOLATION)
}

/// Map a failed write; a duplicate `key` becomes a conflict
fn write_error(error: sqlx::Error, action: &str, key: &str) -> DomainError {
    let code = error
        .as_database_error()
        .and_then(|db| db.code().map(|c| c.into_owned()));

    if is_unique_violation(code.as_deref()) {
        DomainError::conflict(format!("Entity with key '{}' already exists", key))
    } else {
        DomainError::storage(format!("Failed to {} entity '{}': {}", action, key, error))
    }
}

fn read_error(error: sqlx::Error, action: &str) -> DomainError {
    DomainError::storage(format!("Failed to {}: {}", action, error))
}

fn key_not_found(key: &str) -> DomainError {
    DomainError::not_found(format!("Entity with key '{}' not found", key))
}

fn encode<E: StorageEntity>(entity: &E) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(entity)
        .map_err(|e| DomainError::storage(format!("Failed to serialize entity: {}", e)))
}

fn decode<E: StorageEntity>(row: &PgRow) -> Result<E, DomainError> {
    let data: serde_json::Value = row
        .try_get("data")
        .map_err(|e| read_error(e, "read data column"))?;

    serde_json::from_value(data)
        .map_err(|e| DomainError::storage(format!("Failed to deserialize entity: {}", e)))
}

/// [`Storage`] over a PostgreSQL table of `(key, data, created_at, updated_at)` rows
///
/// Renames are a single `UPDATE` of the key column.
pub struct PostgresStorage<E>
where
    E: StorageEntity,
{
    pool: PgPool,
    table_name: String,
    queries: TableQueries,
    _phantom: PhantomData<E>,
}

impl<E> Debug for PostgresStorage<E>
where
    E: StorageEntity,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStorage")
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl<E> PostgresStorage<E>
where
    E: StorageEntity,
{
    /// Storage over `table_name`; fails for names that are not plain identifiers
    pub fn new(pool: PgPool, table_name: impl Into<String>) -> Result<Self, DomainError> {
        let table_name = table_name.into();
        let queries = TableQueries::new(&table_name)?;

        Ok(Self {
            pool,
            table_name,
            queries,
            _phantom: PhantomData,
        })
    }

    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        sqlx::query(&self.queries.create_table)
            .execute(&self.pool)
            .await
            .map_err(|e| read_error(e, &format!("create table {}", self.table_name)))?;

        Ok(())
    }
}

#[async_trait]
impl<E> Storage<E> for PostgresStorage<E>
where
    E: StorageEntity + 'static,
{
    async fn get(&self, key: &E::Key) -> Result<Option<E>, DomainError> {
        let row = sqlx::query(&self.queries.get)
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| read_error(e, "get entity"))?;

        row.as_ref().map(decode::<E>).transpose()
    }

    async fn list(&self) -> Result<Vec<E>, DomainError> {
        let rows = sqlx::query(&self.queries.list)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| read_error(e, "list entities"))?;

        rows.iter().map(decode::<E>).collect()
    }

    async fn create(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str().to_string();

        sqlx::query(&self.queries.insert)
            .bind(&key)
            .bind(encode(&entity)?)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, "create", &key))?;

        Ok(entity)
    }

    async fn update(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str().to_string();

        let result = sqlx::query(&self.queries.update)
            .bind(&key)
            .bind(encode(&entity)?)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, "update", &key))?;

        if result.rows_affected() == 0 {
            return Err(key_not_found(&key));
        }

        Ok(entity)
    }

    async fn save(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str().to_string();

        sqlx::query(&self.queries.upsert)
            .bind(&key)
            .bind(encode(&entity)?)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, "save", &key))?;

        Ok(entity)
    }

    async fn rename(&self, old_key: &E::Key, entity: E) -> Result<E, DomainError> {
        let new_key = entity.key().as_str().to_string();

        let result = sqlx::query(&self.queries.rename)
            .bind(old_key.as_str())
            .bind(&new_key)
            .bind(encode(&entity)?)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, "rename", &new_key))?;

        if result.rows_affected() == 0 {
            return Err(key_not_found(old_key.as_str()));
        }

        Ok(entity)
    }

    async fn delete(&self, key: &E::Key) -> Result<bool, DomainError> {
        let result = sqlx::query(&self.queries.delete)
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| read_error(e, "delete entity"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let row = sqlx::query(&self.queries.count)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| read_error(e, "count entities"))?;

        let count: i64 = row.try_get("count").map_err(|e| read_error(e, "read count"))?;
        Ok(count as usize)
    }

    async fn exists(&self, key: &E::Key) -> Result<bool, DomainError> {
        let row = sqlx::query(&self.queries.exists)
            .bind(key.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| read_error(e, "check existence"))?;

        row.try_get("exists").map_err(|e| read_error(e, "read exists"))
    }
}
