//! Chain service - step store editing, import/export and runs

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::chain::{
    Chain, ChainDocument, ChainError, ChainName, ChainRunResult, ChainRunner, ChainStep,
    RunRequest,
};
use crate::domain::storage::Storage;
use crate::domain::DomainError;

/// Request to create a new chain
#[derive(Debug, Clone)]
pub struct CreateChainRequest {
    pub name: String,
    pub description: Option<String>,
    pub steps: Vec<ChainStep>,
}

impl CreateChainRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_steps(mut self, steps: Vec<ChainStep>) -> Self {
        self.steps = steps;
        self
    }
}

/// Chain service for editing and running chains
pub struct ChainService {
    storage: Arc<dyn Storage<Chain>>,
    runner: Arc<dyn ChainRunner>,
    edit_lock: Mutex<()>,
}

impl std::fmt::Debug for ChainService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainService").finish()
    }
}

impl ChainService {
    /// Create a new chain service
    pub fn new(storage: Arc<dyn Storage<Chain>>, runner: Arc<dyn ChainRunner>) -> Self {
        Self {
            storage,
            runner,
            edit_lock: Mutex::new(()),
        }
    }

    /// List all chains ordered by name
    pub async fn list(&self) -> Result<Vec<Chain>, ChainError> {
        Ok(self.storage.list().await?)
    }

    /// Get a chain by name
    pub async fn get(&self, name: &str) -> Result<Chain, ChainError> {
        let key = ChainName::new(name)?;
        self.storage
            .get(&key)
            .await?
            .ok_or_else(|| ChainError::not_found(key.as_str()))
    }

    /// Create a new chain
    pub async fn create(&self, request: CreateChainRequest) -> Result<Chain, ChainError> {
        let document = ChainDocument {
            name: request.name,
            description: request.description,
            steps: request.steps,
        };

        self.import(document, false).await
    }

    /// Delete a chain
    pub async fn delete(&self, name: &str) -> Result<(), ChainError> {
        let key = ChainName::new(name)?;
        let _guard = self.edit_lock.lock().await;

        if !self.storage.delete(&key).await? {
            return Err(ChainError::not_found(key.as_str()));
        }

        info!(chain = %key, "Chain deleted");
        Ok(())
    }

    /// Rename a chain, keeping its steps
    pub async fn rename(&self, name: &str, new_name: &str) -> Result<Chain, ChainError> {
        let old_key = ChainName::new(name)?;
        let new_key = ChainName::new(new_name)?;
        let _guard = self.edit_lock.lock().await;

        let mut chain = self.load(&old_key).await?;
        if old_key == new_key {
            return Ok(chain);
        }

        chain.set_name(new_key.clone());
        let renamed = self
            .storage
            .rename(&old_key, chain)
            .await
            .map_err(|e| match e {
                DomainError::NotFound { .. } => ChainError::not_found(old_key.as_str()),
                other => Self::conflict_as_name_conflict(other, &new_key),
            })?;

        info!(from = %old_key, to = %new_key, "Chain renamed");
        Ok(renamed)
    }

    /// Insert a step at its position, shifting later steps up
    pub async fn add_step(&self, name: &str, step: ChainStep) -> Result<Chain, ChainError> {
        self.edit(name, |chain| chain.insert_step(step).map(|_| ()))
            .await
    }

    /// Replace a step in place, or append it at `len + 1`
    pub async fn upsert_step(&self, name: &str, step: ChainStep) -> Result<Chain, ChainError> {
        self.edit(name, |chain| chain.upsert_step(step).map(|_| ()))
            .await
    }

    /// Swap two steps
    pub async fn move_step(
        &self,
        name: &str,
        old_step_number: u32,
        new_step_number: u32,
    ) -> Result<Chain, ChainError> {
        self.edit(name, |chain| chain.move_step(old_step_number, new_step_number))
            .await
    }

    /// Remove a step, shifting later steps down
    pub async fn delete_step(&self, name: &str, step_number: u32) -> Result<Chain, ChainError> {
        self.edit(name, |chain| chain.delete_step(step_number).map(|_| ()))
            .await
    }

    /// Names of the run-time arguments the chain's steps reference
    pub async fn chain_args(&self, name: &str) -> Result<Vec<String>, ChainError> {
        Ok(self.get(name).await?.argument_names())
    }

    /// Export a chain as a portable document
    pub async fn export(&self, name: &str) -> Result<ChainDocument, ChainError> {
        let chain = self.get(name).await?;
        Ok(ChainDocument::from(&chain))
    }

    /// Import a chain document, replacing an existing chain only when `overwrite` is set
    pub async fn import(&self, document: ChainDocument, overwrite: bool) -> Result<Chain, ChainError> {
        let chain = document.into_chain()?;
        let _guard = self.edit_lock.lock().await;

        let stored = if overwrite {
            self.storage.save(chain).await?
        } else {
            let name = chain.name().clone();
            self.storage
                .create(chain)
                .await
                .map_err(|e| Self::conflict_as_name_conflict(e, &name))?
        };

        info!(chain = %stored.name(), steps = stored.len(), "Chain stored");
        Ok(stored)
    }

    /// Run a chain; the step list is snapshotted before the first step starts
    pub async fn run(&self, name: &str, request: RunRequest) -> Result<ChainRunResult, ChainError> {
        let snapshot = self.get(name).await?;
        debug!(chain = %snapshot.name(), mode = ?request.mode, "Running chain snapshot");
        self.runner.run(&snapshot, request).await
    }

    /// Import every `.toml` and `.json` chain document in `dir`, skipping chains that already exist
    pub async fn load_seed_dir(&self, dir: impl AsRef<Path>) -> Result<usize, ChainError> {
        let dir = dir.as_ref();
        let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
            ChainError::storage(format!("Failed to read seed directory {}: {}", dir.display(), e))
        })?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ChainError::storage(e.to_string()))?
        {
            paths.push(entry.path());
        }
        paths.sort();

        let mut imported = 0;
        for path in paths {
            let Some(document) = Self::read_seed_file(&path).await? else {
                continue;
            };

            match self.import(document, false).await {
                Ok(chain) => {
                    imported += 1;
                    debug!(chain = %chain.name(), path = %path.display(), "Seeded chain");
                }
                Err(ChainError::NameConflict(name)) => {
                    debug!(chain = %name, "Seed chain already exists, skipping");
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping invalid seed chain");
                }
            }
        }

        info!(count = imported, dir = %dir.display(), "Loaded seed chains");
        Ok(imported)
    }

    async fn read_seed_file(path: &Path) -> Result<Option<ChainDocument>, ChainError> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if extension != "toml" && extension != "json" {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ChainError::storage(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let parsed = if extension == "toml" {
            toml::from_str::<ChainDocument>(&content).map_err(|e| e.to_string())
        } else {
            serde_json::from_str::<ChainDocument>(&content).map_err(|e| e.to_string())
        };

        match parsed {
            Ok(document) => Ok(Some(document)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to parse seed chain");
                Ok(None)
            }
        }
    }

    async fn load(&self, key: &ChainName) -> Result<Chain, ChainError> {
        self.storage
            .get(key)
            .await?
            .ok_or_else(|| ChainError::not_found(key.as_str()))
    }

    /// Read-modify-write under the edit lock; nothing is stored when `apply` fails
    async fn edit<F>(&self, name: &str, apply: F) -> Result<Chain, ChainError>
    where
        F: FnOnce(&mut Chain) -> Result<(), ChainError> + Send,
    {
        let key = ChainName::new(name)?;
        let _guard = self.edit_lock.lock().await;

        let mut chain = self.load(&key).await?;
        apply(&mut chain)?;

        Ok(self.storage.update(chain).await?)
    }

    fn conflict_as_name_conflict(error: DomainError, name: &ChainName) -> ChainError {
        match error {
            DomainError::Conflict { .. } => ChainError::NameConflict(name.to_string()),
            other => other.into(),
        }
    }
}
