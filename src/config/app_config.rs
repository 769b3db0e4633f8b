use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::{Agent, DomainError, ErrorPolicyConfig};
use crate::infrastructure::chain::ExecutionSettings;
use crate::infrastructure::llm::LlmProviderConfig;
use crate::infrastructure::storage::{PostgresConfig, StorageConfig, StorageType};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageSettings,
    pub execution: ExecutionConfig,
    /// Named LLM providers agents can refer to
    pub providers: HashMap<String, LlmProviderConfig>,
    /// Agents registered at startup when missing
    pub agents: Vec<Agent>,
    pub chains: ChainsConfig,
    pub metrics: MetricsConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// `memory` or `postgres`
    #[serde(rename = "type")]
    pub storage_type: String,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Maximum nesting of chain steps
    pub max_depth: usize,
    /// Default round limit for task steps
    pub task_max_rounds: u32,
    /// Per step timeout, 0 disables it
    pub step_timeout_secs: u64,
    pub error_policy: ErrorPolicyConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChainsConfig {
    /// Directory of TOML/JSON chain documents imported at startup
    pub seed_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// When set, `/api` requests must present this key
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        let postgres = PostgresConfig::default();
        Self {
            storage_type: "memory".to_string(),
            database_url: None,
            max_connections: postgres.max_connections,
            min_connections: postgres.min_connections,
            connect_timeout_secs: postgres.connect_timeout_secs,
        }
    }
}

impl StorageSettings {
    /// Resolve the backend selection into a storage configuration
    pub fn to_storage_config(&self) -> Result<StorageConfig, DomainError> {
        let storage_type = StorageType::from_str(&self.storage_type).ok_or_else(|| {
            DomainError::configuration(format!("Unknown storage type '{}'", self.storage_type))
        })?;

        match storage_type {
            StorageType::InMemory => Ok(StorageConfig::in_memory()),
            StorageType::Postgres => {
                let url = self.database_url.clone().ok_or_else(|| {
                    DomainError::configuration("storage.database_url is required for postgres")
                })?;

                Ok(StorageConfig::postgres(
                    PostgresConfig::new(url)
                        .with_max_connections(self.max_connections)
                        .with_min_connections(self.min_connections)
                        .with_connect_timeout(self.connect_timeout_secs),
                ))
            }
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            task_max_rounds: 5,
            step_timeout_secs: 0,
            error_policy: ErrorPolicyConfig::default(),
        }
    }
}

impl ExecutionConfig {
    pub fn settings(&self) -> ExecutionSettings {
        ExecutionSettings {
            step_timeout: (self.step_timeout_secs > 0)
                .then(|| Duration::from_secs(self.step_timeout_secs)),
            error_policy: self.error_policy.clone(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorPolicy;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.execution.max_depth, 8);
        assert!(config.metrics.enabled);
        assert!(config.auth.api_key.is_none());
        assert!(config.execution.settings().step_timeout.is_none());
        assert!(matches!(
            config.storage.to_storage_config(),
            Ok(StorageConfig::InMemory)
        ));
    }

    #[test]
    fn test_parse_toml_sections() {
        let raw = r#"
[server]
port = 9000

[storage]
type = "postgres"
database_url = "postgres://localhost/chains"

[execution]
step_timeout_secs = 30

[execution.error_policy]
prompt = "halt"

[providers.openai]
type = "openai"
api_key_env = "OPENAI_API_KEY"

[[agents]]
name = "writer"
provider = "openai"
model = "gpt-4o"
commands = ["echo"]

[auth]
api_key = "secret"
"#;

        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.agents.len(), 1);
        assert_eq!(config.agents[0].commands, vec!["echo".to_string()]);
        assert!(config.providers.contains_key("openai"));
        assert_eq!(config.auth.api_key.as_deref(), Some("secret"));

        let settings = config.execution.settings();
        assert_eq!(settings.step_timeout, Some(Duration::from_secs(30)));
        assert_eq!(settings.error_policy.prompt, ErrorPolicy::Halt);
        assert_eq!(settings.error_policy.chain, ErrorPolicy::Halt);

        match config.storage.to_storage_config().unwrap() {
            StorageConfig::Postgres(pg) => assert_eq!(pg.url, "postgres://localhost/chains"),
            other => panic!("expected postgres, got {:?}", other),
        }
    }

    #[test]
    fn test_postgres_requires_url() {
        let settings = StorageSettings {
            storage_type: "postgres".to_string(),
            ..Default::default()
        };

        assert!(matches!(
            settings.to_storage_config(),
            Err(DomainError::Configuration { .. })
        ));
    }

    #[test]
    fn test_unknown_storage_type() {
        let settings = StorageSettings {
            storage_type: "sqlite".to_string(),
            ..Default::default()
        };

        assert!(settings.to_storage_config().is_err());
    }
}
