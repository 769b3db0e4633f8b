use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::http_client::HttpClient;
use super::{AnthropicProvider, OpenAiProvider};
use crate::domain::{DomainError, LlmProvider};

/// Wire protocol spoken by a configured provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "openai", alias = "open_ai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
}

/// Configuration of one named LLM provider
#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    /// Literal API key; takes precedence over `api_key_env`
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    120
}

impl LlmProviderConfig {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            api_key: None,
            api_key_env: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn resolve_api_key(&self, name: &str) -> Result<String, DomainError> {
        if let Some(ref key) = self.api_key {
            return Ok(key.clone());
        }

        let var = self.api_key_env.as_deref().ok_or_else(|| {
            DomainError::configuration(format!(
                "Provider '{}' needs either api_key or api_key_env",
                name
            ))
        })?;

        std::env::var(var).map_err(|_| {
            DomainError::configuration(format!(
                "Environment variable '{}' for provider '{}' is not set",
                var, name
            ))
        })
    }
}

/// Factory for creating LLM providers
#[derive(Debug)]
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Create one provider from its configuration
    pub fn create(
        name: &str,
        config: &LlmProviderConfig,
    ) -> Result<Arc<dyn LlmProvider>, DomainError> {
        let api_key = config.resolve_api_key(name)?;
        let http_client = HttpClient::with_timeout(Duration::from_secs(config.timeout_secs))?;

        let provider: Arc<dyn LlmProvider> = match (config.kind, &config.base_url) {
            (ProviderKind::OpenAi, Some(url)) => {
                Arc::new(OpenAiProvider::with_base_url(http_client, api_key, url))
            }
            (ProviderKind::OpenAi, None) => Arc::new(OpenAiProvider::new(http_client, api_key)),
            (ProviderKind::Anthropic, Some(url)) => {
                Arc::new(AnthropicProvider::with_base_url(http_client, api_key, url))
            }
            (ProviderKind::Anthropic, None) => {
                Arc::new(AnthropicProvider::new(http_client, api_key))
            }
        };

        Ok(provider)
    }

    /// Create every configured provider, keyed by its configured name
    pub fn create_all(
        configs: &HashMap<String, LlmProviderConfig>,
    ) -> Result<HashMap<String, Arc<dyn LlmProvider>>, DomainError> {
        let mut providers = HashMap::with_capacity(configs.len());
        for (name, config) in configs {
            providers.insert(name.clone(), Self::create(name, config)?);
        }
        Ok(providers)
    }
}
