//! LLM provider implementations

mod agent_inference;
mod anthropic;
mod factory;
mod http_client;
mod openai;

pub use agent_inference::ProviderAgentInference;
pub use anthropic::AnthropicProvider;
pub use factory::{LlmProviderConfig, LlmProviderFactory, ProviderKind};
pub use http_client::{HttpClient, HttpClientTrait};
pub use openai::OpenAiProvider;

#[cfg(test)]
pub use http_client::mock::MockHttpClient;
