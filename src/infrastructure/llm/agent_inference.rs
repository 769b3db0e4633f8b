//! Routes agent completions to the provider each agent is configured with

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::{
    Agent, AgentInference, DomainError, LlmProvider, LlmRequest, LlmResponse, Message,
};
use crate::infrastructure::observability::{record_llm_request, LlmRequestMetricParams};

/// [`AgentInference`] backed by a table of named providers
#[derive(Debug, Clone, Default)]
pub struct ProviderAgentInference {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
}

impl ProviderAgentInference {
    pub fn new(providers: HashMap<String, Arc<dyn LlmProvider>>) -> Self {
        Self { providers }
    }

    pub fn with_provider(mut self, name: impl Into<String>, provider: Arc<dyn LlmProvider>) -> Self {
        self.providers.insert(name.into(), provider);
        self
    }

    pub fn has_provider(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn provider_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn build_request(agent: &Agent, messages: Vec<Message>) -> LlmRequest {
        let mut builder = LlmRequest::builder();

        if let Some(ref system_prompt) = agent.system_prompt {
            builder = builder.system(system_prompt.clone());
        }

        builder
            .messages(messages)
            .temperature(agent.settings.temperature)
            .max_tokens(agent.settings.max_tokens)
            .top_p(agent.settings.top_p)
            .build()
    }
}

#[async_trait]
impl AgentInference for ProviderAgentInference {
    async fn complete(
        &self,
        agent: &Agent,
        messages: Vec<Message>,
    ) -> Result<LlmResponse, DomainError> {
        let provider = self.providers.get(&agent.provider).ok_or_else(|| {
            DomainError::configuration(format!(
                "Agent '{}' references unknown provider '{}'",
                agent.name, agent.provider
            ))
        })?;

        let request = Self::build_request(agent, messages);
        debug!(
            agent = %agent.name,
            provider = %agent.provider,
            model = %agent.model,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let start = Instant::now();
        let result = provider.chat(&agent.model, request).await;

        record_llm_request(LlmRequestMetricParams {
            provider: provider.provider_name(),
            model: &agent.model,
            duration: start.elapsed(),
            success: result.is_ok(),
            input_tokens: result
                .as_ref()
                .ok()
                .and_then(|r| r.usage.as_ref())
                .map(|u| u.prompt_tokens as u64),
            output_tokens: result
                .as_ref()
                .ok()
                .and_then(|r| r.usage.as_ref())
                .map(|u| u.completion_tokens as u64),
        });

        if let Err(ref e) = result {
            warn!(agent = %agent.name, error = %e, "Completion request failed");
        }

        result
    }
}
