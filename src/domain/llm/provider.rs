use async_trait::async_trait;
use std::fmt::Debug;

use super::{LlmRequest, LlmResponse};
use crate::domain::DomainError;

/// Trait for LLM providers (OpenAI, Anthropic, etc.)
#[async_trait]
pub trait LlmProvider: Send + Sync + Debug {
    /// Send a chat completion request
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::domain::llm::Message;

    /// Provider returning queued responses in order, then echoing the last user message
    #[derive(Debug)]
    pub struct MockLlmProvider {
        name: &'static str,
        responses: Mutex<VecDeque<String>>,
        error: Option<String>,
        requests: Mutex<Vec<(String, LlmRequest)>>,
    }

    impl MockLlmProvider {
        pub fn new(name: &'static str) -> Self {
            Self {
                name,
                responses: Mutex::new(VecDeque::new()),
                error: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn with_response(self, content: impl Into<String>) -> Self {
            self.responses.lock().unwrap().push_back(content.into());
            self
        }

        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }

        /// Requests received so far as `(model, request)` pairs
        pub fn requests(&self) -> Vec<(String, LlmRequest)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlmProvider {
        async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError> {
            self.requests
                .lock()
                .unwrap()
                .push((model.to_string(), request.clone()));

            if let Some(ref error) = self.error {
                return Err(DomainError::provider(self.name, error));
            }

            let content = match self.responses.lock().unwrap().pop_front() {
                Some(content) => content,
                None => request
                    .messages
                    .iter()
                    .rev()
                    .find(|m| !m.is_system())
                    .map(|m| m.content_text().to_string())
                    .unwrap_or_default(),
            };

            Ok(LlmResponse::new("mock-response", model, Message::assistant(content)))
        }

        fn provider_name(&self) -> &'static str {
            self.name
        }
    }
}
