//! Static command table built once at startup

use std::collections::BTreeMap;
use std::sync::Arc;

use super::handler::{CommandDescriptor, CommandError, CommandHandler, CommandInvocation};

/// Command name to handler, immutable after construction
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    handlers: BTreeMap<&'static str, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; a later handler with the same name replaces the earlier one
    pub fn with_handler(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.handlers.insert(handler.name(), handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn CommandHandler>> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }

    pub fn descriptors(&self) -> Vec<CommandDescriptor> {
        self.handlers.values().map(|h| h.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub async fn dispatch(&self, invocation: &CommandInvocation) -> Result<String, CommandError> {
        let handler = self
            .get(&invocation.command_name)
            .ok_or_else(|| CommandError::NotFound(invocation.command_name.clone()))?;

        handler.execute(invocation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Map;

    #[derive(Debug)]
    struct Upper;

    #[async_trait]
    impl CommandHandler for Upper {
        fn name(&self) -> &'static str {
            "upper"
        }

        fn description(&self) -> &'static str {
            "Uppercases the input"
        }

        fn parameters(&self) -> &'static [&'static str] {
            &["input"]
        }

        async fn execute(&self, invocation: &CommandInvocation) -> Result<String, CommandError> {
            Ok(invocation.required_arg("input")?.to_uppercase())
        }
    }

    #[tokio::test]
    async fn test_dispatch_to_registered_handler() {
        let registry = CommandRegistry::new().with_handler(Arc::new(Upper));
        let invocation = CommandInvocation::new("upper", "a", CommandInvocation::parse_args("hey"));

        assert_eq!(registry.dispatch(&invocation).await.unwrap(), "HEY");
        assert_eq!(registry.names(), vec!["upper"]);
        assert_eq!(registry.descriptors()[0].parameters, &["input"]);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_command() {
        let registry = CommandRegistry::new();
        let invocation = CommandInvocation::new("missing", "a", Map::new());

        assert_eq!(
            registry.dispatch(&invocation).await.unwrap_err(),
            CommandError::NotFound("missing".to_string())
        );
    }
}
