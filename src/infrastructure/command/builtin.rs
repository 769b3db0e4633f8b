//! Built-in commands registered at startup

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::command::{CommandError, CommandHandler, CommandInvocation, CommandRegistry};
use crate::infrastructure::llm::{HttpClient, HttpClientTrait};

const MAX_HTTP_BODY_CHARS: usize = 16_000;

/// Returns its `input` argument unchanged
#[derive(Debug, Default)]
pub struct EchoCommand;

#[async_trait]
impl CommandHandler for EchoCommand {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn description(&self) -> &'static str {
        "Returns the input text unchanged"
    }

    fn parameters(&self) -> &'static [&'static str] {
        &["input"]
    }

    async fn execute(&self, invocation: &CommandInvocation) -> Result<String, CommandError> {
        Ok(invocation.arg("input").unwrap_or_default())
    }
}

/// Current UTC time, optionally formatted with a strftime `format`
#[derive(Debug, Default)]
pub struct DateTimeCommand;

#[async_trait]
impl CommandHandler for DateTimeCommand {
    fn name(&self) -> &'static str {
        "datetime"
    }

    fn description(&self) -> &'static str {
        "Returns the current UTC date and time"
    }

    fn parameters(&self) -> &'static [&'static str] {
        &["format"]
    }

    async fn execute(&self, invocation: &CommandInvocation) -> Result<String, CommandError> {
        let now = Utc::now();

        match invocation.arg("format") {
            Some(format) => {
                let items: Vec<_> = chrono::format::StrftimeItems::new(&format).collect();
                if items.contains(&chrono::format::Item::Error) {
                    return Err(CommandError::invalid_arguments(
                        self.name(),
                        format!("invalid format '{}'", format),
                    ));
                }
                Ok(now.format_with_items(items.into_iter()).to_string())
            }
            None => Ok(now.to_rfc3339()),
        }
    }
}

/// Fetches a URL and returns the response body as text
#[derive(Debug)]
pub struct HttpGetCommand<C: HttpClientTrait> {
    client: C,
}

impl<C: HttpClientTrait> HttpGetCommand<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: HttpClientTrait + 'static> CommandHandler for HttpGetCommand<C> {
    fn name(&self) -> &'static str {
        "http_get"
    }

    fn description(&self) -> &'static str {
        "Fetches a URL over HTTP(S) and returns the response body"
    }

    fn parameters(&self) -> &'static [&'static str] {
        &["url"]
    }

    async fn execute(&self, invocation: &CommandInvocation) -> Result<String, CommandError> {
        let url = invocation
            .arg("url")
            .or_else(|| invocation.arg("input"))
            .map(|u| u.trim().to_string())
            .ok_or_else(|| CommandError::invalid_arguments(self.name(), "missing 'url'"))?;

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CommandError::invalid_arguments(
                self.name(),
                format!("'{}' is not an http(s) URL", url),
            ));
        }

        let body = self
            .client
            .get_text(&url, vec![("Accept", "text/plain, text/html, application/json")])
            .await
            .map_err(|e| CommandError::failed(self.name(), e.to_string()))?;

        Ok(body.chars().take(MAX_HTTP_BODY_CHARS).collect())
    }
}

/// Registry with every built-in command
pub fn builtin_registry(http_client: HttpClient) -> CommandRegistry {
    CommandRegistry::new()
        .with_handler(Arc::new(EchoCommand))
        .with_handler(Arc::new(DateTimeCommand))
        .with_handler(Arc::new(HttpGetCommand::new(http_client)))
}
