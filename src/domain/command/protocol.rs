//! Fenced `command` block protocol used by task and instruction steps
//!
//! Agents request commands by answering with one or more blocks like:
//!
//! ~~~text
//! ```command
//! {"command_name": "http_get", "command_args": {"url": "https://example.com"}}
//! ```
//! ~~~

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::handler::CommandDescriptor;

static COMMAND_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```command\s*\n?(.*?)```").unwrap());

/// A command requested by the agent
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommandRequest {
    pub command_name: String,
    #[serde(default)]
    pub command_args: Map<String, Value>,
}

/// Extract command requests from an agent response, in order.
/// Blocks that are not valid requests are returned as errors describing the problem.
pub fn parse_command_requests(response: &str) -> Vec<Result<CommandRequest, String>> {
    COMMAND_BLOCK
        .captures_iter(response)
        .map(|caps| {
            let body = caps[1].trim();
            serde_json::from_str::<CommandRequest>(body)
                .map_err(|e| format!("Invalid command block: {}", e))
        })
        .collect()
}

/// Instructions appended to the prompt of a command-capable step
pub fn render_command_catalog(commands: &[CommandDescriptor]) -> String {
    if commands.is_empty() {
        return "No commands are available; answer directly.".to_string();
    }

    let mut catalog = String::from("You can run the following commands:\n");
    for command in commands {
        catalog.push_str(&format!("- {}: {}", command.name, command.description));
        if !command.parameters.is_empty() {
            catalog.push_str(&format!(" (arguments: {})", command.parameters.join(", ")));
        }
        catalog.push('\n');
    }
    catalog.push_str(
        "\nTo run a command, reply with a fenced block:\n\
         ```command\n\
         {\"command_name\": \"<name>\", \"command_args\": {\"<argument>\": \"<value>\"}}\n\
         ```\n\
         When no further commands are needed, reply with your final answer and no command blocks.",
    );
    catalog
}
