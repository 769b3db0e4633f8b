//! Agent domain - named provider/model configurations

mod entity;
mod inference;

pub use entity::{Agent, AgentName, AgentSettings};
pub use inference::AgentInference;

#[cfg(test)]
pub use inference::MockAgentInference;
