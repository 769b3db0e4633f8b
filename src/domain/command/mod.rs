//! Command domain - statically registered capabilities

mod handler;
mod protocol;
mod registry;

pub use handler::{CommandDescriptor, CommandError, CommandHandler, CommandInvocation};
pub use protocol::{parse_command_requests, render_command_catalog, CommandRequest};
pub use registry::CommandRegistry;
