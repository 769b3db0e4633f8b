//! Command implementations

mod builtin;

pub use builtin::{builtin_registry, DateTimeCommand, EchoCommand, HttpGetCommand};
