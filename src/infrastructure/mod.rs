//! Infrastructure layer - External service implementations

pub mod chain;
pub mod command;
pub mod llm;
pub mod logging;
pub mod observability;
pub mod services;
pub mod storage;
