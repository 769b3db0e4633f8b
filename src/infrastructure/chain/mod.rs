//! Chain execution

mod runner;
mod step_executor;

pub use runner::{ChainRunnerImpl, ExecutionSettings};
pub use step_executor::{StepExecutor, SubChainRunner};
