//! CLI module for the chain engine
//!
//! - `serve`: run the HTTP API (default)
//! - `run`: execute one chain file and print its output

pub mod run;
pub mod serve;

use clap::{Parser, Subcommand};

/// PMP Chain Engine - store and run chains of LLM, command and sub-chain steps
#[derive(Parser)]
#[command(name = "pmp-chain-engine")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Run a chain file once and print the result
    Run(run::RunArgs),
}
