//! Run command - executes one chain file locally and prints the result

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;

use crate::config::AppConfig;
use crate::domain::chain::{ChainDocument, RunMode, RunRequest};
use crate::infrastructure::logging;

/// Arguments for the run command
#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Chain document to run (`.toml` or `.json`)
    pub file: PathBuf,

    /// Text substituted for `{user_input}`
    #[arg(short, long, default_value = "")]
    pub input: String,

    /// Run every step with this agent instead of the ones in the file
    #[arg(long)]
    pub agent: Option<String>,

    /// Chain argument as `name=value`; may be repeated
    #[arg(long = "arg", value_parser = parse_key_value)]
    pub args: Vec<(String, String)>,

    /// Start at this step instead of step 1
    #[arg(long, conflicts_with = "step")]
    pub from_step: Option<u32>,

    /// Run only this step
    #[arg(long)]
    pub step: Option<u32>,

    /// Print every step's response as JSON instead of only the final output
    #[arg(long)]
    pub all_responses: bool,
}

/// Run a chain file against the configured agents and providers
pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut config = AppConfig::load()?;
    config.storage.storage_type = "memory".to_string();
    logging::init_logging(&config.logging);

    let document = read_document(&args.file).await?;
    let name = document.name.clone();

    let state = crate::create_app_state_with_config(&config).await?;
    state.chain_service.import(document, true).await?;

    let request = build_request(&args);
    let result = state.chain_service.run(&name, request).await?;

    if args.all_responses {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.output);
    }

    Ok(())
}

fn build_request(args: &RunArgs) -> RunRequest {
    let mode = match (args.step, args.from_step) {
        (Some(step), _) => RunMode::SingleStep(step),
        (None, Some(step)) => RunMode::FromStep(step),
        (None, None) => RunMode::Full,
    };

    let mut request = RunRequest::new(args.input.clone()).with_mode(mode);
    if let Some(ref agent) = args.agent {
        request = request.with_agent_override(agent.clone());
    }
    for (name, value) in &args.args {
        request = request.with_arg(name.clone(), value.clone());
    }
    request
}

async fn read_document(path: &Path) -> anyhow::Result<ChainDocument> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let document: ChainDocument = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("Invalid chain document {}", path.display()))?,
        _ => serde_json::from_str(&content)
            .with_context(|| format!("Invalid chain document {}", path.display()))?,
    };

    Ok(document)
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        run: RunArgs,
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("tone=formal=ish"),
            Ok(("tone".to_string(), "formal=ish".to_string()))
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_build_request_modes() {
        let cli = TestCli::parse_from([
            "test", "chain.toml", "--input", "hello", "--agent", "writer", "--arg", "tone=dry",
            "--step", "2",
        ]);

        let request = build_request(&cli.run);
        assert_eq!(request.user_input, "hello");
        assert_eq!(request.mode, RunMode::SingleStep(2));
        assert_eq!(request.agent_override.as_deref(), Some("writer"));
        assert_eq!(request.args.get("tone").map(String::as_str), Some("dry"));
    }

    #[test]
    fn test_from_step_conflicts_with_step() {
        let result = TestCli::try_parse_from(["test", "c.json", "--step", "1", "--from-step", "2"]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_read_toml_document() {
        let path = std::env::temp_dir().join(format!("chain-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "name = \"hello\"\n\n[[steps]]\nstep_number = 1\nagent_name = \"writer\"\nstep_type = \"prompt\"\nprompt = \"Hi {user_input}\"\n",
        )
        .unwrap();

        let document = read_document(&path).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(document.name, "hello");
        assert_eq!(document.steps.len(), 1);
    }
}
