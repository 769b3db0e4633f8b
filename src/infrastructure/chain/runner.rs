//! Sequential chain runner with partial runs, error policies and nested chains

use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{info, info_span, warn, Instrument};

use super::step_executor::{StepExecutor, SubChainRunner};
use crate::domain::chain::{
    Chain, ChainError, ChainName, ChainRunResult, ChainRunner, ChainStep, ErrorPolicy,
    ErrorPolicyConfig, ExecutionContext, RunMode, RunRequest, StepResponse,
};
use crate::domain::Storage;
use crate::infrastructure::observability::{record_chain_run, record_step_execution};

/// Run-time limits and policies
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionSettings {
    pub step_timeout: Option<Duration>,
    pub error_policy: ErrorPolicyConfig,
}

/// Default [`ChainRunner`]
#[derive(Debug, Clone)]
pub struct ChainRunnerImpl {
    chains: Arc<dyn Storage<Chain>>,
    executor: StepExecutor,
    settings: ExecutionSettings,
}

impl ChainRunnerImpl {
    pub fn new(chains: Arc<dyn Storage<Chain>>, executor: StepExecutor) -> Self {
        Self {
            chains,
            executor,
            settings: ExecutionSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ExecutionSettings) -> Self {
        self.settings = settings;
        self
    }

    fn policy_for(&self, step: &ChainStep) -> ErrorPolicy {
        step.on_error
            .unwrap_or_else(|| self.settings.error_policy.for_step_type(step.step_type()))
    }

    fn select_steps<'a>(chain: &'a Chain, mode: RunMode) -> Result<&'a [ChainStep], ChainError> {
        let steps = chain.steps();
        let check = |n: u32| {
            chain
                .step(n)
                .map(|_| n as usize - 1)
                .ok_or_else(|| ChainError::out_of_range(chain.name().as_str(), n))
        };

        match mode {
            RunMode::Full => Ok(steps),
            RunMode::FromStep(n) => Ok(&steps[check(n)?..]),
            RunMode::SingleStep(n) => {
                let index = check(n)?;
                Ok(&steps[index..=index])
            }
        }
    }

    async fn execute_step(
        &self,
        step: &ChainStep,
        context: &ExecutionContext,
    ) -> Result<String, ChainError> {
        let execution = self.executor.execute(step, context, self);

        match self.settings.step_timeout {
            Some(timeout) => tokio::time::timeout(timeout, execution)
                .await
                .map_err(|_| ChainError::Timeout {
                    step_number: step.step_number,
                    timeout_secs: timeout.as_secs(),
                })?,
            None => execution.await,
        }
    }

    async fn run_steps(
        &self,
        chain: &Chain,
        mut context: ExecutionContext,
        mode: RunMode,
    ) -> Result<ChainRunResult, ChainError> {
        let started = Instant::now();
        let steps = Self::select_steps(chain, mode)?;
        let mut responses = Vec::with_capacity(steps.len());
        let mut output = context.user_input().to_string();

        for step in steps {
            let agent_name = context.agent_for(&step.agent_name).to_string();
            let step_type = step.step_type();
            let step_started = Instant::now();

            info!(
                step_number = step.step_number,
                step_type = %step_type,
                agent = %agent_name,
                "Executing step"
            );

            let result = self.execute_step(step, &context).await;
            let elapsed = step_started.elapsed();
            record_step_execution(step_type.as_str(), result.is_ok(), elapsed);

            let response = match result {
                Ok(text) => StepResponse::success(
                    step.step_number,
                    step_type,
                    agent_name,
                    text,
                    elapsed.as_millis() as u64,
                ),
                Err(error) if error.is_structural() => return Err(error),
                Err(error) => match self.policy_for(step) {
                    ErrorPolicy::Halt => {
                        warn!(step_number = step.step_number, error = %error, "Step failed, halting chain");
                        return Err(ChainError::step_failed(
                            chain.name().as_str(),
                            step.step_number,
                            error,
                        ));
                    }
                    ErrorPolicy::Continue => {
                        warn!(step_number = step.step_number, error = %error, "Step failed, continuing");
                        StepResponse::failure(
                            step.step_number,
                            step_type,
                            agent_name,
                            &error,
                            elapsed.as_millis() as u64,
                        )
                    }
                },
            };

            context.record_output(step.step_number, response.output.clone());
            output = response.output.clone();
            responses.push(response);
        }

        Ok(ChainRunResult {
            chain_name: chain.name().to_string(),
            output,
            responses,
            execution_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn run_traced(
        &self,
        chain: &Chain,
        context: ExecutionContext,
        mode: RunMode,
    ) -> Result<ChainRunResult, ChainError> {
        let started = Instant::now();
        let span = info_span!(
            "chain_run",
            chain = %chain.name(),
            depth = context.call_stack().len()
        );

        let result = self.run_steps(chain, context, mode).instrument(span).await;
        record_chain_run(chain.name().as_str(), result.is_ok(), started.elapsed());
        result
    }
}

#[async_trait]
impl SubChainRunner for ChainRunnerImpl {
    async fn run_sub_chain(
        &self,
        chain_name: &str,
        context: ExecutionContext,
    ) -> Result<ChainRunResult, ChainError> {
        let key = ChainName::new(chain_name)?;
        let chain = self
            .chains
            .get(&key)
            .await
            .map_err(|e| ChainError::storage(e.to_string()))?
            .ok_or_else(|| ChainError::not_found(chain_name))?;

        self.run_traced(&chain, context, RunMode::Full).await
    }
}

#[async_trait]
impl ChainRunner for ChainRunnerImpl {
    async fn run(&self, chain: &Chain, request: RunRequest) -> Result<ChainRunResult, ChainError> {
        let context = ExecutionContext::new(chain.name().as_str(), request.user_input)
            .with_args(request.args)
            .with_agent_override(request.agent_override)
            .with_outputs(request.step_outputs);

        self.run_traced(chain, context, request.mode).await
    }
}
