//! Lambda processing pipeline
//!
//! validate signature -> normalize -> execute in sandbox -> assemble result.
//! Every path ends in an [`ExecutionResult`]; nothing is returned as an error.

use crate::normalize::NormalizerRegistry;
use crate::sandbox::{Execution, Sandbox};
use crate::{ExecutionResult, LambdaDefinition, LambdaError, Result, SandboxConfig, signature};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Runs lambdas in a sandbox that is rebuilt every `recycle_after` calls
///
/// The service owns its isolate and is `!Send`; give each concurrent caller
/// its own service.
#[derive(Debug)]
pub struct LambdaService {
    config: SandboxConfig,
    normalizers: NormalizerRegistry,
    sandbox: Option<Sandbox>,
}

impl LambdaService {
    /// Service with the default JavaScript and TypeScript normalizers
    #[must_use]
    pub fn new(config: SandboxConfig) -> Self {
        Self::with_normalizers(config, NormalizerRegistry::default())
    }

    #[must_use]
    pub fn with_normalizers(config: SandboxConfig, normalizers: NormalizerRegistry) -> Self {
        Self {
            config,
            normalizers,
            sandbox: None,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Calls served by the current isolate; `0` when none is alive
    #[must_use]
    pub fn executions(&self) -> u64 {
        self.sandbox.as_ref().map_or(0, Sandbox::executions)
    }

    /// Run `lambda` once with `data`
    pub fn process(&mut self, lambda: &LambdaDefinition, data: &Value) -> ExecutionResult {
        if let Err(e) = signature::validate(&lambda.body) {
            tracing::debug!(language = %lambda.language, "lambda rejected: invalid signature");
            return ExecutionResult::signature_invalid(e.to_string());
        }

        match self.run(lambda, data) {
            Ok((execution, elapsed)) => {
                tracing::debug!(
                    language = %lambda.language,
                    elapsed_us = elapsed.as_micros(),
                    console_writes = execution.console_output.len(),
                    "lambda succeeded"
                );
                ExecutionResult::ok(execution.response, execution.console_output, elapsed)
            }
            Err(e) => {
                tracing::error!(error = %e, language = %lambda.language, "lambda execution failed");
                ExecutionResult::runtime_error(e.to_string())
            }
        }
    }

    fn run(&mut self, lambda: &LambdaDefinition, data: &Value) -> Result<(Execution, Duration)> {
        let source = self.normalizers.normalize(&lambda.body, lambda.language)?;
        let timeout = self.config.timeout;
        let recycle_after = self.config.recycle_after;
        let sandbox = self.sandbox()?;

        let start = Instant::now();
        let outcome = sandbox.execute(&source, data, timeout);
        let elapsed = start.elapsed();

        let spent = sandbox.executions() >= recycle_after;
        if spent || outcome.as_ref().is_err_and(LambdaError::poisons_sandbox) {
            self.recycle(spent);
        }

        outcome.map(|execution| (execution, elapsed))
    }

    /// The live isolate, built on first use
    fn sandbox(&mut self) -> Result<&mut Sandbox> {
        if self.sandbox.is_none() {
            self.sandbox = Some(Sandbox::new(&self.config)?);
        }
        self.sandbox
            .as_mut()
            .ok_or_else(|| LambdaError::Sandbox("sandbox unavailable".into()))
    }

    fn recycle(&mut self, spent: bool) {
        if let Some(sandbox) = self.sandbox.take() {
            if spent {
                tracing::debug!(executions = sandbox.executions(), "sandbox spent, recycling");
            } else {
                tracing::info!(executions = sandbox.executions(), "sandbox terminated, recycling");
            }
        }
    }
}

impl Default for LambdaService {
    fn default() -> Self {
        Self::new(SandboxConfig::default())
    }
}
