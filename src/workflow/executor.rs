//! Step execution logic

use crate::config::StepDefinition;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors during step execution
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StepExecutionError {
    #[error("step '{step}' cancelled")]
    Cancelled { step: String },

    #[error("step '{step}' failed: {message}")]
    Failed { step: String, message: String },
}

impl StepExecutionError {
    pub fn failed(step: &StepDefinition, message: impl Into<String>) -> Self {
        Self::Failed {
            step: step.id.clone(),
            message: message.into(),
        }
    }
}

/// Performs the work of one step
///
/// The engine owns sequencing and status bookkeeping; a driver only does
/// (or pretends to do) the work and reports success or failure.
#[async_trait]
pub trait StepDriver: Send + Sync {
    async fn execute(&self, step: &StepDefinition, wait: Duration)
    -> Result<(), StepExecutionError>;
}

/// Sleeps for the computed wait and always succeeds
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedDriver;

#[async_trait]
impl StepDriver for SimulatedDriver {
    async fn execute(
        &self,
        step: &StepDefinition,
        wait: Duration,
    ) -> Result<(), StepExecutionError> {
        tracing::trace!(step = %step.id, endpoint = %step.api_endpoint, "Simulating step");
        tokio::time::sleep(wait).await;
        Ok(())
    }
}
