#![allow(dead_code)]

//! Execution engine - drives a workflow's steps through their lifecycle

use super::duration::{DurationPolicy, scale};
use super::executor::{SimulatedDriver, StepDriver, StepExecutionError};
use super::state::{ExecutionState, Progress, RunSummary, StepStatus};
use crate::cli::signals::CancellationToken;
use crate::config::{EngineSettings, StepDefinition, WorkflowDefinition};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from engine operations other than running
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("a run of '{workflow}' is in progress")]
    Busy { workflow: String },
}

/// A single status transition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepStatusEvent {
    pub workflow: String,
    pub step_id: String,
    pub step_name: String,
    /// Zero-based position in the workflow
    pub index: usize,
    pub total: usize,
    pub status: StepStatus,
    pub error: Option<String>,
    pub at: DateTime<Utc>,
}

/// How a call to [`ExecutionEngine::run`] ended
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Every step was driven to a terminal state
    Completed(RunSummary),
    /// Another run was active; nothing changed
    AlreadyRunning,
    /// The cancellation token fired mid-run
    Cancelled(RunSummary),
}

impl RunOutcome {
    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            RunOutcome::Completed(s) | RunOutcome::Cancelled(s) => Some(s),
            RunOutcome::AlreadyRunning => None,
        }
    }
}

/// Runs one workflow at a time, strictly step after step
///
/// Steps go `pending -> processing -> completed` in declaration order. A step
/// only starts once the previous one is terminal. Declared dependencies are
/// logged but never consulted. A second `run` while one is active is a no-op.
pub struct ExecutionEngine {
    settings: EngineSettings,
    policy: DurationPolicy,
    driver: Arc<dyn StepDriver>,
    state: Mutex<ExecutionState>,
    events: Option<mpsc::UnboundedSender<StepStatusEvent>>,
}

impl ExecutionEngine {
    /// Create an engine with the simulated driver
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            policy: DurationPolicy::from(&settings),
            settings,
            driver: Arc::new(SimulatedDriver),
            state: Mutex::new(ExecutionState::default()),
            events: None,
        }
    }

    /// Replace the step driver
    pub fn with_driver(mut self, driver: Arc<dyn StepDriver>) -> Self {
        self.driver = driver;
        self
    }

    /// Subscribe to status transitions
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<StepStatusEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.events = Some(sender);
        receiver
    }

    /// Simulated wait for a step, after speed scaling
    pub fn wait_for(&self, step: &StepDefinition) -> Duration {
        scale(self.policy.wait_for(&step.estimated_time), self.settings.speed)
    }

    fn lock(&self) -> MutexGuard<'_, ExecutionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load a workflow, clearing any previous state
    pub fn load(&self, workflow: &WorkflowDefinition) -> Result<(), EngineError> {
        let mut state = self.lock();
        if state.is_running() {
            return Err(EngineError::Busy {
                workflow: state.workflow().unwrap_or_default().to_string(),
            });
        }
        *state = ExecutionState::new(workflow);
        tracing::debug!(workflow = %workflow.name, steps = workflow.steps.len(), "Workflow loaded");
        Ok(())
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ExecutionState {
        self.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_running()
    }

    pub fn progress(&self) -> Progress {
        self.lock().progress()
    }

    /// Mark a step as failed from outside the engine
    ///
    /// Only non-terminal steps change. A step failed while processing stays
    /// failed; the run moves on to the next step when its wait ends.
    pub fn fail_step(&self, step_id: &str, cause: &str) -> bool {
        let event = {
            let mut state = self.lock();
            let Some(index) = state.index_of(step_id) else {
                return false;
            };
            if !state.fail(index, cause) {
                return false;
            }
            self.event_for(&state, index)
        };

        tracing::warn!(step = step_id, cause, "Step marked as failed");
        self.emit(event);
        true
    }

    /// Run a workflow to completion
    pub async fn run(&self, workflow: &WorkflowDefinition) -> RunOutcome {
        self.execute(workflow, None).await
    }

    /// Run a workflow, stopping early if `token` fires
    pub async fn run_until_cancelled(
        &self,
        workflow: &WorkflowDefinition,
        token: &CancellationToken,
    ) -> RunOutcome {
        self.execute(workflow, Some(token)).await
    }

    async fn execute(
        &self,
        workflow: &WorkflowDefinition,
        token: Option<&CancellationToken>,
    ) -> RunOutcome {
        {
            let mut state = self.lock();
            if state.is_running() {
                tracing::warn!(
                    workflow = %workflow.name,
                    active = state.workflow().unwrap_or_default(),
                    "Run requested while another is active, ignoring"
                );
                return RunOutcome::AlreadyRunning;
            }
            *state = ExecutionState::new(workflow);
            state.set_running(true);
        }
        let _running = RunningGuard { state: &self.state };

        let started_at = Instant::now();
        let total = workflow.steps.len();
        let mut cancelled = false;

        tracing::info!(workflow = %workflow.name, steps = total, "Starting workflow");

        for (index, step) in workflow.steps.iter().enumerate() {
            if self.settings.dispatch_delay_ms > 0 {
                let delay = scale(
                    Duration::from_millis(self.settings.dispatch_delay_ms),
                    self.settings.speed,
                );
                if until_cancelled(token, tokio::time::sleep(delay)).await.is_none() {
                    cancelled = true;
                    break;
                }
            }

            if token.is_some_and(|t| t.is_cancelled()) {
                cancelled = true;
                break;
            }

            if !step.dependencies.is_empty() {
                tracing::debug!(
                    step = %step.id,
                    dependencies = ?step.dependencies,
                    "Declared dependencies are advisory"
                );
            }

            if !self.apply(index, StepStatus::Processing) {
                tracing::debug!(step = %step.id, "Step already terminal, skipping");
                continue;
            }

            let wait = self.wait_for(step);
            tracing::debug!(
                step = %step.id,
                index = index + 1,
                total,
                wait_ms = wait.as_millis() as u64,
                "Step processing"
            );

            let result = until_cancelled(token, self.driver.execute(step, wait))
                .await
                .unwrap_or_else(|| {
                    Err(StepExecutionError::Cancelled {
                        step: step.id.clone(),
                    })
                });

            match result {
                Ok(()) => {
                    if self.apply(index, StepStatus::Completed) {
                        tracing::info!(step = %step.id, "Step completed");
                    }
                }
                Err(e @ StepExecutionError::Cancelled { .. }) => {
                    self.fail(index, &e);
                    cancelled = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!(step = %step.id, error = %e, "Step failed");
                    self.fail(index, &e);
                }
            }
        }

        let summary = RunSummary::from_state(&self.lock(), started_at, cancelled);

        if cancelled {
            tracing::warn!(
                workflow = %workflow.name,
                progress = %summary.progress,
                "Workflow cancelled"
            );
            RunOutcome::Cancelled(summary)
        } else {
            tracing::info!(
                workflow = %workflow.name,
                progress = %summary.progress,
                failed = summary.failed,
                duration_ms = summary.duration.as_millis() as u64,
                "Workflow finished"
            );
            RunOutcome::Completed(summary)
        }
    }

    /// Transition a step and emit the event if it changed
    fn apply(&self, index: usize, next: StepStatus) -> bool {
        let event = {
            let mut state = self.lock();
            if !state.transition(index, next) {
                return false;
            }
            self.event_for(&state, index)
        };
        self.emit(event);
        true
    }

    fn fail(&self, index: usize, error: &StepExecutionError) {
        let event = {
            let mut state = self.lock();
            if !state.fail(index, error.to_string()) {
                return;
            }
            self.event_for(&state, index)
        };
        self.emit(event);
    }

    fn event_for(&self, state: &ExecutionState, index: usize) -> Option<StepStatusEvent> {
        let record = state.step(index)?;
        Some(StepStatusEvent {
            workflow: state.workflow().unwrap_or_default().to_string(),
            step_id: record.id.clone(),
            step_name: record.name.clone(),
            index,
            total: state.steps().len(),
            status: record.status,
            error: record.error.clone(),
            at: Utc::now(),
        })
    }

    fn emit(&self, event: Option<StepStatusEvent>) {
        if let (Some(sender), Some(event)) = (&self.events, event) {
            // A dropped receiver just means nobody is watching
            let _ = sender.send(event);
        }
    }
}

/// Clears the running flag however the run ends
struct RunningGuard<'a> {
    state: &'a Mutex<ExecutionState>,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_running(false);
    }
}

async fn until_cancelled<F, T>(token: Option<&CancellationToken>, future: F) -> Option<T>
where
    F: std::future::Future<Output = T>,
{
    match token {
        Some(token) => crate::cli::signals::with_cancellation(token, future).await,
        None => Some(future.await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkflowKind;
    use async_trait::async_trait;

    fn step(id: &str, estimate: &str) -> StepDefinition {
        StepDefinition {
            id: id.into(),
            name: format!("Step {}", id),
            estimated_time: estimate.into(),
            ..Default::default()
        }
    }

    fn create_test_workflow() -> WorkflowDefinition {
        WorkflowDefinition {
            name: "Product Background Replacement".into(),
            kind: WorkflowKind::Processing,
            steps: vec![
                step("remove_bg", "30-60 seconds"),
                step("generate_bg", "8-12 seconds"),
                StepDefinition {
                    dependencies: vec!["remove_bg".into(), "generate_bg".into()],
                    ..step("composite", "2-4 minutes")
                },
            ],
            ..Default::default()
        }
    }

    fn drain(receiver: &mut mpsc::UnboundedReceiver<StepStatusEvent>) -> Vec<StepStatusEvent> {
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_completes_every_step() {
        let engine = ExecutionEngine::new(EngineSettings::default());
        let workflow = create_test_workflow();

        let outcome = engine.run(&workflow).await;

        let summary = outcome.summary().unwrap();
        assert!(matches!(outcome, RunOutcome::Completed(_)));
        assert!(summary.success());

        let state = engine.snapshot();
        assert!(!state.is_running());
        let statuses = state.statuses();
        assert_eq!(statuses.len(), 3);
        assert!(statuses.values().all(|s| *s == StepStatus::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transitions_strictly_ordered() {
        let mut engine = ExecutionEngine::new(EngineSettings::default());
        let mut events = engine.subscribe();
        let workflow = create_test_workflow();

        engine.run(&workflow).await;

        let seen: Vec<_> = drain(&mut events)
            .into_iter()
            .map(|e| (e.step_id, e.status))
            .collect();
        assert_eq!(
            seen,
            vec![
                ("remove_bg".to_string(), StepStatus::Processing),
                ("remove_bg".to_string(), StepStatus::Completed),
                ("generate_bg".to_string(), StepStatus::Processing),
                ("generate_bg".to_string(), StepStatus::Completed),
                ("composite".to_string(), StepStatus::Processing),
                ("composite".to_string(), StepStatus::Completed),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_timing() {
        let engine = ExecutionEngine::new(EngineSettings::default());
        let workflow = create_test_workflow();

        let start = tokio::time::Instant::now();
        engine.run(&workflow).await;

        // 30s + 8s + 2s default for minutes
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(40_000));
        assert!(elapsed < Duration::from_millis(40_100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_speed_and_dispatch_delay() {
        let settings = EngineSettings {
            speed: 2.0,
            dispatch_delay_ms: 1000,
            ..Default::default()
        };
        let engine = ExecutionEngine::new(settings);
        let workflow = create_test_workflow();

        let start = tokio::time::Instant::now();
        engine.run(&workflow).await;

        // (1s + 30s) / 2 + (1s + 8s) / 2 + (1s + 2s) / 2
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(21_500));
        assert!(elapsed < Duration::from_millis(21_600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_mid_run() {
        let engine = Arc::new(ExecutionEngine::new(EngineSettings::default()));
        let workflow = create_test_workflow();

        let runner = engine.clone();
        let wf = workflow.clone();
        let handle = tokio::spawn(async move { runner.run(&wf).await });

        // remove_bg finishes at 30s, generate_bg runs until 38s
        tokio::time::sleep(Duration::from_secs(31)).await;

        let state = engine.snapshot();
        assert!(state.is_running());
        assert_eq!(state.status_of("remove_bg"), Some(StepStatus::Completed));
        assert_eq!(state.status_of("generate_bg"), Some(StepStatus::Processing));
        assert_eq!(state.status_of("composite"), Some(StepStatus::Pending));
        assert_eq!(engine.progress(), Progress { completed: 1, total: 3 });

        handle.await.unwrap();
        assert!(!engine.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_run_is_noop() {
        let mut engine = ExecutionEngine::new(EngineSettings::default());
        let mut events = engine.subscribe();
        let engine = Arc::new(engine);
        let workflow = create_test_workflow();

        let runner = engine.clone();
        let wf = workflow.clone();
        let handle = tokio::spawn(async move { runner.run(&wf).await });

        tokio::time::sleep(Duration::from_secs(31)).await;
        let before = engine.snapshot().statuses();
        let events_before = drain(&mut events).len();

        let other = WorkflowDefinition {
            name: "Other".into(),
            steps: vec![step("x", "1 second")],
            ..Default::default()
        };
        let outcome = engine.run(&other).await;

        assert!(matches!(outcome, RunOutcome::AlreadyRunning));
        assert_eq!(engine.snapshot().statuses(), before);
        assert_eq!(engine.snapshot().workflow(), Some("Product Background Replacement"));
        assert!(drain(&mut events).is_empty());
        assert_eq!(events_before, 3);

        assert!(matches!(engine.load(&other), Err(EngineError::Busy { .. })));

        let first = handle.await.unwrap();
        assert!(first.summary().unwrap().success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_again_after_finish_resets() {
        let engine = ExecutionEngine::new(EngineSettings::default());
        let workflow = create_test_workflow();

        engine.run(&workflow).await;
        let outcome = engine.run(&workflow).await;

        assert!(matches!(outcome, RunOutcome::Completed(_)));
        assert_eq!(engine.progress(), Progress { completed: 3, total: 3 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_workflow() {
        let engine = ExecutionEngine::new(EngineSettings::default());
        let workflow = WorkflowDefinition::stub("Custom Model Training", WorkflowKind::Training, "", "");

        let outcome = engine.run(&workflow).await;

        let summary = outcome.summary().unwrap();
        assert_eq!(summary.progress, Progress { completed: 0, total: 0 });
        assert_eq!(summary.progress.fraction(), 0.0);
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn test_load_clears_state() {
        let engine = ExecutionEngine::new(EngineSettings::default());
        let workflow = create_test_workflow();

        engine.load(&workflow).unwrap();

        let state = engine.snapshot();
        assert_eq!(state.steps().len(), 3);
        assert_eq!(state.count(StepStatus::Pending), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_halts_run() {
        let mut engine = ExecutionEngine::new(EngineSettings::default());
        let mut events = engine.subscribe();
        let engine = Arc::new(engine);
        let workflow = create_test_workflow();
        let token = CancellationToken::new();

        let runner = engine.clone();
        let wf = workflow.clone();
        let run_token = token.clone();
        let handle =
            tokio::spawn(async move { runner.run_until_cancelled(&wf, &run_token).await });

        tokio::time::sleep(Duration::from_secs(10)).await;
        token.cancel();

        let outcome = handle.await.unwrap();
        assert!(matches!(outcome, RunOutcome::Cancelled(_)));
        assert!(!engine.is_running());

        let state = engine.snapshot();
        assert_eq!(state.status_of("remove_bg"), Some(StepStatus::Error));
        assert_eq!(state.status_of("generate_bg"), Some(StepStatus::Pending));
        assert_eq!(state.status_of("composite"), Some(StepStatus::Pending));

        let last = drain(&mut events).pop().unwrap();
        assert_eq!(last.status, StepStatus::Error);
        assert!(last.error.unwrap().contains("cancelled"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_injected_failure_is_terminal() {
        let engine = Arc::new(ExecutionEngine::new(EngineSettings::default()));
        let workflow = create_test_workflow();

        let runner = engine.clone();
        let wf = workflow.clone();
        let handle = tokio::spawn(async move { runner.run(&wf).await });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(engine.fail_step("remove_bg", "upload rejected"));
        assert!(!engine.fail_step("missing", "nope"));

        let outcome = handle.await.unwrap();
        let summary = outcome.summary().unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.progress, Progress { completed: 2, total: 3 });
        assert!(!summary.success());

        let state = engine.snapshot();
        assert_eq!(state.status_of("remove_bg"), Some(StepStatus::Error));
        assert_eq!(state.failed_steps(), vec![("remove_bg", Some("upload rejected"))]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_pending_step_is_skipped() {
        let mut engine = ExecutionEngine::new(EngineSettings::default());
        let mut events = engine.subscribe();
        let engine = Arc::new(engine);
        let workflow = WorkflowDefinition {
            name: "Two steps".into(),
            steps: vec![step("a", "1 second"), step("b", "60 seconds")],
            ..Default::default()
        };

        let runner = engine.clone();
        let wf = workflow.clone();
        let start = tokio::time::Instant::now();
        let handle = tokio::spawn(async move { runner.run(&wf).await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(engine.fail_step("b", "asset missing"));

        let outcome = handle.await.unwrap();

        // Only step a's wait is spent
        assert!(start.elapsed() < Duration::from_secs(2));
        let summary = outcome.summary().unwrap();
        assert_eq!(summary.progress, Progress { completed: 1, total: 2 });
        assert_eq!(summary.failed, 1);

        let seen: Vec<_> = drain(&mut events)
            .into_iter()
            .map(|e| (e.step_id, e.status))
            .collect();
        assert_eq!(
            seen,
            vec![
                ("a".to_string(), StepStatus::Processing),
                ("b".to_string(), StepStatus::Error),
                ("a".to_string(), StepStatus::Completed),
            ]
        );
    }

    struct FailingDriver {
        fail_on: &'static str,
    }

    #[async_trait]
    impl StepDriver for FailingDriver {
        async fn execute(
            &self,
            step: &StepDefinition,
            _wait: Duration,
        ) -> Result<(), StepExecutionError> {
            if step.id == self.fail_on {
                Err(StepExecutionError::failed(step, "service unavailable"))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_driver_error_becomes_error_status() {
        let mut engine = ExecutionEngine::new(EngineSettings::default())
            .with_driver(Arc::new(FailingDriver { fail_on: "generate_bg" }));
        let mut events = engine.subscribe();
        let workflow = create_test_workflow();

        let outcome = engine.run(&workflow).await;

        assert!(matches!(outcome, RunOutcome::Completed(_)));
        let state = engine.snapshot();
        assert_eq!(state.status_of("generate_bg"), Some(StepStatus::Error));
        // No short-circuiting
        assert_eq!(state.status_of("composite"), Some(StepStatus::Completed));

        let failure = drain(&mut events)
            .into_iter()
            .find(|e| e.status == StepStatus::Error)
            .unwrap();
        assert_eq!(failure.index, 1);
        assert!(failure.error.unwrap().contains("service unavailable"));
    }
}
