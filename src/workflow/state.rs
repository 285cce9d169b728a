#![allow(dead_code)]

//! Workflow execution state

use crate::config::WorkflowDefinition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Lifecycle of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Error,
}

impl StepStatus {
    /// Completed and errored steps never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Error)
    }

    /// Whether `self -> next` is a legal transition
    pub fn can_transition_to(&self, next: StepStatus) -> bool {
        matches!(
            (self, next),
            (StepStatus::Pending, StepStatus::Processing)
                | (StepStatus::Processing, StepStatus::Completed)
                | (StepStatus::Pending, StepStatus::Error)
                | (StepStatus::Processing, StepStatus::Error)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Processing => "processing",
            StepStatus::Completed => "completed",
            StepStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one step within a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub id: String,
    pub name: String,
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Cause, when the step ended in `error`
    pub error: Option<String>,
}

/// Completed steps over total steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Fraction in `0.0..=1.0`. A workflow without steps reports 0.0.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    pub fn percent(&self) -> f64 {
        self.fraction() * 100.0
    }
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.completed, self.total)
    }
}

/// Per-engine execution state
///
/// Every step of the loaded workflow has an explicit record from the moment
/// the workflow is loaded; nothing is implied by absence.
#[derive(Debug, Clone, Default)]
pub struct ExecutionState {
    workflow: Option<String>,
    steps: Vec<StepRecord>,
    running: bool,
}

impl ExecutionState {
    /// Fresh state for a workflow, every step pending
    pub fn new(workflow: &WorkflowDefinition) -> Self {
        Self {
            workflow: Some(workflow.name.clone()),
            steps: workflow
                .steps
                .iter()
                .map(|s| StepRecord {
                    id: s.id.clone(),
                    name: s.name.clone(),
                    status: StepStatus::Pending,
                    started_at: None,
                    finished_at: None,
                    error: None,
                })
                .collect(),
            running: false,
        }
    }

    /// Name of the loaded workflow, if any
    pub fn workflow(&self) -> Option<&str> {
        self.workflow.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub(crate) fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&StepRecord> {
        self.steps.get(index)
    }

    /// Index of the first step with this id
    pub fn index_of(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }

    pub fn status_of(&self, step_id: &str) -> Option<StepStatus> {
        self.index_of(step_id).map(|i| self.steps[i].status)
    }

    /// Status keyed by step id
    pub fn statuses(&self) -> HashMap<String, StepStatus> {
        self.steps
            .iter()
            .map(|s| (s.id.clone(), s.status))
            .collect()
    }

    /// Apply a transition if it is legal. Returns whether the state changed.
    pub fn transition(&mut self, index: usize, next: StepStatus) -> bool {
        let Some(record) = self.steps.get_mut(index) else {
            return false;
        };
        if !record.status.can_transition_to(next) {
            return false;
        }

        let now = Utc::now();
        match next {
            StepStatus::Processing => record.started_at = Some(now),
            StepStatus::Completed | StepStatus::Error => record.finished_at = Some(now),
            StepStatus::Pending => {}
        }
        record.status = next;
        true
    }

    /// Move a step to `error` with a cause. Returns whether the state changed.
    pub fn fail(&mut self, index: usize, cause: impl Into<String>) -> bool {
        if self.transition(index, StepStatus::Error) {
            self.steps[index].error = Some(cause.into());
            true
        } else {
            false
        }
    }

    pub fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    pub fn progress(&self) -> Progress {
        Progress {
            completed: self.count(StepStatus::Completed),
            total: self.steps.len(),
        }
    }

    /// Steps that ended in error, with their causes
    pub fn failed_steps(&self) -> Vec<(&str, Option<&str>)> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Error)
            .map(|s| (s.id.as_str(), s.error.as_deref()))
            .collect()
    }
}

/// Result of a finished or cancelled run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub workflow: String,
    pub progress: Progress,
    pub failed: usize,
    pub duration: Duration,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn from_state(state: &ExecutionState, started_at: Instant, cancelled: bool) -> Self {
        Self {
            workflow: state.workflow().unwrap_or_default().to_string(),
            progress: state.progress(),
            failed: state.count(StepStatus::Error),
            duration: started_at.elapsed(),
            cancelled,
        }
    }

    /// Every step completed
    pub fn success(&self) -> bool {
        !self.cancelled && self.failed == 0 && self.progress.completed == self.progress.total
    }
}
