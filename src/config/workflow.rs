//! Workflow and step definitions

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Workflow kind - explicit, not inferred
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowKind {
    /// Produce new assets
    #[default]
    Generation,
    /// Transform existing assets
    Processing,
    /// Train a custom model
    Training,
    /// Adapt assets for channels or markets
    Optimization,
}

impl WorkflowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generation => "generation",
            Self::Processing => "processing",
            Self::Training => "training",
            Self::Optimization => "optimization",
        }
    }
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single step of a workflow
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StepDefinition {
    /// Step id (unique within workflow)
    pub id: String,

    /// Display name
    pub name: String,

    /// Free-form step kind ("validation", "generation", ...)
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Endpoint the step would call
    #[serde(default)]
    pub api_endpoint: String,

    /// Opaque payload, surfaced verbatim
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,

    /// Human-readable duration estimate ("8-15 seconds", "2-4 minutes")
    #[serde(default)]
    pub estimated_time: String,

    /// Declared dependencies. Advisory only, never enforced.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Full workflow definition
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WorkflowDefinition {
    /// Display name, used by the selector
    pub name: String,

    /// Workflow kind
    #[serde(rename = "type")]
    pub kind: WorkflowKind,

    #[serde(default)]
    pub api_endpoint: String,

    #[serde(default)]
    pub estimated_time: String,

    /// Steps in declaration order
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

impl WorkflowDefinition {
    /// Workflow without steps, as attached to assistant responses
    pub fn stub(
        name: impl Into<String>,
        kind: WorkflowKind,
        api_endpoint: impl Into<String>,
        estimated_time: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            api_endpoint: api_endpoint.into(),
            estimated_time: estimated_time.into(),
            steps: Vec::new(),
        }
    }

    /// Look up a step by id
    pub fn step(&self, id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Validate the workflow definition
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("workflow name must not be empty".to_string());
        }

        let mut seen_ids = HashSet::new();
        for (idx, step) in self.steps.iter().enumerate() {
            if step.id.trim().is_empty() {
                errors.push(format!(
                    "workflow '{}': step #{} has an empty id",
                    self.name,
                    idx + 1
                ));
            } else if !seen_ids.insert(step.id.as_str()) {
                errors.push(format!(
                    "workflow '{}': duplicate step id: {}",
                    self.name, step.id
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Dependencies naming steps that don't exist in this workflow.
    ///
    /// Dependencies are descriptive metadata, so these are warnings rather
    /// than validation errors.
    pub fn unknown_dependencies(&self) -> Vec<(String, String)> {
        self.steps
            .iter()
            .flat_map(|step| {
                step.dependencies
                    .iter()
                    .filter(|dep| self.step(dep).is_none())
                    .map(|dep| (step.id.clone(), dep.clone()))
            })
            .collect()
    }
}
