//! Pick a workflow from the catalog by free-text label

use crate::config::{Catalog, WorkflowDefinition};

/// Select the workflow matching a label
///
/// Returns the first workflow whose name contains `label`, ignoring case.
/// When nothing matches the first catalog entry is returned, so selection
/// never fails for a non-empty catalog. Returns `None` only for an empty
/// slice, which a validated `Catalog` never is.
pub fn select<'a>(label: &str, workflows: &'a [WorkflowDefinition]) -> Option<&'a WorkflowDefinition> {
    let needle = label.to_lowercase();

    let found = workflows
        .iter()
        .find(|w| w.name.to_lowercase().contains(&needle));

    match found {
        Some(workflow) => {
            tracing::debug!(label, workflow = %workflow.name, "Selected matching workflow");
            Some(workflow)
        }
        None => {
            let fallback = workflows.first();
            if let Some(workflow) = fallback {
                tracing::debug!(label, workflow = %workflow.name, "No match, using default workflow");
            }
            fallback
        }
    }
}

impl Catalog {
    /// Select from this catalog; see [`select`]
    pub fn select(&self, label: &str) -> &WorkflowDefinition {
        select(label, self.workflows()).expect("validated catalog holds at least one workflow")
    }
}
