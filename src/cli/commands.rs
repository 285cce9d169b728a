//! CLI command implementations

use super::output::{OutputEvent, OutputHandler};
use super::signals::{CancellationToken, with_cancellation};
use crate::config::{
    Catalog, ChatSettings, EngineSettings, ObiConfig, Persona, WorkflowDefinition,
};
use crate::responder::ResponseGenerator;
use crate::workflow::{ExecutionEngine, RunOutcome};
use std::path::Path;
use std::time::Duration;

/// Exit code for a run stopped by a signal
pub const EXIT_CANCELLED: i32 = 130;

/// List the catalog
pub fn list_workflows(catalog: &Catalog, handler: &dyn OutputHandler) -> i32 {
    for (idx, workflow) in catalog.workflows().iter().enumerate() {
        let marker = if idx == 0 { " (default)" } else { "" };
        handler.emit(OutputEvent::Info {
            message: format!(
                "{}{}\n  {} · {} · {} steps · {}",
                workflow.name,
                marker,
                workflow.kind,
                workflow.api_endpoint,
                workflow.steps.len(),
                workflow.estimated_time
            ),
        });
    }
    0
}

/// Show which workflow a label selects, with per-step simulated waits
pub fn select_workflow(
    label: &str,
    catalog: &Catalog,
    settings: &EngineSettings,
    handler: &dyn OutputHandler,
) -> i32 {
    let workflow = catalog.select(label);
    emit_selected(label, workflow, handler);

    // Same waits a run would use
    let engine = ExecutionEngine::new(settings.clone());

    for (idx, step) in workflow.steps.iter().enumerate() {
        let mut line = format!(
            "  {}. {} [{}] {} (~{}s simulated)",
            idx + 1,
            step.name,
            step.id,
            step.estimated_time,
            engine.wait_for(step).as_secs_f64()
        );
        if !step.dependencies.is_empty() {
            line.push_str(&format!(" after {}", step.dependencies.join(", ")));
        }
        handler.emit(OutputEvent::Info { message: line });
    }
    0
}

/// Select a workflow by label and run it
pub async fn run_workflow(
    label: &str,
    catalog: &Catalog,
    settings: &EngineSettings,
    token: &CancellationToken,
    handler: &dyn OutputHandler,
) -> i32 {
    let workflow = catalog.select(label);
    emit_selected(label, workflow, handler);
    execute(workflow, settings, token, handler).await
}

/// Run a workflow, forwarding status events to `handler`
pub async fn execute(
    workflow: &WorkflowDefinition,
    settings: &EngineSettings,
    token: &CancellationToken,
    handler: &dyn OutputHandler,
) -> i32 {
    let mut engine = ExecutionEngine::new(settings.clone());
    let mut events = engine.subscribe();

    let run = engine.run_until_cancelled(workflow, token);
    tokio::pin!(run);

    let outcome = loop {
        tokio::select! {
            outcome = &mut run => break outcome,
            Some(event) = events.recv() => handler.emit(event.into()),
        }
    };
    while let Ok(event) = events.try_recv() {
        handler.emit(event.into());
    }

    let Some(summary) = outcome.summary() else {
        return 1;
    };

    handler.emit(OutputEvent::WorkflowComplete {
        name: summary.workflow.clone(),
        completed: summary.progress.completed,
        total: summary.progress.total,
        failed: summary.failed,
        duration_ms: summary.duration.as_millis() as u64,
        cancelled: summary.cancelled,
    });

    match outcome {
        RunOutcome::Cancelled(_) => EXIT_CANCELLED,
        RunOutcome::Completed(ref s) if s.failed == 0 => 0,
        _ => 1,
    }
}

/// Reply to a message, optionally running the suggested workflow
#[allow(clippy::too_many_arguments)]
pub async fn chat(
    message: &str,
    persona: Persona,
    generator: &ResponseGenerator,
    catalog: &Catalog,
    config: &ObiConfig,
    run: bool,
    token: &CancellationToken,
    handler: &dyn OutputHandler,
) -> i32 {
    if message.trim().is_empty() {
        handler.emit(OutputEvent::Response {
            persona: persona.to_string(),
            message: generator.welcome(persona).to_string(),
            workflow: None,
        });
        return 0;
    }

    if !think(&config.chat, token).await {
        return EXIT_CANCELLED;
    }

    let response = generator.respond(message, persona);
    handler.emit(OutputEvent::Response {
        persona: persona.to_string(),
        message: response.message,
        workflow: response.workflow.as_ref().map(|w| w.name.clone()),
    });

    let Some(suggested) = response.workflow else {
        return 0;
    };

    // Suggestions name a workflow; the catalog decides which one actually runs
    let label = suggested.name.to_lowercase();
    if run {
        run_workflow(&label, catalog, &config.engine, token, handler).await
    } else {
        emit_selected(&label, catalog.select(&label), handler);
        0
    }
}

/// List personas with their quick actions
pub fn list_personas(generator: &ResponseGenerator, handler: &dyn OutputHandler) -> i32 {
    for (persona, ctx) in generator.personas().iter() {
        let mut message = format!("{} ({})\n  focus: {}", ctx.label, persona, ctx.focus_area);
        for action in &ctx.quick_actions {
            message.push_str(&format!("\n  • {}", action));
        }
        handler.emit(OutputEvent::Info { message });
    }
    0
}

/// Validate the catalog that would be used
pub fn validate_catalog(
    explicit: Option<&Path>,
    config: &ObiConfig,
    project_dir: Option<&Path>,
    handler: &dyn OutputHandler,
) -> i32 {
    match Catalog::resolve(explicit, config, project_dir) {
        Ok(catalog) => {
            let steps: usize = catalog.workflows().iter().map(|w| w.steps.len()).sum();
            handler.emit(OutputEvent::Info {
                message: format!(
                    "✓ Catalog is valid ({} workflows, {} steps)",
                    catalog.workflows().len(),
                    steps
                ),
            });
            for workflow in catalog.workflows() {
                for (step, dependency) in workflow.unknown_dependencies() {
                    handler.emit(OutputEvent::Info {
                        message: format!(
                            "  note: '{}' step '{}' lists unknown dependency '{}'",
                            workflow.name, step, dependency
                        ),
                    });
                }
            }
            0
        }
        Err(e) => {
            handler.emit(OutputEvent::Info {
                message: format!("✗ Catalog validation failed:\n{:#}", e),
            });
            1
        }
    }
}

fn emit_selected(label: &str, workflow: &WorkflowDefinition, handler: &dyn OutputHandler) {
    handler.emit(OutputEvent::WorkflowSelected {
        label: label.to_string(),
        name: workflow.name.clone(),
        kind: workflow.kind.to_string(),
        steps: workflow.steps.len(),
    });
}

/// Simulated processing pause before a reply. False if cancelled.
async fn think(settings: &ChatSettings, token: &CancellationToken) -> bool {
    let delay = Duration::from_millis(settings.response_delay_ms);
    with_cancellation(token, tokio::time::sleep(delay))
        .await
        .is_some()
}
