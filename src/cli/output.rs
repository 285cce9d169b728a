//! Output handlers for CLI commands
//!
//! Supports console (pretty), JSON, and quiet output modes.

use crate::workflow::{StepStatus, StepStatusEvent};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Output mode for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Console,
    Json,
    Quiet,
}

impl OutputMode {
    /// Parse from string
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "quiet" => Self::Quiet,
            _ => Self::Console,
        }
    }
}

/// Events emitted by commands
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum OutputEvent {
    WorkflowSelected {
        label: String,
        name: String,
        kind: String,
        steps: usize,
    },
    StepStatus {
        step: String,
        name: String,
        /// One-based
        index: usize,
        total: usize,
        status: StepStatus,
        error: Option<String>,
    },
    WorkflowComplete {
        name: String,
        completed: usize,
        total: usize,
        failed: usize,
        duration_ms: u64,
        cancelled: bool,
    },
    Response {
        persona: String,
        message: String,
        workflow: Option<String>,
    },
    Info {
        message: String,
    },
    Debug {
        message: String,
    },
}

impl From<StepStatusEvent> for OutputEvent {
    fn from(event: StepStatusEvent) -> Self {
        OutputEvent::StepStatus {
            step: event.step_id,
            name: event.step_name,
            index: event.index + 1,
            total: event.total,
            status: event.status,
            error: event.error,
        }
    }
}

/// Output handler trait
pub trait OutputHandler: Send + Sync {
    /// Emit an event
    fn emit(&self, event: OutputEvent);
}

/// Console output handler
pub struct ConsoleHandler {
    debug: bool,
}

impl ConsoleHandler {
    /// Create a new console handler
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    fn format_duration(ms: u64) -> String {
        if ms < 1000 {
            format!("{}ms", ms)
        } else {
            format!("{:.1}s", ms as f64 / 1000.0)
        }
    }
}

impl OutputHandler for ConsoleHandler {
    fn emit(&self, event: OutputEvent) {
        match event {
            OutputEvent::WorkflowSelected {
                label,
                name,
                kind,
                steps,
            } => {
                if label.is_empty() {
                    eprintln!("Workflow '{}' ({}, {} steps)", name, kind, steps);
                } else {
                    eprintln!(
                        "'{}' -> workflow '{}' ({}, {} steps)",
                        label, name, kind, steps
                    );
                }
            }
            OutputEvent::StepStatus {
                name,
                index,
                total,
                status,
                error,
                ..
            } => match status {
                StepStatus::Processing => {
                    eprint!("[{}/{}] {}... ", index, total, name);
                    let _ = io::stderr().flush();
                }
                StepStatus::Completed => eprintln!("✓"),
                StepStatus::Error => {
                    eprintln!("✗ {}", error.unwrap_or_default());
                }
                StepStatus::Pending => {}
            },
            OutputEvent::WorkflowComplete {
                name,
                completed,
                total,
                failed,
                duration_ms,
                cancelled,
            } => {
                eprintln!();
                if cancelled {
                    eprintln!(
                        "✗ Workflow '{}' cancelled after {}/{} steps ({})",
                        name,
                        completed,
                        total,
                        Self::format_duration(duration_ms)
                    );
                } else if failed > 0 {
                    eprintln!(
                        "✗ Workflow '{}' finished with {} failed step(s) ({}/{} completed, {})",
                        name,
                        failed,
                        completed,
                        total,
                        Self::format_duration(duration_ms)
                    );
                } else {
                    eprintln!(
                        "✓ Workflow '{}' completed ({} steps in {})",
                        name,
                        total,
                        Self::format_duration(duration_ms)
                    );
                }
            }
            OutputEvent::Response {
                message, workflow, ..
            } => {
                println!("{}", message);
                if let Some(workflow) = workflow {
                    eprintln!("\n→ suggested workflow: {}", workflow);
                }
            }
            OutputEvent::Info { message } => {
                println!("{}", message);
            }
            OutputEvent::Debug { message } => {
                if self.debug {
                    eprintln!("[debug] {}", message);
                }
            }
        }
    }
}

/// JSON output handler, one object per line
pub struct JsonHandler {
    pretty: bool,
}

impl JsonHandler {
    /// Create a new JSON handler
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn print_json<T: Serialize>(&self, value: &T) {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };

        if let Ok(s) = json {
            println!("{}", s);
        }
    }
}

impl OutputHandler for JsonHandler {
    fn emit(&self, event: OutputEvent) {
        self.print_json(&event);
    }
}

/// Quiet handler: only assistant replies and listings reach stdout
pub struct QuietHandler;

impl OutputHandler for QuietHandler {
    fn emit(&self, event: OutputEvent) {
        match event {
            OutputEvent::Response { message, .. } | OutputEvent::Info { message } => {
                println!("{}", message);
            }
            _ => {}
        }
    }
}

/// Create an output handler based on mode
pub fn create_handler(mode: OutputMode, debug: bool) -> Box<dyn OutputHandler> {
    match mode {
        OutputMode::Console => Box::new(ConsoleHandler::new(debug)),
        OutputMode::Json => Box::new(JsonHandler::new(false)),
        OutputMode::Quiet => Box::new(QuietHandler),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock handler for testing
    #[derive(Clone, Default)]
    pub(crate) struct MockHandler {
        events: Arc<Mutex<Vec<OutputEvent>>>,
    }

    impl MockHandler {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn events(&self) -> Vec<OutputEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl OutputHandler for MockHandler {
        fn emit(&self, event: OutputEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn test_output_mode_parse() {
        assert_eq!(OutputMode::parse("json"), OutputMode::Json);
        assert_eq!(OutputMode::parse("QUIET"), OutputMode::Quiet);
        assert_eq!(OutputMode::parse("console"), OutputMode::Console);
        assert_eq!(OutputMode::parse("unknown"), OutputMode::Console);
    }

    #[test]
    fn test_step_event_conversion_is_one_based() {
        let event = StepStatusEvent {
            workflow: "wf".into(),
            step_id: "remove_bg".into(),
            step_name: "Remove Background".into(),
            index: 0,
            total: 3,
            status: StepStatus::Processing,
            error: None,
            at: chrono::Utc::now(),
        };

        match OutputEvent::from(event) {
            OutputEvent::StepStatus { index, total, step, .. } => {
                assert_eq!(index, 1);
                assert_eq!(total, 3);
                assert_eq!(step, "remove_bg");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_json_shape() {
        let event = OutputEvent::StepStatus {
            step: "composite".into(),
            name: "Composite Final Image".into(),
            index: 3,
            total: 3,
            status: StepStatus::Completed,
            error: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "StepStatus");
        assert_eq!(json["status"], "completed");
    }

    #[test]
    fn test_console_format_duration() {
        assert_eq!(ConsoleHandler::format_duration(500), "500ms");
        assert_eq!(ConsoleHandler::format_duration(1000), "1.0s");
        assert_eq!(ConsoleHandler::format_duration(2500), "2.5s");
    }

    #[test]
    fn test_mock_handler_captures_events() {
        let handler = MockHandler::new();
        handler.emit(OutputEvent::Info {
            message: "one".into(),
        });
        handler.emit(OutputEvent::Debug {
            message: "two".into(),
        });
        assert_eq!(handler.events().len(), 2);
    }

    #[test]
    fn test_create_handler() {
        let _ = create_handler(OutputMode::Console, false);
        let _ = create_handler(OutputMode::Json, false);
        let _ = create_handler(OutputMode::Quiet, false);
    }
}
