//! Workflow execution engine for obi
//!
//! This module handles:
//! - Picking a workflow from the catalog by label
//! - Turning free-text duration estimates into simulated waits
//! - Sequential step execution with status events
//!
//! # Example
//!
//! ```ignore
//! use obi::config::{Catalog, EngineSettings};
//! use obi::workflow::ExecutionEngine;
//!
//! let catalog = Catalog::builtin()?;
//! let workflow = catalog.select("background replacement");
//!
//! let mut engine = ExecutionEngine::new(EngineSettings::default());
//! let mut events = engine.subscribe();
//! let outcome = engine.run(workflow).await;
//! ```

mod duration;
mod executor;
mod runner;
mod selector;
mod state;

#[allow(unused_imports)]
pub use duration::DurationPolicy;
#[allow(unused_imports)]
pub use executor::{SimulatedDriver, StepDriver, StepExecutionError};
#[allow(unused_imports)]
pub use runner::{EngineError, ExecutionEngine, RunOutcome, StepStatusEvent};
#[allow(unused_imports)]
pub use selector::select;
#[allow(unused_imports)]
pub use state::{ExecutionState, Progress, RunSummary, StepRecord, StepStatus};
