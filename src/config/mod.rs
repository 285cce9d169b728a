//! Configuration types and loading for obi

mod catalog;
mod loader;
mod persona;
mod workflow;

pub use catalog::Catalog;
#[allow(unused_imports)]
pub use loader::{ChatSettings, Defaults, EngineSettings, ObiConfig};
#[allow(unused_imports)]
pub use persona::{Persona, PersonaContext, PersonaTable};
pub use workflow::{StepDefinition, WorkflowDefinition, WorkflowKind};
