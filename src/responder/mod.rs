//! Canned assistant replies
//!
//! Input is lowercased and checked against an ordered keyword table; the
//! first matching rule supplies the reply and an associated workflow. With
//! no match, the persona's default reply is used and no workflow attached.

mod rules;

use crate::config::{Persona, PersonaTable, WorkflowDefinition};
use serde::Serialize;

#[allow(unused_imports)]
pub use rules::{RULES, ResponseRule, WorkflowStub, first_match};

/// Reply to one user message
#[derive(Debug, Clone, Serialize)]
pub struct AssistantResponse {
    pub message: String,
    pub workflow: Option<WorkflowDefinition>,
    /// Topic of the rule that fired
    pub topic: Option<&'static str>,
}

/// Produces replies for a persona table
#[derive(Debug, Clone)]
pub struct ResponseGenerator {
    personas: PersonaTable,
}

impl ResponseGenerator {
    pub fn new(personas: PersonaTable) -> Self {
        Self { personas }
    }

    pub fn personas(&self) -> &PersonaTable {
        &self.personas
    }

    /// Opening line for a conversation
    pub fn welcome(&self, persona: Persona) -> &str {
        &self.personas.get(persona).welcome_message
    }

    /// Reply to `input` as seen by `persona`
    pub fn respond(&self, input: &str, persona: Persona) -> AssistantResponse {
        let lower_input = input.to_lowercase();

        match first_match(&lower_input) {
            Some(rule) => {
                tracing::debug!(topic = rule.topic, %persona, "Keyword rule matched");
                AssistantResponse {
                    message: rule.message.to_string(),
                    workflow: Some(rule.workflow.to_definition()),
                    topic: Some(rule.topic),
                }
            }
            None => {
                tracing::debug!(%persona, "No keyword rule matched, using persona default");
                AssistantResponse {
                    message: self.personas.get(persona).default_response.clone(),
                    workflow: None,
                    topic: None,
                }
            }
        }
    }
}
