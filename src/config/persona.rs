//! Persona tags and their presentation context

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

const BUILTIN_PERSONAS: &str = include_str!("builtin/personas.toml");

/// Who the assistant is talking to
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    #[default]
    CreativeDirector,
    CampaignManager,
    Designer,
    Developer,
}

impl Persona {
    pub const ALL: [Persona; 4] = [
        Persona::CreativeDirector,
        Persona::CampaignManager,
        Persona::Designer,
        Persona::Developer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreativeDirector => "creative_director",
            Self::CampaignManager => "campaign_manager",
            Self::Designer => "designer",
            Self::Developer => "developer",
        }
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        Persona::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown persona '{}' (expected one of: creative_director, campaign_manager, designer, developer)",
                    s
                )
            })
    }
}

/// Canned copy for a persona
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PersonaContext {
    pub label: String,
    pub welcome_message: String,
    pub focus_area: String,
    #[serde(default)]
    pub quick_actions: Vec<String>,
    #[serde(default)]
    pub expertise: Vec<String>,
    #[serde(default)]
    pub common_workflows: Vec<String>,
    /// Reply used when no keyword rule matches
    pub default_response: String,
}

/// Persona contexts keyed by persona tag
#[derive(Debug, Clone)]
pub struct PersonaTable {
    contexts: BTreeMap<String, PersonaContext>,
}

impl PersonaTable {
    /// Parse the embedded persona table
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_PERSONAS).context("parsing built-in persona table")
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let contexts: BTreeMap<String, PersonaContext> = toml::from_str(contents)?;

        let missing: Vec<_> = Persona::ALL
            .iter()
            .filter(|p| !contexts.contains_key(p.as_str()))
            .map(|p| p.as_str())
            .collect();
        if !missing.is_empty() {
            anyhow::bail!("persona table missing entries for: {}", missing.join(", "));
        }

        Ok(Self { contexts })
    }

    /// Context for a persona. Every persona is guaranteed present.
    pub fn get(&self, persona: Persona) -> &PersonaContext {
        &self.contexts[persona.as_str()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Persona, &PersonaContext)> {
        Persona::ALL.into_iter().map(|p| (p, self.get(p)))
    }
}
