//! Configuration loading with multi-layer merge

use super::Persona;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level obi configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ObiConfig {
    /// Global defaults
    #[serde(default)]
    pub defaults: Defaults,

    /// Execution engine timing
    #[serde(default)]
    pub engine: EngineSettings,

    /// Conversation settings
    #[serde(default)]
    pub chat: ChatSettings,

    /// Catalog file replacing the built-in catalog. Relative paths are
    /// resolved against the config file that declares them.
    pub catalog: Option<String>,
}

/// Global default settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    /// Persona used when none is given on the command line
    #[serde(default)]
    pub persona: Persona,
}

/// Timing knobs for the execution engine
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EngineSettings {
    /// Pause before each step is dispatched, in milliseconds
    #[serde(default)]
    pub dispatch_delay_ms: u64,

    /// Wait for estimates that don't mention seconds
    #[serde(default = "default_step_ms")]
    pub default_step_ms: u64,

    /// Seconds to wait when a seconds estimate has no usable number
    #[serde(default = "default_fallback_seconds")]
    pub fallback_seconds: u64,

    /// Divides every wait; 2.0 runs twice as fast
    #[serde(default = "default_speed")]
    pub speed: f64,
}

fn default_step_ms() -> u64 {
    2000
}

fn default_fallback_seconds() -> u64 {
    5
}

fn default_speed() -> f64 {
    1.0
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            dispatch_delay_ms: 0,
            default_step_ms: default_step_ms(),
            fallback_seconds: default_fallback_seconds(),
            speed: default_speed(),
        }
    }
}

/// Conversation settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ChatSettings {
    /// Simulated "thinking" pause before a reply, in milliseconds
    #[serde(default = "default_response_delay_ms")]
    pub response_delay_ms: u64,
}

fn default_response_delay_ms() -> u64 {
    1500
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            response_delay_ms: default_response_delay_ms(),
        }
    }
}

impl ObiConfig {
    /// Load configuration from the standard hierarchy
    ///
    /// Load order (later overrides earlier):
    /// 1. Built-in defaults
    /// 2. ~/.config/obi/config.toml
    /// 3. .obi/config.toml (project)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                let user_config = Self::load_file(&user_config_path)
                    .with_context(|| format!("loading {}", user_config_path.display()))?;
                config.merge(user_config);
            }
        }

        let project_config_path = project_dir
            .map(|p| p.join(".obi/config.toml"))
            .unwrap_or_else(|| PathBuf::from(".obi/config.toml"));

        if project_config_path.exists() {
            let project_config = Self::load_file(&project_config_path)
                .with_context(|| format!("loading {}", project_config_path.display()))?;
            config.merge(project_config);
        }

        tracing::debug!(
            persona = %config.defaults.persona,
            speed = config.engine.speed,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.anchor_catalog(base);
        }
        Ok(config)
    }

    /// Make a relative `catalog` path relative to `base` instead of the cwd
    fn anchor_catalog(&mut self, base: &Path) {
        if let Some(path) = self.catalog_path() {
            if path.is_relative() {
                self.catalog = Some(base.join(path).to_string_lossy().into_owned());
            }
        }
    }

    /// Get the user config path (~/.config/obi/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("obi/config.toml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        if other.defaults.persona != Persona::default() {
            self.defaults.persona = other.defaults.persona;
        }

        let defaults = EngineSettings::default();
        if other.engine.dispatch_delay_ms != defaults.dispatch_delay_ms {
            self.engine.dispatch_delay_ms = other.engine.dispatch_delay_ms;
        }
        if other.engine.default_step_ms != defaults.default_step_ms {
            self.engine.default_step_ms = other.engine.default_step_ms;
        }
        if other.engine.fallback_seconds != defaults.fallback_seconds {
            self.engine.fallback_seconds = other.engine.fallback_seconds;
        }
        if other.engine.speed != defaults.speed {
            self.engine.speed = other.engine.speed;
        }

        if other.chat.response_delay_ms != default_response_delay_ms() {
            self.chat.response_delay_ms = other.chat.response_delay_ms;
        }

        if other.catalog.is_some() {
            self.catalog = other.catalog;
        }
    }

    /// Configured catalog path with `~` expanded
    pub fn catalog_path(&self) -> Option<PathBuf> {
        self.catalog
            .as_deref()
            .map(|p| PathBuf::from(shellexpand::tilde(p).into_owned()))
    }
}
