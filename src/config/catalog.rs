//! Workflow catalog loading

use super::{ObiConfig, WorkflowDefinition};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const BUILTIN_CATALOG: &str = include_str!("builtin/catalog.toml");

/// Ordered, non-empty list of workflow definitions
///
/// Only constructed through [`Catalog::new`], so selection always has a
/// default to fall back on.
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    workflows: Vec<WorkflowDefinition>,
}

/// On-disk shape of a catalog file, before validation
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    workflows: Vec<WorkflowDefinition>,
}

impl Catalog {
    /// The embedded catalog
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_CATALOG).context("parsing built-in catalog")
    }

    /// Build a catalog from definitions, validating them
    pub fn new(workflows: Vec<WorkflowDefinition>) -> Result<Self> {
        let catalog = Self { workflows };
        catalog.validate().map_err(|errors| {
            anyhow::anyhow!("catalog validation failed:\n  {}", errors.join("\n  "))
        })?;
        catalog.warn_unknown_dependencies();
        Ok(catalog)
    }

    /// Parse and validate a catalog
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(contents)?;
        Self::new(file.workflows)
    }

    /// Load a catalog file
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("loading catalog {}", path.display()))
    }

    /// Resolve the catalog from the standard hierarchy
    ///
    /// Search order (first match wins):
    /// 1. explicit path (command line)
    /// 2. `catalog` entry of the loaded config
    /// 3. .obi/catalog.toml (project)
    /// 4. ~/.config/obi/catalog.toml (user)
    /// 5. Built-in catalog (embedded)
    pub fn resolve(
        explicit: Option<&Path>,
        config: &ObiConfig,
        project_dir: Option<&Path>,
    ) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_file(path);
        }

        if let Some(path) = config.catalog_path() {
            return Self::load_file(&path);
        }

        let project_path = project_dir
            .map(|p| p.join(".obi/catalog.toml"))
            .unwrap_or_else(|| PathBuf::from(".obi/catalog.toml"));
        if project_path.exists() {
            return Self::load_file(&project_path);
        }

        if let Some(user_dir) = dirs::config_dir() {
            let user_path = user_dir.join("obi/catalog.toml");
            if user_path.exists() {
                return Self::load_file(&user_path);
            }
        }

        Self::builtin()
    }

    /// Validate every workflow; the catalog itself must not be empty
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.workflows.is_empty() {
            errors.push("catalog must contain at least one workflow".to_string());
        }

        for workflow in &self.workflows {
            if let Err(mut workflow_errors) = workflow.validate() {
                errors.append(&mut workflow_errors);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn warn_unknown_dependencies(&self) {
        for workflow in &self.workflows {
            for (step, dependency) in workflow.unknown_dependencies() {
                tracing::warn!(
                    workflow = %workflow.name,
                    step = %step,
                    dependency = %dependency,
                    "Step declares a dependency on an unknown step"
                );
            }
        }
    }

    pub fn workflows(&self) -> &[WorkflowDefinition] {
        &self.workflows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_catalog() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.workflows.len(), 2);

        let first = &catalog.workflows[0];
        assert_eq!(first.name, "Brand Campaign Generation");
        let ids: Vec<_> = first.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["validate_model", "generate_assets", "optimize_channels"]
        );
        assert_eq!(
            first.steps[1].config["custom_model"],
            serde_json::json!("brand_holiday_v2")
        );

        let second = &catalog.workflows[1];
        assert_eq!(
            second.step("composite").unwrap().dependencies,
            vec!["remove_bg", "generate_bg"]
        );
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let err = Catalog::from_toml("workflows = []").unwrap_err();
        assert!(err.to_string().contains("at least one workflow"));
    }

    #[test]
    fn test_missing_workflows_table_rejected() {
        let err = Catalog::from_toml("").unwrap_err();
        assert!(err.to_string().contains("at least one workflow"));

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blank.toml");
        std::fs::write(&path, "# nothing here\n").unwrap();
        assert!(Catalog::resolve(Some(&path), &ObiConfig::default(), None).is_err());
    }

    #[test]
    fn test_explicit_path_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mine.toml");
        std::fs::write(
            &path,
            r#"
            [[workflows]]
            name = "Solo"
            type = "training"
        "#,
        )
        .unwrap();

        let catalog = Catalog::resolve(Some(&path), &ObiConfig::default(), Some(dir.path()))
            .unwrap();
        assert_eq!(catalog.workflows.len(), 1);
        assert_eq!(catalog.workflows[0].name, "Solo");
    }

    #[test]
    fn test_project_catalog_found() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".obi")).unwrap();
        std::fs::write(
            dir.path().join(".obi/catalog.toml"),
            r#"
            [[workflows]]
            name = "Project Flow"
            type = "processing"

            [[workflows.steps]]
            id = "only"
            name = "Only Step"
            estimated_time = "1 second"
        "#,
        )
        .unwrap();

        let catalog = Catalog::resolve(None, &ObiConfig::default(), Some(dir.path())).unwrap();
        assert_eq!(catalog.workflows[0].name, "Project Flow");
    }

    #[test]
    fn test_invalid_catalog_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(
            &path,
            r#"
            [[workflows]]
            name = "Dupes"
            type = "generation"

            [[workflows.steps]]
            id = "x"
            name = "X"

            [[workflows.steps]]
            id = "x"
            name = "X again"
        "#,
        )
        .unwrap();

        let err = Catalog::load_file(&path).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("bad.toml"));
        assert!(message.contains("duplicate step id"));
    }
}
