//! Workflow documents: seed variables plus an ordered list of configured actions.

use std::{fs, path::Path, str::FromStr};

use anyhow::{Context, Result, bail};
use cogwork_types::VariableStore;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One configured action inside a workflow document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDefinition {
    /// Catalog key of the action kind.
    pub kind: String,
    /// Display name; defaults to the kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub parameters: IndexMap<String, JsonValue>,
}

impl ActionDefinition {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: None,
            parameters: IndexMap::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: JsonValue) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|name| !name.trim().is_empty()).unwrap_or(&self.kind)
    }
}

/// A workflow as authored on disk (YAML or JSON).
///
/// ```yaml
/// workflow: export-drawings
/// variables:
///   folder: C:/parts
/// actions:
///   - kind: open_document
///     name: Open bracket
///     parameters:
///       path: "{folder}/bracket.sldprt"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    #[serde(default)]
    pub variables: serde_json::Map<String, JsonValue>,
    #[serde(default)]
    pub actions: Vec<ActionDefinition>,
}

impl WorkflowDocument {
    /// Read and parse a workflow file. The YAML parser also accepts JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read workflow file: {}", path.display()))?;
        content
            .parse::<Self>()
            .with_context(|| format!("Failed to load workflow file: {}", path.display()))
    }

    /// Workflow name, falling back to `default`.
    pub fn name(&self) -> &str {
        self.workflow.as_deref().unwrap_or("default")
    }

    /// A variable store seeded from `variables`.
    pub fn seed_variables(&self) -> VariableStore {
        VariableStore::from_json_map(&self.variables)
    }
}

impl FromStr for WorkflowDocument {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> Result<Self> {
        let document: WorkflowDocument = serde_yaml::from_str(content).context("Failed to parse workflow document")?;
        if let Some(position) = document.actions.iter().position(|action| action.kind.trim().is_empty()) {
            bail!("action #{} is missing the required 'kind' field", position + 1);
        }
        Ok(document)
    }
}
