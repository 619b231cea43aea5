//! Maps action kinds to descriptors and behaviour constructors.

use std::sync::Arc;

use cogwork_types::Value;
use indexmap::IndexMap;
use thiserror::Error;

use crate::{
    lifecycle::{ActionBehavior, ActionDescriptor, ActionInstance, Parameters},
    workflow::document::ActionDefinition,
};

/// Builds a fresh behaviour for each instantiated action.
pub type ActionConstructor = Box<dyn Fn() -> Box<dyn ActionBehavior> + Send + Sync>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Action kind '{kind}' is already registered")]
    DuplicateKind { kind: String },

    #[error("Unknown action kind '{kind}' for action '{action}'")]
    UnknownKind { kind: String, action: String },
}

struct CatalogEntry {
    descriptor: Arc<ActionDescriptor>,
    constructor: ActionConstructor,
}

/// Registry of the action kinds a host can instantiate.
#[derive(Default)]
pub struct ActionCatalog {
    entries: IndexMap<String, CatalogEntry>,
}

impl ActionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `descriptor.kind` with the constructor producing its behaviour.
    pub fn register<F>(&mut self, descriptor: ActionDescriptor, constructor: F) -> Result<(), CatalogError>
    where
        F: Fn() -> Box<dyn ActionBehavior> + Send + Sync + 'static,
    {
        if self.entries.contains_key(&descriptor.kind) {
            return Err(CatalogError::DuplicateKind { kind: descriptor.kind });
        }
        self.entries.insert(
            descriptor.kind.clone(),
            CatalogEntry {
                descriptor: Arc::new(descriptor),
                constructor: Box::new(constructor),
            },
        );
        Ok(())
    }

    pub fn descriptor(&self, kind: &str) -> Option<&ActionDescriptor> {
        self.entries.get(kind).map(|entry| entry.descriptor.as_ref())
    }

    /// Registered kinds in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Create a new action instance from a document definition.
    pub fn instantiate(&self, definition: &ActionDefinition) -> Result<ActionInstance, CatalogError> {
        let name = definition.display_name();
        let entry = self.entries.get(&definition.kind).ok_or_else(|| CatalogError::UnknownKind {
            kind: definition.kind.clone(),
            action: name.to_string(),
        })?;

        let parameters: Parameters = definition
            .parameters
            .iter()
            .map(|(key, value)| (key.clone(), Value::from_json(value)))
            .collect();
        Ok(ActionInstance::new(
            name,
            Arc::clone(&entry.descriptor),
            parameters,
            (entry.constructor)(),
        ))
    }
}

impl std::fmt::Debug for ActionCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionCatalog").field("kinds", &self.entries.keys().collect::<Vec<_>>()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{ActionContext, ActionState, ParameterKind, ParameterSpec};
    use cogwork_types::ActionError;
    use serde_json::json;

    struct Noop;

    impl ActionBehavior for Noop {
        fn execute(&mut self, _context: &mut ActionContext<'_>) -> Result<(), ActionError> {
            Ok(())
        }
    }

    fn catalog() -> ActionCatalog {
        let mut catalog = ActionCatalog::new();
        catalog
            .register(
                ActionDescriptor::new("noop").with_parameter(ParameterSpec::new("count", ParameterKind::Integer)),
                || Box::new(Noop),
            )
            .unwrap();
        catalog
    }

    #[test]
    fn instantiates_registered_kinds_with_converted_parameters() {
        let catalog = catalog();
        let definition = ActionDefinition::new("noop").named("Do nothing").with_parameter("count", json!(3));

        let action = catalog.instantiate(&definition).unwrap();
        assert_eq!(action.name(), "Do nothing");
        assert_eq!(action.kind(), "noop");
        assert_eq!(action.state(), ActionState::Created);
        assert_eq!(action.parameters()["count"], Value::Integer(3));
        assert_eq!(catalog.kinds().collect::<Vec<_>>(), vec!["noop"]);
    }

    #[test]
    fn rejects_unknown_and_duplicate_kinds() {
        let mut catalog = catalog();
        let error = catalog.instantiate(&ActionDefinition::new("teleport")).unwrap_err();
        assert_eq!(
            error,
            CatalogError::UnknownKind {
                kind: "teleport".into(),
                action: "teleport".into()
            }
        );

        let duplicate = catalog.register(ActionDescriptor::new("noop"), || Box::new(Noop)).unwrap_err();
        assert_eq!(duplicate, CatalogError::DuplicateKind { kind: "noop".into() });
    }
}
