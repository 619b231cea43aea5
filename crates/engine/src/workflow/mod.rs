//! Workflow documents, the action catalog and the sequential runner.

pub mod catalog;
pub mod document;
pub mod runner;

pub use catalog::{ActionCatalog, ActionConstructor, CatalogError};
pub use document::{ActionDefinition, WorkflowDocument};
pub use runner::{ActionReport, RunReport, WorkflowRun};
