//! # Cogwork Engine
//!
//! The Cogwork engine runs plugin actions that automate external applications
//! (CAD engines, worksheet engines, spreadsheets, shells, XML processors) as a
//! sequence of steps sharing one variable store.
//!
//! ## Key Features
//!
//! - **Action Lifecycle**: Init → Do → Cleanup → Dispose with enforced ordering
//! - **Interpolation**: `{ ... }` fragments in parameters, compiled once per run
//! - **Resource Registry**: one lazily created, shared handle per application family
//! - **Workflow Runner**: YAML/JSON documents executed with a configurable failure policy
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use cogwork_engine::{
//!     ActionBehavior, ActionCatalog, ActionContext, ActionDescriptor, EngineConfig, ParameterKind, ParameterSpec,
//!     RunContext, WorkflowDocument, WorkflowRun,
//! };
//! use cogwork_types::{ActionError, Value};
//!
//! struct Greet;
//!
//! impl ActionBehavior for Greet {
//!     fn execute(&mut self, context: &mut ActionContext<'_>) -> Result<(), ActionError> {
//!         let greeting = context.text_param("text")?;
//!         context.publish_output("output", greeting)?;
//!         Ok(())
//!     }
//! }
//!
//! let mut catalog = ActionCatalog::new();
//! catalog.register(
//!     ActionDescriptor::new("greet")
//!         .with_parameter(ParameterSpec::new("text", ParameterKind::Text).required())
//!         .with_parameter(ParameterSpec::new("output", ParameterKind::VariableName).required()),
//!     || Box::new(Greet),
//! )?;
//!
//! let document: WorkflowDocument = r#"
//! variables:
//!   name: world
//! actions:
//!   - kind: greet
//!     parameters:
//!       text: "hello {name}"
//!       output: greeting
//! "#
//! .parse()?;
//!
//! let config = EngineConfig::default();
//! let context = RunContext::new(config.build_registry(), config.build_host());
//! let mut run = WorkflowRun::from_document(&document, &catalog, context, config)?;
//! let report = run.execute();
//!
//! assert!(report.succeeded());
//! assert_eq!(run.context().variables.get("greeting"), Some(&Value::from("hello world")));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`expression`**: the pluggable expression language and its built-in implementation
//! - **`interpolation`**: fragment scanning and the per-run compile cache
//! - **`lifecycle`**: action descriptors, the per-phase context and the state machine
//! - **`resources`**: application handles, factories and the singleton registry
//! - **`workflow`**: documents, the action catalog and the sequential runner
//! - **`config`**: `engine.yaml` loading

pub mod config;
pub mod expression;
pub mod host;
pub mod interpolation;
pub mod lifecycle;
pub mod resources;
pub mod workflow;

// Re-export commonly used types for convenience
pub use config::{DisposeOrder, EngineConfig, FailurePolicy, default_config_path, load_config, load_config_from_path};
pub use expression::{BuiltinEvaluator, CompiledExpression, ExpressionEvaluator};
pub use host::TracingHost;
pub use interpolation::Interpolator;
pub use lifecycle::{
    ActionBehavior, ActionContext, ActionDescriptor, ActionInstance, ActionState, ParameterKind, ParameterSpec, Parameters, RunContext,
};
pub use resources::{ApplicationHandle, FnFactory, ResourceFactory, ResourceHandle, ResourceRegistry, downcast_handle};
pub use workflow::{ActionCatalog, ActionDefinition, ActionReport, CatalogError, RunReport, WorkflowDocument, WorkflowRun};
