//! Shared types for the Cogwork action-execution core.
//!
//! Everything an action exchanges with the host or with other actions is
//! defined here: the dynamically typed [`Value`], the per-run
//! [`VariableStore`], the error taxonomy, and the [`HostCallbacks`] trait.

pub mod errors;
pub mod host;
pub mod value;
pub mod variables;

pub use errors::{ActionError, DisposalWarning, InterpolationError, ResourceError};
pub use host::{AskKind, AskResult, HostCallbacks, MessageLevel};
pub use value::{ResourceRef, Value};
pub use variables::VariableStore;
