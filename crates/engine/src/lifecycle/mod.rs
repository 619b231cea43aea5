//! # Action lifecycle
//!
//! Every action follows the same contract:
//!
//! 1. **Init**: parameters are validated against the [`ActionDescriptor`],
//!    the family singleton is acquired from the [`ResourceRegistry`](crate::ResourceRegistry)
//!    and inputs are fetched from the variable store.
//! 2. **Do**: the single observable effect, possibly interpolating parameters.
//! 3. **Cleanup**: outputs are published to the store. Runs only after a
//!    successful Do and never fails the action.
//! 4. **Dispose**: releases whatever the action still owns. Runs once, from any state.

mod context;
mod descriptor;
mod instance;
mod state;

pub use context::{ActionContext, RunContext};
pub use descriptor::{ActionDescriptor, ParameterKind, ParameterSpec, Parameters};
pub use instance::{ActionBehavior, ActionInstance};
pub use state::ActionState;
