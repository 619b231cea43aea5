//! The four-phase state machine wrapping an action behaviour.

use std::sync::Arc;

use cogwork_types::{ActionError, DisposalWarning};
use tracing::{debug, warn};

use crate::{
    lifecycle::{
        context::{ActionContext, RunContext},
        descriptor::{ActionDescriptor, Parameters},
        state::ActionState,
    },
    resources::ResourceHandle,
};

/// The behaviour of one concrete action kind.
///
/// Only [`execute`](ActionBehavior::execute) is required. `init` fetches
/// inputs, `execute` performs the single observable effect, `cleanup`
/// publishes outputs and `dispose` releases anything the action created that
/// was not handed over to the store.
pub trait ActionBehavior: Send {
    fn init(&mut self, _context: &mut ActionContext<'_>) -> Result<(), ActionError> {
        Ok(())
    }

    fn execute(&mut self, context: &mut ActionContext<'_>) -> Result<(), ActionError>;

    fn cleanup(&mut self, _context: &mut ActionContext<'_>) -> Result<(), ActionError> {
        Ok(())
    }

    fn dispose(&mut self, _context: &mut ActionContext<'_>) -> Result<(), ActionError> {
        Ok(())
    }
}

/// One configured invocation of an action.
///
/// Drives a behaviour through Init → Do → Cleanup → Dispose and enforces the
/// ordering: Do only after a successful Init, Cleanup only after a successful
/// Do, Dispose at most once from any state.
pub struct ActionInstance {
    name: String,
    descriptor: Arc<ActionDescriptor>,
    parameters: Parameters,
    behavior: Box<dyn ActionBehavior>,
    state: ActionState,
    resource: Option<ResourceHandle>,
    disposal_warning: Option<DisposalWarning>,
}

impl ActionInstance {
    pub fn new(
        name: impl Into<String>,
        descriptor: Arc<ActionDescriptor>,
        parameters: Parameters,
        behavior: Box<dyn ActionBehavior>,
    ) -> Self {
        Self {
            name: name.into(),
            descriptor,
            parameters,
            behavior,
            state: ActionState::Created,
            resource: None,
            disposal_warning: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.descriptor.kind
    }

    pub fn descriptor(&self) -> &ActionDescriptor {
        &self.descriptor
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    /// The family singleton held between Init and Dispose.
    pub fn resource(&self) -> Option<&ResourceHandle> {
        self.resource.as_ref()
    }

    /// Warning recorded if the behaviour's dispose failed.
    pub fn disposal_warning(&self) -> Option<&DisposalWarning> {
        self.disposal_warning.as_ref()
    }

    /// Validate parameters, acquire the family singleton and fetch inputs.
    pub fn init(&mut self, run: &mut RunContext) -> Result<(), ActionError> {
        self.expect_state(ActionState::Created, "init")?;
        debug!(action = %self.name, kind = %self.descriptor.kind, "init");

        let outcome = self.try_init(run);
        self.settle(outcome, ActionState::Initialized)
    }

    fn try_init(&mut self, run: &mut RunContext) -> Result<(), ActionError> {
        self.descriptor.validate(&self.name, &self.parameters)?;

        if let Some(family) = &self.descriptor.family {
            let handle = run
                .registry
                .instance(family)
                .map_err(|source| ActionError::resource(&self.name, source))?;
            self.resource = Some(handle);
        }

        let mut context = ActionContext::new(&self.name, &self.descriptor, &self.parameters, self.resource.as_ref(), run);
        self.behavior.init(&mut context)
    }

    /// Perform the action's effect. Only valid right after a successful Init.
    pub fn execute(&mut self, run: &mut RunContext) -> Result<(), ActionError> {
        self.expect_state(ActionState::Initialized, "do")?;
        debug!(action = %self.name, "do");
        self.state = ActionState::Running;

        let mut context = ActionContext::new(&self.name, &self.descriptor, &self.parameters, self.resource.as_ref(), run);
        let outcome = self.behavior.execute(&mut context);
        self.settle(outcome, ActionState::Running)
    }

    /// Publish outputs after a successful Do.
    ///
    /// Never fails: errors are logged and forwarded to the host as warnings.
    /// In any state other than `Running` this is a no-op.
    pub fn cleanup(&mut self, run: &mut RunContext) {
        if self.state != ActionState::Running {
            debug!(action = %self.name, state = %self.state, "cleanup skipped");
            return;
        }
        debug!(action = %self.name, "cleanup");

        let mut context = ActionContext::new(&self.name, &self.descriptor, &self.parameters, self.resource.as_ref(), run);
        if let Err(error) = self.behavior.cleanup(&mut context) {
            warn!(action = %self.name, %error, "cleanup failed");
            run.host.warn(&format!("Cleanup of '{}' failed: {error}", self.name));
        }
        self.state = ActionState::Cleaned;
    }

    /// Release everything the action still owns. Idempotent.
    ///
    /// A failing behaviour dispose is downgraded to a [`DisposalWarning`],
    /// which is logged, recorded and returned.
    pub fn dispose(&mut self, run: &mut RunContext) -> Option<DisposalWarning> {
        if self.state == ActionState::Disposed {
            return None;
        }
        debug!(action = %self.name, state = %self.state, "dispose");

        let mut context = ActionContext::new(&self.name, &self.descriptor, &self.parameters, self.resource.as_ref(), run);
        let warning = self
            .behavior
            .dispose(&mut context)
            .err()
            .map(|error| DisposalWarning::new(&self.name, error.to_string()));
        if let Some(warning) = &warning {
            warn!(action = %self.name, message = %warning.message, "dispose failed");
        }

        self.resource = None;
        self.state = ActionState::Disposed;
        self.disposal_warning = warning.clone();
        warning
    }

    /// Init, Do and Cleanup in sequence, stopping at the first failure.
    ///
    /// Dispose is left to the caller so outputs stay available until the
    /// host decides to release them.
    pub fn run(&mut self, run: &mut RunContext) -> Result<(), ActionError> {
        self.init(run)?;
        self.execute(run)?;
        self.cleanup(run);
        Ok(())
    }

    fn expect_state(&self, expected: ActionState, phase: &str) -> Result<(), ActionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ActionError::invalid_transition(&self.name, self.state, phase))
        }
    }

    fn settle(&mut self, outcome: Result<(), ActionError>, success: ActionState) -> Result<(), ActionError> {
        match outcome {
            Ok(()) => {
                self.state = success;
                Ok(())
            }
            Err(error) => {
                debug!(action = %self.name, %error, "phase failed");
                self.state = ActionState::Failed;
                Err(error)
            }
        }
    }
}

impl std::fmt::Debug for ActionInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionInstance")
            .field("name", &self.name)
            .field("kind", &self.descriptor.kind)
            .field("state", &self.state)
            .field("holds_resource", &self.resource.is_some())
            .finish()
    }
}
