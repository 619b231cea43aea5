//! Error taxonomy for action execution.

use std::{fmt, time::Duration};

use thiserror::Error;

/// Failure raised by an action's `init` or `do` phase.
///
/// Cleanup and dispose failures never surface as `ActionError` to the host;
/// they are downgraded to log entries (see [`DisposalWarning`]).
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Configuration error in '{action}': {message}")]
    Configuration { action: String, message: String },

    #[error("Resource acquisition failed for '{action}': {source}")]
    ResourceAcquisition {
        action: String,
        #[source]
        source: ResourceError,
    },

    #[error("Interpolation compile error in '{action}' for fragment '{fragment}': {message}")]
    InterpolationCompile { action: String, fragment: String, message: String },

    #[error("Interpolation evaluation error in '{action}' for fragment '{fragment}': {message}")]
    InterpolationEval { action: String, fragment: String, message: String },

    #[error("Action '{action}' failed: {message}{}", diagnostics_suffix(.diagnostics))]
    Effect {
        action: String,
        message: String,
        diagnostics: Option<String>,
    },

    #[error("Action '{action}' cannot run {phase} while {state}")]
    InvalidTransition { action: String, state: String, phase: String },
}

fn diagnostics_suffix(diagnostics: &Option<String>) -> String {
    match diagnostics {
        Some(text) if !text.trim().is_empty() => format!("\n{text}"),
        _ => String::new(),
    }
}

impl ActionError {
    /// Create a configuration error.
    pub fn configuration(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            action: action.into(),
            message: message.into(),
        }
    }

    /// Wrap a resource registry failure.
    pub fn resource(action: impl Into<String>, source: ResourceError) -> Self {
        Self::ResourceAcquisition {
            action: action.into(),
            source,
        }
    }

    /// Attribute an interpolation failure to the action that requested it.
    pub fn interpolation(action: impl Into<String>, error: InterpolationError) -> Self {
        let action = action.into();
        match error {
            InterpolationError::Compile { fragment, message } => Self::InterpolationCompile { action, fragment, message },
            InterpolationError::Evaluation { fragment, message } => Self::InterpolationEval { action, fragment, message },
        }
    }

    /// Create an effect error without application diagnostics.
    pub fn effect(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Effect {
            action: action.into(),
            message: message.into(),
            diagnostics: None,
        }
    }

    /// Create an effect error carrying the application's own diagnostic text.
    pub fn effect_with_diagnostics(action: impl Into<String>, message: impl Into<String>, diagnostics: impl Into<String>) -> Self {
        Self::Effect {
            action: action.into(),
            message: message.into(),
            diagnostics: Some(diagnostics.into()),
        }
    }

    /// Create an invalid-transition error.
    pub fn invalid_transition(action: impl Into<String>, state: impl fmt::Display, phase: impl Into<String>) -> Self {
        Self::InvalidTransition {
            action: action.into(),
            state: state.to_string(),
            phase: phase.into(),
        }
    }

    /// Name of the action the error belongs to.
    pub fn action(&self) -> &str {
        match self {
            Self::Configuration { action, .. }
            | Self::ResourceAcquisition { action, .. }
            | Self::InterpolationCompile { action, .. }
            | Self::InterpolationEval { action, .. }
            | Self::Effect { action, .. }
            | Self::InvalidTransition { action, .. } => action,
        }
    }

    /// True for failures that stop an action before its `do` phase.
    pub fn is_init_failure(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::ResourceAcquisition { .. })
    }
}

/// Failure to compile or evaluate one interpolation fragment.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InterpolationError {
    #[error("cannot compile '{fragment}': {message}")]
    Compile { fragment: String, message: String },

    #[error("cannot evaluate '{fragment}': {message}")]
    Evaluation { fragment: String, message: String },
}

impl InterpolationError {
    /// Create a compile error.
    pub fn compile(fragment: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Compile {
            fragment: fragment.into(),
            message: message.into(),
        }
    }

    /// Create an evaluation error.
    pub fn evaluation(fragment: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Evaluation {
            fragment: fragment.into(),
            message: message.into(),
        }
    }

    pub fn fragment(&self) -> &str {
        match self {
            Self::Compile { fragment, .. } | Self::Evaluation { fragment, .. } => fragment,
        }
    }
}

/// Failure to obtain a shared application handle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("No factory registered for application family '{family}'")]
    UnknownFamily { family: String },

    #[error("A factory is already registered for application family '{family}'")]
    AlreadyRegistered { family: String },

    #[error("Could not attach to '{family}': {reason}")]
    Acquisition { family: String, reason: String },

    #[error("Attaching to '{family}' timed out after {timeout:?}")]
    Timeout { family: String, timeout: Duration },
}

impl ResourceError {
    /// Create an unknown family error.
    pub fn unknown_family(family: impl Into<String>) -> Self {
        Self::UnknownFamily { family: family.into() }
    }

    /// Create a duplicate registration error.
    pub fn already_registered(family: impl Into<String>) -> Self {
        Self::AlreadyRegistered { family: family.into() }
    }

    /// Create an acquisition error carrying the endpoint's diagnostic.
    pub fn acquisition(family: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Acquisition {
            family: family.into(),
            reason: reason.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(family: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            family: family.into(),
            timeout,
        }
    }
}

/// Non-fatal problem reported while disposing an action or tearing down a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisposalWarning {
    pub action: String,
    pub message: String,
}

impl DisposalWarning {
    pub fn new(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for DisposalWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error while disposing '{}': {}", self.action, self.message)
    }
}
