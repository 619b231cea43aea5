//! Per-run state shared by actions and the per-phase view lent to behaviours.

use std::sync::Arc;

use cogwork_types::{ActionError, AskKind, AskResult, HostCallbacks, MessageLevel, Value, VariableStore};

use crate::{
    interpolation::Interpolator,
    lifecycle::descriptor::{ActionDescriptor, ParameterKind, Parameters},
    resources::{ApplicationHandle, ResourceHandle, ResourceRegistry, downcast_handle},
};

/// Everything a workflow run threads through its actions.
///
/// The store is owned here and lent mutably to one action phase at a time;
/// the registry and host are shared and may outlive the run.
pub struct RunContext {
    pub variables: VariableStore,
    pub interpolator: Interpolator,
    pub registry: Arc<ResourceRegistry>,
    pub host: Arc<dyn HostCallbacks>,
}

impl RunContext {
    pub fn new(registry: Arc<ResourceRegistry>, host: Arc<dyn HostCallbacks>) -> Self {
        Self {
            variables: VariableStore::new(),
            interpolator: Interpolator::new(),
            registry,
            host,
        }
    }

    pub fn with_variables(mut self, variables: VariableStore) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_interpolator(mut self, interpolator: Interpolator) -> Self {
        self.interpolator = interpolator;
        self
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("variables", &self.variables)
            .field("interpolator", &self.interpolator)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// The view of a run an action behaviour receives during one phase.
///
/// Parameter accessors resolve interpolation and coerce to the declared kind;
/// every failure is attributed to the action by name.
pub struct ActionContext<'a> {
    name: &'a str,
    descriptor: &'a ActionDescriptor,
    parameters: &'a Parameters,
    resource: Option<&'a ResourceHandle>,
    run: &'a mut RunContext,
}

impl<'a> ActionContext<'a> {
    pub(crate) fn new(
        name: &'a str,
        descriptor: &'a ActionDescriptor,
        parameters: &'a Parameters,
        resource: Option<&'a ResourceHandle>,
        run: &'a mut RunContext,
    ) -> Self {
        Self {
            name,
            descriptor,
            parameters,
            resource,
            run,
        }
    }

    /// Display name of the action.
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn descriptor(&self) -> &ActionDescriptor {
        self.descriptor
    }

    /// Resolved value of a declared parameter.
    ///
    /// Missing optional parameters without a default resolve to [`Value::Null`].
    pub fn param(&self, name: &str) -> Result<Value, ActionError> {
        let spec = self.descriptor.parameter(name).ok_or_else(|| {
            ActionError::configuration(self.name, format!("action kind '{}' declares no parameter '{name}'", self.descriptor.kind))
        })?;

        let raw = match self.parameters.get(name).filter(|value| !value.is_null()).or(spec.default.as_ref()) {
            Some(raw) => raw,
            None if spec.required => {
                return Err(ActionError::configuration(self.name, format!("missing required parameter '{name}'")));
            }
            None => return Ok(Value::Null),
        };

        let resolved = match raw {
            Value::String(text) if spec.interpolates(raw) => match spec.kind {
                ParameterKind::Text | ParameterKind::VariableName => self.resolve(text).map(Value::String)?,
                _ => self
                    .run
                    .interpolator
                    .resolve_value(text, &self.run.variables)
                    .map_err(|error| ActionError::interpolation(self.name, error))?,
            },
            other => other.clone(),
        };

        spec.kind
            .coerce(resolved)
            .map_err(|reason| ActionError::configuration(self.name, format!("parameter '{name}' {reason}")))
    }

    pub fn text_param(&self, name: &str) -> Result<String, ActionError> {
        self.param(name).map(|value| value.to_text())
    }

    /// Text value of an optional parameter; `None` when unset.
    pub fn opt_text_param(&self, name: &str) -> Result<Option<String>, ActionError> {
        let value = self.param(name)?;
        Ok((!value.is_null()).then(|| value.to_text()))
    }

    pub fn int_param(&self, name: &str) -> Result<i64, ActionError> {
        match self.param(name)? {
            Value::Integer(number) => Ok(number),
            other => Err(self.unset_or_mistyped(name, &other, "an integer")),
        }
    }

    pub fn float_param(&self, name: &str) -> Result<f64, ActionError> {
        match self.param(name)? {
            Value::Float(number) => Ok(number),
            Value::Integer(number) => Ok(number as f64),
            other => Err(self.unset_or_mistyped(name, &other, "a number")),
        }
    }

    pub fn bool_param(&self, name: &str) -> Result<bool, ActionError> {
        match self.param(name)? {
            Value::Bool(flag) => Ok(flag),
            other => Err(self.unset_or_mistyped(name, &other, "a boolean")),
        }
    }

    fn unset_or_mistyped(&self, name: &str, value: &Value, expected: &str) -> ActionError {
        if value.is_null() {
            ActionError::configuration(self.name, format!("parameter '{name}' has no value"))
        } else {
            ActionError::configuration(self.name, format!("parameter '{name}' is not {expected}"))
        }
    }

    /// Read the store variable named by a variable-name parameter.
    pub fn fetch_input(&self, parameter: &str) -> Result<Value, ActionError> {
        let variable = self.text_param(parameter)?;
        self.run
            .variables
            .get(&variable)
            .cloned()
            .ok_or_else(|| ActionError::configuration(self.name, format!("variable '{variable}' is not defined")))
    }

    /// Write `value` to the store variable named by a variable-name parameter.
    ///
    /// Returns the variable name written to.
    pub fn publish_output(&mut self, parameter: &str, value: impl Into<Value>) -> Result<String, ActionError> {
        let variable = self.text_param(parameter)?;
        self.run.variables.set(variable.clone(), value);
        Ok(variable)
    }

    /// Interpolate arbitrary text against the current store.
    pub fn resolve(&self, raw: &str) -> Result<String, ActionError> {
        self.run
            .interpolator
            .resolve(raw, &self.run.variables)
            .map_err(|error| ActionError::interpolation(self.name, error))
    }

    pub fn variables(&self) -> &VariableStore {
        &self.run.variables
    }

    pub fn variables_mut(&mut self) -> &mut VariableStore {
        &mut self.run.variables
    }

    /// The family singleton acquired during Init, if the action declares a family.
    pub fn resource(&self) -> Option<&ResourceHandle> {
        self.resource
    }

    /// The family singleton as its concrete type.
    pub fn handle<T: ApplicationHandle>(&self) -> Result<Arc<T>, ActionError> {
        let resource = self
            .resource
            .ok_or_else(|| ActionError::configuration(self.name, "action holds no application handle"))?;
        downcast_handle::<T>(resource).ok_or_else(|| {
            ActionError::configuration(
                self.name,
                format!("application handle is not a {}", std::any::type_name::<T>()),
            )
        })
    }

    pub fn message(&self, text: &str, level: MessageLevel) {
        self.run.host.message(text, level);
    }

    pub fn warn(&self, text: &str) {
        self.run.host.warn(text);
    }

    pub fn ask(&self, question: &str, title: &str, kind: AskKind) -> AskResult {
        self.run.host.ask(question, title, kind)
    }
}
