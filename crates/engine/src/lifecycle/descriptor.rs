//! Declarative description of an action kind and its parameters.

use cogwork_types::{ActionError, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Parameter values keyed by parameter name, in declaration order.
pub type Parameters = IndexMap<String, Value>;

/// Expected type of a parameter once resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    Text,
    Integer,
    Float,
    Boolean,
    /// Names a variable in the store; read with `fetch_input`, written with `publish_output`.
    VariableName,
    Any,
}

impl ParameterKind {
    fn label(self) -> &'static str {
        match self {
            ParameterKind::Text => "text",
            ParameterKind::Integer => "an integer",
            ParameterKind::Float => "a number",
            ParameterKind::Boolean => "a boolean",
            ParameterKind::VariableName => "a variable name",
            ParameterKind::Any => "a value",
        }
    }

    /// Convert `value` to this kind, or describe why it cannot be.
    pub(crate) fn coerce(self, value: Value) -> Result<Value, String> {
        let converted = match (self, &value) {
            (ParameterKind::Any, _) => Some(value.clone()),
            (ParameterKind::Text, Value::Resource(_)) => None,
            (ParameterKind::Text, _) => Some(Value::String(value.to_text())),
            (ParameterKind::VariableName, Value::String(name)) if !name.trim().is_empty() => Some(Value::String(name.trim().to_string())),
            (ParameterKind::VariableName, _) => None,
            (ParameterKind::Integer, _) => value.as_i64().map(Value::Integer),
            (ParameterKind::Float, _) => value.as_f64().map(Value::Float),
            (ParameterKind::Boolean, _) => value.as_bool().map(Value::Bool),
        };
        converted.ok_or_else(|| format!("expected {}, got {} '{}'", self.label(), value.type_name(), value.to_text()))
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
    pub required: bool,
    /// Used verbatim; never interpolated.
    pub literal: bool,
    pub default: Option<Value>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            literal: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn literal(mut self) -> Self {
        self.literal = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Whether the raw value will be resolved through the interpolator on access.
    pub(crate) fn interpolates(&self, raw: &Value) -> bool {
        !self.literal && matches!(raw, Value::String(text) if text.contains(['{', '}']))
    }
}

/// Static description shared by every instance of an action kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDescriptor {
    pub kind: String,
    /// Application family whose singleton the action needs, if any.
    pub family: Option<String>,
    pub parameters: Vec<ParameterSpec>,
}

impl ActionDescriptor {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            family: None,
            parameters: Vec::new(),
        }
    }

    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|parameter| parameter.name == name)
    }

    /// Validate configured values against the declaration.
    ///
    /// Rejects undeclared names, missing required values and values that can
    /// never convert to the declared kind. Values that will be interpolated are
    /// checked again when they are read.
    pub fn validate(&self, action: &str, parameters: &Parameters) -> Result<(), ActionError> {
        if let Some(unknown) = parameters.keys().find(|name| self.parameter(name).is_none()) {
            return Err(ActionError::configuration(
                action,
                format!("unknown parameter '{unknown}' for action kind '{}'", self.kind),
            ));
        }

        for spec in &self.parameters {
            let value = parameters.get(&spec.name).filter(|value| !value.is_null()).or(spec.default.as_ref());
            let Some(value) = value else {
                if spec.required {
                    return Err(ActionError::configuration(action, format!("missing required parameter '{}'", spec.name)));
                }
                continue;
            };
            if spec.interpolates(value) {
                continue;
            }
            spec.kind
                .coerce(value.clone())
                .map_err(|reason| ActionError::configuration(action, format!("parameter '{}' {reason}", spec.name)))?;
        }
        Ok(())
    }
}
