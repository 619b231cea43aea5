//! Dynamically typed values shared between actions through the variable store.
//!
//! Every value an action reads or publishes is a [`Value`]. The conversions
//! defined here are total: any value can be rendered as text, tested for
//! truthiness, and (where it has a JSON form) converted to `serde_json::Value`.

use std::{any::Any, collections::BTreeMap, fmt, sync::Arc};

use serde_json::Value as JsonValue;

/// Opaque reference to an object that lives inside an external application.
///
/// Workbooks, CAD documents, XML navigators and similar automation objects are
/// stored in the variable store as resource references. The reference is cheap
/// to clone; clones point at the same underlying object.
#[derive(Clone)]
pub struct ResourceRef {
    kind: String,
    inner: Arc<dyn Any + Send + Sync>,
}

impl ResourceRef {
    /// Wrap an owned object under a descriptive kind label (for example `workbook`).
    pub fn new<T: Any + Send + Sync>(kind: impl Into<String>, object: T) -> Self {
        Self {
            kind: kind.into(),
            inner: Arc::new(object),
        }
    }

    /// Wrap an already shared object without re-allocating it.
    pub fn from_arc<T: Any + Send + Sync>(kind: impl Into<String>, object: Arc<T>) -> Self {
        Self {
            kind: kind.into(),
            inner: object,
        }
    }

    /// Kind label supplied when the reference was created.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Recover the concrete object when it has type `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.inner.clone().downcast::<T>().ok()
    }

    /// True when both references point at the same object.
    pub fn ptr_eq(&self, other: &ResourceRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceRef").field(&self.kind).finish()
    }
}

impl PartialEq for ResourceRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// Tagged union of every value kind an action can exchange.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Resource(ResourceRef),
}

impl Value {
    /// Short name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Resource(_) => "resource",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_resource(&self) -> Option<&ResourceRef> {
        match self {
            Value::Resource(resource) => Some(resource),
            _ => None,
        }
    }

    /// Numeric view of the value.
    ///
    /// Booleans map to `0`/`1` and strings are parsed after trimming.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(number) => Some(*number as f64),
            Value::Float(number) => Some(*number),
            Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Integer view of the value.
    ///
    /// Floats convert only when they have no fractional part and fit in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(number) => Some(*number),
            Value::Float(number) if number.fract() == 0.0 => float_to_i64(*number),
            Value::Bool(flag) => Some(i64::from(*flag)),
            Value::String(text) => text.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Boolean view of the value.
    ///
    /// Strings accept `true`/`false`/`yes`/`no`/`1`/`0` case-insensitively;
    /// other kinds fall back to truthiness.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(flag) => Some(*flag),
            Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" | "" => Some(false),
                _ => None,
            },
            Value::Resource(_) => None,
            other => Some(other.is_truthy()),
        }
    }

    /// Truthiness used by logical operators.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(flag) => *flag,
            Value::Integer(number) => *number != 0,
            Value::Float(number) => *number != 0.0,
            Value::String(text) => !text.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
            Value::Resource(_) => true,
        }
    }

    /// Textual form spliced into interpolated strings.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(flag) => flag.to_string(),
            Value::Integer(number) => number.to_string(),
            Value::Float(number) => number.to_string(),
            Value::String(text) => text.clone(),
            Value::List(items) => {
                let rendered: Vec<String> = items.iter().map(Value::to_nested_text).collect();
                format!("[{}]", rendered.join(", "))
            }
            Value::Map(entries) => {
                let rendered: Vec<String> = entries
                    .iter()
                    .map(|(key, value)| format!("{key:?}: {}", value.to_nested_text()))
                    .collect();
                format!("{{{}}}", rendered.join(", "))
            }
            Value::Resource(resource) => format!("<{}>", resource.kind()),
        }
    }

    // Strings nested in lists and maps are quoted so element boundaries stay visible.
    fn to_nested_text(&self) -> String {
        match self {
            Value::String(text) => format!("{text:?}"),
            other => other.to_text(),
        }
    }

    /// Build a value from JSON. Objects become maps; numbers prefer the integer form.
    pub fn from_json(json: &JsonValue) -> Value {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(flag) => Value::Bool(*flag),
            JsonValue::Number(number) => match number.as_i64() {
                Some(integer) => Value::Integer(integer),
                None => Value::Float(number.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(text) => Value::String(text.clone()),
            JsonValue::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            JsonValue::Object(map) => Value::Map(map.iter().map(|(key, value)| (key.clone(), Value::from_json(value))).collect()),
        }
    }

    /// JSON form of the value. Resources (and non-finite floats) have none.
    pub fn to_json(&self) -> Option<JsonValue> {
        match self {
            Value::Null => Some(JsonValue::Null),
            Value::Bool(flag) => Some(JsonValue::Bool(*flag)),
            Value::Integer(number) => Some(JsonValue::from(*number)),
            Value::Float(number) => serde_json::Number::from_f64(*number).map(JsonValue::Number),
            Value::String(text) => Some(JsonValue::String(text.clone())),
            Value::List(items) => items.iter().map(Value::to_json).collect::<Option<Vec<_>>>().map(JsonValue::Array),
            Value::Map(entries) => {
                let mut object = serde_json::Map::new();
                for (key, value) in entries {
                    object.insert(key.clone(), value.to_json()?);
                }
                Some(JsonValue::Object(object))
            }
            Value::Resource(_) => None,
        }
    }
}

// `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
fn float_to_i64(number: f64) -> Option<i64> {
    (number >= i64::MIN as f64 && number < i64::MAX as f64).then_some(number as i64)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::String(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::String(text)
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Bool(flag)
    }
}

impl From<i64> for Value {
    fn from(number: i64) -> Self {
        Value::Integer(number)
    }
}

impl From<i32> for Value {
    fn from(number: i32) -> Self {
        Value::Integer(i64::from(number))
    }
}

impl From<f64> for Value {
    fn from(number: f64) -> Self {
        Value::Float(number)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<ResourceRef> for Value {
    fn from(resource: ResourceRef) -> Self {
        Value::Resource(resource)
    }
}

impl From<&JsonValue> for Value {
    fn from(json: &JsonValue) -> Self {
        Value::from_json(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_conversion_covers_every_variant() {
        assert_eq!(Value::Null.to_text(), "");
        assert_eq!(Value::Bool(true).to_text(), "true");
        assert_eq!(Value::Integer(-42).to_text(), "-42");
        assert_eq!(Value::Float(2.0).to_text(), "2");
        assert_eq!(Value::Float(2.5).to_text(), "2.5");
        assert_eq!(Value::from("plain").to_text(), "plain");
        assert_eq!(
            Value::List(vec![Value::Integer(1), Value::from("a"), Value::Null]).to_text(),
            r#"[1, "a", ]"#
        );
        assert_eq!(Value::Resource(ResourceRef::new("workbook", 7_u32)).to_text(), "<workbook>");
    }

    #[test]
    fn truthiness_follows_emptiness_and_zero() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Integer(0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::Float(0.1).is_truthy());
    }

    #[test]
    fn numeric_views_parse_strings() {
        assert_eq!(Value::from(" 3.5 ").as_f64(), Some(3.5));
        assert_eq!(Value::from("12").as_i64(), Some(12));
        assert_eq!(Value::Float(4.0).as_i64(), Some(4));
        assert_eq!(Value::Float(4.2).as_i64(), None);
        assert_eq!(Value::from("abc").as_f64(), None);
    }

    #[test]
    fn integer_view_rejects_out_of_range_floats() {
        assert_eq!(Value::Float(1e20).as_i64(), None);
        assert_eq!(Value::Float(-1e300).as_i64(), None);
        assert_eq!(Value::Float(9_223_372_036_854_775_808.0).as_i64(), None);
        assert_eq!(Value::Float(f64::INFINITY).as_i64(), None);
        assert_eq!(Value::Float(-9_223_372_036_854_775_808.0).as_i64(), Some(i64::MIN));
        assert_eq!(Value::Float(1e15).as_i64(), Some(1_000_000_000_000_000));
    }

    #[test]
    fn boolean_view_accepts_common_spellings() {
        assert_eq!(Value::from("Yes").as_bool(), Some(true));
        assert_eq!(Value::from("0").as_bool(), Some(false));
        assert_eq!(Value::from("maybe").as_bool(), None);
        assert_eq!(Value::Integer(2).as_bool(), Some(true));
    }

    #[test]
    fn json_conversion_preserves_structure() {
        let json = json!({"name": "bracket", "sizes": [1, 2.5], "active": true});
        let value = Value::from_json(&json);
        let Value::Map(entries) = &value else {
            panic!("expected map, got {value:?}");
        };
        assert_eq!(entries["name"], Value::from("bracket"));
        assert_eq!(entries["sizes"], Value::List(vec![Value::Integer(1), Value::Float(2.5)]));
        assert_eq!(value.to_json(), Some(json));
    }

    #[test]
    fn resources_have_no_json_form_and_compare_by_identity() {
        let first = ResourceRef::new("document", String::from("part.sldprt"));
        let clone = first.clone();
        let other = ResourceRef::new("document", String::from("part.sldprt"));

        assert_eq!(Value::Resource(first.clone()).to_json(), None);
        assert_eq!(first, clone);
        assert_ne!(first, other);
        assert_eq!(first.downcast::<String>().as_deref().map(String::as_str), Some("part.sldprt"));
        assert!(first.downcast::<u32>().is_none());
    }
}
