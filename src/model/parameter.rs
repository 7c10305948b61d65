//! Declarative descriptions of tunable parameters.
//!
//! Transform, filter and export forms are generated dynamically from
//! these descriptions: the form renders one control per description and
//! validates user input against it. That rendering and validation logic
//! lives with the forms - the core only declares the shape.

use serde::{Deserialize, Serialize};

/// The type tag of a tunable parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Integer,
    Float,
    Boolean,
}

/// A parameter value: one of the four primitive shapes a form can hold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ParameterValue {
    /// Returns the type tag matching this value.
    pub fn parameter_type(&self) -> ParameterType {
        match self {
            ParameterValue::Boolean(_) => ParameterType::Boolean,
            ParameterValue::Integer(_) => ParameterType::Integer,
            ParameterValue::Float(_) => ParameterType::Float,
            ParameterValue::String(_) => ParameterType::String,
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Boolean(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Integer(value)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::String(value.to_string())
    }
}

/// Declares one tunable input exposed to a user-facing form.
///
/// When `options` is present the parameter is a closed choice, not free
/// text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescription {
    /// The type tag driving which form control is rendered.
    #[serde(rename = "type")]
    pub parameter_type: ParameterType,

    /// Display label for the control.
    pub label: String,

    /// Optional longer help text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Optional default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ParameterValue>,

    /// Optional enumerated set of allowed values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ParameterValue>>,
}

impl ParameterDescription {
    /// Creates a new description with the given type and label.
    pub fn new(parameter_type: ParameterType, label: impl Into<String>) -> Self {
        Self {
            parameter_type,
            label: label.into(),
            description: None,
            default: None,
            options: None,
        }
    }

    /// Sets the help text.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, default: impl Into<ParameterValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Constrains the parameter to an enumerated set of allowed values.
    pub fn with_options(mut self, options: impl IntoIterator<Item = ParameterValue>) -> Self {
        self.options = Some(options.into_iter().collect());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_produces_closed_choice() {
        let description = ParameterDescription::new(ParameterType::String, "A Select")
            .with_default("two")
            .with_options(["one", "two", "three", "four"].map(ParameterValue::from));

        assert_eq!(description.parameter_type, ParameterType::String);
        assert_eq!(description.default, Some(ParameterValue::String("two".into())));
        assert_eq!(description.options.as_ref().map(Vec::len), Some(4));
    }

    #[test]
    fn type_tag_serializes_lowercase() {
        let description = ParameterDescription::new(ParameterType::Integer, "Radius").with_default(1i64);

        let json = serde_json::to_value(&description).expect("serialize description");
        assert_eq!(json["type"], "integer");
        assert_eq!(json["label"], "Radius");
        assert_eq!(json["default"], 1);
    }

    #[test]
    fn value_roundtrips_untagged() {
        let values = vec![
            ParameterValue::from(true),
            ParameterValue::from(7i64),
            ParameterValue::from(3.5),
            ParameterValue::from("abc"),
        ];

        let json = serde_json::to_string(&values).expect("serialize values");
        let restored: Vec<ParameterValue> = serde_json::from_str(&json).expect("parse values");
        assert_eq!(values, restored);
    }

    #[test]
    fn value_reports_its_type() {
        assert_eq!(ParameterValue::from(true).parameter_type(), ParameterType::Boolean);
        assert_eq!(ParameterValue::from(0.5).parameter_type(), ParameterType::Float);
    }
}
