use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

use super::errors::ToolError;

/// JSON type a tool parameter must have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParameterKind {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParameterKind::String => value.is_string(),
            ParameterKind::Integer => value.is_i64() || value.is_u64(),
            ParameterKind::Number => value.is_number(),
            ParameterKind::Boolean => value.is_boolean(),
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterKind::String => write!(f, "string"),
            ParameterKind::Integer => write!(f, "integer"),
            ParameterKind::Number => write!(f, "number"),
            ParameterKind::Boolean => write!(f, "boolean"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
    pub description: String,
    pub required: bool,
}

impl ParameterSpec {
    pub fn required(name: &str, kind: ParameterKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            required: true,
        }
    }

    pub fn optional(name: &str, kind: ParameterKind, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// Name, description and input schema the reasoning step sees for a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDescriptor {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Input schema as a JSON Schema object
    pub fn json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    json!({
                        "type": p.kind.to_string(),
                        "description": p.description,
                    }),
                )
            })
            .collect();

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check arguments against the declared parameters
    pub fn validate(&self, arguments: &Value) -> Result<(), ToolError> {
        let object = arguments.as_object().ok_or_else(|| {
            ToolError::InvalidInput(format!(
                "Arguments for '{}' must be a JSON object",
                self.name
            ))
        })?;

        for key in object.keys() {
            if !self.parameters.iter().any(|p| &p.name == key) {
                return Err(ToolError::InvalidInput(format!(
                    "Unexpected parameter '{}' for tool '{}'",
                    key, self.name
                )));
            }
        }

        for parameter in &self.parameters {
            match object.get(&parameter.name) {
                None | Some(Value::Null) if parameter.required => {
                    return Err(ToolError::InvalidInput(format!(
                        "Missing '{}' parameter",
                        parameter.name
                    )));
                }
                Some(value) if !value.is_null() && !parameter.kind.accepts(value) => {
                    return Err(ToolError::InvalidInput(format!(
                        "Parameter '{}' must be of type {}",
                        parameter.name, parameter.kind
                    )));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// A request from the reasoning step to run one registered tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Correlates the request with its observation in the reasoning context
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolInvocation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}
