// SPDX-License-Identifier: MIT

//! Built-in value type validators used by entity `inputType`/`outputType`

use crate::core::error::{DataPointError, Result};
use crate::core::value::{inspect, type_of};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Types an entity can require of its input or output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    /// An error rendered by `DataPointError::to_value`
    Error,
}

impl ValueType {
    /// Parse a bare type name such as `number`
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Error => "error",
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Error => value
                .as_object()
                .map(|o| o.contains_key("name") && o.contains_key("message"))
                .unwrap_or(false),
        }
    }

    /// Pass the value through unchanged, or fail with a type-check error
    pub fn check(&self, value: &Value) -> Result<Value> {
        if self.matches(value) {
            return Ok(value.clone());
        }
        Err(DataPointError::TypeCheck {
            expected: self.name().to_string(),
            actual: type_of(value).to_string(),
            value: inspect(value),
        })
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
