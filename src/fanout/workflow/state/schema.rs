// SPDX-License-Identifier: MIT

//! State schema definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::sdk::error::ConfigError;

/// Schema defining the workflow state structure
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct StateSchema {
    /// Field definitions
    #[serde(flatten)]
    pub fields: BTreeMap<String, StateFieldDef>,
}

/// Definition of a single state field
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StateFieldDef {
    /// Type of the field
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Reducer for merging values
    #[serde(default)]
    pub reducer: ReducerType,
    /// Default value
    pub default: Option<Value>,
}

/// Supported field types
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

/// Reducer types for merging values into state
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReducerType {
    /// Replace the value (default)
    #[default]
    Overwrite,
    /// Append to array
    Append,
}

impl FieldType {
    /// Check whether a JSON value has this type; null is accepted everywhere
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (FieldType::String, Value::String(_)) => true,
            (FieldType::Number, Value::Number(_)) => true,
            (FieldType::Boolean, Value::Bool(_)) => true,
            (FieldType::Array, Value::Array(_)) => true,
            (FieldType::Object, Value::Object(_)) => true,
            _ => false,
        }
    }
}

impl StateFieldDef {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            reducer: ReducerType::Overwrite,
            default: None,
        }
    }

    /// Accumulating array field
    pub fn append() -> Self {
        Self {
            field_type: FieldType::Array,
            reducer: ReducerType::Append,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

impl StateSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field definition
    pub fn field(mut self, name: impl Into<String>, def: StateFieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    /// Reducer for a field; fields missing from the schema overwrite
    pub fn reducer(&self, name: &str) -> ReducerType {
        self.fields
            .get(name)
            .map(|f| f.reducer)
            .unwrap_or(ReducerType::Overwrite)
    }

    /// Check the schema is self-consistent
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, def) in &self.fields {
            if def.reducer == ReducerType::Append && def.field_type != FieldType::Array {
                return Err(ConfigError::InvalidSchema(format!(
                    "field '{}' uses the append reducer but is not an array",
                    name
                )));
            }
            if let Some(default) = &def.default {
                if !def.field_type.accepts(default) {
                    return Err(ConfigError::InvalidSchema(format!(
                        "default for field '{}' is not of type {:?}",
                        name, def.field_type
                    )));
                }
            }
        }
        Ok(())
    }
}
