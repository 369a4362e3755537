// SPDX-License-Identifier: MIT

//! Values exchanged between the engine and step implementations
//!
//! - `StateView` - read-only snapshot handed to a step or router
//! - `StateUpdate` - partial update a step returns for the engine to merge

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::error::StepError;

/// Read-only snapshot of the fields a step is allowed to see
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateView {
    fields: BTreeMap<String, Value>,
}

impl StateView {
    pub fn new(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get a nested field value using dot notation (e.g., "current_task.description")
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Deserialize a required field into a typed value
    pub fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T, StepError> {
        let value = self
            .fields
            .get(key)
            .ok_or_else(|| StepError::MissingField(key.to_string()))?;
        serde_json::from_value(value.clone())
            .map_err(|e| StepError::invalid_field(key, e.to_string()))
    }

    /// Deserialize an optional field; missing and null both yield `None`
    pub fn optional<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StepError> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| StepError::invalid_field(key, e.to_string())),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    /// Convert the view to a JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

/// Partial state update produced by a step
///
/// Keys are merged by the coordinator according to each field's reducer,
/// so a step never needs to know whether a field overwrites or appends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    values: BTreeMap<String, Value>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field from any serializable value
    pub fn with<T: Serialize>(mut self, key: impl Into<String>, value: T) -> Result<Self, StepError> {
        self.values.insert(key.into(), serde_json::to_value(value)?);
        Ok(self)
    }

    /// Set a field from a JSON value
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Build an update from a JSON object
    pub fn from_json(value: Value) -> Result<Self, StepError> {
        match value {
            Value::Object(map) => Ok(map.into_iter().collect()),
            Value::Null => Ok(Self::new()),
            other => Err(StepError::invalid_field(
                "update",
                format!("expected an object, got {}", other),
            )),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Turn the update into the view a dispatched step receives
    pub fn into_view(self) -> StateView {
        StateView::new(self.values)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.values.clone().into_iter().collect::<Map<_, _>>())
    }
}

impl FromIterator<(String, Value)> for StateUpdate {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for StateUpdate {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Task {
        description: String,
    }

    fn view(value: Value) -> StateView {
        StateUpdate::from_json(value).unwrap().into_view()
    }

    #[test]
    fn test_require_typed_field() {
        let view = view(json!({"current_task": {"description": "Task 1"}}));
        let task: Task = view.require("current_task").unwrap();
        assert_eq!(task.description, "Task 1");
    }

    #[test]
    fn test_require_missing_field() {
        let view = StateView::default();
        let err = view.require::<String>("main_query").unwrap_err();
        assert!(matches!(err, StepError::MissingField(f) if f == "main_query"));
    }

    #[test]
    fn test_require_wrong_shape() {
        let view = view(json!({"main_query": 42}));
        let err = view.require::<String>("main_query").unwrap_err();
        assert!(matches!(err, StepError::InvalidField { .. }));
    }

    #[test]
    fn test_optional_null_is_none() {
        let view = view(json!({"final_output": null}));
        assert_eq!(view.optional::<String>("final_output").unwrap(), None);
        assert_eq!(view.optional::<String>("absent").unwrap(), None);
    }

    #[test]
    fn test_get_path() {
        let view = view(json!({"current_task": {"meta": {"priority": 3}}}));
        assert_eq!(view.get_path("current_task.meta.priority"), Some(&json!(3)));
        assert_eq!(view.get_path("current_task.missing"), None);
    }

    #[test]
    fn test_update_builder() {
        let update = StateUpdate::new()
            .with("planned_task", vec!["a", "b"])
            .unwrap()
            .with("done", true)
            .unwrap();
        assert_eq!(update.len(), 2);
        assert_eq!(update.get("planned_task"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn test_update_from_non_object_fails() {
        assert!(StateUpdate::from_json(json!([1, 2])).is_err());
        assert!(StateUpdate::from_json(Value::Null).unwrap().is_empty());
    }
}
