// SPDX-License-Identifier: MIT

//! Runtime state storage for workflow execution

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use super::schema::{ReducerType, StateSchema};
use crate::sdk::error::{GraphError, StepError};
use crate::sdk::state::{StateUpdate, StateView};

/// Runtime workflow state with reducer support
///
/// Fields are kept in key order so the serialized state is stable across runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowState {
    /// Current state values
    fields: BTreeMap<String, Value>,
    /// Schema deciding type and reducer per field
    schema: StateSchema,
}

impl WorkflowState {
    /// Create a new WorkflowState from a schema, applying defaults
    pub fn new(schema: &StateSchema) -> Self {
        let fields = schema
            .fields
            .iter()
            .filter_map(|(name, def)| def.default.clone().map(|d| (name.clone(), d)))
            .collect();

        Self {
            fields,
            schema: schema.clone(),
        }
    }

    /// Create an empty WorkflowState
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a state from a schema and the initial fields of a run
    pub fn with_initial(schema: &StateSchema, initial: StateUpdate) -> Result<Self, GraphError> {
        let mut state = Self::new(schema);
        state.apply(initial)?;
        Ok(state)
    }

    /// Update a field using the appropriate reducer
    pub fn update(&mut self, key: &str, value: Value) -> Result<(), GraphError> {
        self.check_type(key, &value)
            .map_err(|e| GraphError::InvalidState(e.to_string()))?;

        match self.schema.reducer(key) {
            ReducerType::Overwrite => {
                self.fields.insert(key.to_string(), value);
            }
            ReducerType::Append => {
                let slot = self
                    .fields
                    .entry(key.to_string())
                    .or_insert_with(|| Value::Array(vec![]));
                if slot.is_null() {
                    *slot = Value::Array(vec![]);
                }
                if let Value::Array(items) = slot {
                    match value {
                        Value::Array(new_items) => items.extend(new_items),
                        Value::Null => {}
                        other => items.push(other),
                    }
                }
            }
        }
        Ok(())
    }

    /// Check every field of an update against the schema without applying it
    pub fn validate(&self, update: &StateUpdate) -> Result<(), StepError> {
        update
            .iter()
            .try_for_each(|(key, value)| self.check_type(key, value))
    }

    /// Merge a step's partial update; nothing is merged if any field is invalid
    pub fn apply(&mut self, update: StateUpdate) -> Result<(), GraphError> {
        self.validate(&update)
            .map_err(|e| GraphError::InvalidState(e.to_string()))?;
        for (key, value) in update {
            self.update(&key, value)?;
        }
        Ok(())
    }

    /// Merge the updates of fan-out siblings in the order given
    ///
    /// Every update must fit the schema, and overwrite fields written by more
    /// than one sibling must agree. Otherwise the whole merge is rejected and
    /// the state is left untouched.
    pub fn merge_siblings(&mut self, updates: Vec<(String, StateUpdate)>) -> Result<(), GraphError> {
        for (step, update) in &updates {
            self.validate(update)
                .map_err(|e| GraphError::step(step.as_str(), e, self.to_json()))?;
        }

        let mut writers: HashMap<&str, Vec<(&str, &Value)>> = HashMap::new();
        for (step, update) in &updates {
            for (key, value) in update.iter() {
                if self.schema.reducer(key) == ReducerType::Overwrite {
                    writers
                        .entry(key.as_str())
                        .or_default()
                        .push((step.as_str(), value));
                }
            }
        }

        let mut conflicts: Vec<(&str, Vec<String>)> = writers
            .into_iter()
            .filter(|(_, w)| w.iter().any(|(_, v)| *v != w[0].1))
            .map(|(field, w)| (field, w.iter().map(|(s, _)| s.to_string()).collect()))
            .collect();
        conflicts.sort_by(|a, b| a.0.cmp(b.0));

        if let Some((field, steps)) = conflicts.into_iter().next() {
            return Err(GraphError::MergeConflict {
                field: field.to_string(),
                steps,
            });
        }

        for (_, update) in updates {
            self.apply(update)?;
        }
        Ok(())
    }

    fn check_type(&self, key: &str, value: &Value) -> Result<(), StepError> {
        let Some(def) = self.schema.fields.get(key) else {
            return Ok(());
        };
        // Appending a single element is allowed; its shape is the caller's concern
        if def.reducer == ReducerType::Append || def.field_type.accepts(value) {
            return Ok(());
        }
        Err(StepError::invalid_field(
            key,
            format!("expects {:?}, got {}", def.field_type, value),
        ))
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get a nested field value using dot notation (e.g., "final_output.description")
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Read-only snapshot handed to steps and routers
    pub fn snapshot(&self) -> StateView {
        StateView::new(self.fields.clone())
    }

    /// Convert state to JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Get all field names
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::workflow::state::schema::{FieldType, StateFieldDef};
    use serde_json::json;

    fn schema() -> StateSchema {
        StateSchema::new()
            .field("main_query", StateFieldDef::new(FieldType::String))
            .field("completed_tasks", StateFieldDef::append())
            .field(
                "planned_task",
                StateFieldDef::new(FieldType::Array).with_default(json!([])),
            )
    }

    fn update(value: Value) -> StateUpdate {
        StateUpdate::from_json(value).unwrap()
    }

    #[test]
    fn test_empty_state() {
        let state = WorkflowState::empty();
        assert!(state.get("anything").is_none());
    }

    #[test]
    fn test_state_with_defaults() {
        let state = WorkflowState::new(&schema());
        assert_eq!(state.get("planned_task"), Some(&json!([])));
        assert!(state.get("main_query").is_none());
    }

    #[test]
    fn test_overwrite_reducer() {
        let mut state = WorkflowState::new(&schema());

        state.update("main_query", json!("first")).unwrap();
        state.update("main_query", json!("second")).unwrap();
        assert_eq!(state.get("main_query"), Some(&json!("second")));
    }

    #[test]
    fn test_append_reducer() {
        let mut state = WorkflowState::new(&schema());

        state.update("completed_tasks", json!("item1")).unwrap();
        assert_eq!(state.get("completed_tasks"), Some(&json!(["item1"])));

        state
            .update("completed_tasks", json!(["item2", "item3"]))
            .unwrap();
        assert_eq!(
            state.get("completed_tasks"),
            Some(&json!(["item1", "item2", "item3"]))
        );

        // Empty contributions leave the sequence as is
        state.update("completed_tasks", json!([])).unwrap();
        state.update("completed_tasks", Value::Null).unwrap();
        assert_eq!(state.get("completed_tasks").unwrap().as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let mut state = WorkflowState::new(&schema());
        let err = state.update("main_query", json!(5)).unwrap_err();
        assert!(matches!(err, GraphError::InvalidState(_)));
    }

    #[test]
    fn test_apply_rejects_whole_update() {
        let mut state = WorkflowState::new(&schema());
        let err = state
            .apply(update(json!({"completed_tasks": ["a"], "main_query": 5})))
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidState(ref m) if m.contains("main_query")));
        assert!(state.get("completed_tasks").is_none());

        let invalid = state.validate(&update(json!({"planned_task": "text"})));
        assert!(matches!(invalid, Err(StepError::InvalidField { ref field, .. }) if field == "planned_task"));
    }

    #[test]
    fn test_with_initial() {
        let state =
            WorkflowState::with_initial(&schema(), update(json!({"main_query": "hello"}))).unwrap();
        assert_eq!(state.get("main_query"), Some(&json!("hello")));
        assert_eq!(state.get("planned_task"), Some(&json!([])));
    }

    #[test]
    fn test_merge_siblings_in_given_order() {
        let mut state = WorkflowState::new(&schema());
        state
            .merge_siblings(vec![
                ("worker_1".to_string(), update(json!({"completed_tasks": ["a"]}))),
                ("worker_2".to_string(), update(json!({"completed_tasks": ["b", "c"]}))),
            ])
            .unwrap();
        assert_eq!(state.get("completed_tasks"), Some(&json!(["a", "b", "c"])));
    }

    #[test]
    fn test_merge_siblings_conflict() {
        let mut state = WorkflowState::new(&schema());
        let err = state
            .merge_siblings(vec![
                ("worker_1".to_string(), update(json!({"main_query": "x", "completed_tasks": ["a"]}))),
                ("worker_2".to_string(), update(json!({"main_query": "y"}))),
            ])
            .unwrap_err();

        match err {
            GraphError::MergeConflict { field, steps } => {
                assert_eq!(field, "main_query");
                assert_eq!(steps, vec!["worker_1", "worker_2"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Nothing was applied
        assert!(state.get("completed_tasks").is_none());
    }

    #[test]
    fn test_merge_siblings_invalid_update_names_step() {
        let mut state = WorkflowState::new(&schema());
        let err = state
            .merge_siblings(vec![
                ("worker_1".to_string(), update(json!({"completed_tasks": ["a"]}))),
                ("worker_2".to_string(), update(json!({"main_query": 5}))),
            ])
            .unwrap_err();

        assert_eq!(err.step_name(), Some("worker_2"));
        assert!(matches!(
            err,
            GraphError::StepExecution { source: StepError::InvalidField { .. }, .. }
        ));
        assert!(state.get("completed_tasks").is_none());
    }

    #[test]
    fn test_merge_siblings_equal_writes_allowed() {
        let mut state = WorkflowState::new(&schema());
        state
            .merge_siblings(vec![
                ("worker_1".to_string(), update(json!({"main_query": "same"}))),
                ("worker_2".to_string(), update(json!({"main_query": "same"}))),
            ])
            .unwrap();
        assert_eq!(state.get("main_query"), Some(&json!("same")));
    }

    #[test]
    fn test_get_path_and_snapshot() {
        let mut state = WorkflowState::empty();
        state
            .update("final_output", json!({"description": "done", "synthesized": true}))
            .unwrap();

        assert_eq!(state.get_path("final_output.description"), Some(&json!("done")));
        assert_eq!(state.get_path("final_output.nonexistent"), None);
        assert_eq!(state.snapshot().get("final_output"), state.get("final_output"));
    }

    #[test]
    fn test_to_json_is_key_ordered() {
        let mut state = WorkflowState::empty();
        state.update("b", json!(2)).unwrap();
        state.update("a", json!(1)).unwrap();

        let text = serde_json::to_string(&state.to_json()).unwrap();
        assert_eq!(text, r#"{"a":1,"b":2}"#);
    }
}
