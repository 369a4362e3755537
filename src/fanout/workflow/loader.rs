//! Workflow loader - YAML file loading and parsing

use super::types::WorkflowDefinition;
use crate::sdk::error::GraphError;
use std::fs;
use std::path::Path;

/// Loads workflow definitions from YAML files
pub struct WorkflowLoader;

impl WorkflowLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a workflow definition from a YAML file
    pub fn load_workflow<P: AsRef<Path>>(&self, path: P) -> Result<WorkflowDefinition, GraphError> {
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Parse a workflow definition from a YAML string
    pub fn parse_yaml(content: &str) -> Result<WorkflowDefinition, GraphError> {
        let def: WorkflowDefinition = serde_yaml::from_str(content)?;
        Ok(def)
    }
}

impl Default for WorkflowLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::workflow::state::{FieldType, ReducerType};
    use crate::fanout::workflow::types::RouterDefinition;

    #[test]
    fn test_parse_fan_out_workflow() {
        let yaml = r#"
name: orchestrator-workers
description: "Plan, distribute, synthesize"

state:
  main_query: { type: string }
  completed_tasks: { type: array, reducer: append }

steps:
  - id: planner
  - id: orchestrator
  - id: worker_a
    uses: worker_1
  - id: synthesizer

edges:
  - { from: START, to: planner }
  - { from: planner, to: orchestrator }
  - { from: worker_a, to: synthesizer }
  - { from: synthesizer, to: END }

routes:
  - from: orchestrator
    router:
      fan_out:
        over: orchestrated_tasks
        label: agent_name
        payload_key: current_task
        fields: [description]
    targets:
      worker_1: worker_a
"#;
        let def = WorkflowLoader::parse_yaml(yaml).unwrap();
        assert_eq!(def.name, "orchestrator-workers");
        assert_eq!(def.description, "Plan, distribute, synthesize");
        assert_eq!(def.steps.len(), 4);
        assert_eq!(def.steps[2].implementation(), "worker_1");
        assert_eq!(def.steps[0].implementation(), "planner");
        assert_eq!(def.edges[0].from, "START");

        let completed = &def.state.fields["completed_tasks"];
        assert_eq!(completed.field_type, FieldType::Array);
        assert_eq!(completed.reducer, ReducerType::Append);
        assert_eq!(def.state.fields["main_query"].reducer, ReducerType::Overwrite);

        let route = &def.routes[0];
        assert_eq!(route.targets["worker_1"], "worker_a");
        match &route.router {
            RouterDefinition::FanOut(f) => {
                assert_eq!(f.over, "orchestrated_tasks");
                assert_eq!(f.fields.as_deref(), Some(&["description".to_string()][..]));
            }
            other => panic!("unexpected router: {:?}", other),
        }
    }

    #[test]
    fn test_parse_branches_and_named_routers() {
        let yaml = r#"
name: review
steps:
  - id: writer
  - id: reviewer
edges:
  - { from: START, to: writer }
  - { from: writer, to: reviewer }
routes:
  - from: reviewer
    router:
      branches:
        rules:
          - { when: "score > 0.8", label: accept }
        default: retry
    targets: { accept: END, retry: writer }
  - from: other
    router: { uses: my_router }
    targets: {}
"#;
        let def = WorkflowLoader::parse_yaml(yaml).unwrap();
        assert!(def.state.fields.is_empty());
        match &def.routes[0].router {
            RouterDefinition::Branches(b) => {
                assert_eq!(b.rules[0].when, "score > 0.8");
                assert_eq!(b.default.as_deref(), Some("retry"));
            }
            other => panic!("unexpected router: {:?}", other),
        }
        assert!(matches!(&def.routes[1].router, RouterDefinition::Uses(n) if n == "my_router"));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let err = WorkflowLoader::parse_yaml("name: [unclosed").unwrap_err();
        assert!(matches!(err, GraphError::Yaml(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = WorkflowLoader::new()
            .load_workflow("does/not/exist.yaml")
            .unwrap_err();
        assert!(matches!(err, GraphError::Io(_)));
    }
}
