// SPDX-License-Identifier: MIT

//! Typed error handling for fanout-rs
//!
//! Errors fall into three groups:
//! - `ConfigError` - problems with the graph itself, raised before a run starts
//! - `GraphError` - anything that aborts a run (routing, merging, step failures)
//! - `StepError` - what a step or router implementation reports to the engine

use thiserror::Error;

/// Top-level error type for graph construction and execution
#[derive(Debug, Error)]
pub enum GraphError {
    /// The graph definition is invalid; the run never starts
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A router returned a label that is not in its routing table
    #[error("Routing error at '{step}': label '{label}' is not in the routing table")]
    Routing { step: String, label: String },

    /// Two fan-out siblings wrote different values to the same overwrite field
    #[error("Merge conflict on field '{field}' between steps {steps:?}")]
    MergeConflict { field: String, steps: Vec<String> },

    /// A step (or the router attached to it) failed
    #[error("Step '{step}' failed: {source}")]
    StepExecution {
        step: String,
        #[source]
        source: StepError,
        /// State at the moment of failure
        snapshot: Box<serde_json::Value>,
    },

    /// Run exceeded the configured number of step executions
    #[error("Max steps reached: {limit}")]
    StepLimitExceeded { limit: usize },

    /// A value does not fit the state schema
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Graph configuration errors, detected while building or compiling
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A step with this name is already registered
    #[error("Step '{0}' is already registered")]
    DuplicateStep(String),

    /// An edge or route references a step that was never registered
    #[error("Unknown step: {0}")]
    UnknownStep(String),

    /// Start and end markers cannot be registered as steps
    #[error("'{0}' is a reserved name")]
    ReservedName(String),

    /// A step already has an outgoing edge
    #[error("Step '{0}' already has an outgoing edge")]
    DuplicateEdge(String),

    /// The end marker cannot have outgoing edges
    #[error("The end marker cannot have outgoing edges (edge to '{0}')")]
    EdgeFromEnd(String),

    /// Nothing is connected to the start marker
    #[error("Graph has no entry edge from the start marker")]
    MissingEntry,

    /// Step cannot be reached from the entry
    #[error("Step '{0}' is unreachable from the entry")]
    Unreachable(String),

    /// Step has no path to the end marker
    #[error("Step '{0}' has no path to the end marker")]
    DeadEnd(String),

    /// Circular dependency made only of static edges
    #[error("Circular dependency detected: {0:?}")]
    Cycle(Vec<String>),

    /// Fan-out targets do not converge on a single join step
    #[error("Fan-out from '{step}' has no single join target: {successors:?}")]
    AmbiguousJoin {
        step: String,
        successors: Vec<String>,
    },

    /// A router declares a label missing from its routing table
    #[error("Router at '{step}' declares label '{label}' which is not mapped")]
    UnmappedLabel { step: String, label: String },

    /// Workflow file names an implementation the registry does not have
    #[error("No implementation registered under '{0}'")]
    UnknownImplementation(String),

    /// State schema is inconsistent
    #[error("Invalid state schema: {0}")]
    InvalidSchema(String),

    /// A `when` expression could not be parsed
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    /// Environment or CLI setting with an unusable value
    #[error("Invalid value '{value}' for {name}")]
    InvalidSetting { name: String, value: String },
}

/// Errors reported by step and router implementations
#[derive(Debug, Error)]
pub enum StepError {
    /// A required state field is absent
    #[error("Missing field '{0}'")]
    MissingField(String),

    /// A state field has an unexpected shape
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    /// The step panicked while running
    #[error("Step panicked: {0}")]
    Panicked(String),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Generic failure
    #[error("{0}")]
    Failed(String),
}

impl GraphError {
    /// Create a routing error
    pub fn routing(step: impl Into<String>, label: impl Into<String>) -> Self {
        Self::Routing {
            step: step.into(),
            label: label.into(),
        }
    }

    /// Create a step execution error carrying the state snapshot
    pub fn step(step: impl Into<String>, source: StepError, snapshot: serde_json::Value) -> Self {
        Self::StepExecution {
            step: step.into(),
            source,
            snapshot: Box::new(snapshot),
        }
    }

    /// Whether this error was raised before the run started
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Name of the step the error is attributed to, if any
    pub fn step_name(&self) -> Option<&str> {
        match self {
            Self::Routing { step, .. } | Self::StepExecution { step, .. } => Some(step),
            _ => None,
        }
    }
}

impl StepError {
    /// Create an invalid field error
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a generic failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl From<&str> for StepError {
    fn from(s: &str) -> Self {
        Self::Failed(s.to_string())
    }
}

impl From<String> for StepError {
    fn from(s: String) -> Self {
        Self::Failed(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_error_wraps_into_graph_error() {
        let err: GraphError = ConfigError::DuplicateStep("planner".to_string()).into();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("planner"));
    }

    #[test]
    fn test_routing_error_names_step_and_label() {
        let err = GraphError::routing("orchestrator", "worker_9");
        assert_eq!(err.step_name(), Some("orchestrator"));
        assert!(err.to_string().contains("worker_9"));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_step_error_keeps_snapshot() {
        let err = GraphError::step(
            "worker_1",
            StepError::MissingField("current_task".to_string()),
            json!({"main_query": "q"}),
        );
        match &err {
            GraphError::StepExecution { snapshot, .. } => {
                assert_eq!(snapshot["main_query"], "q");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.step_name(), Some("worker_1"));
        assert!(err.to_string().contains("current_task"));
    }

    #[test]
    fn test_step_error_from_str() {
        let err: StepError = "boom".into();
        assert_eq!(err.to_string(), "boom");
    }
}
