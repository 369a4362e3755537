// SPDX-License-Identifier: MIT

//! Workflow definition types
//!
//! These mirror the YAML workflow format:
//!
//! ```yaml
//! name: orchestrator-workers
//! state:
//!   completed_tasks: { type: array, reducer: append }
//! steps:
//!   - id: planner
//! edges:
//!   - { from: START, to: planner }
//! routes:
//!   - from: orchestrator
//!     router:
//!       fan_out: { over: orchestrated_tasks, label: agent_name, payload_key: current_task }
//!     targets: { worker_1: worker_1 }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::fanout::workflow::state::StateSchema;

/// Root workflow definition
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct WorkflowDefinition {
    /// Name of the workflow
    pub name: String,
    /// Description of the workflow
    #[serde(default)]
    pub description: String,
    /// Field types and reducers
    #[serde(default)]
    pub state: StateSchema,
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
    #[serde(default)]
    pub edges: Vec<EdgeDefinition>,
    #[serde(default)]
    pub routes: Vec<RouteDefinition>,
}

/// A step in the graph
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StepDefinition {
    /// Unique identifier for this step
    pub id: String,
    /// Registry name of the implementation, defaults to `id`
    #[serde(default)]
    pub uses: Option<String>,
}

impl StepDefinition {
    pub fn implementation(&self) -> &str {
        self.uses.as_deref().unwrap_or(&self.id)
    }
}

/// A static edge
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EdgeDefinition {
    pub from: String,
    pub to: String,
}

/// A router-driven edge
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteDefinition {
    pub from: String,
    /// Written as a single-key map, e.g. `router: { uses: assign_tasks }`
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub router: RouterDefinition,
    /// Routing label → target step
    pub targets: BTreeMap<String, String>,
}

/// How the router of a route is built
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterDefinition {
    /// One dispatch per item of a list field
    FanOut(FanOutDefinition),
    /// Ordered `when` rules
    Branches(BranchesDefinition),
    /// Router registered under this name
    Uses(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FanOutDefinition {
    /// List field to iterate
    pub over: String,
    /// Item field holding the routing label
    pub label: String,
    /// Key the item is passed to the child under
    pub payload_key: String,
    /// Item fields to pass, all when omitted
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BranchesDefinition {
    #[serde(default)]
    pub rules: Vec<BranchRule>,
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BranchRule {
    pub when: String,
    pub label: String,
}
