// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

/// A unit of planned work
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Worker label assigned by the orchestrator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
}

impl Task {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            agent_name: None,
        }
    }
}

/// Result a worker appends to `completed_tasks`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletedTask {
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

/// Combined result written to `final_output`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedOutput {
    pub description: Option<String>,
    #[serde(default)]
    pub synthesized: bool,
}
