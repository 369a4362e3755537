// SPDX-License-Identifier: MIT

//! Run progress events and the run report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fanout::workflow::state::WorkflowState;

/// Progress notifications emitted while a graph runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunEvent {
    StepStarted {
        step: String,
    },
    StepCompleted {
        step: String,
        update: serde_json::Value,
    },
    StepFailed {
        step: String,
        error: String,
    },
    /// A router dispatched children, in dispatch order
    FanOut {
        from: String,
        targets: Vec<String>,
    },
    /// All children of a fan-out finished and were merged
    Joined {
        join: String,
        children: usize,
    },
    Finished {
        run_id: Uuid,
    },
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Steps run by the coordinator; fan-out children are not counted
    pub steps_executed: usize,
    /// Every step that ran, children included, in merge order
    pub trace: Vec<String>,
    pub state: WorkflowState,
}

impl RunReport {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Summary plus final state as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "run_id": self.run_id,
            "started_at": self.started_at,
            "finished_at": self.finished_at,
            "steps_executed": self.steps_executed,
            "trace": self.trace,
            "state": self.state.to_json(),
        })
    }
}
