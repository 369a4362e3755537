//! Planner, orchestrator, workers and synthesizer

use async_trait::async_trait;
use std::sync::Arc;

use super::classifier::TaskClassifier;
use super::types::{CompletedTask, SynthesizedOutput, Task};
use crate::fanout::workflow::graph::END;
use crate::sdk::error::StepError;
use crate::sdk::state::{StateUpdate, StateView};
use crate::sdk::step::Step;

/// Splits the query into tasks
pub struct Planner;

#[async_trait]
impl Step for Planner {
    async fn run(&self, view: StateView) -> Result<StateUpdate, StepError> {
        let query: String = view.require("main_query")?;
        log::debug!("Planning tasks for query: {}", query);
        let tasks = vec![Task::new("Task 1"), Task::new("Task 2")];
        StateUpdate::new().with("planned_task", tasks)
    }
}

/// Labels every planned task with the worker that should handle it
pub struct Orchestrator {
    classifier: Arc<dyn TaskClassifier>,
}

impl Orchestrator {
    pub fn new(classifier: Arc<dyn TaskClassifier>) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl Step for Orchestrator {
    async fn run(&self, view: StateView) -> Result<StateUpdate, StepError> {
        let planned: Vec<Task> = view.optional("planned_task")?.unwrap_or_default();
        let tasks: Vec<Task> = planned
            .into_iter()
            .map(|mut task| {
                let label = task
                    .description
                    .as_deref()
                    .and_then(|d| self.classifier.classify(d))
                    .unwrap_or_else(|| END.to_string());
                task.agent_name = Some(label);
                task
            })
            .collect();
        StateUpdate::new().with("orchestrated_tasks", tasks)
    }
}

/// Completes the task it was dispatched with
pub struct Worker {
    name: String,
}

impl Worker {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Step for Worker {
    async fn run(&self, view: StateView) -> Result<StateUpdate, StepError> {
        let task: Task = view.require("current_task")?;
        log::info!(
            "{} working on: {}",
            self.name,
            task.description.as_deref().unwrap_or("<no description>")
        );
        let done = CompletedTask {
            description: task.description.map(|d| format!("{} created", d)),
            completed: true,
        };
        StateUpdate::new().with("completed_tasks", vec![done])
    }
}

/// Combines completed tasks into the final output
pub struct Synthesizer;

#[async_trait]
impl Step for Synthesizer {
    async fn run(&self, view: StateView) -> Result<StateUpdate, StepError> {
        let completed: Vec<CompletedTask> = view.optional("completed_tasks")?.unwrap_or_default();
        let output = SynthesizedOutput {
            description: combine(&completed),
            synthesized: true,
        };
        StateUpdate::new().with("final_output", output)
    }
}

/// "Task 1 created" + "Task 2 created" -> "Task 1 and Task 2 created"
fn combine(completed: &[CompletedTask]) -> Option<String> {
    let descriptions: Vec<&str> = completed
        .iter()
        .filter_map(|t| t.description.as_deref())
        .collect();
    if descriptions.is_empty() {
        return None;
    }

    let stems: Option<Vec<&str>> = descriptions
        .iter()
        .map(|d| d.strip_suffix(" created"))
        .collect();
    Some(match stems {
        Some(stems) => format!("{} created", stems.join(" and ")),
        None => descriptions.join(" and "),
    })
}
