// SPDX-License-Identifier: MIT

//! Built-in orchestrator/worker steps
//!
//! A planner splits the query into tasks, the orchestrator labels each task
//! with a worker, `assign_tasks` fans the labelled tasks out to the workers,
//! and the synthesizer combines what they completed.

mod classifier;
mod orchestrator;
mod types;

pub use classifier::{KeywordClassifier, TaskClassifier};
pub use orchestrator::{Orchestrator, Planner, Synthesizer, Worker};
pub use types::{CompletedTask, SynthesizedOutput, Task};

use once_cell::sync::Lazy;
use serde_json::json;
use std::sync::Arc;

use crate::fanout::workflow::graph::{CompiledGraph, StateGraph, END, START};
use crate::fanout::workflow::registry::StepRegistry;
use crate::fanout::workflow::routers::FanOutRouter;
use crate::fanout::workflow::state::{FieldType, StateFieldDef, StateSchema};
use crate::sdk::error::GraphError;

/// State of the orchestrator/worker graph
pub static ORCHESTRATOR_SCHEMA: Lazy<StateSchema> = Lazy::new(|| {
    StateSchema::new()
        .field("main_query", StateFieldDef::new(FieldType::String))
        .field(
            "planned_task",
            StateFieldDef::new(FieldType::Array).with_default(json!([])),
        )
        .field(
            "orchestrated_tasks",
            StateFieldDef::new(FieldType::Array).with_default(json!([])),
        )
        .field("completed_tasks", StateFieldDef::append())
        .field("final_output", StateFieldDef::new(FieldType::Object))
});

/// Dispatches each orchestrated task to the worker named by its label
pub fn assign_tasks(workers: &[String]) -> FanOutRouter {
    FanOutRouter::new("orchestrated_tasks", "agent_name", "current_task")
        .with_fields(["description"])
        .with_targets(workers)
}

/// planner -> orchestrator -> (worker per label) -> synthesizer
pub fn orchestrator_workers_graph(
    classifier: Arc<dyn TaskClassifier>,
) -> Result<CompiledGraph, GraphError> {
    let workers = classifier.labels();
    let mut graph = StateGraph::new("orchestrator-workers")
        .with_description("Plan tasks, run them on workers in parallel, synthesize the results")
        .with_schema(ORCHESTRATOR_SCHEMA.clone());

    graph
        .add_step("planner", Planner)?
        .add_step("orchestrator", Orchestrator::new(classifier))?;
    for worker in &workers {
        graph.add_step(worker, Worker::new(worker))?;
    }
    graph.add_step("synthesizer", Synthesizer)?;

    graph
        .add_edge(START, "planner")?
        .add_edge("planner", "orchestrator")?
        .add_conditional_edge(
            "orchestrator",
            assign_tasks(&workers),
            workers.iter().map(|w| (w.clone(), w.clone())),
        )?;
    for worker in &workers {
        graph.add_edge(worker, "synthesizer")?;
    }
    graph.add_edge("synthesizer", END)?;

    graph.compile()
}

/// Make the built-in steps available to workflow files
///
/// Registers `planner`, `orchestrator`, `synthesizer`, one step per worker
/// label of the default classifier, and the `assign_tasks` router.
pub async fn register_builtin_steps(registry: &StepRegistry) {
    let classifier = Arc::new(KeywordClassifier::default());
    let workers = classifier.labels();

    registry.register("planner", Arc::new(Planner)).await;
    registry
        .register("orchestrator", Arc::new(Orchestrator::new(classifier)))
        .await;
    for worker in &workers {
        registry
            .register(worker.clone(), Arc::new(Worker::new(worker)))
            .await;
    }
    registry.register("synthesizer", Arc::new(Synthesizer)).await;
    registry
        .register_router("assign_tasks", Arc::new(assign_tasks(&workers)))
        .await;
}
