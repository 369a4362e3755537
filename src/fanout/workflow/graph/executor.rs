//! Graph workflow executor

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::{RunEvent, RunReport};
use super::types::{Edge, END, START};
use crate::fanout::workflow::config::RunConfig;
use crate::fanout::workflow::state::{StateSchema, WorkflowState};
use crate::sdk::error::{ConfigError, GraphError, StepError};
use crate::sdk::router::Route;
use crate::sdk::state::{StateUpdate, StateView};
use crate::sdk::step::Step;

/// Validated graph ready for execution
///
/// A compiled graph holds no per-run data, so it can serve any number of
/// runs, concurrently or one after another.
pub struct CompiledGraph {
    pub(super) name: String,
    pub(super) description: String,
    pub(super) schema: StateSchema,
    pub(super) steps: HashMap<String, Arc<dyn Step>>,
    pub(super) step_order: Vec<String>,
    pub(super) edges: BTreeMap<String, Edge>,
    pub(super) config: RunConfig,
}

/// Where execution continues after a step
enum Next {
    Step(String),
    FanOut { children: Vec<Child>, join: String },
}

/// One resolved dispatch request
struct Child {
    step: String,
    payload: StateUpdate,
}

/// Per-run identity and optional event sink
struct RunContext {
    run_id: Uuid,
    events: Option<mpsc::Sender<RunEvent>>,
}

impl RunContext {
    async fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}

impl CompiledGraph {
    /// Replace the run limits
    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    /// Step names in registration order
    pub fn step_names(&self) -> &[String] {
        &self.step_order
    }

    /// Outgoing edge of a step (or of `START`)
    pub fn edge(&self, from: &str) -> Option<&Edge> {
        self.edges.get(from)
    }

    /// Run from the start marker to the end marker and return the final state
    pub async fn invoke(&self, initial: StateUpdate) -> Result<WorkflowState, GraphError> {
        Ok(self.execute(initial, None).await?.state)
    }

    /// Same as `invoke`, returning the run metadata alongside the state
    pub async fn run(&self, initial: StateUpdate) -> Result<RunReport, GraphError> {
        self.execute(initial, None).await
    }

    /// Run while reporting progress on `tx`; a closed receiver does not stop the run
    ///
    /// Events are sent with backpressure: a run stalls while the channel is
    /// full. Drain the receiver concurrently (e.g. `tokio::join!` or a spawned
    /// task), or give the channel room for every event of the run.
    pub async fn invoke_with_events(
        &self,
        initial: StateUpdate,
        tx: mpsc::Sender<RunEvent>,
    ) -> Result<RunReport, GraphError> {
        self.execute(initial, Some(tx)).await
    }

    async fn execute(
        &self,
        initial: StateUpdate,
        events: Option<mpsc::Sender<RunEvent>>,
    ) -> Result<RunReport, GraphError> {
        let ctx = RunContext {
            run_id: Uuid::new_v4(),
            events,
        };
        let started_at = Utc::now();
        let mut state = WorkflowState::with_initial(&self.schema, initial)?;
        let mut trace = Vec::new();
        let mut executed = 0usize;
        let mut current = START.to_string();

        log::info!("[{}] Starting graph '{}'", ctx.run_id, self.name);

        while current != END {
            if current != START {
                if executed >= self.config.max_steps {
                    log::error!(
                        "[{}] Graph '{}' reached max steps ({})",
                        ctx.run_id,
                        self.name,
                        self.config.max_steps
                    );
                    return Err(GraphError::StepLimitExceeded {
                        limit: self.config.max_steps,
                    });
                }
                executed += 1;
                self.run_step(&ctx, &current, &mut state).await?;
                trace.push(current.clone());
            }

            current = match self.advance(&current, &state)? {
                Next::Step(next) => next,
                Next::FanOut { children, join } => {
                    let ran = self
                        .fan_out(&ctx, &current, children, &join, &mut state)
                        .await?;
                    trace.extend(ran);
                    join
                }
            };
        }

        log::info!(
            "[{}] Graph '{}' finished after {} steps",
            ctx.run_id,
            self.name,
            executed
        );
        ctx.emit(RunEvent::Finished { run_id: ctx.run_id }).await;

        Ok(RunReport {
            run_id: ctx.run_id,
            started_at,
            finished_at: Utc::now(),
            steps_executed: executed,
            trace,
            state,
        })
    }

    /// Run one step on the coordinator and merge its update
    async fn run_step(
        &self,
        ctx: &RunContext,
        name: &str,
        state: &mut WorkflowState,
    ) -> Result<(), GraphError> {
        let step = self.step(name)?;
        log::info!("[{}] Executing step: {}", ctx.run_id, name);
        ctx.emit(RunEvent::StepStarted {
            step: name.to_string(),
        })
        .await;

        // An update that does not fit the schema fails the step before anything merges
        let result = spawn_step(step, state.snapshot())
            .await
            .and_then(|update| state.validate(&update).map(|()| update));
        match result {
            Ok(update) => {
                ctx.emit(RunEvent::StepCompleted {
                    step: name.to_string(),
                    update: update.to_json(),
                })
                .await;
                state.apply(update)
            }
            Err(e) => {
                log::error!("[{}] Step {} failed: {}", ctx.run_id, name, e);
                ctx.emit(RunEvent::StepFailed {
                    step: name.to_string(),
                    error: e.to_string(),
                })
                .await;
                Err(GraphError::step(name, e, state.to_json()))
            }
        }
    }

    /// Follow the outgoing edge of `current`
    ///
    /// Every dispatch request is resolved before anything is spawned, so an
    /// unknown label aborts the run with no child having started.
    fn advance(&self, current: &str, state: &WorkflowState) -> Result<Next, GraphError> {
        let edge = self
            .edges
            .get(current)
            .ok_or_else(|| ConfigError::DeadEnd(current.to_string()))?;

        let cond = match edge {
            Edge::Static(next) => return Ok(Next::Step(next.clone())),
            Edge::Conditional(cond) => cond,
        };

        let route = cond
            .router
            .route(&state.snapshot())
            .map_err(|e| GraphError::step(current, e, state.to_json()))?;

        match route {
            Route::Label(label) => match cond.routes.get(&label) {
                Some(next) => Ok(Next::Step(next.clone())),
                None => Err(GraphError::routing(current, label)),
            },
            Route::Dispatch(requests) => {
                let Some(join) = &cond.join else {
                    return Err(GraphError::step(
                        current,
                        StepError::failed("router returned dispatch requests but does not fan out"),
                        state.to_json(),
                    ));
                };

                let mut children = Vec::with_capacity(requests.len());
                for request in requests {
                    let Some(target) = cond.routes.get(&request.target) else {
                        return Err(GraphError::routing(current, request.target));
                    };
                    if target == END {
                        log::debug!("Dispatch to '{}' resolves to END, skipping", request.target);
                        continue;
                    }
                    children.push(Child {
                        step: target.clone(),
                        payload: request.payload,
                    });
                }
                Ok(Next::FanOut {
                    children,
                    join: join.clone(),
                })
            }
        }
    }

    /// Run children concurrently, wait for all of them, merge in dispatch order
    async fn fan_out(
        &self,
        ctx: &RunContext,
        from: &str,
        children: Vec<Child>,
        join: &str,
        state: &mut WorkflowState,
    ) -> Result<Vec<String>, GraphError> {
        let targets: Vec<String> = children.iter().map(|c| c.step.clone()).collect();
        log::info!(
            "[{}] Step {} dispatching {} tasks",
            ctx.run_id,
            from,
            targets.len()
        );
        ctx.emit(RunEvent::FanOut {
            from: from.to_string(),
            targets: targets.clone(),
        })
        .await;

        let mut jobs = Vec::with_capacity(children.len());
        for child in children {
            let step = self.step(&child.step)?;
            log::info!("[{}] Executing step: {}", ctx.run_id, child.step);
            ctx.emit(RunEvent::StepStarted {
                step: child.step.clone(),
            })
            .await;
            jobs.push(async move {
                let result = spawn_step(step, child.payload.into_view()).await;
                (child.step, result)
            });
        }

        // `buffered` yields results in dispatch order whatever the completion order
        let limit = self.config.max_concurrency.unwrap_or(jobs.len()).max(1);
        let results: Vec<(String, Result<StateUpdate, StepError>)> =
            stream::iter(jobs).buffered(limit).collect().await;

        let mut updates = Vec::with_capacity(results.len());
        let mut failure = None;
        for (step, result) in results {
            match result.and_then(|update| state.validate(&update).map(|()| update)) {
                Ok(update) => {
                    ctx.emit(RunEvent::StepCompleted {
                        step: step.clone(),
                        update: update.to_json(),
                    })
                    .await;
                    updates.push((step, update));
                }
                Err(e) => {
                    log::error!("[{}] Step {} failed: {}", ctx.run_id, step, e);
                    ctx.emit(RunEvent::StepFailed {
                        step: step.clone(),
                        error: e.to_string(),
                    })
                    .await;
                    if failure.is_none() {
                        failure = Some((step, e));
                    }
                }
            }
        }

        if let Some((step, e)) = failure {
            return Err(GraphError::step(step, e, state.to_json()));
        }

        if let Err(e) = state.merge_siblings(updates) {
            log::error!("[{}] Join at {} failed: {}", ctx.run_id, join, e);
            return Err(e);
        }
        ctx.emit(RunEvent::Joined {
            join: join.to_string(),
            children: targets.len(),
        })
        .await;

        Ok(targets)
    }

    fn step(&self, name: &str) -> Result<Arc<dyn Step>, GraphError> {
        self.steps
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownStep(name.to_string()).into())
    }
}

/// Run a step on its own task so a panic surfaces as a step error
async fn spawn_step(step: Arc<dyn Step>, view: StateView) -> Result<StateUpdate, StepError> {
    match tokio::spawn(async move { step.run(view).await }).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => {
            let payload = e.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(StepError::Panicked(message))
        }
        Err(e) => Err(StepError::failed(e.to_string())),
    }
}
