// SPDX-License-Identifier: MIT

//! Graph registry: steps plus the edges connecting them

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::compiler;
use super::executor::CompiledGraph;
use super::types::{ConditionalEdge, Edge, END, START};
use crate::fanout::workflow::state::StateSchema;
use crate::sdk::error::{ConfigError, GraphError};
use crate::sdk::router::Router;
use crate::sdk::step::Step;

/// Mutable graph under construction
///
/// ```rust,ignore
/// let mut graph = StateGraph::new("pipeline");
/// graph
///     .add_step("planner", planner)?
///     .add_step("synthesizer", synthesizer)?
///     .add_edge(START, "planner")?
///     .add_edge("planner", "synthesizer")?
///     .add_edge("synthesizer", END)?;
/// let app = graph.compile()?;
/// ```
pub struct StateGraph {
    pub(super) name: String,
    pub(super) description: String,
    pub(super) schema: StateSchema,
    pub(super) steps: HashMap<String, Arc<dyn Step>>,
    /// Registration order, used wherever output must be deterministic
    pub(super) step_order: Vec<String>,
    /// Outgoing edge per source, `START` included
    pub(super) edges: BTreeMap<String, Edge>,
}

impl StateGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            schema: StateSchema::default(),
            steps: HashMap::new(),
            step_order: Vec::new(),
            edges: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare field types and reducers
    pub fn with_schema(mut self, schema: StateSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Register a step under a unique name
    pub fn add_step(
        &mut self,
        name: impl Into<String>,
        step: impl Step + 'static,
    ) -> Result<&mut Self, GraphError> {
        self.add_shared_step(name, Arc::new(step))
    }

    /// Register a step that may be shared with other graphs
    pub fn add_shared_step(
        &mut self,
        name: impl Into<String>,
        step: Arc<dyn Step>,
    ) -> Result<&mut Self, GraphError> {
        let name = name.into();
        if name == START || name == END {
            return Err(ConfigError::ReservedName(name).into());
        }
        if self.steps.contains_key(&name) {
            return Err(ConfigError::DuplicateStep(name).into());
        }
        self.steps.insert(name.clone(), step);
        self.step_order.push(name);
        Ok(self)
    }

    /// Add a static edge; `from` may be `START` and `to` may be `END`
    pub fn add_edge(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Result<&mut Self, GraphError> {
        let (from, to) = (from.into(), to.into());
        self.check_source(&from, &to)?;
        self.check_target(&to)?;
        self.edges.insert(from, Edge::Static(to));
        Ok(self)
    }

    /// Add a router-driven edge with its label → target table
    pub fn add_conditional_edge<I, K, V>(
        &mut self,
        from: impl Into<String>,
        router: impl Router + 'static,
        routes: I,
    ) -> Result<&mut Self, GraphError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let routes = routes
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.add_shared_conditional_edge(from, Arc::new(router), routes)
    }

    /// Same as `add_conditional_edge` for a router held in an `Arc`
    pub fn add_shared_conditional_edge(
        &mut self,
        from: impl Into<String>,
        router: Arc<dyn Router>,
        routes: BTreeMap<String, String>,
    ) -> Result<&mut Self, GraphError> {
        let from = from.into();
        let first_target = routes.values().next().cloned().unwrap_or_default();
        self.check_source(&from, &first_target)?;
        for target in routes.values() {
            self.check_target(target)?;
        }
        self.edges.insert(
            from,
            Edge::Conditional(ConditionalEdge {
                router,
                routes,
                join: None,
            }),
        );
        Ok(self)
    }

    /// Validate the graph and turn it into something runnable
    pub fn compile(self) -> Result<CompiledGraph, GraphError> {
        compiler::compile(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_step(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    fn check_source(&self, from: &str, to: &str) -> Result<(), GraphError> {
        if from == END {
            return Err(ConfigError::EdgeFromEnd(to.to_string()).into());
        }
        if from != START && !self.steps.contains_key(from) {
            return Err(ConfigError::UnknownStep(from.to_string()).into());
        }
        if self.edges.contains_key(from) {
            return Err(ConfigError::DuplicateEdge(from.to_string()).into());
        }
        Ok(())
    }

    fn check_target(&self, to: &str) -> Result<(), GraphError> {
        if to == START {
            return Err(ConfigError::ReservedName(to.to_string()).into());
        }
        if to != END && !self.steps.contains_key(to) {
            return Err(ConfigError::UnknownStep(to.to_string()).into());
        }
        Ok(())
    }
}
