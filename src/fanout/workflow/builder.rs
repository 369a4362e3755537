// SPDX-License-Identifier: MIT

//! Workflow builder - turns workflow definitions into compiled graphs

use std::path::Path;
use std::sync::Arc;

use crate::fanout::workflow::graph::{normalize_marker, CompiledGraph, StateGraph};
use crate::fanout::workflow::loader::WorkflowLoader;
use crate::fanout::workflow::registry::StepRegistry;
use crate::fanout::workflow::routers::{ConditionRouter, FanOutRouter};
use crate::fanout::workflow::types::{RouteDefinition, RouterDefinition, WorkflowDefinition};
use crate::sdk::error::{ConfigError, GraphError};
use crate::sdk::router::Router;

/// High-level builder for constructing graphs from YAML definitions
pub struct Builder {
    loader: WorkflowLoader,
    registry: StepRegistry,
}

impl Builder {
    pub fn new(registry: StepRegistry) -> Self {
        Self {
            loader: WorkflowLoader::new(),
            registry,
        }
    }

    /// Build a graph from a YAML file path
    pub async fn build_from_file<P: AsRef<Path>>(&self, path: P) -> Result<CompiledGraph, GraphError> {
        let def = self.loader.load_workflow(path)?;
        self.build(&def).await
    }

    /// Build a graph from a YAML string
    pub async fn build_from_yaml(&self, content: &str) -> Result<CompiledGraph, GraphError> {
        let def = WorkflowLoader::parse_yaml(content)?;
        self.build(&def).await
    }

    /// Build a graph from a parsed definition
    pub async fn build(&self, def: &WorkflowDefinition) -> Result<CompiledGraph, GraphError> {
        let mut graph = StateGraph::new(&def.name)
            .with_description(&def.description)
            .with_schema(def.state.clone());

        for step_def in &def.steps {
            let step = self
                .registry
                .get(step_def.implementation())
                .await
                .ok_or_else(|| ConfigError::UnknownImplementation(step_def.implementation().to_string()))?;
            graph.add_shared_step(&step_def.id, step)?;
        }

        for edge in &def.edges {
            graph.add_edge(normalize_marker(&edge.from), normalize_marker(&edge.to))?;
        }

        for route in &def.routes {
            let router = self.build_router(route).await?;
            let targets = route
                .targets
                .iter()
                .map(|(label, to)| (label.clone(), normalize_marker(to).to_string()))
                .collect();
            graph.add_shared_conditional_edge(normalize_marker(&route.from), router, targets)?;
        }

        log::info!(
            "Built graph '{}' with {} steps",
            def.name,
            def.steps.len()
        );

        graph.compile()
    }

    async fn build_router(&self, route: &RouteDefinition) -> Result<Arc<dyn Router>, GraphError> {
        let router: Arc<dyn Router> = match &route.router {
            RouterDefinition::FanOut(f) => {
                let mut router = FanOutRouter::new(&f.over, &f.label, &f.payload_key)
                    .with_targets(route.targets.keys());
                if let Some(fields) = &f.fields {
                    router = router.with_fields(fields);
                }
                Arc::new(router)
            }
            RouterDefinition::Branches(b) => {
                let mut router = ConditionRouter::new();
                for rule in &b.rules {
                    router = router.when(&rule.when, &rule.label)?;
                }
                if let Some(default) = &b.default {
                    router = router.otherwise(default);
                }
                Arc::new(router)
            }
            RouterDefinition::Uses(name) => self
                .registry
                .get_router(name)
                .await
                .ok_or_else(|| ConfigError::UnknownImplementation(name.clone()))?,
        };
        Ok(router)
    }
}
