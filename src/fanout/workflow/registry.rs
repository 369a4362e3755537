// SPDX-License-Identifier: MIT

//! Named step and router implementations for declarative workflows

use crate::sdk::router::Router;
use crate::sdk::step::Step;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct StepRegistry {
    steps: Arc<RwLock<HashMap<String, Arc<dyn Step>>>>,
    routers: Arc<RwLock<HashMap<String, Arc<dyn Router>>>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self {
            steps: Arc::new(RwLock::new(HashMap::new())),
            routers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register(&self, name: impl Into<String>, step: Arc<dyn Step>) {
        let mut steps = self.steps.write().await;
        steps.insert(name.into(), step);
    }

    pub async fn register_router(&self, name: impl Into<String>, router: Arc<dyn Router>) {
        let mut routers = self.routers.write().await;
        routers.insert(name.into(), router);
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Step>> {
        let steps = self.steps.read().await;
        steps.get(name).cloned()
    }

    pub async fn get_router(&self, name: &str) -> Option<Arc<dyn Router>> {
        let routers = self.routers.read().await;
        routers.get(name).cloned()
    }

    /// Registered step names, sorted
    pub async fn step_names(&self) -> Vec<String> {
        let steps = self.steps.read().await;
        let mut names: Vec<String> = steps.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::new()
    }
}
