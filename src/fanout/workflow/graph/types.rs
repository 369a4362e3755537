//! Graph type definitions

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::sdk::router::Router;

/// Start marker; its outgoing edge selects the entry step
pub const START: &str = "__start__";
/// End marker; reaching it completes the run
pub const END: &str = "__end__";

/// Map the `START`/`END` aliases used in workflow files to the markers
pub fn normalize_marker(name: &str) -> &str {
    match name {
        "START" => START,
        "END" => END,
        other => other,
    }
}

/// Outgoing edge of a step
#[derive(Clone)]
pub enum Edge {
    /// Always continue with this step
    Static(String),
    /// Let a router decide
    Conditional(ConditionalEdge),
}

/// Router plus its label → target table
#[derive(Clone)]
pub struct ConditionalEdge {
    pub router: Arc<dyn Router>,
    pub routes: BTreeMap<String, String>,
    /// Step all fan-out children converge on, filled in by `compile()`
    pub join: Option<String>,
}

impl Edge {
    /// Steps this edge can lead to, join target included
    pub fn successors(&self) -> Vec<&str> {
        match self {
            Edge::Static(to) => vec![to.as_str()],
            Edge::Conditional(edge) => {
                let mut targets: Vec<&str> = edge.routes.values().map(String::as_str).collect();
                if let Some(join) = &edge.join {
                    targets.push(join.as_str());
                }
                targets
            }
        }
    }

    pub fn as_static(&self) -> Option<&str> {
        match self {
            Edge::Static(to) => Some(to),
            Edge::Conditional(_) => None,
        }
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Static(to) => f.debug_tuple("Static").field(to).finish(),
            Edge::Conditional(edge) => f
                .debug_struct("Conditional")
                .field("routes", &edge.routes)
                .field("join", &edge.join)
                .field("fans_out", &edge.router.fans_out())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::workflow::routers::FnRouter;
    use crate::sdk::router::Route;

    #[test]
    fn test_normalize_marker() {
        assert_eq!(normalize_marker("START"), START);
        assert_eq!(normalize_marker("END"), END);
        assert_eq!(normalize_marker("planner"), "planner");
    }

    #[test]
    fn test_successors_include_join() {
        let edge = Edge::Conditional(ConditionalEdge {
            router: Arc::new(FnRouter::fan_out(|_| Ok(Route::Dispatch(vec![])))),
            routes: [("w1".to_string(), "worker_1".to_string())].into_iter().collect(),
            join: Some("synthesizer".to_string()),
        });
        assert_eq!(edge.successors(), vec!["worker_1", "synthesizer"]);
        assert!(edge.as_static().is_none());
        assert!(format!("{:?}", edge).contains("fans_out: true"));
    }
}
