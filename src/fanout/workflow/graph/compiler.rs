//! Graph validation and compilation

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use super::executor::CompiledGraph;
use super::state_graph::StateGraph;
use super::types::{Edge, END, START};
use crate::fanout::workflow::config::RunConfig;
use crate::sdk::error::{ConfigError, GraphError};

/// Validate a graph and produce its executable form
///
/// Checks, in order: schema, entry edge, router label sets, fan-out joins,
/// reachability from the entry, static cycles, and a path to the end marker
/// from every reachable step.
pub(super) fn compile(mut graph: StateGraph) -> Result<CompiledGraph, GraphError> {
    graph.schema.validate()?;

    if !graph.edges.contains_key(START) {
        return Err(ConfigError::MissingEntry.into());
    }

    check_labels(&graph)?;
    resolve_joins(&mut graph)?;

    let reachable = reachable_from_start(&graph);
    if let Some(step) = graph.step_order.iter().find(|s| !reachable.contains(s.as_str())) {
        return Err(ConfigError::Unreachable(step.clone()).into());
    }

    if let Some(cycle) = find_static_cycle(&graph) {
        return Err(ConfigError::Cycle(cycle).into());
    }

    let finishing = reaching_end(&graph);
    if let Some(step) = graph.step_order.iter().find(|s| !finishing.contains(s.as_str())) {
        return Err(ConfigError::DeadEnd(step.clone()).into());
    }

    log::debug!(
        "Compiled graph '{}' with {} steps",
        graph.name,
        graph.step_order.len()
    );

    Ok(CompiledGraph {
        name: graph.name,
        description: graph.description,
        schema: graph.schema,
        steps: graph.steps,
        step_order: graph.step_order,
        edges: graph.edges,
        config: RunConfig::default(),
    })
}

/// Every label a router declares must be mapped to a target
fn check_labels(graph: &StateGraph) -> Result<(), ConfigError> {
    for (from, edge) in &graph.edges {
        let Edge::Conditional(cond) = edge else {
            continue;
        };
        if let Some(labels) = cond.router.labels() {
            if let Some(label) = labels.iter().find(|l| !cond.routes.contains_key(*l)) {
                return Err(ConfigError::UnmappedLabel {
                    step: from.clone(),
                    label: label.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Find the single static successor shared by all targets of each fan-out
fn resolve_joins(graph: &mut StateGraph) -> Result<(), ConfigError> {
    let mut joins = Vec::new();
    for (from, edge) in &graph.edges {
        let Edge::Conditional(cond) = edge else {
            continue;
        };
        if !cond.router.fans_out() {
            continue;
        }

        let mut successors = BTreeSet::new();
        let mut unjoined = false;
        for target in cond.routes.values().filter(|t| t.as_str() != END) {
            match graph.edges.get(target).and_then(Edge::as_static) {
                Some(next) => {
                    successors.insert(next.to_string());
                }
                None => unjoined = true,
            }
        }

        let mut successors: Vec<String> = successors.into_iter().collect();
        if unjoined || successors.len() != 1 {
            return Err(ConfigError::AmbiguousJoin {
                step: from.clone(),
                successors,
            });
        }
        joins.push((from.clone(), successors.remove(0)));
    }

    for (from, join) in joins {
        if let Some(Edge::Conditional(cond)) = graph.edges.get_mut(&from) {
            cond.join = Some(join);
        }
    }
    Ok(())
}

fn reachable_from_start(graph: &StateGraph) -> HashSet<&str> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::from([START]);
    while let Some(node) = queue.pop_front() {
        if !seen.insert(node) {
            continue;
        }
        if let Some(edge) = graph.edges.get(node) {
            queue.extend(edge.successors());
        }
    }
    seen
}

/// Steps with a path to the end marker
fn reaching_end(graph: &StateGraph) -> HashSet<&str> {
    let mut incoming: HashMap<&str, Vec<&str>> = HashMap::new();
    for (from, edge) in &graph.edges {
        for to in edge.successors() {
            incoming.entry(to).or_default().push(from.as_str());
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::from([END]);
    while let Some(node) = queue.pop_front() {
        if !seen.insert(node) {
            continue;
        }
        if let Some(preds) = incoming.get(node) {
            queue.extend(preds.iter().copied());
        }
    }
    seen
}

/// A loop made only of static edges can never terminate
///
/// Each step has at most one outgoing edge, so following static edges from
/// any step either leaves the static subgraph or revisits a step.
fn find_static_cycle(graph: &StateGraph) -> Option<Vec<String>> {
    let mut cleared: HashSet<&str> = HashSet::new();

    for start in &graph.step_order {
        let mut path: Vec<&str> = Vec::new();
        let mut on_path: HashSet<&str> = HashSet::new();
        let mut current = start.as_str();

        loop {
            if cleared.contains(current) {
                break;
            }
            if !on_path.insert(current) {
                let from = path.iter().position(|s| *s == current).unwrap_or(0);
                let mut cycle: Vec<String> = path[from..].iter().map(|s| s.to_string()).collect();
                cycle.push(current.to_string());
                return Some(cycle);
            }
            path.push(current);
            match graph.edges.get(current).and_then(Edge::as_static) {
                Some(next) if next != END => current = next,
                _ => break,
            }
        }
        cleared.extend(path);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::workflow::routers::{FanOutRouter, FnRouter};
    use crate::fanout::workflow::state::{FieldType, StateFieldDef, StateSchema};
    use crate::sdk::router::Route;
    use crate::sdk::state::StateUpdate;
    use crate::sdk::step::FnStep;

    fn noop() -> FnStep {
        FnStep::sync(|_| Ok(StateUpdate::new()))
    }

    fn graph_with(steps: &[&str]) -> StateGraph {
        let mut graph = StateGraph::new("test");
        for step in steps {
            graph.add_step(*step, noop()).unwrap();
        }
        graph
    }

    fn compile_err(graph: StateGraph) -> ConfigError {
        match graph.compile() {
            Err(GraphError::Config(e)) => e,
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected compile to fail"),
        }
    }

    /// orchestrator -(fan out)-> worker_1|worker_2 -> synthesizer
    ///
    /// `worker_2_next` is registered with an edge to END when it is not one
    /// of the fixture's steps.
    fn fan_out_graph(worker_2_next: &str) -> StateGraph {
        let mut graph = graph_with(&["orchestrator", "worker_1", "worker_2", "synthesizer"]);
        if worker_2_next != END && !graph.has_step(worker_2_next) {
            graph.add_step(worker_2_next, noop()).unwrap();
            graph.add_edge(worker_2_next, END).unwrap();
        }
        graph.add_edge(START, "orchestrator").unwrap();
        graph
            .add_conditional_edge(
                "orchestrator",
                FanOutRouter::new("tasks", "agent", "task"),
                [("worker_1", "worker_1"), ("worker_2", "worker_2")],
            )
            .unwrap();
        graph.add_edge("worker_1", "synthesizer").unwrap();
        graph.add_edge("worker_2", worker_2_next).unwrap();
        graph.add_edge("synthesizer", END).unwrap();
        graph
    }

    #[test]
    fn test_linear_graph_compiles() {
        let mut graph = graph_with(&["a", "b"]);
        graph.add_edge(START, "a").unwrap();
        graph.add_edge("a", "b").unwrap();
        graph.add_edge("b", END).unwrap();
        let compiled = graph.compile().unwrap();
        assert_eq!(compiled.name(), "test");
    }

    #[test]
    fn test_missing_entry() {
        let mut graph = graph_with(&["a"]);
        graph.add_edge("a", END).unwrap();
        assert!(matches!(compile_err(graph), ConfigError::MissingEntry));
    }

    #[test]
    fn test_unreachable_step() {
        let mut graph = graph_with(&["a", "orphan"]);
        graph.add_edge(START, "a").unwrap();
        graph.add_edge("a", END).unwrap();
        graph.add_edge("orphan", END).unwrap();
        assert!(matches!(compile_err(graph), ConfigError::Unreachable(s) if s == "orphan"));
    }

    #[test]
    fn test_dead_end() {
        let mut graph = graph_with(&["a", "b"]);
        graph.add_edge(START, "a").unwrap();
        graph.add_edge("a", "b").unwrap();
        assert!(matches!(compile_err(graph), ConfigError::DeadEnd(s) if s == "a"));
    }

    #[test]
    fn test_static_cycle_rejected() {
        let mut graph = graph_with(&["a", "b", "c"]);
        graph.add_edge(START, "a").unwrap();
        graph.add_edge("a", "b").unwrap();
        graph.add_edge("b", "c").unwrap();
        graph.add_edge("c", "b").unwrap();
        match compile_err(graph) {
            ConfigError::Cycle(path) => assert_eq!(path, vec!["b", "c", "b"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cycle_through_router_allowed() {
        let mut graph = graph_with(&["writer", "reviewer"]);
        graph.add_edge(START, "writer").unwrap();
        graph.add_edge("writer", "reviewer").unwrap();
        graph
            .add_conditional_edge(
                "reviewer",
                FnRouter::new(|_| Ok(Route::Label("accept".into()))),
                [("accept", END), ("retry", "writer")],
            )
            .unwrap();
        assert!(graph.compile().is_ok());
    }

    #[test]
    fn test_fan_out_join_resolved() {
        let compiled = fan_out_graph("synthesizer").compile().unwrap();
        match compiled.edge("orchestrator") {
            Some(Edge::Conditional(cond)) => {
                assert_eq!(cond.join.as_deref(), Some("synthesizer"))
            }
            other => panic!("unexpected edge: {:?}", other),
        }
    }

    #[test]
    fn test_ambiguous_join() {
        match compile_err(fan_out_graph("extra")) {
            ConfigError::AmbiguousJoin { step, successors } => {
                assert_eq!(step, "orchestrator");
                assert_eq!(successors, vec!["extra", "synthesizer"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fan_out_target_needs_static_edge() {
        let mut graph = graph_with(&["orchestrator", "worker", "synthesizer"]);
        graph.add_edge(START, "orchestrator").unwrap();
        graph
            .add_conditional_edge(
                "orchestrator",
                FanOutRouter::new("tasks", "agent", "task"),
                [("worker", "worker")],
            )
            .unwrap();
        graph
            .add_conditional_edge(
                "worker",
                FnRouter::new(|_| Ok(Route::Label("next".into()))),
                [("next", "synthesizer")],
            )
            .unwrap();
        graph.add_edge("synthesizer", END).unwrap();
        assert!(matches!(
            compile_err(graph),
            ConfigError::AmbiguousJoin { .. }
        ));
    }

    #[test]
    fn test_unmapped_label() {
        let mut graph = graph_with(&["a"]);
        graph.add_edge(START, "a").unwrap();
        graph
            .add_conditional_edge(
                "a",
                FnRouter::new(|_| Ok(Route::Label("yes".into()))).with_labels(["yes", "no"]),
                [("yes", END)],
            )
            .unwrap();
        assert!(matches!(
            compile_err(graph),
            ConfigError::UnmappedLabel { label, .. } if label == "no"
        ));
    }

    #[test]
    fn test_invalid_schema() {
        let mut graph = graph_with(&["a"]).with_schema(
            StateSchema::new().field(
                "items",
                StateFieldDef::new(FieldType::String).with_default(serde_json::json!(3)),
            ),
        );
        graph.add_edge(START, "a").unwrap();
        graph.add_edge("a", END).unwrap();
        assert!(matches!(compile_err(graph), ConfigError::InvalidSchema(_)));
    }

    #[test]
    fn test_every_reachable_step_finishes() {
        let compiled = fan_out_graph("synthesizer").compile().unwrap();
        let info = compiled.describe();
        assert_eq!(info.steps.len(), 4);
    }
}
