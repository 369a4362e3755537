// SPDX-License-Identifier: MIT

//! Graph introspection and Mermaid rendering
//!
//! | Node              | Shape         | Mermaid Syntax |
//! |-------------------|---------------|----------------|
//! | Step              | Rectangle     | `id[label]`    |
//! | Fan-out source    | Parallelogram | `id[/label\]`  |
//! | START/END         | Stadium       | `id([label])`  |

use serde::{Deserialize, Serialize};

use super::executor::CompiledGraph;
use super::types::{Edge, END, START};

/// Serializable structure of a compiled graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// First step, when the start marker has a static edge
    #[serde(default)]
    pub entry: Option<String>,
    pub steps: Vec<StepInfo>,
    pub edges: Vec<EdgeInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    pub name: String,
    /// Step's router dispatches concurrent children
    pub fans_out: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeInfo {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
    /// Routing label for conditional edges
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Static,
    Conditional,
    /// Where execution resumes after a fan-out barrier
    Join,
}

impl CompiledGraph {
    /// Steps and edges, in registration order, for renderers and tooling
    pub fn describe(&self) -> GraphInfo {
        let fans_out = |name: &str| {
            matches!(self.edge(name), Some(Edge::Conditional(c)) if c.router.fans_out())
        };

        let steps = self
            .step_names()
            .iter()
            .map(|name| StepInfo {
                name: name.clone(),
                fans_out: fans_out(name),
            })
            .collect();

        let sources = std::iter::once(START).chain(self.step_names().iter().map(String::as_str));
        let mut edges = Vec::new();
        for from in sources {
            match self.edge(from) {
                Some(Edge::Static(to)) => edges.push(EdgeInfo {
                    from: from.to_string(),
                    to: to.clone(),
                    kind: EdgeKind::Static,
                    label: None,
                }),
                Some(Edge::Conditional(cond)) => {
                    edges.extend(cond.routes.iter().map(|(label, to)| EdgeInfo {
                        from: from.to_string(),
                        to: to.clone(),
                        kind: EdgeKind::Conditional,
                        label: Some(label.clone()),
                    }));
                    if let Some(join) = &cond.join {
                        edges.push(EdgeInfo {
                            from: from.to_string(),
                            to: join.clone(),
                            kind: EdgeKind::Join,
                            label: None,
                        });
                    }
                }
                None => {}
            }
        }

        GraphInfo {
            name: self.name().to_string(),
            description: self.description().to_string(),
            entry: self.edge(START).and_then(Edge::as_static).map(str::to_string),
            steps,
            edges,
        }
    }
}

impl GraphInfo {
    /// Render as a Mermaid flowchart
    pub fn to_mermaid(&self) -> String {
        let mut lines = vec!["flowchart TD".to_string()];
        lines.push(format!("    {}([START])", sanitize_id(START)));
        for step in &self.steps {
            let id = sanitize_id(&step.name);
            if step.fans_out {
                lines.push(format!("    {}[/{}\\]", id, step.name));
            } else {
                lines.push(format!("    {}[{}]", id, step.name));
            }
        }
        lines.push(format!("    {}([END])", sanitize_id(END)));

        for edge in &self.edges {
            let (from, to) = (sanitize_id(&edge.from), sanitize_id(&edge.to));
            lines.push(match (edge.kind, &edge.label) {
                (EdgeKind::Static, _) => format!("    {} --> {}", from, to),
                (EdgeKind::Conditional, Some(label)) => {
                    format!("    {} -. \"{}\" .-> {}", from, label, to)
                }
                (EdgeKind::Conditional, None) => format!("    {} -.-> {}", from, to),
                (EdgeKind::Join, _) => format!("    {} == join ==> {}", from, to),
            });
        }
        lines.join("\n")
    }
}

/// Mermaid node ids allow alphanumerics and underscores only
pub fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
