// SPDX-License-Identifier: MIT

//! Graph construction and execution
//!
//! Build a `StateGraph`, `compile()` it into a `CompiledGraph`, then
//! `invoke` it with the initial fields of a run.

mod compiler;
pub mod events;
pub mod executor;
pub mod state_graph;
pub mod types;
pub mod visualize;

pub use events::{RunEvent, RunReport};
pub use executor::CompiledGraph;
pub use state_graph::StateGraph;
pub use types::{normalize_marker, ConditionalEdge, Edge, END, START};
pub use visualize::{EdgeInfo, EdgeKind, GraphInfo, StepInfo};
