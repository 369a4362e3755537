// SPDX-License-Identifier: MIT

//! Shared run state
//!
//! `StateSchema` declares each field's type and whether it overwrites or
//! appends; `WorkflowState` is the coordinator-owned store that applies those
//! rules when step updates are merged.

mod schema;
mod store;

pub use schema::{FieldType, ReducerType, StateFieldDef, StateSchema};
pub use store::WorkflowState;
