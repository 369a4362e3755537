//! Router trait - decides where execution goes after a step

use std::collections::BTreeSet;

use super::error::StepError;
use super::state::{StateUpdate, StateView};

/// Request to run one step as a fan-out child
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    /// Routing label, resolved through the conditional edge's table
    pub target: String,
    /// Fields the dispatched step receives as its view
    pub payload: StateUpdate,
}

impl DispatchRequest {
    pub fn new(target: impl Into<String>, payload: StateUpdate) -> Self {
        Self {
            target: target.into(),
            payload,
        }
    }
}

/// Outcome of a routing decision
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Continue with the single successor mapped to this label
    Label(String),
    /// Run these requests concurrently, then continue at the join target
    Dispatch(Vec<DispatchRequest>),
}

/// Routing function attached to a step by a conditional edge
///
/// Routers only read the state. Returning `Route::Dispatch` is allowed only
/// when `fans_out()` is true, so the join target can be checked at compile
/// time.
pub trait Router: Send + Sync {
    fn route(&self, view: &StateView) -> Result<Route, StepError>;

    /// Labels this router can return, when known ahead of time
    fn labels(&self) -> Option<BTreeSet<String>> {
        None
    }

    /// Whether this router produces dispatch requests
    fn fans_out(&self) -> bool {
        false
    }
}
