// SPDX-License-Identifier: MIT

//! Building blocks for step and router implementations

pub mod error;
pub mod router;
pub mod state;
pub mod step;

pub use error::{ConfigError, GraphError, StepError};
pub use router::{DispatchRequest, Route, Router};
pub use state::{StateUpdate, StateView};
pub use step::{FnStep, Step};
