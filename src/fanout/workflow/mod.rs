// SPDX-License-Identifier: MIT

pub mod builder;
pub mod condition;
pub mod config;
pub mod graph;
pub mod loader;
pub mod registry;
pub mod routers;
pub mod state;
pub mod types;
