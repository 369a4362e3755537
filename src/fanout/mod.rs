// SPDX-License-Identifier: MIT

pub mod steps;
pub mod workflow;
