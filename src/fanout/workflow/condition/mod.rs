// SPDX-License-Identifier: MIT

//! `when` expressions used by branch routers
//!
//! An expression compares dotted state paths with literals, for example
//! `score >= 0.8`, `final_output.synthesized == true` or
//! `not (tags contains 'urgent' or retries > 3)`.

mod ast;
mod evaluator;
mod parser;

pub use ast::{CompareOp, Expression, Literal};
pub use evaluator::evaluate;
pub use parser::parse;
