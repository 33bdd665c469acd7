//! Core generation logic: type model, traversal, planning, orchestration.

pub mod cancel;
pub mod context;
pub mod engine;
pub mod executor;
pub mod model;
pub mod parser;
pub mod planner;
pub mod resolver;
pub mod types;
pub mod visitor;
pub mod writer;

#[cfg(test)]
pub(crate) mod fixtures;
