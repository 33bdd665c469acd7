//! Codeweft: schema-driven, multi-target code generation.
//!
//! A parsed schema (the type model) is walked in a fixed order by generator
//! modules written in Luau. Each configured target gets a fresh visitor, its
//! output is written atomically, then its follow-up commands run.

pub mod audit;
pub mod cli;
pub mod core;
pub mod error;
pub mod loader;
pub mod runner;
