//! pingexit - exit conditions and ping maps for probe loops
//!
//! This library parses `-x` exit condition specifications, evaluates them
//! against the running totals of a probe loop, keeps a bounded ping map of
//! round outcomes and renders the final report.

pub mod cli;
pub mod condition;
pub mod config;
pub mod error;
pub mod grammar;
pub mod ping_map;
pub mod probe;
pub mod report;
