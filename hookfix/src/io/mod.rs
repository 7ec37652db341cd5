//! Side-effecting helpers: child processes, cache layout, agent stream.

pub mod agent;
pub mod cache;
pub mod config;
pub mod iteration_log;
pub mod lint;
pub mod process;
