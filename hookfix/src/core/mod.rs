//! Pure, deterministic logic with no I/O.

pub mod hooks;
pub mod prompt;
