//! Stable exit codes for the hookfix binary.

/// Lint came back clean within the iteration budget.
pub const OK: i32 = 0;
/// Iteration budget exhausted while lint still fails, or an unrecoverable error.
pub const FAILING: i32 = 1;
