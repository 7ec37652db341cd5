//! Pre-commit fix loop.
//!
//! Runs the `pre-commit` lint tool against a repository and, when it fails,
//! asks a Codex agent session to patch the working tree, retrying up to a
//! bounded number of iterations. The crate enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (prompt building, failed-hook
//!   extraction). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (child processes, cache layout,
//!   iteration artifacts, the agent event stream).
//!
//! [`looping`] coordinates core logic with I/O to implement the retry loop
//! behind the `hookfix` binary.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
