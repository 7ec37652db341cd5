//! Development-time tracing for debugging the loop.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: Dev diagnostics via `RUST_LOG`, output to stderr.
//!   Not part of the hook's product output.
//!
//! - **Product output**: iteration banners, lint output, and streamed agent
//!   messages go straight to stdout/stderr via [`crate::looping::Console`].

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing subscriber for development logging.
///
/// Reads `RUST_LOG` env var. Defaults to `warn` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=hookfix=debug cargo run
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
