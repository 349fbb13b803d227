//! Diagnostics on stderr, filtered by `RUST_LOG` (default `warn`).
//!
//! Operator prompts and messages go to stdout and are not logs.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// # Example
/// ```bash
/// RUST_LOG=roboarm=debug roboarm --simulate
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
