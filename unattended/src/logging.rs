//! Diagnostic tracing for unattended installs.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: Dev diagnostics via `RUST_LOG`, output to stderr.
//!
//! - **Status lines (`io/status`)**: Product output on stdout, the lines a
//!   caller reads to learn what the install is doing and why it ended.
//!   Unaffected by `RUST_LOG`.
//!
//! # Targets
//!
//! Every event is emitted under the `unattended` crate target. Useful
//! narrower targets:
//!
//! - `unattended::install`: stage transitions, replayed answers, failures.
//! - `unattended::download`: transfer start, completion, cancellation.
//! - `unattended::dependency`: nested installs for missing dependencies.
//! - `unattended::validate`: pre-flight verdicts.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Directives used when `RUST_LOG` is unset or unparsable.
const DEFAULT_DIRECTIVES: &str = "warn";

/// Initialize tracing subscriber for diagnostics.
///
/// Reads `RUST_LOG`, falling back to `warn`.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=warn,unattended::install=debug unattended validate --script quake.yml
/// ```
pub fn init() {
    tracing_subscriber::registry()
        .with(env_filter(std::env::var("RUST_LOG").ok()))
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

fn env_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}
