//! Status sink for human-readable progress and outcome lines.
//!
//! Status lines are product output (what a headless caller shows its user);
//! diagnostics go through `tracing` instead.

/// Receives one human-readable line at a time.
pub trait StatusSink: Send + Sync {
    fn emit(&self, line: &str);
}

/// Writes status lines to stdout.
pub struct ConsoleStatus;

impl StatusSink for ConsoleStatus {
    fn emit(&self, line: &str) {
        println!("{line}");
    }
}
