//! Shared types for the unattended install flow.
//!
//! Pure data: no I/O, safe to construct and compare in tests.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const MEGABYTE: f64 = 1024.0 * 1024.0;

/// Terminal result of one orchestrator instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Succeeded,
    Failed(String),
}

impl InstallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InstallOutcome::Succeeded)
    }

    /// Failure reason, if the install failed.
    pub fn message(&self) -> Option<&str> {
        match self {
            InstallOutcome::Succeeded => None,
            InstallOutcome::Failed(message) => Some(message),
        }
    }
}

/// Lifecycle stages of an orchestrator, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    AcquiringScript,
    Validating,
    Preparing,
    SelectingTarget,
    CheckingRunner,
    Executing,
    Terminated,
}

/// A choice recorded on the interpreter in response to an input menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInput {
    pub alias: String,
    pub value: String,
}

/// Transport-reported state of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferState {
    Running,
    Completed,
    Cancelled,
    Error,
}

/// Read-only snapshot of a running transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadState {
    pub state: TransferState,
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
    /// Bytes per second.
    pub average_speed: f64,
    pub time_remaining: Option<Duration>,
    pub error: Option<String>,
}

impl DownloadState {
    pub fn running(downloaded_bytes: u64, total_bytes: u64) -> Self {
        Self {
            state: TransferState::Running,
            downloaded_bytes,
            total_bytes,
            average_speed: 0.0,
            time_remaining: None,
            error: None,
        }
    }

    /// Human-readable progress line, e.g.
    /// `1.50 / 10.00MB (0.75MB/s), 00:00:11 remaining`.
    pub fn progress_line(&self) -> String {
        format!(
            "{:.2} / {:.2}MB ({:.2}MB/s), {} remaining",
            self.downloaded_bytes as f64 / MEGABYTE,
            self.total_bytes as f64 / MEGABYTE,
            self.average_speed / MEGABYTE,
            Remaining(self.time_remaining),
        )
    }
}

struct Remaining(Option<Duration>);

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(left) => {
                let secs = left.as_secs();
                write!(
                    f,
                    "{:02}:{:02}:{:02}",
                    secs / 3600,
                    (secs % 3600) / 60,
                    secs % 60
                )
            }
            None => f.write_str("unknown"),
        }
    }
}
