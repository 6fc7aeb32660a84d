//! Transport abstraction for file downloads.
//!
//! The [`Transport`] trait decouples download supervision from the actual
//! transfer backend. Tests use scripted transports that replay progress frames.

use std::path::PathBuf;

use anyhow::Result;

use crate::core::types::DownloadState;

/// Parameters for one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub source: String,
    pub destination: PathBuf,
    pub referer: Option<String>,
    pub overwrite: bool,
}

/// Creates transfers. Construction fails on malformed requests.
pub trait Transport: Send + Sync {
    fn open(&self, request: &TransferRequest) -> Result<Box<dyn Transfer>>;
}

/// A single transfer, polled by its supervisor until it settles.
pub trait Transfer {
    fn start(&mut self) -> Result<()>;
    /// Completed fraction in `[0.0, 1.0]`.
    fn progress(&mut self) -> f64;
    fn snapshot(&self) -> DownloadState;
}
