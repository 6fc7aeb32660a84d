//! Download supervision.
//!
//! Starts a transfer and polls it until it settles, reporting progress on the
//! status sink between polls. The poll loop blocks the calling thread for the
//! whole transfer; there is no UI thread to keep responsive.

use std::thread;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::core::types::{DownloadState, TransferState};
use crate::error::InstallError;
use crate::io::status::StatusSink;
use crate::io::transport::{TransferRequest, Transport};

/// Reported when the transport cancels a transfer.
pub const DOWNLOAD_INTERRUPTED: &str = "Download interrupted";

pub struct DownloadSupervisor<'a> {
    transport: &'a dyn Transport,
    status: &'a dyn StatusSink,
    poll_interval: Duration,
}

impl<'a> DownloadSupervisor<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        status: &'a dyn StatusSink,
        poll_interval: Duration,
    ) -> Self {
        Self {
            transport,
            status,
            poll_interval,
        }
    }

    /// Run `request` to completion and return the final snapshot.
    #[instrument(skip_all, fields(source = %request.source, destination = %request.destination.display()))]
    pub fn run(&self, request: &TransferRequest) -> Result<DownloadState, InstallError> {
        let mut transfer = self.transport.open(request).map_err(|err| {
            InstallError::Transfer(format!(
                "Downloading {} to {} has an error: {err:#}",
                request.source,
                request.destination.display()
            ))
        })?;

        let line = format!(
            "Downloading {} to {}",
            request.source,
            request.destination.display()
        );
        self.status.emit(&line);
        debug!("{line}");

        transfer.start().map_err(|err| {
            InstallError::Transfer(format!(
                "Downloading {} to {} has an error: {err:#}",
                request.source,
                request.destination.display()
            ))
        })?;

        loop {
            let progress = transfer.progress();
            let snapshot = transfer.snapshot();
            match snapshot.state {
                TransferState::Cancelled => {
                    warn!("transfer cancelled by transport");
                    return Err(InstallError::Transfer(DOWNLOAD_INTERRUPTED.to_string()));
                }
                TransferState::Error => {
                    let message = snapshot
                        .error
                        .unwrap_or_else(|| "Download failed".to_string());
                    warn!(error = %message, "transfer failed");
                    return Err(InstallError::Transfer(message));
                }
                TransferState::Completed => {
                    debug!(bytes = snapshot.downloaded_bytes, "transfer completed");
                    return Ok(snapshot);
                }
                TransferState::Running if progress >= 1.0 => {
                    debug!(bytes = snapshot.downloaded_bytes, "transfer reached 100%");
                    return Ok(snapshot);
                }
                TransferState::Running => {}
            }
            self.status.emit(&snapshot.progress_line());
            thread::sleep(self.poll_interval);
        }
    }
}
