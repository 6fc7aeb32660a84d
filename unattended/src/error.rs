//! Error taxonomy for unattended installs.
//!
//! Display strings are the exact lines shown to the user on failure.

use std::path::PathBuf;

use thiserror::Error;

/// Reasons a script is rejected before anything runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid script: missing `{field}`")]
    InvalidScript { field: &'static str },
    #[error("Number of provided files is wrong. {provided} instead of {required}")]
    FileCountMismatch { provided: usize, required: usize },
    #[error("File {} does not exist", .path.display())]
    MissingFile { path: PathBuf },
    #[error("Number of provided options is wrong. {provided} instead of {required}")]
    OptionCountMismatch { provided: usize, required: usize },
    #[error("Option {answer} not available for menu {index}")]
    UnknownOption { index: usize, answer: String },
}

/// Terminal failures of an orchestrator instance.
///
/// A missing dependency is not listed: it is recovered by a nested install
/// and only surfaces here as [`InstallError::Dependency`] when that fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstallError {
    #[error("{0}")]
    Acquisition(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Scripting(String),
    #[error("{} is not a file", .path.display())]
    FileSelection { path: PathBuf },
    #[error("{0}")]
    Transfer(String),
    #[error("{0}")]
    Callback(String),
    #[error("no {kind} answer left for request #{request}")]
    AnswersExhausted { kind: &'static str, request: usize },
    #[error("Dependency cycle detected: {}", .chain.join(" -> "))]
    DependencyCycle { chain: Vec<String> },
    #[error("Dependency chain deeper than {limit}: {}", .chain.join(" -> "))]
    DependencyDepth { limit: u32, chain: Vec<String> },
    #[error("Dependency {slug} failed: {message}")]
    Dependency { slug: String, message: String },
    #[error("install already terminated")]
    Terminated,
}

impl InstallError {
    /// Recover a typed error from a collaborator's `anyhow` error, falling back
    /// to a scripting error carrying the full context chain.
    pub fn from_collaborator(err: anyhow::Error) -> Self {
        match err.downcast::<InstallError>() {
            Ok(install) => install,
            Err(other) => InstallError::Scripting(format!("{other:#}")),
        }
    }
}
