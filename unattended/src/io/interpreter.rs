//! Seams to the external script interpreter.
//!
//! The interpreter parses and executes installer steps; the unattended driver
//! only fetches scripts through it, constructs it, and answers its callbacks.
//! Tests plug in scripted implementations from `test_support`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use thiserror::Error;

use crate::core::script::InstallScript;
use crate::core::types::UserInput;
use crate::host::InstallHost;
use crate::io::script_file::load_script;

/// Raised by [`InterpreterFactory::create`] when the script needs another
/// package installed first. Recovered with `anyhow::Error::downcast_ref`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing dependency {slug}")]
pub struct MissingDependency {
    pub slug: String,
}

/// Single-shot continuation for a remote script fetch.
pub type FetchCallback = Box<dyn FnOnce(Result<Vec<InstallScript>>) + Send>;

/// Where scripts come from.
pub trait ScriptSource: Send + Sync {
    fn read_local(&self, path: &Path) -> Result<InstallScript> {
        load_script(path)
    }

    /// Start fetching the scripts published for `slug`. Must return without
    /// waiting; `on_complete` runs exactly once, on any thread.
    fn fetch_remote(&self, slug: &str, revision: Option<&str>, on_complete: FetchCallback);
}

/// Builds an interpreter bound to one script.
pub trait InterpreterFactory: Send + Sync {
    /// Fails with [`MissingDependency`] when a dependency must be installed
    /// first, or with any other error for scripting problems.
    fn create(&self, script: &InstallScript) -> Result<Box<dyn ScriptInterpreter>>;
}

/// An interpreter instance driving one script.
pub trait ScriptInterpreter {
    fn creates_own_folder(&self) -> bool;
    fn default_target(&self) -> Result<PathBuf>;
    fn target_path(&self) -> Option<&Path>;
    fn set_target_path(&mut self, path: PathBuf);
    /// Verify the runner the script needs, installing it when absent.
    fn check_runner(&mut self) -> Result<()>;
    /// Run the installer steps, calling back into `host` whenever a decision
    /// is needed. Returns once the interpreter has nothing left to do.
    fn launch(&mut self, host: &mut dyn InstallHost) -> Result<()>;
}

/// Operations a host callback performs on the interpreter that called it.
pub trait InterpreterControl {
    fn record_user_input(&mut self, input: UserInput);
    fn select_file(&mut self, path: &Path);
    fn resume_step_iteration(&mut self);
    fn clear_abort_marker(&mut self);
    fn advance_to_file_processing(&mut self);
}
