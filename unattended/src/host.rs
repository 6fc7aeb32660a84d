//! Host capabilities the script interpreter calls back into.
//!
//! The interpreter was written against a graphical host. Every capability it
//! expects is part of [`InstallHost`]; the unattended host answers the ones
//! that carry decisions from pre-supplied answers and leaves the purely visual
//! ones inert.

use std::path::PathBuf;

use crate::core::script::MenuOption;
use crate::error::InstallError;
use crate::io::interpreter::InterpreterControl;

/// Runs after a download finishes. Whatever data it needs is captured.
pub type CompletionCallback = Box<dyn FnOnce() -> anyhow::Result<()>>;

/// Continuation for a disc prompt, called with the required disc ids.
pub type DiscCallback<'a> = &'a mut dyn FnMut(&[String]) -> anyhow::Result<()>;

/// A menu the interpreter wants answered.
#[derive(Debug, Clone, Copy)]
pub struct MenuRequest<'a> {
    pub alias: &'a str,
    pub options: &'a [MenuOption],
    pub preselect: Option<&'a str>,
    pub has_entry: bool,
}

/// A file the interpreter wants downloaded.
pub struct DownloadRequest {
    pub source: String,
    pub destination: PathBuf,
    pub referer: Option<String>,
    pub on_complete: Option<CompletionCallback>,
}

impl DownloadRequest {
    pub fn new(source: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            referer: None,
            on_complete: None,
        }
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn on_complete(mut self, callback: CompletionCallback) -> Self {
        self.on_complete = Some(callback);
        self
    }
}

/// Callback surface of an installer host.
///
/// Calls are delivered one at a time. Once the host has terminated, request
/// methods return [`InstallError::Terminated`].
pub trait InstallHost {
    /// Show a status line.
    fn set_status(&mut self, text: &str);

    /// Choose a value for an input menu and record it on the interpreter.
    fn request_menu_choice(
        &mut self,
        ctl: &mut dyn InterpreterControl,
        menu: &MenuRequest<'_>,
    ) -> Result<(), InstallError>;

    /// Provide a local file for a file requirement without a source.
    fn request_file_selection(
        &mut self,
        ctl: &mut dyn InterpreterControl,
        prompt: &str,
    ) -> Result<(), InstallError>;

    /// Download a file, then continue with the script's file processing.
    fn request_download(
        &mut self,
        ctl: &mut dyn InterpreterControl,
        request: DownloadRequest,
    ) -> Result<(), InstallError>;

    /// Install a package the script depends on before continuing.
    fn request_dependency_resolution(&mut self, slug: &str) -> Result<(), InstallError>;

    /// Ask for physical media, resuming through `resume` once available.
    fn request_disc_insertion(
        &mut self,
        prompt: &str,
        requires: &[String],
        resume: DiscCallback<'_>,
    ) -> Result<(), InstallError>;

    fn on_install_finished(&mut self);
    fn on_install_error(&mut self, message: &str);

    fn clean_widgets(&mut self);
    fn add_spinner(&mut self);
    fn set_cancel_button_sensitive(&mut self, sensitive: bool);
    fn hide_continue_button(&mut self);
    fn attach_logger(&mut self, command: &str);
}
