//! Orchestration of one unattended install.
//!
//! [`UnattendedInstall`] acquires the script, validates it against the
//! supplied answers, prepares an interpreter (installing missing dependencies
//! first), selects the install folder, checks the runner and then hands
//! control to the interpreter. From there it only reacts to the interpreter's
//! callbacks, replaying answers in the order they are asked for.
//!
//! Every instance terminates exactly once, through [`InstallHost::on_install_finished`]
//! or the shared failure path, and fires its exit signal at that point.

use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};

use tracing::{debug, error, info, trace, warn};

use crate::core::answers::AnswerStore;
use crate::core::script::InstallScript;
use crate::core::types::{InstallOutcome, InstallStage, UserInput};
use crate::dependency::{DependencyChain, resolve_dependency};
use crate::download::DownloadSupervisor;
use crate::error::InstallError;
use crate::host::{DiscCallback, DownloadRequest, InstallHost, MenuRequest};
use crate::io::config::UnattendedConfig;
use crate::io::interpreter::{
    InterpreterControl, InterpreterFactory, MissingDependency, ScriptInterpreter, ScriptSource,
};
use crate::io::status::StatusSink;
use crate::io::transport::{TransferRequest, Transport};
use crate::validate::validate_script;

const NO_SCRIPT: &str = "No install script found";
const MULTIPLE_SCRIPTS: &str = "Please provide a single installer";
const FINISHED: &str = "finished install";

/// Invoked once with the terminal outcome of an orchestrator.
pub type ExitSignal = Box<dyn FnOnce(InstallOutcome) + Send>;

/// Collaborators shared by an orchestrator and the nested ones it spawns.
#[derive(Clone)]
pub struct InstallEnv {
    pub scripts: Arc<dyn ScriptSource>,
    pub interpreters: Arc<dyn InterpreterFactory>,
    pub transport: Arc<dyn Transport>,
    pub status: Arc<dyn StatusSink>,
    pub config: UnattendedConfig,
}

/// What to install and the answers to replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallRequest {
    /// Local script; used when the file exists.
    pub script_path: Option<PathBuf>,
    /// Remote script identity, used when no local script exists.
    pub slug: Option<String>,
    pub revision: Option<String>,
    pub install_path: Option<PathBuf>,
    /// Positional answers for file requirements without a source.
    pub files: Vec<PathBuf>,
    /// Positional answers for input menus, in script order.
    pub options: Vec<String>,
}

impl InstallRequest {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            script_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn remote(slug: impl Into<String>, revision: Option<String>) -> Self {
        Self {
            slug: Some(slug.into()),
            revision,
            ..Self::default()
        }
    }

    pub fn with_files(mut self, files: Vec<PathBuf>) -> Self {
        self.files = files;
        self
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    pub fn with_install_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.install_path = Some(path.into());
        self
    }
}

pub struct UnattendedInstall {
    env: InstallEnv,
    script_path: Option<PathBuf>,
    slug: Option<String>,
    revision: Option<String>,
    install_path: Option<PathBuf>,
    answers: AnswerStore,
    chain: DependencyChain,
    stage: InstallStage,
    exit: Option<ExitSignal>,
}

impl UnattendedInstall {
    pub fn new(env: InstallEnv, request: InstallRequest, exit: ExitSignal) -> Self {
        let chain = DependencyChain::root(request.slug.as_deref());
        Self::with_chain(env, request, chain, exit)
    }

    fn with_chain(
        env: InstallEnv,
        request: InstallRequest,
        chain: DependencyChain,
        exit: ExitSignal,
    ) -> Self {
        let InstallRequest {
            script_path,
            slug,
            revision,
            install_path,
            files,
            options,
        } = request;
        Self {
            env,
            script_path,
            slug,
            revision,
            install_path,
            answers: AnswerStore::new(files, options),
            chain,
            stage: InstallStage::AcquiringScript,
            exit: Some(exit),
        }
    }

    /// Begin the install.
    ///
    /// A local script is processed on the calling thread. A remote script is
    /// fetched asynchronously: this returns immediately and the install
    /// continues inside the fetch callback.
    pub fn start(mut self) {
        self.enter(InstallStage::AcquiringScript);

        if let Some(path) = self.script_path.clone().filter(|path| path.is_file()) {
            let result = self
                .env
                .scripts
                .read_local(&path)
                .map(|script| vec![script]);
            self.on_scripts_obtained(result);
            return;
        }

        let Some(slug) = self.slug.clone() else {
            self.fail(&InstallError::Acquisition(NO_SCRIPT.to_string()));
            return;
        };
        self.announce(&format!(
            "Waiting for response from {}",
            self.env.config.site_url
        ));
        let scripts = Arc::clone(&self.env.scripts);
        let revision = self.revision.clone();
        scripts.fetch_remote(
            &slug,
            revision.as_deref(),
            Box::new(move |result| self.on_scripts_obtained(result)),
        );
    }

    fn on_scripts_obtained(mut self, result: anyhow::Result<Vec<InstallScript>>) {
        if let Err(err) = self.run_stages(result) {
            self.fail(&err);
        }
    }

    fn run_stages(
        &mut self,
        result: anyhow::Result<Vec<InstallScript>>,
    ) -> Result<(), InstallError> {
        let mut script = single_script(result)?;

        self.enter(InstallStage::Validating);
        validate_script(&mut script, &self.answers)?;
        self.chain.name_root(script.slug.as_deref());

        self.enter(InstallStage::Preparing);
        let mut interpreter = self.prepare_interpreter(&script)?;

        self.enter(InstallStage::SelectingTarget);
        self.select_install_folder(interpreter.as_mut())?;

        self.enter(InstallStage::CheckingRunner);
        interpreter
            .check_runner()
            .map_err(InstallError::from_collaborator)?;

        self.enter(InstallStage::Executing);
        let launched = interpreter.launch(&mut *self);
        match launched {
            Err(err) => Err(InstallError::from_collaborator(err)),
            Ok(()) if self.stage == InstallStage::Terminated => Ok(()),
            Ok(()) => Err(InstallError::Scripting(
                "Installer stopped before completion".to_string(),
            )),
        }
    }

    /// Build the interpreter, installing each missing dependency it reports.
    fn prepare_interpreter(
        &mut self,
        script: &InstallScript,
    ) -> Result<Box<dyn ScriptInterpreter>, InstallError> {
        let mut installed: Vec<String> = Vec::new();
        loop {
            let err = match self.env.interpreters.create(script) {
                Ok(interpreter) => return Ok(interpreter),
                Err(err) => err,
            };
            let Some(missing) = err.downcast_ref::<MissingDependency>() else {
                return Err(InstallError::from_collaborator(err));
            };
            let slug = missing.slug.clone();
            if installed.contains(&slug) {
                return Err(InstallError::Scripting(format!(
                    "Dependency {slug} is still missing after installing it"
                )));
            }
            self.request_dependency_resolution(&slug)?;
            installed.push(slug);
        }
    }

    fn select_install_folder(
        &mut self,
        interpreter: &mut dyn ScriptInterpreter,
    ) -> Result<(), InstallError> {
        if !interpreter.creates_own_folder() {
            return Ok(());
        }
        let target = match self.install_path.clone() {
            Some(path) => path,
            None => interpreter
                .default_target()
                .map_err(InstallError::from_collaborator)?,
        };
        interpreter.set_target_path(target.clone());
        let accepted = interpreter
            .target_path()
            .map(Path::to_path_buf)
            .unwrap_or(target);
        self.announce(&format!("Install folder {}", accepted.display()));
        self.install_path = Some(accepted);
        Ok(())
    }

    fn enter(&mut self, stage: InstallStage) {
        debug!(from = ?self.stage, to = ?stage, depth = self.chain.depth(), "stage transition");
        self.stage = stage;
    }

    fn announce(&self, line: &str) {
        self.env.status.emit(line);
        debug!("{line}");
    }

    fn ensure_active(&self) -> Result<(), InstallError> {
        if self.stage == InstallStage::Terminated {
            warn!("callback after termination ignored");
            return Err(InstallError::Terminated);
        }
        Ok(())
    }

    /// Report `result`'s error through the failure path, then hand it back.
    fn checked<T>(&mut self, result: Result<T, InstallError>) -> Result<T, InstallError> {
        if let Err(err) = &result {
            self.fail(err);
        }
        result
    }

    /// Shared failure path: status line, error log, exit signal.
    fn fail(&mut self, err: &InstallError) {
        if self.stage == InstallStage::Terminated {
            debug!(error = %err, "already terminated; not reporting again");
            return;
        }
        let message = err.to_string();
        self.env.status.emit(&message);
        error!(stage = ?self.stage, depth = self.chain.depth(), "{message}");
        self.terminate(InstallOutcome::Failed(message));
    }

    fn terminate(&mut self, outcome: InstallOutcome) {
        self.stage = InstallStage::Terminated;
        if let Some(exit) = self.exit.take() {
            exit(outcome);
        }
    }
}

impl InstallHost for UnattendedInstall {
    fn set_status(&mut self, text: &str) {
        if self.stage != InstallStage::Terminated {
            self.announce(text);
        }
    }

    fn request_menu_choice(
        &mut self,
        ctl: &mut dyn InterpreterControl,
        menu: &MenuRequest<'_>,
    ) -> Result<(), InstallError> {
        self.ensure_active()?;
        let request = self.answers.menu_cursor() + 1;
        let answer = self
            .answers
            .next_menu_option()
            .ok_or(InstallError::AnswersExhausted {
                kind: "menu option",
                request,
            });
        let value = self.checked(answer)?;
        debug!(alias = menu.alias, value = %value, "replaying menu answer");
        ctl.record_user_input(UserInput {
            alias: menu.alias.to_string(),
            value,
        });
        ctl.resume_step_iteration();
        Ok(())
    }

    fn request_file_selection(
        &mut self,
        ctl: &mut dyn InterpreterControl,
        prompt: &str,
    ) -> Result<(), InstallError> {
        self.ensure_active()?;
        let path = match self.answers.peek_file() {
            Some(path) => path.to_path_buf(),
            None => {
                let request = self.answers.file_cursor() + 1;
                return self.checked(Err(InstallError::AnswersExhausted {
                    kind: "file",
                    request,
                }));
            }
        };
        if !path.is_file() {
            return self.checked(Err(InstallError::FileSelection { path }));
        }
        info!(path = %path.display(), prompt, "use supplied file");
        ctl.select_file(&path);
        self.answers.advance_file();
        Ok(())
    }

    fn request_download(
        &mut self,
        ctl: &mut dyn InterpreterControl,
        request: DownloadRequest,
    ) -> Result<(), InstallError> {
        self.ensure_active()?;
        let DownloadRequest {
            source,
            destination,
            referer,
            on_complete,
        } = request;
        let transfer = TransferRequest {
            source,
            destination,
            referer,
            overwrite: true,
        };
        let result = DownloadSupervisor::new(
            self.env.transport.as_ref(),
            self.env.status.as_ref(),
            self.env.config.poll_interval(),
        )
        .run(&transfer);
        self.checked(result)?;

        if let Some(callback) = on_complete {
            let result = callback().map_err(|err| InstallError::Callback(format!("{err:#}")));
            self.checked(result)?;
        }
        ctl.clear_abort_marker();
        ctl.advance_to_file_processing();
        Ok(())
    }

    fn request_dependency_resolution(&mut self, slug: &str) -> Result<(), InstallError> {
        self.ensure_active()?;
        let result = resolve_dependency(&self.env, &self.chain, slug);
        self.checked(result)
    }

    /// Media swaps cannot be automated: resume straight away with the
    /// required disc ids and let the interpreter look for them.
    fn request_disc_insertion(
        &mut self,
        prompt: &str,
        requires: &[String],
        resume: DiscCallback<'_>,
    ) -> Result<(), InstallError> {
        self.ensure_active()?;
        warn!(prompt, ?requires, "disc prompt skipped in unattended mode");
        let result = resume(requires).map_err(InstallError::from_collaborator);
        self.checked(result)
    }

    fn on_install_finished(&mut self) {
        if self.stage == InstallStage::Terminated {
            warn!("completion reported after termination");
            return;
        }
        self.announce(FINISHED);
        self.terminate(InstallOutcome::Succeeded);
    }

    fn on_install_error(&mut self, message: &str) {
        self.fail(&InstallError::Scripting(message.to_string()));
    }

    // Inert: there is no window to manage in unattended mode.

    fn clean_widgets(&mut self) {
        trace!("clean_widgets ignored");
    }

    fn add_spinner(&mut self) {
        trace!("add_spinner ignored");
    }

    fn set_cancel_button_sensitive(&mut self, sensitive: bool) {
        trace!(sensitive, "set_cancel_button_sensitive ignored");
    }

    fn hide_continue_button(&mut self) {
        trace!("hide_continue_button ignored");
    }

    fn attach_logger(&mut self, command: &str) {
        trace!(command, "attach_logger ignored");
    }
}

/// Exactly one script must come out of acquisition.
fn single_script(
    result: anyhow::Result<Vec<InstallScript>>,
) -> Result<InstallScript, InstallError> {
    let mut scripts = result.map_err(|err| {
        InstallError::Acquisition(format!("Could not obtain install script: {err:#}"))
    })?;
    if scripts.len() > 1 {
        return Err(InstallError::Acquisition(MULTIPLE_SCRIPTS.to_string()));
    }
    scripts
        .pop()
        .ok_or_else(|| InstallError::Acquisition(NO_SCRIPT.to_string()))
}

/// Run an install and block until its exit signal fires.
pub fn install_and_wait(env: InstallEnv, request: InstallRequest) -> InstallOutcome {
    let chain = DependencyChain::root(request.slug.as_deref());
    run_nested(env, request, chain)
}

pub(crate) fn run_nested(
    env: InstallEnv,
    request: InstallRequest,
    chain: DependencyChain,
) -> InstallOutcome {
    let (tx, rx) = mpsc::channel();
    let exit: ExitSignal = Box::new(move |outcome| {
        tx.send(outcome).ok();
    });
    UnattendedInstall::with_chain(env, request, chain, exit).start();
    rx.recv().unwrap_or_else(|_| {
        InstallOutcome::Failed("Install ended without reporting an outcome".to_string())
    })
}
