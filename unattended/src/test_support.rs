//! Test-only doubles for the interpreter, transport, script source and sinks.
//!
//! Scripted collaborators replay predetermined behavior and record what the
//! host did to them, so tests can assert on ordering without real scripts,
//! runners or network transfers.

use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::core::script::{InstallScript, MenuOption};
use crate::core::types::{DownloadState, InstallOutcome, TransferState, UserInput};
use crate::host::{DownloadRequest, InstallHost, MenuRequest};
use crate::install::{ExitSignal, InstallEnv};
use crate::io::config::UnattendedConfig;
use crate::io::interpreter::{
    FetchCallback, InterpreterControl, InterpreterFactory, MissingDependency, ScriptInterpreter,
    ScriptSource,
};
use crate::io::status::StatusSink;
use crate::io::transport::{Transfer, TransferRequest, Transport};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Render a minimal valid script with the given file URLs and menus.
///
/// Each menu is a list of option ids; menu `i` gets alias `MENU{i}`.
pub fn script_yaml(name: &str, files: &[&str], menus: &[&[&str]]) -> String {
    let mut yaml = String::new();
    let slug = name.to_lowercase().replace(' ', "-");
    writeln!(yaml, "name: {name}\nslug: {slug}\nrunner: linux\nversion: Installer")
        .expect("write yaml");
    yaml.push_str("script:\n");
    if files.is_empty() {
        yaml.push_str("  files: []\n");
    } else {
        yaml.push_str("  files:\n");
        for (idx, url) in files.iter().enumerate() {
            writeln!(yaml, "    - file{idx}: \"{url}\"").expect("write yaml");
        }
    }
    yaml.push_str("  installer:\n");
    for (idx, options) in menus.iter().enumerate() {
        writeln!(
            yaml,
            "    - input_menu:\n        id: MENU{idx}\n        description: Pick one\n        options:"
        )
        .expect("write yaml");
        for option in *options {
            writeln!(yaml, "          - {option}: Option {option}").expect("write yaml");
        }
    }
    yaml.push_str("    - execute:\n        command: ./install.sh\n");
    yaml
}

pub fn parse(yaml: &str) -> InstallScript {
    crate::io::script_file::parse_script(yaml).expect("parse script")
}

/// Write `yaml` to `install.yml` in a fresh temp dir.
///
/// Keep the returned dir alive for as long as the file is needed.
pub fn script_file(yaml: &str) -> (tempfile::TempDir, PathBuf) {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("install.yml");
    fs::write(&path, yaml).expect("write script");
    (temp, path)
}

/// Create `count` regular files under `dir` to serve as file answers.
pub fn answer_files(dir: &Path, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|idx| {
            let path = dir.join(format!("answer-{idx}.bin"));
            fs::write(&path, b"payload").expect("write answer file");
            path
        })
        .collect()
}

/// Status sink that keeps every line.
#[derive(Default)]
pub struct RecordingStatus {
    lines: Mutex<Vec<String>>,
}

impl RecordingStatus {
    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }

    pub fn last(&self) -> Option<String> {
        lock(&self.lines).last().cloned()
    }
}

impl StatusSink for RecordingStatus {
    fn emit(&self, line: &str) {
        lock(&self.lines).push(line.to_string());
    }
}

/// Collects every exit-signal firing.
#[derive(Clone, Default)]
pub struct OutcomeProbe {
    outcomes: Arc<Mutex<Vec<InstallOutcome>>>,
}

impl OutcomeProbe {
    pub fn signal(&self) -> ExitSignal {
        let outcomes = Arc::clone(&self.outcomes);
        Box::new(move |outcome| lock(&outcomes).push(outcome))
    }

    pub fn outcomes(&self) -> Vec<InstallOutcome> {
        lock(&self.outcomes).clone()
    }

    /// The single outcome; panics if the signal fired zero or several times.
    pub fn single(&self) -> InstallOutcome {
        let outcomes = self.outcomes();
        assert_eq!(outcomes.len(), 1, "exit signal fired {} times", outcomes.len());
        outcomes[0].clone()
    }
}

/// Script source serving in-memory scripts.
///
/// Remote fetches complete on a spawned thread, like a real network call.
/// With [`Self::holding_fetches`], completions wait for [`Self::release_fetches`].
#[derive(Default)]
pub struct MemoryScriptSource {
    remote: Mutex<HashMap<String, Result<Vec<InstallScript>, String>>>,
    fetches: Mutex<Vec<(String, Option<String>)>>,
    hold: bool,
    held: Mutex<Vec<(FetchCallback, Result<Vec<InstallScript>>)>>,
}

impl MemoryScriptSource {
    pub fn holding_fetches(mut self) -> Self {
        self.hold = true;
        self
    }

    /// Complete every held fetch and wait for the continuations to return.
    pub fn release_fetches(&self) {
        let held: Vec<_> = lock(&self.held).drain(..).collect();
        let handles: Vec<_> = held
            .into_iter()
            .map(|(on_complete, result)| thread::spawn(move || on_complete(result)))
            .collect();
        for handle in handles {
            handle.join().expect("fetch continuation panicked");
        }
    }

    pub fn with_remote(self, slug: &str, scripts: Vec<InstallScript>) -> Self {
        lock(&self.remote).insert(slug.to_string(), Ok(scripts));
        self
    }

    pub fn with_remote_error(self, slug: &str, message: &str) -> Self {
        lock(&self.remote).insert(slug.to_string(), Err(message.to_string()));
        self
    }

    pub fn fetches(&self) -> Vec<(String, Option<String>)> {
        lock(&self.fetches).clone()
    }
}

impl ScriptSource for MemoryScriptSource {
    fn fetch_remote(&self, slug: &str, revision: Option<&str>, on_complete: FetchCallback) {
        lock(&self.fetches).push((slug.to_string(), revision.map(str::to_string)));
        let result = match lock(&self.remote).get(slug) {
            Some(Ok(scripts)) => Ok(scripts.clone()),
            Some(Err(message)) => Err(anyhow!(message.clone())),
            None => Err(anyhow!("no script published for {slug}")),
        };
        if self.hold {
            lock(&self.held).push((on_complete, result));
            return;
        }
        thread::spawn(move || on_complete(result));
    }
}

/// What a scripted download callback does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackPlan {
    None,
    Succeed,
    Fail(String),
}

/// One callback the scripted interpreter makes into its host.
#[derive(Debug, Clone)]
pub enum ScriptedRequest {
    Menu {
        alias: String,
        options: Vec<MenuOption>,
    },
    File {
        prompt: String,
    },
    Download {
        source: String,
        destination: PathBuf,
        callback: CallbackPlan,
    },
    Disc {
        requires: Vec<String>,
    },
    Status(String),
    Error(String),
    InertHooks,
}

impl ScriptedRequest {
    pub fn menu(alias: &str, options: &[&str]) -> Self {
        ScriptedRequest::Menu {
            alias: alias.to_string(),
            options: options
                .iter()
                .map(|id| MenuOption {
                    id: id.to_string(),
                    label: id.to_uppercase(),
                })
                .collect(),
        }
    }

    pub fn file(prompt: &str) -> Self {
        ScriptedRequest::File {
            prompt: prompt.to_string(),
        }
    }

    pub fn download(source: &str, callback: CallbackPlan) -> Self {
        ScriptedRequest::Download {
            source: source.to_string(),
            destination: PathBuf::from("/tmp/unattended-download"),
            callback,
        }
    }
}

/// Behavior of one scripted interpreter instance.
#[derive(Debug, Clone)]
pub struct ScriptedSetup {
    pub creates_own_folder: bool,
    pub default_target: PathBuf,
    pub runner_error: Option<String>,
    pub requests: Vec<ScriptedRequest>,
    /// Report completion after the last request.
    pub finish: bool,
    /// Keep going after a host callback fails (a misbehaving interpreter).
    pub ignore_errors: bool,
    /// Folder the interpreter settles on instead of the one it was given.
    pub accepted_target: Option<PathBuf>,
}

impl Default for ScriptedSetup {
    fn default() -> Self {
        Self {
            creates_own_folder: false,
            default_target: PathBuf::from("/games/default"),
            runner_error: None,
            requests: Vec::new(),
            finish: true,
            ignore_errors: false,
            accepted_target: None,
        }
    }
}

impl ScriptedSetup {
    pub fn with_requests(requests: Vec<ScriptedRequest>) -> Self {
        Self {
            requests,
            ..Self::default()
        }
    }
}

/// One outcome of [`InterpreterFactory::create`].
#[derive(Debug, Clone)]
pub enum ScriptedCreate {
    Ready(ScriptedSetup),
    MissingDependency(String),
    Fail(String),
}

/// Everything the host did to scripted interpreters, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterpreterJournal {
    /// Coarse event log across all interpreters, e.g. `create:Quake`.
    pub events: Vec<String>,
    pub user_inputs: Vec<UserInput>,
    pub selected_files: Vec<PathBuf>,
    pub resumes: usize,
    pub abort_cleared: usize,
    pub file_processing: usize,
    pub callbacks_run: usize,
    pub disc_resumes: Vec<Vec<String>>,
    pub target_paths: Vec<PathBuf>,
}

type SharedJournal = Arc<Mutex<InterpreterJournal>>;

/// Interpreter factory replaying a queue of creation outcomes per script name.
#[derive(Default)]
pub struct ScriptedInterpreterFactory {
    plans: Mutex<HashMap<String, VecDeque<ScriptedCreate>>>,
    journal: SharedJournal,
}

impl ScriptedInterpreterFactory {
    pub fn plan(self, name: &str, outcomes: Vec<ScriptedCreate>) -> Self {
        lock(&self.plans).insert(name.to_string(), outcomes.into());
        self
    }

    pub fn journal(&self) -> InterpreterJournal {
        lock(&self.journal).clone()
    }
}

impl InterpreterFactory for ScriptedInterpreterFactory {
    fn create(&self, script: &InstallScript) -> Result<Box<dyn ScriptInterpreter>> {
        let name = script.name.clone().unwrap_or_default();
        lock(&self.journal).events.push(format!("create:{name}"));
        let next = lock(&self.plans).get_mut(&name).and_then(VecDeque::pop_front);
        match next {
            Some(ScriptedCreate::Ready(setup)) => Ok(Box::new(ScriptedInterpreter {
                name,
                setup,
                target: None,
                journal: Arc::clone(&self.journal),
            })),
            Some(ScriptedCreate::MissingDependency(slug)) => {
                Err(anyhow::Error::new(MissingDependency { slug }))
            }
            Some(ScriptedCreate::Fail(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no scripted interpreter left for {name}")),
        }
    }
}

pub struct ScriptedInterpreter {
    name: String,
    setup: ScriptedSetup,
    target: Option<PathBuf>,
    journal: SharedJournal,
}

impl ScriptedInterpreter {
    fn event(&self, event: String) {
        lock(&self.journal).events.push(event);
    }

    fn replay(
        &self,
        host: &mut dyn InstallHost,
        ctl: &mut JournalControl,
        request: &ScriptedRequest,
    ) -> Result<()> {
        match request {
            ScriptedRequest::Menu { alias, options } => {
                let menu = MenuRequest {
                    alias,
                    options,
                    preselect: None,
                    has_entry: false,
                };
                host.request_menu_choice(ctl, &menu)?;
            }
            ScriptedRequest::File { prompt } => host.request_file_selection(ctl, prompt)?,
            ScriptedRequest::Download {
                source,
                destination,
                callback,
            } => {
                let mut download = DownloadRequest::new(source.clone(), destination.clone());
                if *callback != CallbackPlan::None {
                    let journal = Arc::clone(&self.journal);
                    let plan = callback.clone();
                    download = download.on_complete(Box::new(move || {
                        lock(&journal).callbacks_run += 1;
                        match plan {
                            CallbackPlan::Fail(message) => Err(anyhow!(message)),
                            _ => Ok(()),
                        }
                    }));
                }
                host.request_download(ctl, download)?;
            }
            ScriptedRequest::Disc { requires } => {
                let journal = Arc::clone(&self.journal);
                let mut resume = |discs: &[String]| -> Result<()> {
                    lock(&journal).disc_resumes.push(discs.to_vec());
                    Ok(())
                };
                host.request_disc_insertion("Insert disc", requires, &mut resume)?;
            }
            ScriptedRequest::Status(text) => host.set_status(text),
            ScriptedRequest::Error(message) => host.on_install_error(message),
            ScriptedRequest::InertHooks => {
                host.clean_widgets();
                host.add_spinner();
                host.set_cancel_button_sensitive(false);
                host.hide_continue_button();
                host.attach_logger("./install.sh");
            }
        }
        Ok(())
    }
}

impl ScriptInterpreter for ScriptedInterpreter {
    fn creates_own_folder(&self) -> bool {
        self.setup.creates_own_folder
    }

    fn default_target(&self) -> Result<PathBuf> {
        Ok(self.setup.default_target.clone())
    }

    fn target_path(&self) -> Option<&Path> {
        self.target.as_deref()
    }

    fn set_target_path(&mut self, path: PathBuf) {
        self.event(format!("target:{}:{}", self.name, path.display()));
        lock(&self.journal).target_paths.push(path.clone());
        self.target = Some(self.setup.accepted_target.clone().unwrap_or(path));
    }

    fn check_runner(&mut self) -> Result<()> {
        self.event(format!("runner:{}", self.name));
        match &self.setup.runner_error {
            Some(message) => Err(anyhow!(message.clone())),
            None => Ok(()),
        }
    }

    fn launch(&mut self, host: &mut dyn InstallHost) -> Result<()> {
        self.event(format!("launch:{}", self.name));
        let mut ctl = JournalControl {
            journal: Arc::clone(&self.journal),
        };
        for request in &self.setup.requests {
            let result = self.replay(host, &mut ctl, request);
            if result.is_err() && !self.setup.ignore_errors {
                return result;
            }
        }
        if self.setup.finish {
            self.event(format!("finish:{}", self.name));
            host.on_install_finished();
        }
        Ok(())
    }
}

/// [`InterpreterControl`] that writes into the shared journal.
pub struct JournalControl {
    journal: SharedJournal,
}

impl InterpreterControl for JournalControl {
    fn record_user_input(&mut self, input: UserInput) {
        lock(&self.journal).user_inputs.push(input);
    }

    fn select_file(&mut self, path: &Path) {
        lock(&self.journal).selected_files.push(path.to_path_buf());
    }

    fn resume_step_iteration(&mut self) {
        lock(&self.journal).resumes += 1;
    }

    fn clear_abort_marker(&mut self) {
        lock(&self.journal).abort_cleared += 1;
    }

    fn advance_to_file_processing(&mut self) {
        lock(&self.journal).file_processing += 1;
    }
}

/// One progress poll result of a scripted transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub progress: f64,
    pub state: TransferState,
    pub error: Option<String>,
}

impl Frame {
    pub fn running(progress: f64) -> Self {
        Self {
            progress,
            state: TransferState::Running,
            error: None,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            state: TransferState::Cancelled,
            ..Self::running(0.0)
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            state: TransferState::Error,
            error: Some(message.to_string()),
            ..Self::running(0.0)
        }
    }
}

/// Behavior of one transfer opened on a [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub enum ScriptedTransfer {
    Frames(Vec<Frame>),
    Reject(String),
}

/// Transport replaying one [`ScriptedTransfer`] per opened transfer.
#[derive(Default)]
pub struct ScriptedTransport {
    transfers: Mutex<VecDeque<ScriptedTransfer>>,
    opened: Mutex<Vec<TransferRequest>>,
}

impl ScriptedTransport {
    pub fn new(transfers: Vec<ScriptedTransfer>) -> Self {
        Self {
            transfers: Mutex::new(transfers.into()),
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Transport whose every transfer completes on the first poll.
    pub fn instant(count: usize) -> Self {
        Self::new(vec![
            ScriptedTransfer::Frames(vec![Frame::running(1.0)]);
            count
        ])
    }

    pub fn opened(&self) -> Vec<TransferRequest> {
        lock(&self.opened).clone()
    }
}

impl Transport for ScriptedTransport {
    fn open(&self, request: &TransferRequest) -> Result<Box<dyn Transfer>> {
        lock(&self.opened).push(request.clone());
        match lock(&self.transfers).pop_front() {
            Some(ScriptedTransfer::Frames(frames)) => Ok(Box::new(ScriptedTransferHandle {
                frames: frames.into(),
                current: Frame::running(0.0),
                started: false,
            })),
            Some(ScriptedTransfer::Reject(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no scripted transfer left")),
        }
    }
}

const SCRIPTED_TOTAL_BYTES: u64 = 10 * 1024 * 1024;

struct ScriptedTransferHandle {
    frames: VecDeque<Frame>,
    current: Frame,
    started: bool,
}

impl Transfer for ScriptedTransferHandle {
    fn start(&mut self) -> Result<()> {
        self.started = true;
        Ok(())
    }

    fn progress(&mut self) -> f64 {
        self.current = match self.frames.pop_front() {
            Some(frame) => frame,
            // Never leave a supervisor polling forever.
            None => Frame::error("scripted transfer ran out of frames"),
        };
        self.current.progress
    }

    fn snapshot(&self) -> DownloadState {
        let downloaded = (self.current.progress * SCRIPTED_TOTAL_BYTES as f64) as u64;
        DownloadState {
            state: if self.started {
                self.current.state
            } else {
                TransferState::Error
            },
            downloaded_bytes: downloaded,
            total_bytes: SCRIPTED_TOTAL_BYTES,
            average_speed: 1024.0 * 1024.0,
            time_remaining: Some(Duration::from_secs(
                SCRIPTED_TOTAL_BYTES.saturating_sub(downloaded) / (1024 * 1024),
            )),
            error: self.current.error.clone(),
        }
    }
}

/// Bundle of scripted collaborators wired into an [`InstallEnv`].
pub struct TestEnv {
    pub scripts: Arc<MemoryScriptSource>,
    pub interpreters: Arc<ScriptedInterpreterFactory>,
    pub transport: Arc<ScriptedTransport>,
    pub status: Arc<RecordingStatus>,
}

impl TestEnv {
    pub fn new(
        scripts: MemoryScriptSource,
        interpreters: ScriptedInterpreterFactory,
        transport: ScriptedTransport,
    ) -> Self {
        Self {
            scripts: Arc::new(scripts),
            interpreters: Arc::new(interpreters),
            transport: Arc::new(transport),
            status: Arc::new(RecordingStatus::default()),
        }
    }

    pub fn env(&self) -> InstallEnv {
        InstallEnv {
            scripts: self.scripts.clone(),
            interpreters: self.interpreters.clone(),
            transport: self.transport.clone(),
            status: self.status.clone(),
            config: UnattendedConfig {
                poll_interval_ms: 1,
                ..UnattendedConfig::default()
            },
        }
    }
}
