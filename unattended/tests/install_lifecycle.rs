//! End-to-end orchestrator scenarios against scripted collaborators.
//!
//! Each test wires a scripted interpreter, transport and script source into
//! an [`InstallEnv`], runs one install to its terminal state and checks the
//! outcome, the status lines and what the host did to the interpreter.

use std::path::PathBuf;

use unattended::core::types::{InstallOutcome, UserInput};
use unattended::install::{InstallRequest, UnattendedInstall, install_and_wait};
use unattended::test_support::{
    CallbackPlan, Frame, MemoryScriptSource, OutcomeProbe, ScriptedCreate,
    ScriptedInterpreterFactory, ScriptedRequest, ScriptedSetup, ScriptedTransfer,
    ScriptedTransport, TestEnv, answer_files, parse, script_file, script_yaml,
};

fn run_local(env: &TestEnv, request: InstallRequest) -> InstallOutcome {
    let probe = OutcomeProbe::default();
    UnattendedInstall::new(env.env(), request, probe.signal()).start();
    probe.single()
}

fn failed(message: &str) -> InstallOutcome {
    InstallOutcome::Failed(message.to_string())
}

/// Two sentinel files and one menu, answered in the order they are asked for.
#[test]
fn answers_are_replayed_in_request_order() {
    let (dir, script) = script_file(&script_yaml(
        "Quake",
        &["N/A:Select the first disc image", "N/A:Select the second disc image"],
        &[&["en", "fr"]],
    ));
    let files = answer_files(dir.path(), 2);
    let interpreters = ScriptedInterpreterFactory::default().plan(
        "Quake",
        vec![ScriptedCreate::Ready(ScriptedSetup::with_requests(vec![
            ScriptedRequest::file("first"),
            ScriptedRequest::file("second"),
            ScriptedRequest::menu("MENU0", &["en", "fr"]),
        ]))],
    );
    let env = TestEnv::new(
        MemoryScriptSource::default(),
        interpreters,
        ScriptedTransport::default(),
    );

    let request = InstallRequest::local(&script)
        .with_files(files.clone())
        .with_options(vec!["fr".to_string()]);
    assert_eq!(run_local(&env, request), InstallOutcome::Succeeded);

    let journal = env.interpreters.journal();
    assert_eq!(journal.selected_files, files);
    assert_eq!(
        journal.user_inputs,
        vec![UserInput {
            alias: "MENU0".to_string(),
            value: "fr".to_string(),
        }]
    );
    assert_eq!(journal.resumes, 1);
    assert_eq!(env.status.last().as_deref(), Some("finished install"));
}

#[test]
fn missing_file_answers_stop_before_preparing() {
    let (_dir, script) = script_file(&script_yaml("Quake", &["N/A:setup"], &[]));
    let env = TestEnv::new(
        MemoryScriptSource::default(),
        ScriptedInterpreterFactory::default(),
        ScriptedTransport::default(),
    );

    let outcome = run_local(&env, InstallRequest::local(&script));

    let message = "Number of provided files is wrong. 0 instead of 1";
    assert_eq!(outcome, failed(message));
    assert_eq!(env.status.last().as_deref(), Some(message));
    assert!(env.interpreters.journal().events.is_empty());
}

#[test]
fn invalid_menu_answer_is_rejected() {
    let (_dir, script) = script_file(&script_yaml("Quake", &[], &[&["en", "fr"]]));
    let env = TestEnv::new(
        MemoryScriptSource::default(),
        ScriptedInterpreterFactory::default(),
        ScriptedTransport::default(),
    );

    let request = InstallRequest::local(&script).with_options(vec!["de".to_string()]);
    assert_eq!(
        run_local(&env, request),
        failed("Option de not available for menu 0")
    );
}

/// The dependency installs completely before the parent selects its target.
#[test]
fn missing_dependency_installs_before_target_selection() {
    let scripts = MemoryScriptSource::default()
        .with_remote("game", vec![parse(&script_yaml("Game", &[], &[]))])
        .with_remote(
            "foo-runtime",
            vec![parse(&script_yaml("Foo Runtime", &[], &[]))],
        );
    let interpreters = ScriptedInterpreterFactory::default()
        .plan(
            "Game",
            vec![
                ScriptedCreate::MissingDependency("foo-runtime".to_string()),
                ScriptedCreate::Ready(ScriptedSetup {
                    creates_own_folder: true,
                    ..ScriptedSetup::default()
                }),
            ],
        )
        .plan(
            "Foo Runtime",
            vec![ScriptedCreate::Ready(ScriptedSetup::default())],
        );
    let env = TestEnv::new(scripts, interpreters, ScriptedTransport::default());

    let outcome = install_and_wait(env.env(), InstallRequest::remote("game", None));
    assert_eq!(outcome, InstallOutcome::Succeeded);

    assert_eq!(
        env.interpreters.journal().events,
        vec![
            "create:Game",
            "create:Foo Runtime",
            "runner:Foo Runtime",
            "launch:Foo Runtime",
            "finish:Foo Runtime",
            "create:Game",
            "target:Game:/games/default",
            "runner:Game",
            "launch:Game",
            "finish:Game",
        ]
    );
    assert_eq!(
        env.scripts.fetches(),
        vec![
            ("game".to_string(), None),
            ("foo-runtime".to_string(), None)
        ]
    );
    let lines = env.status.lines();
    assert_eq!(lines[0], "Waiting for response from https://lutris.net");
    assert!(lines.contains(&"Install folder /games/default".to_string()));
}

#[test]
fn failed_dependency_fails_the_parent() {
    let scripts = MemoryScriptSource::default()
        .with_remote("game", vec![parse(&script_yaml("Game", &[], &[]))])
        .with_remote_error("foo-runtime", "HTTP 404");
    let interpreters = ScriptedInterpreterFactory::default().plan(
        "Game",
        vec![ScriptedCreate::MissingDependency("foo-runtime".to_string())],
    );
    let env = TestEnv::new(scripts, interpreters, ScriptedTransport::default());

    let outcome = install_and_wait(env.env(), InstallRequest::remote("game", None));
    assert_eq!(
        outcome,
        failed("Dependency foo-runtime failed: Could not obtain install script: HTTP 404")
    );
}

#[test]
fn dependency_cycle_fails_fast() {
    let scripts = MemoryScriptSource::default()
        .with_remote("a", vec![parse(&script_yaml("A", &[], &[]))])
        .with_remote("b", vec![parse(&script_yaml("B", &[], &[]))]);
    let interpreters = ScriptedInterpreterFactory::default()
        .plan(
            "A",
            vec![ScriptedCreate::MissingDependency("b".to_string())],
        )
        .plan(
            "B",
            vec![ScriptedCreate::MissingDependency("a".to_string())],
        );
    let env = TestEnv::new(scripts, interpreters, ScriptedTransport::default());

    let outcome = install_and_wait(env.env(), InstallRequest::remote("a", None));
    assert_eq!(
        outcome,
        failed("Dependency b failed: Dependency cycle detected: a -> b -> a")
    );
    assert_eq!(env.interpreters.journal().events, vec!["create:A", "create:B"]);
}

#[test]
fn dependency_still_missing_after_install_is_fatal() {
    let scripts = MemoryScriptSource::default()
        .with_remote("game", vec![parse(&script_yaml("Game", &[], &[]))])
        .with_remote("dxvk", vec![parse(&script_yaml("Dxvk", &[], &[]))]);
    let interpreters = ScriptedInterpreterFactory::default()
        .plan(
            "Game",
            vec![
                ScriptedCreate::MissingDependency("dxvk".to_string()),
                ScriptedCreate::MissingDependency("dxvk".to_string()),
            ],
        )
        .plan("Dxvk", vec![ScriptedCreate::Ready(ScriptedSetup::default())]);
    let env = TestEnv::new(scripts, interpreters, ScriptedTransport::default());

    let outcome = install_and_wait(env.env(), InstallRequest::remote("game", None));
    assert_eq!(
        outcome,
        failed("Dependency dxvk is still missing after installing it")
    );
}

#[test]
fn transport_error_skips_completion_callback() {
    let (_dir, script) = script_file(&script_yaml("Quake", &[], &[]));
    let interpreters = ScriptedInterpreterFactory::default().plan(
        "Quake",
        vec![ScriptedCreate::Ready(ScriptedSetup::with_requests(vec![
            ScriptedRequest::download("https://example.com/quake.zip", CallbackPlan::Succeed),
        ]))],
    );
    let transport = ScriptedTransport::new(vec![ScriptedTransfer::Frames(vec![
        Frame::running(0.3),
        Frame::error("disk full"),
    ])]);
    let env = TestEnv::new(MemoryScriptSource::default(), interpreters, transport);

    assert_eq!(
        run_local(&env, InstallRequest::local(&script)),
        failed("disk full")
    );

    let journal = env.interpreters.journal();
    assert_eq!(journal.callbacks_run, 0);
    assert_eq!(journal.file_processing, 0);
    assert!(!journal.events.iter().any(|event| event.starts_with("finish:")));
    assert_eq!(env.status.last().as_deref(), Some("disk full"));
}

#[test]
fn cancelled_download_reports_interruption_once() {
    let (_dir, script) = script_file(&script_yaml("Quake", &[], &[]));
    let interpreters = ScriptedInterpreterFactory::default().plan(
        "Quake",
        vec![ScriptedCreate::Ready(ScriptedSetup::with_requests(vec![
            ScriptedRequest::download("https://example.com/quake.zip", CallbackPlan::Succeed),
        ]))],
    );
    let transport = ScriptedTransport::new(vec![ScriptedTransfer::Frames(vec![
        Frame::running(0.5),
        Frame::cancelled(),
    ])]);
    let env = TestEnv::new(MemoryScriptSource::default(), interpreters, transport);

    assert_eq!(
        run_local(&env, InstallRequest::local(&script)),
        failed("Download interrupted")
    );
    let interrupted = env
        .status
        .lines()
        .into_iter()
        .filter(|line| line == "Download interrupted")
        .count();
    assert_eq!(interrupted, 1);
    assert_eq!(env.interpreters.journal().callbacks_run, 0);
}

#[test]
fn completed_download_runs_callback_then_resumes_file_processing() {
    let (_dir, script) = script_file(&script_yaml("Quake", &[], &[]));
    let interpreters = ScriptedInterpreterFactory::default().plan(
        "Quake",
        vec![ScriptedCreate::Ready(ScriptedSetup::with_requests(vec![
            ScriptedRequest::download("https://example.com/a.zip", CallbackPlan::Succeed),
            ScriptedRequest::download("https://example.com/b.zip", CallbackPlan::None),
        ]))],
    );
    let env = TestEnv::new(
        MemoryScriptSource::default(),
        interpreters,
        ScriptedTransport::instant(2),
    );

    assert_eq!(
        run_local(&env, InstallRequest::local(&script)),
        InstallOutcome::Succeeded
    );

    let journal = env.interpreters.journal();
    assert_eq!(journal.callbacks_run, 1);
    assert_eq!(journal.abort_cleared, 2);
    assert_eq!(journal.file_processing, 2);
    let opened = env.transport.opened();
    assert_eq!(opened.len(), 2);
    assert!(opened.iter().all(|request| request.overwrite));
}

#[test]
fn failing_completion_callback_ends_the_install() {
    let (_dir, script) = script_file(&script_yaml("Quake", &[], &[]));
    let interpreters = ScriptedInterpreterFactory::default().plan(
        "Quake",
        vec![ScriptedCreate::Ready(ScriptedSetup::with_requests(vec![
            ScriptedRequest::download(
                "https://example.com/a.zip",
                CallbackPlan::Fail("archive is corrupt".to_string()),
            ),
            ScriptedRequest::file("never asked"),
        ]))],
    );
    let env = TestEnv::new(
        MemoryScriptSource::default(),
        interpreters,
        ScriptedTransport::instant(1),
    );

    assert_eq!(
        run_local(&env, InstallRequest::local(&script)),
        failed("archive is corrupt")
    );
    let journal = env.interpreters.journal();
    assert_eq!(journal.callbacks_run, 1);
    assert_eq!(journal.file_processing, 0);
}

#[test]
fn exit_signal_fires_once_across_repeated_errors() {
    let (_dir, script) = script_file(&script_yaml("Quake", &[], &[]));
    let interpreters = ScriptedInterpreterFactory::default().plan(
        "Quake",
        vec![ScriptedCreate::Ready(ScriptedSetup {
            requests: vec![
                ScriptedRequest::Error("first failure".to_string()),
                ScriptedRequest::Error("second failure".to_string()),
                ScriptedRequest::Status("still going".to_string()),
                ScriptedRequest::menu("LANG", &["en"]),
            ],
            ignore_errors: true,
            ..ScriptedSetup::default()
        })],
    );
    let env = TestEnv::new(
        MemoryScriptSource::default(),
        interpreters,
        ScriptedTransport::default(),
    );
    let probe = OutcomeProbe::default();

    UnattendedInstall::new(env.env(), InstallRequest::local(&script), probe.signal()).start();

    assert_eq!(probe.outcomes(), vec![failed("first failure")]);
    let lines = env.status.lines();
    assert_eq!(lines.last().map(String::as_str), Some("first failure"));
    assert!(!lines.iter().any(|line| line == "second failure"));
    assert!(!lines.iter().any(|line| line == "finished install"));
    assert!(env.interpreters.journal().user_inputs.is_empty());
}

#[test]
fn supplied_path_that_is_not_a_file_fails_selection() {
    let (dir, script) = script_file(&script_yaml("Quake", &[], &[]));
    let missing = dir.path().join("missing.iso");
    let interpreters = ScriptedInterpreterFactory::default().plan(
        "Quake",
        vec![ScriptedCreate::Ready(ScriptedSetup::with_requests(vec![
            ScriptedRequest::file("Select the disc image"),
        ]))],
    );
    let env = TestEnv::new(
        MemoryScriptSource::default(),
        interpreters,
        ScriptedTransport::default(),
    );

    let request = InstallRequest::local(&script).with_files(vec![missing.clone()]);
    assert_eq!(
        run_local(&env, request),
        failed(&format!("{} is not a file", missing.display()))
    );
    assert!(env.interpreters.journal().selected_files.is_empty());
}

#[test]
fn menu_request_beyond_answers_fails() {
    let (_dir, script) = script_file(&script_yaml("Quake", &[], &[]));
    let interpreters = ScriptedInterpreterFactory::default().plan(
        "Quake",
        vec![ScriptedCreate::Ready(ScriptedSetup::with_requests(vec![
            ScriptedRequest::menu("LANG", &["en"]),
        ]))],
    );
    let env = TestEnv::new(
        MemoryScriptSource::default(),
        interpreters,
        ScriptedTransport::default(),
    );

    assert_eq!(
        run_local(&env, InstallRequest::local(&script)),
        failed("no menu option answer left for request #1")
    );
}

#[test]
fn pre_supplied_install_path_wins_over_default() {
    let (_dir, script) = script_file(&script_yaml("Quake", &[], &[]));
    let interpreters = ScriptedInterpreterFactory::default().plan(
        "Quake",
        vec![ScriptedCreate::Ready(ScriptedSetup {
            creates_own_folder: true,
            ..ScriptedSetup::default()
        })],
    );
    let env = TestEnv::new(
        MemoryScriptSource::default(),
        interpreters,
        ScriptedTransport::default(),
    );

    let request = InstallRequest::local(&script).with_install_path("/opt/quake");
    assert_eq!(run_local(&env, request), InstallOutcome::Succeeded);
    assert_eq!(
        env.interpreters.journal().target_paths,
        vec![PathBuf::from("/opt/quake")]
    );
    assert!(
        env.status
            .lines()
            .contains(&"Install folder /opt/quake".to_string())
    );
}

#[test]
fn runner_check_failure_is_fatal() {
    let (_dir, script) = script_file(&script_yaml("Quake", &[], &[]));
    let interpreters = ScriptedInterpreterFactory::default().plan(
        "Quake",
        vec![ScriptedCreate::Ready(ScriptedSetup {
            runner_error: Some("wine is not installed".to_string()),
            ..ScriptedSetup::default()
        })],
    );
    let env = TestEnv::new(
        MemoryScriptSource::default(),
        interpreters,
        ScriptedTransport::default(),
    );

    assert_eq!(
        run_local(&env, InstallRequest::local(&script)),
        failed("wine is not installed")
    );
    assert_eq!(
        env.interpreters.journal().events,
        vec!["create:Quake", "runner:Quake"]
    );
}

#[test]
fn other_construction_failures_are_reported() {
    let (_dir, script) = script_file(&script_yaml("Quake", &[], &[]));
    let interpreters = ScriptedInterpreterFactory::default().plan(
        "Quake",
        vec![ScriptedCreate::Fail("unknown directive `explode`".to_string())],
    );
    let env = TestEnv::new(
        MemoryScriptSource::default(),
        interpreters,
        ScriptedTransport::default(),
    );

    assert_eq!(
        run_local(&env, InstallRequest::local(&script)),
        failed("unknown directive `explode`")
    );
}

#[test]
fn interpreter_returning_early_still_terminates() {
    let (_dir, script) = script_file(&script_yaml("Quake", &[], &[]));
    let interpreters = ScriptedInterpreterFactory::default().plan(
        "Quake",
        vec![ScriptedCreate::Ready(ScriptedSetup {
            finish: false,
            ..ScriptedSetup::default()
        })],
    );
    let env = TestEnv::new(
        MemoryScriptSource::default(),
        interpreters,
        ScriptedTransport::default(),
    );

    assert_eq!(
        run_local(&env, InstallRequest::local(&script)),
        failed("Installer stopped before completion")
    );
}

#[test]
fn disc_prompt_resumes_with_required_discs() {
    let (_dir, script) = script_file(&script_yaml("Quake", &[], &[]));
    let interpreters = ScriptedInterpreterFactory::default().plan(
        "Quake",
        vec![ScriptedCreate::Ready(ScriptedSetup::with_requests(vec![
            ScriptedRequest::Disc {
                requires: vec!["QUAKE_CD2".to_string()],
            },
            ScriptedRequest::InertHooks,
        ]))],
    );
    let env = TestEnv::new(
        MemoryScriptSource::default(),
        interpreters,
        ScriptedTransport::default(),
    );

    assert_eq!(
        run_local(&env, InstallRequest::local(&script)),
        InstallOutcome::Succeeded
    );
    assert_eq!(
        env.interpreters.journal().disc_resumes,
        vec![vec!["QUAKE_CD2".to_string()]]
    );
}

#[test]
fn remote_fetch_must_yield_exactly_one_script() {
    let scripts = MemoryScriptSource::default().with_remote(
        "quake",
        vec![
            parse(&script_yaml("Quake", &[], &[])),
            parse(&script_yaml("Quake GOG", &[], &[])),
        ],
    );
    let env = TestEnv::new(
        scripts,
        ScriptedInterpreterFactory::default(),
        ScriptedTransport::default(),
    );

    let outcome = install_and_wait(
        env.env(),
        InstallRequest::remote("quake", Some("1234".to_string())),
    );
    assert_eq!(outcome, failed("Please provide a single installer"));
    assert_eq!(
        env.scripts.fetches(),
        vec![("quake".to_string(), Some("1234".to_string()))]
    );
}

#[test]
fn nothing_to_install_fails_immediately() {
    let env = TestEnv::new(
        MemoryScriptSource::default(),
        ScriptedInterpreterFactory::default(),
        ScriptedTransport::default(),
    );

    let outcome = run_local(&env, InstallRequest::local("/does/not/exist.yml"));
    assert_eq!(outcome, failed("No install script found"));
    assert!(env.scripts.fetches().is_empty());
}

/// `start` returns while the remote fetch is outstanding; the install then
/// runs to completion inside the fetch continuation.
#[test]
fn remote_start_returns_before_fetch_completes() {
    let scripts = MemoryScriptSource::default()
        .with_remote("quake", vec![parse(&script_yaml("Quake", &[], &[]))])
        .holding_fetches();
    let interpreters = ScriptedInterpreterFactory::default().plan(
        "Quake",
        vec![ScriptedCreate::Ready(ScriptedSetup::default())],
    );
    let env = TestEnv::new(scripts, interpreters, ScriptedTransport::default());
    let probe = OutcomeProbe::default();

    UnattendedInstall::new(env.env(), InstallRequest::remote("quake", None), probe.signal())
        .start();

    assert!(probe.outcomes().is_empty());
    assert_eq!(env.scripts.fetches(), vec![("quake".to_string(), None)]);
    assert_eq!(
        env.status.lines(),
        vec!["Waiting for response from https://lutris.net"]
    );
    assert!(env.interpreters.journal().events.is_empty());

    env.scripts.release_fetches();

    assert_eq!(probe.outcomes(), vec![InstallOutcome::Succeeded]);
    assert_eq!(env.status.last().as_deref(), Some("finished install"));
}

#[test]
fn announced_folder_is_the_one_the_interpreter_accepted() {
    let (_dir, script) = script_file(&script_yaml("Quake", &[], &[]));
    let interpreters = ScriptedInterpreterFactory::default().plan(
        "Quake",
        vec![ScriptedCreate::Ready(ScriptedSetup {
            creates_own_folder: true,
            accepted_target: Some(PathBuf::from("/opt/quake-1")),
            ..ScriptedSetup::default()
        })],
    );
    let env = TestEnv::new(
        MemoryScriptSource::default(),
        interpreters,
        ScriptedTransport::default(),
    );

    let request = InstallRequest::local(&script).with_install_path("/opt/quake");
    assert_eq!(run_local(&env, request), InstallOutcome::Succeeded);

    let lines = env.status.lines();
    assert!(lines.contains(&"Install folder /opt/quake-1".to_string()));
    assert!(!lines.contains(&"Install folder /opt/quake".to_string()));
}
