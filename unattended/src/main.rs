//! Command-line front end for unattended installs.
//!
//! Checks ahead of time whether a script can run without a human, and lists
//! the answers such a run needs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use unattended::core::answers::AnswerStore;
use unattended::core::script::Requirements;
use unattended::exit_codes;
use unattended::io::config::load_config;
use unattended::io::script_file::load_script;
use unattended::logging;
use unattended::validate::validate_script;

#[derive(Parser)]
#[command(
    name = "unattended",
    version,
    about = "Headless host for declarative install scripts"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that a script can run unattended with the given answers.
    ///
    /// Also loads the installer configuration so a broken config is caught
    /// before an install uses it; no config value changes the verdict.
    Validate {
        /// Install script (YAML or JSON).
        #[arg(long)]
        script: PathBuf,
        /// Local file for the next file requirement without a source.
        #[arg(long = "file")]
        files: Vec<PathBuf>,
        /// Option id for the next input menu.
        #[arg(long = "option")]
        options: Vec<String>,
        /// Installer configuration (TOML) to check; defaults apply when missing.
        #[arg(long, default_value = "unattended.toml")]
        config: PathBuf,
    },
    /// List the file and menu answers an unattended run needs.
    Requirements {
        /// Install script (YAML or JSON).
        #[arg(long)]
        script: PathBuf,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Validate {
            script,
            files,
            options,
            config,
        } => cmd_validate(&script, files, options, &config),
        Command::Requirements { script, json } => cmd_requirements(&script, json),
    }
}

fn cmd_validate(
    script_path: &Path,
    files: Vec<PathBuf>,
    options: Vec<String>,
    config_path: &Path,
) -> Result<i32> {
    // Checked only: validation itself is independent of config values.
    let config = load_config(config_path).context("load config")?;
    debug!(?config, "config checked");
    let mut script = load_script(script_path)?;
    let answers = AnswerStore::new(files, options);
    match validate_script(&mut script, &answers) {
        Ok(()) => {
            println!("ok");
            Ok(exit_codes::OK)
        }
        Err(err) => {
            println!("{err}");
            Ok(exit_codes::REJECTED)
        }
    }
}

fn cmd_requirements(script_path: &Path, json: bool) -> Result<i32> {
    let script = load_script(script_path)?;
    let requirements = script.requirements();
    if json {
        let payload =
            serde_json::to_string_pretty(&requirements).context("serialize requirements")?;
        println!("{payload}");
    } else {
        print!("{}", render_requirements(&requirements));
    }
    Ok(exit_codes::OK)
}

/// One line per answer, in the order they must be supplied.
fn render_requirements(requirements: &Requirements) -> String {
    let mut out = String::new();
    for file in &requirements.files {
        match &file.prompt {
            Some(prompt) => out.push_str(&format!("file {}: {}\n", file.id, prompt)),
            None => out.push_str(&format!("file {}\n", file.id)),
        }
    }
    for menu in &requirements.menus {
        out.push_str(&format!(
            "option {}: {}\n",
            menu.alias,
            menu.options.join(" | ")
        ));
    }
    if out.is_empty() {
        out.push_str("no answers needed\n");
    }
    out
}
