//! Pre-flight validation of a script against the answers for an unattended run.
//!
//! Runs once, before any side effect. Checks short-circuit on the first
//! failure, in this order: mandatory fields, locally supplied files, menu
//! answers.

use std::path::PathBuf;

use tracing::debug;

use crate::core::answers::AnswerStore;
use crate::core::script::InstallScript;
use crate::error::ValidationError;

/// Normalize `script` and check it can run unattended with `answers`.
pub fn validate_script(
    script: &mut InstallScript,
    answers: &AnswerStore,
) -> Result<(), ValidationError> {
    script.normalize();
    ensure_fields(script)?;
    ensure_files(script, answers.file_paths())?;
    ensure_menu_answers(script, answers.menu_options())?;
    debug!(
        files = answers.file_paths().len(),
        options = answers.menu_options().len(),
        "script validated"
    );
    Ok(())
}

fn ensure_fields(script: &InstallScript) -> Result<(), ValidationError> {
    let fields = [
        ("name", &script.name),
        ("runner", &script.runner),
        ("version", &script.version),
    ];
    for (field, value) in fields {
        if value.is_none() {
            return Err(ValidationError::InvalidScript { field });
        }
    }
    if script.script.is_none() {
        return Err(ValidationError::InvalidScript { field: "script" });
    }
    Ok(())
}

/// Sentinel file requirements must be matched one-to-one by existing files.
fn ensure_files(script: &InstallScript, supplied: &[PathBuf]) -> Result<(), ValidationError> {
    let required = script.sentinel_files().count();
    if required == 0 {
        return Ok(());
    }
    if required != supplied.len() {
        return Err(ValidationError::FileCountMismatch {
            provided: supplied.len(),
            required,
        });
    }
    if let Some(missing) = supplied.iter().find(|path| !path.is_file()) {
        return Err(ValidationError::MissingFile {
            path: missing.clone(),
        });
    }
    Ok(())
}

/// The i-th answer must be an option id of the i-th input menu.
fn ensure_menu_answers(script: &InstallScript, supplied: &[String]) -> Result<(), ValidationError> {
    let menus: Vec<_> = script.input_menus().collect();
    if menus.is_empty() {
        return Ok(());
    }
    if menus.len() != supplied.len() {
        return Err(ValidationError::OptionCountMismatch {
            provided: supplied.len(),
            required: menus.len(),
        });
    }
    for (index, (menu, answer)) in menus.iter().zip(supplied).enumerate() {
        if !menu.offers(answer) {
            return Err(ValidationError::UnknownOption {
                index,
                answer: answer.clone(),
            });
        }
    }
    Ok(())
}
