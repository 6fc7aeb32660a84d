//! Deterministic data shared by the unattended installer.
//!
//! Core modules must be free of I/O side effects. They hold the script model,
//! the answer store and the outcome/stage/transfer types the orchestration
//! layer passes around.

pub mod answers;
pub mod script;
pub mod types;
