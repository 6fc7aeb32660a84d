//! Collaborator seams and side-effecting helpers.

pub mod config;
pub mod interpreter;
pub mod script_file;
pub mod status;
pub mod transport;
