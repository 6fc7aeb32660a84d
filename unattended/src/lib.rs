//! Headless host for declarative install scripts.
//!
//! An external script interpreter drives the install and calls back into this
//! crate whenever it needs a decision a user would normally make: which file
//! to use, which menu option to pick, where to install, or what to do about a
//! missing dependency. Here those decisions are pre-supplied and replayed in
//! the order the interpreter asks for them.
//!
//! - **[`core`]**: Pure data (script model, answer store, outcome types).
//!   No I/O.
//! - **[`io`]**: Collaborator seams and side effects (script files, config,
//!   status output, interpreter and transport traits).
//!
//! Orchestration modules ([`install`], [`validate`], [`download`],
//! [`dependency`]) coordinate core logic with the collaborators.

pub mod core;
pub mod dependency;
pub mod download;
pub mod error;
pub mod exit_codes;
pub mod host;
pub mod install;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod validate;
