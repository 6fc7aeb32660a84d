//! Pre-supplied answers replayed to interpreter requests.
//!
//! Each sequence has its own read cursor. Cursors only move forward and never
//! pass the end of their sequence; running out of answers means validation
//! let a mismatch through, so callers treat it as an internal fault.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerStore {
    file_paths: Vec<PathBuf>,
    menu_options: Vec<String>,
    file_cursor: usize,
    menu_cursor: usize,
}

impl AnswerStore {
    pub fn new(file_paths: Vec<PathBuf>, menu_options: Vec<String>) -> Self {
        Self {
            file_paths,
            menu_options,
            file_cursor: 0,
            menu_cursor: 0,
        }
    }

    pub fn file_paths(&self) -> &[PathBuf] {
        &self.file_paths
    }

    pub fn menu_options(&self) -> &[String] {
        &self.menu_options
    }

    pub fn file_cursor(&self) -> usize {
        self.file_cursor
    }

    pub fn menu_cursor(&self) -> usize {
        self.menu_cursor
    }

    /// Next unread file answer, without consuming it.
    pub fn peek_file(&self) -> Option<&Path> {
        self.file_paths.get(self.file_cursor).map(PathBuf::as_path)
    }

    /// Mark the file answer returned by [`Self::peek_file`] as used.
    pub fn advance_file(&mut self) {
        if self.file_cursor < self.file_paths.len() {
            self.file_cursor += 1;
        }
    }

    /// Consume the next unread menu answer.
    pub fn next_menu_option(&mut self) -> Option<String> {
        let value = self.menu_options.get(self.menu_cursor)?.clone();
        self.menu_cursor += 1;
        Some(value)
    }
}
