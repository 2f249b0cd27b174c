//! git command execution layer
//!
//! This module handles executing git commands, reading the rebase state
//! directory, and parsing command output.

pub mod constants;
mod executor;
/// Parser module (public for integration testing)
pub mod parser;
mod repository;

pub use executor::GitExecutor;
pub use repository::{
    HeadRef, RebaseDirState, Repository, ResetMode, ResetRequest, RewriteBase, RewriteOptions,
};

use std::io;
use thiserror::Error;

/// Errors that can occur when executing git commands
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git repository")]
    NotARepository,

    #[error("git command failed (exit code {exit_code}): {stderr}")]
    CommandFailed { stderr: String, exit_code: i32 },

    #[error("Failed to parse git output: {0}")]
    ParseError(String),

    #[error("No rebase in progress")]
    NoRebaseInProgress,

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("git is not installed or not in PATH")]
    GitNotFound,
}

impl GitError {
    /// stderr of a failed command, if this is one
    pub fn stderr(&self) -> Option<&str> {
        match self {
            GitError::CommandFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}
