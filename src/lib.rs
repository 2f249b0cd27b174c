//! restack - interactive rebase engine for git
//!
//! Drives git's history-rewriting operations from a list of commits instead of
//! a hand-edited todo file, with an undo/redo layer over all of it.
//!
//! This library provides:
//! - [`engine`]: Todo rules, session control, undo/redo ledger
//! - [`git`]: git command execution and parsing
//! - [`model`]: Domain models
//! - [`config`]: User configuration
//! - [`logging`]: Log file setup

pub mod config;
pub mod engine;
pub mod git;
pub mod logging;
pub mod model;
