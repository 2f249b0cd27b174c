//! Undo/redo ledger
//!
//! Two stacks of [`UndoCheckpoint`]s. Recording a new action clears the redo
//! stack. Replaying always targets the recorded hashes, so an undo followed by
//! a redo restores the exact commits that existed before.

use crate::git::constants::reflog;
use crate::git::{ResetMode, ResetRequest};
use crate::model::{ActionKind, UndoCheckpoint, short_sha};

use super::effect::Effect;

/// Which way a checkpoint is replayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replay {
    Undo,
    Redo,
}

impl Replay {
    fn reflog_action(self) -> &'static str {
        match self {
            Replay::Undo => reflog::UNDO_ACTION,
            Replay::Redo => reflog::REDO_ACTION,
        }
    }
}

/// The repository command that replays a checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerAction {
    Reset(ResetRequest),
    Checkout { target: String },
}

impl LedgerAction {
    /// Inverse (undo) or forward (redo) command for a checkpoint
    pub fn for_checkpoint(checkpoint: &UndoCheckpoint, replay: Replay) -> Self {
        let reset = |sha: &str, mode: ResetMode| {
            LedgerAction::Reset(ResetRequest {
                sha: sha.to_string(),
                mode,
                autostash: mode == ResetMode::Hard,
                reflog_action: Some(replay.reflog_action().to_string()),
            })
        };

        match (&checkpoint.kind, replay) {
            (ActionKind::Commit, Replay::Undo) => reset(&checkpoint.sha_before, ResetMode::Soft),
            (ActionKind::Commit, Replay::Redo) => reset(&checkpoint.sha_after, ResetMode::Soft),
            (ActionKind::Rewrite, Replay::Undo) => reset(&checkpoint.sha_before, ResetMode::Hard),
            (ActionKind::Rewrite, Replay::Redo) => reset(&checkpoint.sha_after, ResetMode::Hard),
            (ActionKind::Checkout { previous }, Replay::Undo) => LedgerAction::Checkout {
                target: previous.clone(),
            },
            (ActionKind::Checkout { .. }, Replay::Redo) => LedgerAction::Checkout {
                target: checkpoint.branch_or_ref.clone(),
            },
        }
    }

    /// Confirmation text describing the command in human terms
    pub fn prompt(&self) -> String {
        match self {
            LedgerAction::Reset(ResetRequest {
                sha,
                mode: ResetMode::Hard,
                ..
            }) => format!(
                "Are you sure you want to hard reset to '{}'? An auto-stash will be performed if necessary.",
                short_sha(sha)
            ),
            LedgerAction::Reset(ResetRequest { sha, .. }) => {
                format!("Are you sure you want to soft reset to '{}'?", short_sha(sha))
            }
            LedgerAction::Checkout { target } => {
                format!("Are you sure you want to checkout '{target}'?")
            }
        }
    }

    pub fn into_effect(self) -> Effect {
        match self {
            LedgerAction::Reset(request) => Effect::ResetTo(request),
            LedgerAction::Checkout { target } => Effect::Checkout {
                target,
                autostash: false,
            },
        }
    }
}

/// HEAD hash the repository must be at for a replay to be safe
pub fn expected_head(checkpoint: &UndoCheckpoint, replay: Replay) -> &str {
    match replay {
        Replay::Undo => &checkpoint.sha_after,
        Replay::Redo => &checkpoint.sha_before,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    undo: Vec<UndoCheckpoint>,
    redo: Vec<UndoCheckpoint>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new action; the redo history is discarded
    pub fn record(&mut self, checkpoint: UndoCheckpoint) {
        tracing::debug!(checkpoint = %checkpoint.summary(), "recording checkpoint");
        self.undo.push(checkpoint);
        self.redo.clear();
    }

    /// Checkpoint that the next undo or redo would replay
    pub fn peek(&self, replay: Replay) -> Option<&UndoCheckpoint> {
        match replay {
            Replay::Undo => self.undo.last(),
            Replay::Redo => self.redo.last(),
        }
    }

    /// Move the top checkpoint to the other stack after a successful replay
    pub fn finish(&mut self, replay: Replay) -> Option<UndoCheckpoint> {
        let (from, to) = match replay {
            Replay::Undo => (&mut self.undo, &mut self.redo),
            Replay::Redo => (&mut self.redo, &mut self.undo),
        };
        let checkpoint = from.pop()?;
        to.push(checkpoint.clone());
        Some(checkpoint)
    }

    /// Undoable actions, oldest first
    pub fn undo_stack(&self) -> &[UndoCheckpoint] {
        &self.undo
    }

    /// Redoable actions, oldest first
    pub fn redo_stack(&self) -> &[UndoCheckpoint] {
        &self.redo
    }
}
