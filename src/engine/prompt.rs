//! Confirmation prompts raised by the engine
//!
//! A prompt stays pending until it is confirmed or cancelled; there is no
//! timeout.

use crate::model::UndoCheckpoint;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Conflicts were resolved; continue the session?
    ContinueRebase,
    /// Files changed after the conflicts were resolved; stage them and continue?
    AutoStageAndContinue,
    /// Reverse the checkpoint on top of the undo stack
    Undo {
        checkpoint: UndoCheckpoint,
        message: String,
    },
    /// Re-apply the checkpoint on top of the redo stack
    Redo {
        checkpoint: UndoCheckpoint,
        message: String,
    },
}

impl Prompt {
    pub fn message(&self) -> &str {
        match self {
            Prompt::ContinueRebase => "All merge conflicts resolved. Continue?",
            Prompt::AutoStageAndContinue => {
                "Files have been modified since conflicts were resolved. Auto-stage them and continue?"
            }
            Prompt::Undo { message, .. } | Prompt::Redo { message, .. } => message,
        }
    }

    /// Prompts that belong to the continue handshake
    pub fn is_continue(&self) -> bool {
        matches!(self, Prompt::ContinueRebase | Prompt::AutoStageAndContinue)
    }
}
