//! Undo checkpoint model

use super::commit::short_sha;

/// How a recorded action is reversed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    /// New or amended commit; reversed with a soft reset
    Commit,
    /// History rewrite (rebase, drop, revert); reversed with a hard reset and autostash
    Rewrite,
    /// Branch switch; reversed by checking out `previous`
    Checkout { previous: String },
}

/// Before/after record of one mutating action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoCheckpoint {
    /// Branch the action applied to, or the ref checked out
    pub branch_or_ref: String,
    pub sha_before: String,
    pub sha_after: String,
    pub kind: ActionKind,
    /// Human description of the action (e.g., "drop commit 03")
    pub description: String,
}

impl UndoCheckpoint {
    pub fn new(
        branch_or_ref: impl Into<String>,
        sha_before: impl Into<String>,
        sha_after: impl Into<String>,
        kind: ActionKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            branch_or_ref: branch_or_ref.into(),
            sha_before: sha_before.into(),
            sha_after: sha_after.into(),
            kind,
            description: description.into(),
        }
    }

    /// One-line summary used in logs
    pub fn summary(&self) -> String {
        format!(
            "{} ({} -> {})",
            self.description,
            short_sha(&self.sha_before),
            short_sha(&self.sha_after)
        )
    }
}
