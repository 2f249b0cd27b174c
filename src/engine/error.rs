//! Engine errors
//!
//! [`Rejection`]s are raised before anything touches the repository.
//! [`EngineError`] wraps them together with failures of git itself.

use thiserror::Error;

use crate::git::GitError;

/// Destructive actions that must be re-issued with `confirmed: true`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Dropping the commit the rebase is stopped on
    DropCursor,
    /// Deleting `update-ref` todos
    DeleteUpdateRefs,
}

impl Confirmation {
    pub fn message(self) -> &'static str {
        match self {
            Confirmation::DropCursor => {
                "Are you sure you want to drop the commit the rebase is currently stopped on?"
            }
            Confirmation::DeleteUpdateRefs => {
                "Are you sure you want to delete the selected update-ref todo(s)? This is irreversible except by aborting the rebase."
            }
        }
    }
}

/// Validation failure; the plan and the repository are unchanged
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("Invalid selection")]
    InvalidSelection,

    #[error("When rebasing, this action only works on a selection of TODO commits.")]
    MustSelectTodoCommits,

    #[error("Can't perform this action during a rebase")]
    AlreadyRebasing,

    #[error("You are currently neither rebasing nor merging")]
    NotRebasing,

    #[error("There's no commit below to squash into")]
    NoCommitBelow,

    #[error("This action only works on a single item")]
    SingleItemOnly,

    #[error("Can't reword a commit that is stopped on conflicts")]
    RewordConflict,

    #[error("Changing this kind of rebase todo entry is not allowed")]
    ChangingThisActionIsNotAllowed,

    #[error("{}", .0.message())]
    ConfirmationRequired(Confirmation),

    #[error(
        "Cannot start interactive rebase: the HEAD commit is a merge commit or is present on the main branch, so there is no appropriate base commit to start the rebase from. You can start an interactive rebase from a specific commit by selecting it and using the edit command."
    )]
    CannotQuickStart,

    #[error(
        "Cannot squash commits in current branch: the HEAD commit is a merge commit or is present on the main branch."
    )]
    CannotSquashInCurrentBranch,

    #[error("Can't rewrite history across a merge commit")]
    CannotRewriteMerges,

    #[error("The root commit has no parent to reset to")]
    NoParentCommit,

    #[error("Invalid branch name: '{0}'")]
    InvalidBranchName(String),

    #[error("An update-ref todo for '{0}' already exists")]
    DuplicateUpdateRef(String),

    #[error("Can't revert a commit that has not been applied yet")]
    CannotRevertPendingTodo,

    #[error("There are no staged changes to amend")]
    NothingStaged,

    #[error("Can't rebase a branch onto itself")]
    CannotRebaseOntoItself,

    #[error("No common ancestor with '{0}' among the listed commits")]
    NoCommonAncestor(String),

    #[error("Unknown ref or commit: '{0}'")]
    UnknownRef(String),

    #[error("No commits to cherry-pick")]
    NothingToCherryPick,

    #[error("Can't perform this action while another operation is running")]
    Busy,

    #[error("Can't undo while rebasing")]
    CantUndoWhileRebasing,

    #[error("Can't redo while rebasing")]
    CantRedoWhileRebasing,

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error("HEAD has moved since '{0}'; undo history is out of date")]
    LedgerOutOfDate(String),

    #[error("Conflicts must be resolved before continuing")]
    ConflictsRemain,

    #[error("Nothing to confirm")]
    NoPendingPrompt,
}

/// Errors surfaced by [`Engine`](super::Engine) operations
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// git exited non-zero for a reason other than conflicts; output verbatim
    #[error("{message}")]
    CommandFailed { message: String },

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("Background worker stopped unexpectedly")]
    WorkerStopped,
}

impl EngineError {
    /// The rejection, if this error is one
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            EngineError::Rejected(r) => Some(r),
            _ => None,
        }
    }
}
