//! Repository facade
//!
//! The reads and writes the engine needs from a repository. [`GitExecutor`]
//! implements it with the git CLI; tests implement it in memory.
//!
//! [`GitExecutor`]: super::GitExecutor

use super::GitError;
use crate::model::{Branch, Commit, ReflogEntry, SessionKind};

/// Where HEAD points
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadRef {
    pub sha: String,
    /// Short branch name, `None` when detached
    pub branch: Option<String>,
}

impl HeadRef {
    /// Branch name, or the hash when detached
    pub fn name(&self) -> &str {
        self.branch.as_deref().unwrap_or(&self.sha)
    }
}

/// Contents of the rebase state directory and sequencer markers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebaseDirState {
    /// `rebase-merge` or `rebase-apply` exists
    pub in_progress: bool,
    /// `rebase-apply`: non-interactive rebase without a todo file
    pub is_apply: bool,
    /// Contents of `git-rebase-todo`
    pub todo: String,
    /// Contents of `done`
    pub done: String,
    /// Number of applied items (`msgnum`)
    pub done_count: usize,
    pub onto: Option<String>,
    pub orig_head: Option<String>,
    /// Branch being rebased (`refs/heads/<name>`)
    pub head_name: Option<String>,
    /// Commit the rebase stopped on
    pub stopped_sha: Option<String>,
    /// Written when stopping on `edit` so the commit can be amended
    pub amend: Option<String>,
    pub merge_head: bool,
    pub revert_head: bool,
    pub cherry_pick_head: bool,
}

impl RebaseDirState {
    /// Which session the markers describe, if any
    pub fn session_kind(&self) -> Option<SessionKind> {
        if self.in_progress {
            Some(SessionKind::Rebase)
        } else if self.merge_head {
            Some(SessionKind::Merge)
        } else if self.revert_head {
            Some(SessionKind::Revert)
        } else if self.cherry_pick_head {
            Some(SessionKind::CherryPick)
        } else {
            None
        }
    }

    /// Revert or cherry-pick started by an `exec` step of the running rebase
    ///
    /// It has to be concluded before the rebase itself can continue.
    pub fn nested_sequencer(&self) -> Option<SessionKind> {
        if !self.in_progress {
            None
        } else if self.revert_head {
            Some(SessionKind::Revert)
        } else if self.cherry_pick_head {
            Some(SessionKind::CherryPick)
        } else {
            None
        }
    }

    /// Short name of the branch being rebased
    pub fn branch(&self) -> Option<&str> {
        self.head_name
            .as_deref()
            .map(|name| name.strip_prefix("refs/heads/").unwrap_or(name))
    }
}

/// Commit an interactive rebase starts from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteBase {
    Commit(String),
    /// Rewrite down to and including the root commit
    Root,
}

/// Arguments of a fresh interactive rebase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOptions {
    pub base: RewriteBase,
    /// Todo file contents to use instead of git's generated plan
    pub todo: String,
    pub autostash: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    Soft,
    Hard,
}

/// Arguments of `git reset`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetRequest {
    pub sha: String,
    pub mode: ResetMode,
    /// Stash local changes around the reset
    pub autostash: bool,
    /// Value for `GIT_REFLOG_ACTION`
    pub reflog_action: Option<String>,
}

/// Operations the engine performs against a repository
pub trait Repository: Send + Sync {
    // ── Reads ─────────────────────────────────────────────────────────

    fn current_head(&self) -> Result<HeadRef, GitError>;

    /// Commits reachable from HEAD, newest first
    fn commits(&self, limit: usize) -> Result<Vec<Commit>, GitError>;

    fn branches(&self) -> Result<Vec<Branch>, GitError>;

    /// HEAD reflog, newest first
    fn reflog_entries(&self, limit: usize) -> Result<Vec<ReflogEntry>, GitError>;

    fn unmerged_paths(&self) -> Result<Vec<String>, GitError>;

    fn has_unstaged_changes(&self) -> Result<bool, GitError>;

    fn has_staged_changes(&self) -> Result<bool, GitError>;

    fn is_working_tree_clean(&self) -> Result<bool, GitError>;

    fn rebase_directory_state(&self) -> Result<RebaseDirState, GitError>;

    /// `core.commentChar`, defaulting to `#`
    fn comment_char(&self) -> Result<char, GitError>;

    /// Resolve a ref or hash to a full commit hash
    fn resolve_ref(&self, name: &str) -> Result<Option<String>, GitError>;

    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>, GitError>;

    // ── Writes ────────────────────────────────────────────────────────

    /// Replace the todo file of the in-progress rebase
    fn write_instruction_file(&self, text: &str) -> Result<(), GitError>;

    /// Start an interactive rebase with a prepared todo file
    ///
    /// Returns `Ok` when the rebase finished or paused on `edit`/`break`.
    fn invoke_rewrite(&self, options: &RewriteOptions) -> Result<(), GitError>;

    fn continue_operation(&self, kind: SessionKind) -> Result<(), GitError>;

    fn skip_operation(&self, kind: SessionKind) -> Result<(), GitError>;

    fn abort_in_progress_operation(&self, kind: SessionKind) -> Result<(), GitError>;

    fn checkout(&self, target: &str, autostash: bool) -> Result<(), GitError>;

    fn reset(&self, request: &ResetRequest) -> Result<(), GitError>;

    fn stage_all(&self) -> Result<(), GitError>;

    /// Replace the message of HEAD, keeping its tree
    fn amend_head_message(&self, message: &str) -> Result<(), GitError>;

    /// Revert commits in the given order, without opening an editor
    fn revert(&self, shas: &[String]) -> Result<(), GitError>;

    /// Apply commits on top of HEAD in the given order
    fn cherry_pick(&self, shas: &[String]) -> Result<(), GitError>;

    /// Commit the staged changes as a `fixup!` of `sha`
    fn commit_fixup(&self, sha: &str) -> Result<(), GitError>;
}
