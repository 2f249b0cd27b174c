//! git-specific constants
//!
//! Centralized definitions for git command names, flags, state files, and
//! output patterns.

/// git command binary name
pub const GIT_COMMAND: &str = "git";

/// Unit separator used between fields of formatted output
pub const FIELD_SEPARATOR: char = '\x1f';

/// Comment character used when `core.commentChar` is unset
pub const DEFAULT_COMMENT_CHAR: char = '#';

/// git subcommands
pub mod commands {
    pub const LOG: &str = "log";
    pub const STATUS: &str = "status";
    pub const FOR_EACH_REF: &str = "for-each-ref";
    pub const REV_PARSE: &str = "rev-parse";
    pub const SYMBOLIC_REF: &str = "symbolic-ref";
    pub const MERGE_BASE: &str = "merge-base";
    pub const CONFIG: &str = "config";
    pub const REBASE: &str = "rebase";
    pub const MERGE: &str = "merge";
    pub const REVERT: &str = "revert";
    pub const CHERRY_PICK: &str = "cherry-pick";
    pub const CHECKOUT: &str = "checkout";
    pub const RESET: &str = "reset";
    pub const STASH: &str = "stash";
    pub const ADD: &str = "add";
    pub const COMMIT: &str = "commit";
}

/// git command flags
pub mod flags {
    /// Run as if started in the given directory (global flag)
    pub const REPO_PATH: &str = "-C";
    /// Disable the pager (global flag)
    pub const NO_PAGER: &str = "--no-pager";
    pub const INTERACTIVE: &str = "--interactive";
    pub const AUTOSTASH: &str = "--autostash";
    pub const KEEP_EMPTY: &str = "--keep-empty";
    pub const NO_AUTOSQUASH: &str = "--no-autosquash";
    pub const ROOT: &str = "--root";
    pub const CONTINUE: &str = "--continue";
    pub const SKIP: &str = "--skip";
    pub const ABORT: &str = "--abort";
    pub const SOFT: &str = "--soft";
    pub const HARD: &str = "--hard";
    pub const NO_EDIT: &str = "--no-edit";
    pub const AMEND: &str = "--amend";
    /// Commit staged changes as `fixup! <subject>` of the given commit
    pub const FIXUP: &str = "--fixup";
    pub const ONLY: &str = "--only";
    pub const ALLOW_EMPTY: &str = "--allow-empty";
    pub const MESSAGE: &str = "-m";
    pub const ALL: &str = "-A";
    pub const PORCELAIN: &str = "--porcelain";
    pub const ABSOLUTE_GIT_DIR: &str = "--absolute-git-dir";
    pub const VERIFY: &str = "--verify";
    pub const QUIET: &str = "--quiet";
    pub const SHORT: &str = "--short";
    pub const WALK_REFLOGS: &str = "-g";
    pub const GET: &str = "--get";
}

/// Environment variables passed to git
pub mod env {
    pub const SEQUENCE_EDITOR: &str = "GIT_SEQUENCE_EDITOR";
    pub const EDITOR: &str = "GIT_EDITOR";
    pub const REFLOG_ACTION: &str = "GIT_REFLOG_ACTION";
    /// Forced so error output can be matched
    pub const LC_ALL: &str = "LC_ALL";
    pub const LOCALE: &str = "C";
    /// Editor that accepts the proposed message unchanged
    pub const NOOP_EDITOR: &str = "true";
}

/// Files inside the git directory
pub mod files {
    pub const REBASE_MERGE: &str = "rebase-merge";
    pub const REBASE_APPLY: &str = "rebase-apply";
    pub const TODO: &str = "git-rebase-todo";
    pub const DONE: &str = "done";
    pub const MSGNUM: &str = "msgnum";
    pub const ONTO: &str = "onto";
    pub const ORIG_HEAD: &str = "orig-head";
    pub const HEAD_NAME: &str = "head-name";
    pub const STOPPED_SHA: &str = "stopped-sha";
    pub const AMEND: &str = "amend";
    pub const MERGE_HEAD: &str = "MERGE_HEAD";
    pub const REVERT_HEAD: &str = "REVERT_HEAD";
    pub const CHERRY_PICK_HEAD: &str = "CHERRY_PICK_HEAD";
}

/// Reflog actions written by undo and redo
pub mod reflog {
    pub const UNDO_ACTION: &str = "[restack undo]";
    pub const REDO_ACTION: &str = "[restack redo]";
}

/// Error detection patterns in git output
pub mod errors {
    /// Pattern indicating not a git repository
    pub const NOT_A_REPO: &str = "not a git repository";

    /// Output that means the command stopped on conflicts
    pub const CONFLICT_PATTERNS: &[&str] = &[
        "Failed to merge in the changes",
        "When you have resolved this problem",
        "fix conflicts",
        "Resolve all conflicts manually",
        "Merge conflict in file",
    ];

    /// A picked commit became empty; skipping it moves on
    pub const NOTHING_TO_COMMIT: &str = "No changes - did you forget to use";

    /// The previous cherry-pick is empty; continuing moves on
    pub const EMPTY_CHERRY_PICK: &str = "The previous cherry-pick is now empty";

    /// Continue/abort raced with the rebase finishing
    pub const NO_REBASE_IN_PROGRESS: &str = "No rebase in progress?";
}
