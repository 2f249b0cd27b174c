//! Repository side effects of operations
//!
//! Effects are produced on the control loop and executed on the worker.

use crate::git::constants::{DEFAULT_COMMENT_CHAR, errors};
use crate::git::parser::Parser;
use crate::git::{GitError, Repository, ResetMode, ResetRequest, RewriteBase, RewriteOptions};
use crate::model::{SessionKind, TodoItem, TodoKind};

/// Upper bound on automatic skip/continue steps after one command
const MAX_AUTO_STEPS: usize = 16;

/// What has to happen in the repository for an operation to take effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Replace the todo file of the running rebase
    WriteTodo { text: String },
    /// Start a one-off interactive rebase
    StartRewrite { base: RewriteBase, todo: String },
    AmendHeadMessage { message: String },
    /// Stop at a commit with `edit`, amend its message, continue
    RewordViaRebase {
        base: RewriteBase,
        todo: String,
        message: String,
    },
    Skip { kind: SessionKind },
    /// Hard reset without autostash (drop the commit stopped on)
    ResetHard { sha: String },
    Revert { shas: Vec<String> },
    CherryPick { shas: Vec<String> },
    /// Commit the staged changes as a fixup of `target`, then squash it in
    ///
    /// `todo` picks the commits down to `target`; the fixup line is added once
    /// the fixup commit exists.
    AmendTo {
        target: String,
        base: RewriteBase,
        todo: String,
    },
    Checkout { target: String, autostash: bool },
    Continue { kind: SessionKind, stage_all: bool },
    Abort { kind: SessionKind },
    ResetTo(ResetRequest),
}

/// Effect without its payload, for summaries and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    None,
    WriteTodo,
    StartRewrite,
    AmendHeadMessage,
    RewordViaRebase,
    Skip,
    ResetHard,
    Revert,
    CherryPick,
    AmendTo,
    Checkout,
    Continue,
    Abort,
    ResetTo,
}

impl Effect {
    pub fn kind(&self) -> EffectKind {
        match self {
            Effect::None => EffectKind::None,
            Effect::WriteTodo { .. } => EffectKind::WriteTodo,
            Effect::StartRewrite { .. } => EffectKind::StartRewrite,
            Effect::AmendHeadMessage { .. } => EffectKind::AmendHeadMessage,
            Effect::RewordViaRebase { .. } => EffectKind::RewordViaRebase,
            Effect::Skip { .. } => EffectKind::Skip,
            Effect::ResetHard { .. } => EffectKind::ResetHard,
            Effect::Revert { .. } => EffectKind::Revert,
            Effect::CherryPick { .. } => EffectKind::CherryPick,
            Effect::AmendTo { .. } => EffectKind::AmendTo,
            Effect::Checkout { .. } => EffectKind::Checkout,
            Effect::Continue { .. } => EffectKind::Continue,
            Effect::Abort { .. } => EffectKind::Abort,
            Effect::ResetTo(_) => EffectKind::ResetTo,
        }
    }

    /// Effects that rewrite history when run with no session in progress
    pub fn rewrites_history(&self) -> bool {
        matches!(
            self,
            Effect::StartRewrite { .. }
                | Effect::RewordViaRebase { .. }
                | Effect::Revert { .. }
                | Effect::CherryPick { .. }
                | Effect::AmendTo { .. }
                | Effect::ResetTo(_)
        )
    }
}

/// How a command run ended, after automatic skip/continue steps
#[derive(Debug)]
pub enum RunOutcome {
    Completed,
    Conflict,
    Failed(GitError),
}

/// Whether command output reports a stop on conflicts
pub fn is_conflict_output(output: &str) -> bool {
    errors::CONFLICT_PATTERNS
        .iter()
        .any(|pattern| output.contains(pattern))
}

/// Execute an effect and classify the result
pub fn run<R: Repository + ?Sized>(repo: &R, effect: &Effect) -> RunOutcome {
    let result = match effect {
        Effect::None => Ok(()),
        Effect::WriteTodo { text } => repo.write_instruction_file(text),
        Effect::StartRewrite { base, todo } => repo.invoke_rewrite(&RewriteOptions {
            base: base.clone(),
            todo: todo.clone(),
            autostash: true,
        }),
        Effect::AmendHeadMessage { message } => repo.amend_head_message(message),
        Effect::RewordViaRebase {
            base,
            todo,
            message,
        } => repo
            .invoke_rewrite(&RewriteOptions {
                base: base.clone(),
                todo: todo.clone(),
                autostash: true,
            })
            .and_then(|_| repo.amend_head_message(message))
            .and_then(|_| repo.continue_operation(SessionKind::Rebase)),
        Effect::Skip { kind } => repo.skip_operation(*kind),
        Effect::ResetHard { sha } => repo.reset(&ResetRequest {
            sha: sha.clone(),
            mode: ResetMode::Hard,
            autostash: false,
            reflog_action: None,
        }),
        Effect::Revert { shas } => repo.revert(shas),
        Effect::CherryPick { shas } => repo.cherry_pick(shas),
        Effect::AmendTo { target, base, todo } => repo.commit_fixup(target).and_then(|_| {
            let fixup = repo.current_head()?.sha;
            repo.invoke_rewrite(&RewriteOptions {
                base: base.clone(),
                todo: with_fixup(todo, target, &fixup),
                autostash: true,
            })
        }),
        Effect::Checkout { target, autostash } => repo.checkout(target, *autostash),
        Effect::Continue { kind, stage_all } => {
            let staged = if *stage_all { repo.stage_all() } else { Ok(()) };
            staged.and_then(|_| continue_session(repo, *kind))
        }
        Effect::Abort { kind } => repo.abort_in_progress_operation(*kind),
        Effect::ResetTo(request) => repo.reset(request),
    };
    settle(repo, result)
}

/// Insert `fixup <fixup>` right after the line picking `target`
fn with_fixup(todo: &str, target: &str, fixup: &str) -> String {
    let mut items = Parser::parse_todo(todo, DEFAULT_COMMENT_CHAR);
    let picked = items
        .iter()
        .position(|item| item.commit.as_deref() == Some(target));
    let subject = picked
        .map(|i| format!("fixup! {}", items[i].subject))
        .unwrap_or_default();
    let at = picked.map_or(items.len(), |i| i + 1);
    items.insert(at, TodoItem::new(TodoKind::Fixup, fixup, subject));
    Parser::serialize_todo(&items)
}

/// Continue a session, concluding a revert or cherry-pick that an `exec`
/// step left behind before the rebase moves on
fn continue_session<R: Repository + ?Sized>(repo: &R, kind: SessionKind) -> Result<(), GitError> {
    if kind == SessionKind::Rebase
        && let Some(nested) = repo.rebase_directory_state()?.nested_sequencer()
    {
        tracing::info!(%nested, "concluding nested session before continuing");
        repo.continue_operation(nested)?;
    }
    repo.continue_operation(kind)
}

/// Classify a command result, skipping or continuing past empty commits
fn settle<R: Repository + ?Sized>(repo: &R, mut result: Result<(), GitError>) -> RunOutcome {
    for _ in 0..MAX_AUTO_STEPS {
        let err = match result {
            Ok(()) => return RunOutcome::Completed,
            Err(err) => err,
        };
        let Some(output) = err.stderr() else {
            return RunOutcome::Failed(err);
        };

        let kind = repo
            .rebase_directory_state()
            .ok()
            .and_then(|state| state.session_kind())
            .unwrap_or(SessionKind::Rebase);

        if output.contains(errors::NOTHING_TO_COMMIT) {
            tracing::info!(%kind, "skipping empty commit");
            result = repo.skip_operation(kind);
        } else if output.contains(errors::EMPTY_CHERRY_PICK) {
            tracing::info!(%kind, "continuing past empty cherry-pick");
            result = repo.continue_operation(kind);
        } else if output.contains(errors::NO_REBASE_IN_PROGRESS) {
            return RunOutcome::Completed;
        } else if is_conflict_output(output)
            || repo.unmerged_paths().is_ok_and(|paths| !paths.is_empty())
        {
            return RunOutcome::Conflict;
        } else {
            return RunOutcome::Failed(err);
        }
    }

    match result {
        Ok(()) => RunOutcome::Completed,
        Err(err) => RunOutcome::Failed(err),
    }
}
