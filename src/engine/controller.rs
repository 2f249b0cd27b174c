//! Rebase session controller
//!
//! Derives the session state and the plan purely from what the repository
//! reports. Nothing here trusts state cached from an earlier read: git (or
//! the user running git directly) may have advanced or abandoned the session.

use crate::git::RebaseDirState;
use crate::git::parser::Parser;
use crate::model::{
    Commit, CurrentStop, Phase, RebasePlan, SessionKind, SessionState, StopReason, TodoItem,
    TodoKind,
};

/// Session state from the rebase directory and the unmerged path list
pub fn derive_state(dir: &RebaseDirState, unmerged: &[String], comment_char: char) -> SessionState {
    let Some(kind) = dir.session_kind() else {
        return SessionState::Idle;
    };

    let phase = if !unmerged.is_empty() {
        Phase::WaitingOnConflict
    } else if kind != SessionKind::Rebase || dir.is_apply {
        // These only stop on conflicts
        Phase::ReadyToContinue
    } else if dir.nested_sequencer().is_some() || stopped_on_conflict(dir, comment_char) {
        Phase::ReadyToContinue
    } else {
        Phase::Running
    };

    SessionState::new(kind, phase)
}

/// The rebase stopped because the last applied item conflicted
///
/// git records `stopped-sha` for every stop on a commit and additionally
/// `amend` when the stop was requested with `edit`.
fn stopped_on_conflict(dir: &RebaseDirState, comment_char: char) -> bool {
    if dir.amend.is_some() || dir.stopped_sha.is_none() {
        return false;
    }
    Parser::parse_done_last(&dir.done, comment_char).is_some_and(|item| item.is_commit())
}

/// Rebuild the plan from the rebase directory and the commits below HEAD
pub fn build_plan(
    dir: &RebaseDirState,
    unmerged: &[String],
    commits: Vec<Commit>,
    comment_char: char,
) -> RebasePlan {
    if !dir.in_progress {
        return RebasePlan::idle(commits);
    }

    let mut todos = Parser::parse_todo(&dir.todo, comment_char);
    todos.reverse();
    let current = stop_entry(dir, unmerged, comment_char);
    RebasePlan::rebasing(todos, current, commits, dir.onto.clone())
}

/// The not-yet-committed item the rebase is parked on, if any
fn stop_entry(dir: &RebaseDirState, unmerged: &[String], comment_char: char) -> Option<CurrentStop> {
    let last: TodoItem = Parser::parse_done_last(&dir.done, comment_char)?;
    if last.kind == TodoKind::Exec {
        // A successful exec never leaves the rebase stopped on it
        return Some(CurrentStop {
            item: last,
            reason: StopReason::FailedExec,
        });
    }
    let conflicted = dir.amend.is_none() && (dir.stopped_sha.is_some() || !unmerged.is_empty());
    (last.is_commit() && conflicted).then_some(CurrentStop {
        item: last,
        reason: StopReason::Conflict,
    })
}
