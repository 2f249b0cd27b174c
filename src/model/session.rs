//! Session state model
//!
//! What history-rewriting operation (if any) the repository is in the middle of.

use std::fmt;

/// Which sequencer operation is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    Rebase,
    Merge,
    Revert,
    CherryPick,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionKind::Rebase => "rebase",
            SessionKind::Merge => "merge",
            SessionKind::Revert => "revert",
            SessionKind::CherryPick => "cherry-pick",
        };
        write!(f, "{name}")
    }
}

/// Progress of an in-flight session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Applying, or paused on an `edit`/`break`/failed `exec`
    Running,
    /// Stopped with unmerged paths
    WaitingOnConflict,
    /// Conflicts are resolved; waiting for the user to continue
    ReadyToContinue,
}

/// Rebase session state, derived from the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Rebasing(Phase),
    Merging(Phase),
    Reverting(Phase),
    CherryPicking(Phase),
}

impl SessionState {
    /// Build a state from its parts
    pub fn new(kind: SessionKind, phase: Phase) -> Self {
        match kind {
            SessionKind::Rebase => SessionState::Rebasing(phase),
            SessionKind::Merge => SessionState::Merging(phase),
            SessionKind::Revert => SessionState::Reverting(phase),
            SessionKind::CherryPick => SessionState::CherryPicking(phase),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    pub fn is_rebasing(&self) -> bool {
        matches!(self, SessionState::Rebasing(_))
    }

    pub fn kind(&self) -> Option<SessionKind> {
        match self {
            SessionState::Idle => None,
            SessionState::Rebasing(_) => Some(SessionKind::Rebase),
            SessionState::Merging(_) => Some(SessionKind::Merge),
            SessionState::Reverting(_) => Some(SessionKind::Revert),
            SessionState::CherryPicking(_) => Some(SessionKind::CherryPick),
        }
    }

    pub fn phase(&self) -> Option<Phase> {
        match self {
            SessionState::Idle => None,
            SessionState::Rebasing(p)
            | SessionState::Merging(p)
            | SessionState::Reverting(p)
            | SessionState::CherryPicking(p) => Some(*p),
        }
    }

    pub fn is_waiting_on_conflict(&self) -> bool {
        self.phase() == Some(Phase::WaitingOnConflict)
    }

    pub fn is_ready_to_continue(&self) -> bool {
        self.phase() == Some(Phase::ReadyToContinue)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind(), self.phase()) {
            (Some(kind), Some(Phase::Running)) => write!(f, "{kind} in progress"),
            (Some(kind), Some(Phase::WaitingOnConflict)) => write!(f, "{kind}: conflicts"),
            (Some(kind), Some(Phase::ReadyToContinue)) => write!(f, "{kind}: ready to continue"),
            _ => write!(f, "idle"),
        }
    }
}
