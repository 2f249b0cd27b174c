//! User-level operations and their results

use super::effect::EffectKind;
use super::prompt::Prompt;

/// Contiguous run of rows in the displayed list (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRange {
    pub start: usize,
    pub end: usize,
}

impl SelectionRange {
    /// Range between two rows, in either order
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn single(index: usize) -> Self {
        Self {
            start: index,
            end: index,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.end).contains(&index)
    }

    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// Which fixup commits `SquashFixups` folds in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixupScope {
    /// Fixups above (and targeting) the selected commit
    AboveSelected,
    /// Every fixup on the current branch since it left the main branch
    CurrentBranch,
}

/// A user gesture on the commit list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Drop the selection; `confirmed` after the user accepted the warning
    Drop { confirmed: bool },
    /// Fold into the commit below, discarding the message
    Fixup,
    /// Fold into the commit below, keeping this commit's message
    FixupKeepMessage,
    /// Fold into the commit below, concatenating messages
    Squash,
    /// Reset pending todos to `pick`
    Pick,
    Reword { message: String },
    MoveUp,
    MoveDown,
    /// Start an interactive rebase stopping at the selection
    Edit,
    /// Start an interactive rebase from an inferred base
    QuickStart,
    SquashFixups { scope: FixupScope },
    InsertUpdateRef { branch: String },
    Revert,
    /// Fold the staged changes into the selected commit
    AmendTo,
    /// Move the commits of the current branch onto another ref
    RebaseBranch { onto: String },
    /// Apply commits from elsewhere on top of HEAD, oldest first
    CherryPick { commits: Vec<String> },
}

impl Operation {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Drop { .. } => "drop",
            Operation::Fixup => "fixup",
            Operation::FixupKeepMessage => "fixup -C",
            Operation::Squash => "squash",
            Operation::Pick => "pick",
            Operation::Reword { .. } => "reword",
            Operation::MoveUp => "move up",
            Operation::MoveDown => "move down",
            Operation::Edit => "edit",
            Operation::QuickStart => "quick start",
            Operation::SquashFixups { .. } => "squash fixups",
            Operation::InsertUpdateRef { .. } => "insert update-ref",
            Operation::Revert => "revert",
            Operation::AmendTo => "amend to",
            Operation::RebaseBranch { .. } => "rebase onto",
            Operation::CherryPick { .. } => "cherry-pick",
        }
    }

    /// Operations that pick their own range and ignore the selection
    pub fn ignores_selection(&self) -> bool {
        matches!(
            self,
            Operation::QuickStart
                | Operation::SquashFixups {
                    scope: FixupScope::CurrentBranch
                }
                | Operation::RebaseBranch { .. }
                | Operation::CherryPick { .. }
        )
    }

    /// Operations whose base is found through the configured main branches
    pub fn uses_main_bases(&self) -> bool {
        matches!(
            self,
            Operation::QuickStart
                | Operation::SquashFixups {
                    scope: FixupScope::CurrentBranch
                }
        )
    }
}

/// How an applied operation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Pending todos were rewritten
    Updated,
    /// git finished; no session in progress
    Completed,
    /// git paused (edit, break, failed exec) and waits for the user
    Stopped,
    /// git stopped on conflicts
    Conflict,
    /// Nothing to do (e.g. moving past the boundary)
    NoOp,
    /// A confirmation prompt was raised instead of acting
    Prompted(Prompt),
}

/// Result of a successful operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanChangeSummary {
    pub message: String,
    pub effect: EffectKind,
    pub outcome: Outcome,
}

impl PlanChangeSummary {
    pub fn no_op(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            effect: EffectKind::None,
            outcome: Outcome::NoOp,
        }
    }
}
