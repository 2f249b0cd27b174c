//! File status data model for `git status --porcelain`

/// Status of a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    /// File path
    pub path: String,

    /// Index (staged) status column
    pub index: char,

    /// Work tree status column
    pub worktree: char,
}

impl FileStatus {
    /// Unmerged entries (`DD`, `AU`, `UD`, `UA`, `DU`, `AA`, `UU`)
    pub fn is_unmerged(&self) -> bool {
        matches!(
            (self.index, self.worktree),
            ('D', 'D') | ('A', 'U') | ('U', 'D') | ('U', 'A') | ('D', 'U') | ('A', 'A') | ('U', 'U')
        )
    }

    pub fn is_untracked(&self) -> bool {
        self.index == '?' && self.worktree == '?'
    }

    /// Changes in the work tree that are not staged (untracked files included)
    pub fn has_unstaged_changes(&self) -> bool {
        if self.is_unmerged() {
            return false;
        }
        self.is_untracked() || self.worktree != ' '
    }

    /// Changes recorded in the index
    pub fn has_staged_changes(&self) -> bool {
        !self.is_unmerged() && !self.is_untracked() && self.index != ' '
    }
}
