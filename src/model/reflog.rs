//! Reflog model for `git log -g` output

/// One entry of the HEAD reflog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflogEntry {
    /// Selector (e.g., "HEAD@{0}")
    pub selector: String,
    /// Commit HEAD pointed at after the entry
    pub sha: String,
    /// Unix timestamp of the entry
    pub time: i64,
    /// Reflog message (e.g., "rebase (finish): returning to refs/heads/main")
    pub action: String,
}

impl ReflogEntry {
    /// Whether the entry was written by an aborted rebase
    pub fn is_abort(&self) -> bool {
        self.action.contains("(abort)")
    }

    /// Whether the entry was written by a finished rebase
    pub fn is_rebase_finish(&self) -> bool {
        self.action.starts_with("rebase") && self.action.contains("(finish)")
    }
}
