//! Local branch model for `git for-each-ref refs/heads`

/// A local branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    /// Short name (e.g., "main", "feature/x")
    pub name: String,
    /// Commit the branch points at
    pub sha: String,
    /// Whether HEAD is attached to this branch
    pub is_head: bool,
}

impl Branch {
    /// Full ref name (`refs/heads/<name>`)
    pub fn full_ref(&self) -> String {
        format!("refs/heads/{}", self.name)
    }
}
