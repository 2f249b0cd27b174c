//! Commit model for `git log` output

/// A commit below the pending part of a plan (or any commit when idle)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Commit {
    /// Full commit hash
    pub sha: String,
    /// First line of the message
    pub subject: String,
    /// Parent hashes (empty for a root commit)
    pub parents: Vec<String>,
}

impl Commit {
    pub fn new(sha: impl Into<String>, subject: impl Into<String>, parents: Vec<String>) -> Self {
        Self {
            sha: sha.into(),
            subject: subject.into(),
            parents,
        }
    }

    /// Get short hash for display (first 8 chars)
    pub fn short_sha(&self) -> &str {
        short_sha(&self.sha)
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// First parent, if any
    pub fn parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }
}

/// Abbreviate a hash to 8 characters
pub fn short_sha(sha: &str) -> &str {
    &sha[..8.min(sha.len())]
}
