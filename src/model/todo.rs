//! Rebase todo model
//!
//! One instruction of a `git rebase --interactive` plan.

use std::fmt;

/// Kind of a rebase todo line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TodoKind {
    Pick,
    Drop,
    Edit,
    Reword,
    Squash,
    Fixup,
    /// Fixup that explicitly discards this commit's message (same as `Fixup` on disk)
    FixupNoMessage,
    /// Fixup that keeps this commit's message (`fixup -C` / `fixup -c`)
    FixupUseOwnMessage,
    Exec,
    UpdateRef,
    Label,
    Reset,
    Merge,
    Break,
    /// Comment, blank line, or unrecognized line kept verbatim
    Comment,
}

impl TodoKind {
    /// Every kind that has a verb on disk
    pub const ALL: [TodoKind; 14] = [
        TodoKind::Pick,
        TodoKind::Drop,
        TodoKind::Edit,
        TodoKind::Reword,
        TodoKind::Squash,
        TodoKind::Fixup,
        TodoKind::FixupNoMessage,
        TodoKind::FixupUseOwnMessage,
        TodoKind::Exec,
        TodoKind::UpdateRef,
        TodoKind::Label,
        TodoKind::Reset,
        TodoKind::Merge,
        TodoKind::Break,
    ];

    /// The verb written to the todo file
    pub fn verb(self) -> &'static str {
        match self {
            TodoKind::Pick => "pick",
            TodoKind::Drop => "drop",
            TodoKind::Edit => "edit",
            TodoKind::Reword => "reword",
            TodoKind::Squash => "squash",
            TodoKind::Fixup | TodoKind::FixupNoMessage | TodoKind::FixupUseOwnMessage => "fixup",
            TodoKind::Exec => "exec",
            TodoKind::UpdateRef => "update-ref",
            TodoKind::Label => "label",
            TodoKind::Reset => "reset",
            TodoKind::Merge => "merge",
            TodoKind::Break => "break",
            TodoKind::Comment => "",
        }
    }

    /// Classify a leading verb token, accepting git's one-letter abbreviations
    pub fn from_verb(verb: &str) -> Option<Self> {
        let kind = match verb {
            "pick" | "p" => TodoKind::Pick,
            "drop" | "d" => TodoKind::Drop,
            "edit" | "e" => TodoKind::Edit,
            "reword" | "r" => TodoKind::Reword,
            "squash" | "s" => TodoKind::Squash,
            "fixup" | "f" => TodoKind::Fixup,
            "exec" | "x" => TodoKind::Exec,
            "update-ref" | "u" => TodoKind::UpdateRef,
            "label" | "l" => TodoKind::Label,
            "reset" | "t" => TodoKind::Reset,
            "merge" | "m" => TodoKind::Merge,
            "break" | "b" => TodoKind::Break,
            _ => return None,
        };
        Some(kind)
    }

    /// Kinds the user may freely switch between while rebasing
    pub fn is_standard(self) -> bool {
        matches!(
            self,
            TodoKind::Pick
                | TodoKind::Drop
                | TodoKind::Edit
                | TodoKind::Reword
                | TodoKind::Squash
                | TodoKind::Fixup
                | TodoKind::FixupNoMessage
                | TodoKind::FixupUseOwnMessage
        )
    }

    /// Whether lines of this kind name a commit
    pub fn has_commit(self) -> bool {
        self.is_standard() || self == TodoKind::Merge
    }

    /// Whether this kind folds the commit into the one before it
    pub fn is_fixup_like(self) -> bool {
        matches!(
            self,
            TodoKind::Squash
                | TodoKind::Fixup
                | TodoKind::FixupNoMessage
                | TodoKind::FixupUseOwnMessage
        )
    }

    /// Labels, resets and comments stay in the plan but are not listed
    pub fn is_visible(self) -> bool {
        !matches!(self, TodoKind::Label | TodoKind::Reset | TodoKind::Comment)
    }
}

impl fmt::Display for TodoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TodoKind::Comment => write!(f, "#"),
            TodoKind::FixupUseOwnMessage => write!(f, "fixup -C"),
            other => write!(f, "{}", other.verb()),
        }
    }
}

/// A single todo line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoItem {
    pub kind: TodoKind,
    /// Commit hash (abbreviated or full, kept as written)
    pub commit: Option<String>,
    /// One-line summary, display only
    pub subject: String,
    /// Ref updated by an `update-ref` line, verbatim (`refs/heads/...`)
    pub target_ref: Option<String>,
    /// Shell text of an `exec` line
    pub exec_command: Option<String>,
    /// Argument of `label`, `reset` and `merge`
    pub label: Option<String>,
    /// `fixup -c`: keep the message and reopen the editor
    pub edit_message: bool,
    /// Original text of comment and unrecognized lines
    pub raw: Option<String>,
}

impl TodoItem {
    /// Create a commit-bearing item
    pub fn new(kind: TodoKind, commit: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            kind,
            commit: Some(commit.into()),
            subject: subject.into(),
            target_ref: None,
            exec_command: None,
            label: None,
            edit_message: false,
            raw: None,
        }
    }

    pub fn pick(commit: impl Into<String>, subject: impl Into<String>) -> Self {
        Self::new(TodoKind::Pick, commit, subject)
    }

    /// Create an `update-ref` item
    pub fn update_ref(target: impl Into<String>) -> Self {
        Self {
            target_ref: Some(target.into()),
            ..Self::bare(TodoKind::UpdateRef)
        }
    }

    /// Create an `exec` item
    pub fn exec(command: impl Into<String>) -> Self {
        Self {
            exec_command: Some(command.into()),
            ..Self::bare(TodoKind::Exec)
        }
    }

    /// Create a `label` or `reset` item
    pub fn labelled(kind: TodoKind, label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::bare(kind)
        }
    }

    /// Create an opaque pass-through line
    pub fn comment(raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
            ..Self::bare(TodoKind::Comment)
        }
    }

    /// Item of the given kind with no arguments (e.g. `break`)
    pub fn bare(kind: TodoKind) -> Self {
        Self {
            kind,
            commit: None,
            subject: String::new(),
            target_ref: None,
            exec_command: None,
            label: None,
            edit_message: false,
            raw: None,
        }
    }

    /// Copy of this item with a different kind
    pub fn with_kind(&self, kind: TodoKind) -> Self {
        Self {
            kind,
            edit_message: false,
            ..self.clone()
        }
    }

    /// Whether this item names a commit
    pub fn is_commit(&self) -> bool {
        self.kind.has_commit() && self.commit.is_some()
    }

    /// Commit item that will produce a commit (anything but `drop`)
    pub fn is_kept_commit(&self) -> bool {
        self.is_commit() && self.kind != TodoKind::Drop
    }

    /// Short branch name for `update-ref refs/heads/<name>` items
    pub fn branch_name(&self) -> Option<&str> {
        self.target_ref
            .as_deref()
            .map(|r| r.strip_prefix("refs/heads/").unwrap_or(r))
    }

    /// Text shown in the commit list
    pub fn display_text(&self) -> &str {
        match self.kind {
            TodoKind::UpdateRef => self.branch_name().unwrap_or_default(),
            TodoKind::Exec => self.exec_command.as_deref().unwrap_or_default(),
            TodoKind::Label | TodoKind::Reset => self.label.as_deref().unwrap_or_default(),
            TodoKind::Comment => self.raw.as_deref().unwrap_or_default(),
            _ => &self.subject,
        }
    }
}
