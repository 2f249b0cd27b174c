//! Rebase plan model
//!
//! The pending todo items of a rebase plus the finalized commits below them.
//!
//! Pending items are kept in display order: newest first, the reverse of the
//! todo file. Labels, resets and comments are kept in place so the file can be
//! written back unchanged, but they are not part of the displayed list.
//!
//! Displayed list: visible todos, then the stop entry (if any), then commits
//! with HEAD first.

use std::ops::Range;

use super::commit::Commit;
use super::todo::{TodoItem, TodoKind};

/// Why the rebase is parked on an item that has not been committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Applying the item produced conflicts
    Conflict,
    /// The `exec` command exited non-zero
    FailedExec,
}

/// The item the rebase is stopped on when it is not a finished commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentStop {
    pub item: TodoItem,
    pub reason: StopReason,
}

/// One row of the displayed list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEntry<'a> {
    /// Pending todo (index into the plan's todos)
    Todo { index: usize, item: &'a TodoItem },
    /// Conflicted pick or failed exec the rebase is stopped on
    Current(&'a CurrentStop),
    /// Finalized commit (index into the plan's commits)
    Commit { index: usize, commit: &'a Commit },
}

/// What an `update-ref` item will point at when it is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// The commit produced by the pending item with this hash
    Commit(String),
    /// The commit HEAD is at when the item is reached
    Head,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RebasePlan {
    todos: Vec<TodoItem>,
    current: Option<CurrentStop>,
    commits: Vec<Commit>,
    base: Option<String>,
    rebasing: bool,
}

impl RebasePlan {
    /// Plan with no rebase in progress: only finalized commits
    pub fn idle(commits: Vec<Commit>) -> Self {
        Self {
            commits,
            ..Default::default()
        }
    }

    /// Plan of an in-progress rebase
    ///
    /// `todos` must already be in display order.
    pub fn rebasing(
        todos: Vec<TodoItem>,
        current: Option<CurrentStop>,
        commits: Vec<Commit>,
        base: Option<String>,
    ) -> Self {
        Self {
            todos,
            current,
            commits,
            base,
            rebasing: true,
        }
    }

    /// Plan built from todo items in file order (oldest first)
    pub fn from_file_order(items: Vec<TodoItem>, commits: Vec<Commit>) -> Self {
        let mut todos = items;
        todos.reverse();
        Self::rebasing(todos, None, commits, None)
    }

    pub fn todos(&self) -> &[TodoItem] {
        &self.todos
    }

    pub fn current(&self) -> Option<&CurrentStop> {
        self.current.as_ref()
    }

    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    /// Commit the rebase started from (`onto`), when known
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn is_rebasing(&self) -> bool {
        self.rebasing
    }

    /// Pending items in todo file order
    pub fn file_order(&self) -> Vec<TodoItem> {
        self.todos.iter().rev().cloned().collect()
    }

    pub fn item_at(&self, index: usize) -> Option<&TodoItem> {
        self.todos.get(index)
    }

    /// Replace the todos in `range` with `items`; everything outside keeps its order
    pub fn replace_range(&mut self, range: Range<usize>, items: Vec<TodoItem>) {
        let end = range.end.min(self.todos.len());
        let start = range.start.min(end);
        self.todos.splice(start..end, items);
    }

    /// Move one todo so that it ends up at index `to`
    pub fn move_item(&mut self, from: usize, to: usize) {
        if from >= self.todos.len() || to >= self.todos.len() || from == to {
            return;
        }
        let item = self.todos.remove(from);
        self.todos.insert(to, item);
    }

    /// Plan indices of the listed todos, top to bottom
    pub fn visible_todo_indices(&self) -> Vec<usize> {
        self.todos
            .iter()
            .enumerate()
            .filter(|(_, item)| item.kind.is_visible())
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of listed todos
    pub fn pending_len(&self) -> usize {
        self.todos.iter().filter(|item| item.kind.is_visible()).count()
    }

    pub fn display_len(&self) -> usize {
        self.pending_len() + usize::from(self.current.is_some()) + self.commits.len()
    }

    /// Display index of the "YOU ARE HERE" row
    pub fn find_cursor(&self) -> Option<usize> {
        if self.rebasing && (self.current.is_some() || !self.commits.is_empty()) {
            Some(self.pending_len())
        } else {
            None
        }
    }

    pub fn entry_at(&self, display_index: usize) -> Option<DisplayEntry<'_>> {
        let visible = self.visible_todo_indices();
        if let Some(&index) = visible.get(display_index) {
            return Some(DisplayEntry::Todo {
                index,
                item: &self.todos[index],
            });
        }
        let mut rest = display_index - visible.len();
        if let Some(current) = &self.current {
            if rest == 0 {
                return Some(DisplayEntry::Current(current));
            }
            rest -= 1;
        }
        self.commits
            .get(rest)
            .map(|commit| DisplayEntry::Commit {
                index: rest,
                commit,
            })
    }

    /// The displayed list, top to bottom
    pub fn entries(&self) -> Vec<DisplayEntry<'_>> {
        (0..self.display_len())
            .filter_map(|i| self.entry_at(i))
            .collect()
    }

    /// Plan index of a displayed todo
    pub fn todo_index(&self, display_index: usize) -> Option<usize> {
        self.visible_todo_indices().get(display_index).copied()
    }

    /// Commit index of a displayed finalized commit
    pub fn commit_index(&self, display_index: usize) -> Option<usize> {
        match self.entry_at(display_index)? {
            DisplayEntry::Commit { index, .. } => Some(index),
            _ => None,
        }
    }

    /// Display index of a finalized commit
    pub fn commit_display_index(&self, commit_index: usize) -> usize {
        self.pending_len() + usize::from(self.current.is_some()) + commit_index
    }

    /// Where the `update-ref` item at `index` points: the nearest kept commit below it
    pub fn anchor_of(&self, index: usize) -> Anchor {
        self.todos
            .iter()
            .skip(index + 1)
            .find(|item| item.is_kept_commit())
            .and_then(|item| item.commit.clone())
            .map(Anchor::Commit)
            .unwrap_or(Anchor::Head)
    }

    /// Every `update-ref` target with its anchor, top to bottom
    pub fn anchors(&self) -> Vec<(String, Anchor)> {
        self.todos
            .iter()
            .enumerate()
            .filter(|(_, item)| item.kind == TodoKind::UpdateRef)
            .map(|(i, item)| (item.target_ref.clone().unwrap_or_default(), self.anchor_of(i)))
            .collect()
    }

    /// Hashes of pending commits that will be kept
    pub fn kept_commits(&self) -> Vec<&str> {
        self.todos
            .iter()
            .filter(|item| item.is_kept_commit())
            .filter_map(|item| item.commit.as_deref())
            .collect()
    }
}
