//! Rebase todo file parser and serializer
//!
//! Format, one instruction per line:
//! ```text
//! pick 1fc6c95 Patch A
//! fixup -C 6b2481b Patch B
//! exec make test
//! update-ref refs/heads/topic
//! # comment
//! ```

use regex::Regex;
use std::sync::LazyLock;

use super::{Parser, split_first_token};
use crate::model::{TodoItem, TodoKind};

/// Regex for a todo line: `<verb> <arguments>`
///
/// Groups:
/// 1. verb (first token)
/// 2. arguments (rest of the line, trailing whitespace removed)
static TODO_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\S+)(?:\s+(.*?))?\s*$").expect("Invalid todo line regex")
});

impl Parser {
    /// Parse todo file text into items, in file order
    ///
    /// Never fails: comments, blank lines and lines with an unknown verb become
    /// `Comment` items carrying the original text.
    pub fn parse_todo(text: &str, comment_char: char) -> Vec<TodoItem> {
        text.lines()
            .map(|line| Self::parse_todo_line(line, comment_char))
            .collect()
    }

    /// Last instruction of a `done` file, ignoring comments
    pub fn parse_done_last(text: &str, comment_char: char) -> Option<TodoItem> {
        Self::parse_todo(text, comment_char)
            .into_iter()
            .rev()
            .find(|item| item.kind != TodoKind::Comment)
    }

    /// Serialize items (file order) to todo file text
    pub fn serialize_todo(items: &[TodoItem]) -> String {
        let mut out = String::new();
        for item in items {
            out.push_str(&Self::serialize_todo_line(item));
            out.push('\n');
        }
        out
    }

    pub fn parse_todo_line(line: &str, comment_char: char) -> TodoItem {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(comment_char) {
            return TodoItem::comment(line);
        }

        let Some(caps) = TODO_LINE_REGEX.captures(line) else {
            return TodoItem::comment(line);
        };
        let verb = caps.get(1).map_or("", |m| m.as_str());
        let rest = caps.get(2).map_or("", |m| m.as_str());

        let Some(kind) = TodoKind::from_verb(verb) else {
            return TodoItem::comment(line);
        };

        let parsed = match kind {
            TodoKind::Fixup => Self::parse_fixup(rest),
            TodoKind::Exec => (!rest.is_empty()).then(|| TodoItem::exec(rest)),
            TodoKind::UpdateRef => {
                let (target, _) = split_first_token(rest);
                (!target.is_empty()).then(|| TodoItem::update_ref(target))
            }
            TodoKind::Label | TodoKind::Reset => {
                (!rest.is_empty()).then(|| TodoItem::labelled(kind, rest))
            }
            TodoKind::Merge => Self::parse_merge(rest),
            TodoKind::Break => Some(TodoItem::bare(TodoKind::Break)),
            _ => Self::parse_commit_args(kind, rest),
        };

        parsed.unwrap_or_else(|| TodoItem::comment(line))
    }

    pub fn serialize_todo_line(item: &TodoItem) -> String {
        let commit = item.commit.as_deref().unwrap_or_default();
        match item.kind {
            TodoKind::Comment => item.raw.clone().unwrap_or_default(),
            TodoKind::Exec => {
                format!("exec {}", item.exec_command.as_deref().unwrap_or_default())
            }
            TodoKind::UpdateRef => format!(
                "update-ref {}",
                item.target_ref.as_deref().unwrap_or_default()
            ),
            TodoKind::Label | TodoKind::Reset => format!(
                "{} {}",
                item.kind.verb(),
                item.label.as_deref().unwrap_or_default()
            ),
            TodoKind::Break => "break".to_string(),
            TodoKind::Merge => {
                let mut line = String::from("merge");
                if item.commit.is_some() {
                    let flag = if item.edit_message { "-c" } else { "-C" };
                    line.push_str(&format!(" {flag} {commit}"));
                }
                if let Some(label) = &item.label {
                    line.push(' ');
                    line.push_str(label);
                }
                if !item.subject.is_empty() {
                    line.push_str(" # ");
                    line.push_str(&item.subject);
                }
                line
            }
            TodoKind::FixupUseOwnMessage => {
                let flag = if item.edit_message { "-c" } else { "-C" };
                with_subject(format!("fixup {flag} {commit}"), &item.subject)
            }
            kind => with_subject(format!("{} {commit}", kind.verb()), &item.subject),
        }
    }

    /// `<sha> [# ]<subject>`
    fn parse_commit_args(kind: TodoKind, rest: &str) -> Option<TodoItem> {
        let (sha, subject) = split_first_token(rest);
        if sha.is_empty() {
            return None;
        }
        Some(TodoItem::new(kind, sha, strip_subject_marker(subject)))
    }

    /// `[-C|-c] <sha> <subject>`
    fn parse_fixup(rest: &str) -> Option<TodoItem> {
        let (first, after) = split_first_token(rest);
        match first {
            "-C" | "-c" => {
                let mut item = Self::parse_commit_args(TodoKind::FixupUseOwnMessage, after)?;
                item.edit_message = first == "-c";
                Some(item)
            }
            _ => Self::parse_commit_args(TodoKind::Fixup, rest),
        }
    }

    /// `[-C|-c <sha>] <label> [# <subject>]`
    fn parse_merge(rest: &str) -> Option<TodoItem> {
        let (first, after) = split_first_token(rest);
        let mut item = TodoItem::bare(TodoKind::Merge);
        let remainder = match first {
            "-C" | "-c" => {
                let (sha, after_sha) = split_first_token(after);
                if sha.is_empty() {
                    return None;
                }
                item.commit = Some(sha.to_string());
                item.edit_message = first == "-c";
                after_sha
            }
            _ => rest,
        };
        let (label, subject) = split_first_token(remainder);
        if label.is_empty() {
            return None;
        }
        item.label = Some(label.to_string());
        item.subject = strip_subject_marker(subject).to_string();
        Some(item)
    }
}

/// Newer git writes `pick <sha> # <subject>`
fn strip_subject_marker(subject: &str) -> &str {
    subject
        .strip_prefix("# ")
        .or_else(|| subject.strip_prefix('#'))
        .unwrap_or(subject)
        .trim()
}

fn with_subject(mut line: String, subject: &str) -> String {
    if !subject.is_empty() {
        line.push(' ');
        line.push_str(subject);
    }
    line
}
