//! Status output parser (git status --porcelain)

use regex::Regex;
use std::sync::LazyLock;

use super::super::GitError;
use crate::model::FileStatus;

use super::Parser;

/// Regex for a porcelain v1 line: `XY <path>` or `XY <from> -> <to>`
///
/// Groups:
/// 1. index status
/// 2. work tree status
/// 3. path (rename source included)
static STATUS_LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.)(.) (.+)$").expect("Invalid status line regex"));

impl Parser {
    pub fn parse_status(output: &str) -> Result<Vec<FileStatus>, GitError> {
        let mut files = Vec::new();

        for line in output.lines() {
            if line.is_empty() {
                continue;
            }
            let caps = STATUS_LINE_REGEX.captures(line).ok_or_else(|| {
                GitError::ParseError(format!("Unrecognized status line: {}", line))
            })?;
            let path = &caps[3];
            let path = path.split_once(" -> ").map_or(path, |(_, to)| to);
            files.push(FileStatus {
                path: path.to_string(),
                index: caps[1].chars().next().unwrap_or(' '),
                worktree: caps[2].chars().next().unwrap_or(' '),
            });
        }

        Ok(files)
    }
}
