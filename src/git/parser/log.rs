//! Log output parser (git log --format=%H%x1f%P%x1f%s)

use super::super::GitError;
use super::super::constants::FIELD_SEPARATOR;
use crate::model::Commit;

use super::Parser;

impl Parser {
    /// Parse `git log` output into commits, newest first
    pub fn parse_log(output: &str) -> Result<Vec<Commit>, GitError> {
        let mut commits = Vec::new();

        for line in output.lines() {
            if line.is_empty() {
                continue;
            }

            let mut fields = line.splitn(3, FIELD_SEPARATOR);
            let (Some(sha), Some(parents), Some(subject)) =
                (fields.next(), fields.next(), fields.next())
            else {
                return Err(GitError::ParseError(format!(
                    "Expected 3 fields in log line: {}",
                    line
                )));
            };

            if sha.is_empty() {
                return Err(GitError::ParseError(format!(
                    "Missing commit hash in log line: {}",
                    line
                )));
            }

            commits.push(Commit {
                sha: sha.to_string(),
                subject: subject.to_string(),
                parents: parents.split_whitespace().map(str::to_string).collect(),
            });
        }

        Ok(commits)
    }
}
