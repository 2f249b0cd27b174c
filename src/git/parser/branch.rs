//! Branch list parser (git for-each-ref refs/heads)
//!
//! Format: `%(refname)%09%(objectname)%09%(HEAD)`

use super::super::GitError;
use crate::model::Branch;

use super::Parser;

impl Parser {
    pub fn parse_branches(output: &str) -> Result<Vec<Branch>, GitError> {
        output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let fields: Vec<&str> = line.split('\t').collect();
                if fields.len() < 3 {
                    return Err(GitError::ParseError(format!(
                        "Expected 3 fields in branch line: {}",
                        line
                    )));
                }
                let name = fields[0].strip_prefix("refs/heads/").unwrap_or(fields[0]);
                Ok(Branch {
                    name: name.to_string(),
                    sha: fields[1].to_string(),
                    is_head: fields[2].trim() == "*",
                })
            })
            .collect()
    }
}
