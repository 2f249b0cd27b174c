//! Reflog parser (git log -g --format=%gd%x1f%H%x1f%ct%x1f%gs)

use super::super::GitError;
use super::super::constants::FIELD_SEPARATOR;
use crate::model::ReflogEntry;

use super::Parser;

impl Parser {
    pub fn parse_reflog(output: &str) -> Result<Vec<ReflogEntry>, GitError> {
        let mut entries = Vec::new();

        for line in output.lines().filter(|l| !l.is_empty()) {
            let fields: Vec<&str> = line.splitn(4, FIELD_SEPARATOR).collect();
            if fields.len() < 4 {
                return Err(GitError::ParseError(format!(
                    "Expected 4 fields in reflog line: {}",
                    line
                )));
            }
            let time = fields[2].trim().parse::<i64>().map_err(|e| {
                GitError::ParseError(format!("Invalid reflog timestamp '{}': {}", fields[2], e))
            })?;
            entries.push(ReflogEntry {
                selector: fields[0].to_string(),
                sha: fields[1].to_string(),
                time,
                action: fields[3].to_string(),
            });
        }

        Ok(entries)
    }
}
