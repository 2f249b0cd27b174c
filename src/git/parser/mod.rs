//! git output parser
//!
//! Parses the output from git commands and the rebase todo file into
//! structured data.

mod branch;
mod log;
mod reflog;
mod status;
mod todo;

/// Parser for git command output and todo files
pub struct Parser;

/// Split `"<token> <rest>"` on the first run of whitespace
fn split_first_token(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.find(char::is_whitespace) {
        Some(pos) => (&input[..pos], input[pos..].trim_start()),
        None => (input, ""),
    }
}
