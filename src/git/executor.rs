//! git command executor
//!
//! Handles running git commands, capturing their output, and reading the
//! rebase state directory.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::NamedTempFile;

use super::constants::{self, commands, env, errors, files, flags};
use super::parser::Parser;
use super::repository::{
    HeadRef, RebaseDirState, Repository, ResetMode, ResetRequest, RewriteBase, RewriteOptions,
};
use super::GitError;
use crate::model::{Branch, Commit, ReflogEntry, SessionKind};

/// Executor for git commands
#[derive(Debug, Clone)]
pub struct GitExecutor {
    /// Path to the repository (None = current directory)
    repo_path: Option<PathBuf>,
}

impl Default for GitExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl GitExecutor {
    /// Create a new executor for the current directory
    pub fn new() -> Self {
        Self { repo_path: None }
    }

    /// Create a new executor for a specific repository path
    pub fn with_repo_path(path: PathBuf) -> Self {
        Self {
            repo_path: Some(path),
        }
    }

    /// Run a git command with the given arguments
    pub fn run(&self, args: &[&str]) -> Result<String, GitError> {
        self.run_with_env(args, &[])
    }

    /// Run a git command with extra environment variables
    ///
    /// Always disables the pager and forces the C locale so output can be
    /// matched against known patterns.
    pub fn run_with_env(&self, args: &[&str], envs: &[(&str, &str)]) -> Result<String, GitError> {
        let mut cmd = Command::new(constants::GIT_COMMAND);

        // Add repository path if specified
        if let Some(ref path) = self.repo_path {
            cmd.arg(flags::REPO_PATH).arg(path);
        }

        cmd.arg(flags::NO_PAGER);
        cmd.args(args);
        cmd.env(env::LC_ALL, env::LOCALE);
        for (key, value) in envs {
            cmd.env(key, value);
        }

        tracing::debug!(?args, "running git");

        let output = cmd.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GitError::GitNotFound
            } else {
                GitError::IoError(e)
            }
        })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);

            // Check for common error patterns
            if stderr.contains(errors::NOT_A_REPO) {
                return Err(GitError::NotARepository);
            }

            // rebase and merge report conflicts on stdout
            let combined = if stdout.trim().is_empty() {
                stderr.into_owned()
            } else {
                format!("{}{}", stdout, stderr)
            };
            tracing::debug!(?args, exit_code, "git command failed");
            Err(GitError::CommandFailed {
                stderr: combined,
                exit_code,
            })
        }
    }

    /// Run a command whose non-zero exit means "no result"
    fn run_optional(&self, args: &[&str]) -> Result<Option<String>, GitError> {
        match self.run(args) {
            Ok(out) => Ok(Some(out)),
            Err(GitError::CommandFailed { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Run a command that may open an editor; the proposed text is accepted
    fn run_non_interactive(&self, args: &[&str]) -> Result<String, GitError> {
        self.run_with_env(args, &[(env::EDITOR, env::NOOP_EDITOR)])
    }

    /// Absolute path of the git directory
    pub fn git_dir(&self) -> Result<PathBuf, GitError> {
        let out = self.run(&[commands::REV_PARSE, flags::ABSOLUTE_GIT_DIR])?;
        Ok(PathBuf::from(out.trim()))
    }

    /// Run `git status --porcelain`
    pub fn status_raw(&self) -> Result<String, GitError> {
        self.run(&[commands::STATUS, flags::PORCELAIN])
    }

    /// Whether tracked files have staged or unstaged changes
    fn has_tracked_changes(&self) -> Result<bool, GitError> {
        let out = self.run(&[commands::STATUS, flags::PORCELAIN, "--untracked-files=no"])?;
        Ok(!out.trim().is_empty())
    }

    /// Run `work` with local changes stashed around it
    fn with_autostash<T>(
        &self,
        work: impl FnOnce() -> Result<T, GitError>,
    ) -> Result<T, GitError> {
        if !self.has_tracked_changes()? {
            return work();
        }
        self.run(&[commands::STASH, "push", flags::MESSAGE, "restack autostash"])?;
        let result = work();
        let popped = self.run(&[commands::STASH, "pop"]);
        let value = result?;
        popped?;
        Ok(value)
    }
}

/// Read a state file, trimmed; `None` when missing
fn read_state_file(dir: &Path, name: &str) -> Option<String> {
    fs::read_to_string(dir.join(name))
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl Repository for GitExecutor {
    fn current_head(&self) -> Result<HeadRef, GitError> {
        let sha = self.run(&[commands::REV_PARSE, "HEAD"])?.trim().to_string();
        let branch = self
            .run_optional(&[commands::SYMBOLIC_REF, flags::QUIET, flags::SHORT, "HEAD"])?
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok(HeadRef { sha, branch })
    }

    fn commits(&self, limit: usize) -> Result<Vec<Commit>, GitError> {
        let max = format!("-n{limit}");
        let out = self.run(&[commands::LOG, &max, "--format=%H%x1f%P%x1f%s", "HEAD"])?;
        Parser::parse_log(&out)
    }

    fn branches(&self) -> Result<Vec<Branch>, GitError> {
        let out = self.run(&[
            commands::FOR_EACH_REF,
            "--format=%(refname)%09%(objectname)%09%(HEAD)",
            "refs/heads",
        ])?;
        Parser::parse_branches(&out)
    }

    fn reflog_entries(&self, limit: usize) -> Result<Vec<ReflogEntry>, GitError> {
        let max = format!("-n{limit}");
        let out = self.run_optional(&[
            commands::LOG,
            flags::WALK_REFLOGS,
            &max,
            "--format=%gd%x1f%H%x1f%ct%x1f%gs",
            "HEAD",
        ])?;
        match out {
            Some(out) => Parser::parse_reflog(&out),
            None => Ok(Vec::new()),
        }
    }

    fn unmerged_paths(&self) -> Result<Vec<String>, GitError> {
        let files = Parser::parse_status(&self.status_raw()?)?;
        Ok(files
            .into_iter()
            .filter(|f| f.is_unmerged())
            .map(|f| f.path)
            .collect())
    }

    fn has_unstaged_changes(&self) -> Result<bool, GitError> {
        let files = Parser::parse_status(&self.status_raw()?)?;
        Ok(files.iter().any(|f| f.has_unstaged_changes()))
    }

    fn has_staged_changes(&self) -> Result<bool, GitError> {
        let files = Parser::parse_status(&self.status_raw()?)?;
        Ok(files.iter().any(|f| f.has_staged_changes()))
    }

    fn is_working_tree_clean(&self) -> Result<bool, GitError> {
        Ok(self.status_raw()?.trim().is_empty())
    }

    fn rebase_directory_state(&self) -> Result<RebaseDirState, GitError> {
        let git_dir = self.git_dir()?;
        let merge_dir = git_dir.join(files::REBASE_MERGE);
        let apply_dir = git_dir.join(files::REBASE_APPLY);

        let mut state = RebaseDirState {
            merge_head: git_dir.join(files::MERGE_HEAD).exists(),
            revert_head: git_dir.join(files::REVERT_HEAD).exists(),
            cherry_pick_head: git_dir.join(files::CHERRY_PICK_HEAD).exists(),
            ..Default::default()
        };

        let dir = if merge_dir.is_dir() {
            merge_dir
        } else if apply_dir.is_dir() {
            state.is_apply = true;
            apply_dir
        } else {
            return Ok(state);
        };

        state.in_progress = true;
        state.todo = fs::read_to_string(dir.join(files::TODO)).unwrap_or_default();
        state.done = fs::read_to_string(dir.join(files::DONE)).unwrap_or_default();
        state.done_count = read_state_file(&dir, files::MSGNUM)
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        state.onto = read_state_file(&dir, files::ONTO);
        state.orig_head = read_state_file(&dir, files::ORIG_HEAD);
        state.head_name = read_state_file(&dir, files::HEAD_NAME).filter(|n| n != "detached HEAD");
        state.stopped_sha = read_state_file(&dir, files::STOPPED_SHA);
        state.amend = read_state_file(&dir, files::AMEND);
        Ok(state)
    }

    fn comment_char(&self) -> Result<char, GitError> {
        let value = self.run_optional(&[commands::CONFIG, flags::GET, "core.commentChar"])?;
        let value = value.as_deref().map(str::trim).unwrap_or_default();
        let mut chars = value.chars();
        Ok(match (chars.next(), chars.next()) {
            // "auto" and unset both fall back to the default
            (Some(c), None) => c,
            _ => constants::DEFAULT_COMMENT_CHAR,
        })
    }

    fn resolve_ref(&self, name: &str) -> Result<Option<String>, GitError> {
        let spec = format!("{name}^{{commit}}");
        Ok(self
            .run_optional(&[commands::REV_PARSE, flags::VERIFY, flags::QUIET, &spec])?
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()))
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>, GitError> {
        Ok(self
            .run_optional(&[commands::MERGE_BASE, a, b])?
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()))
    }

    fn write_instruction_file(&self, text: &str) -> Result<(), GitError> {
        let dir = self.git_dir()?.join(files::REBASE_MERGE);
        if !dir.is_dir() {
            return Err(GitError::NoRebaseInProgress);
        }
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.persist(dir.join(files::TODO)).map_err(|e| e.error)?;
        Ok(())
    }

    fn invoke_rewrite(&self, options: &RewriteOptions) -> Result<(), GitError> {
        let mut todo = NamedTempFile::new()?;
        todo.write_all(options.todo.as_bytes())?;
        todo.flush()?;

        let source = todo.path().to_string_lossy().into_owned();
        let editor = format!("cp {}", shell_words::quote(&source));

        let mut args = vec![
            commands::REBASE,
            flags::INTERACTIVE,
            flags::KEEP_EMPTY,
            flags::NO_AUTOSQUASH,
        ];
        if options.autostash {
            args.push(flags::AUTOSTASH);
        }
        match &options.base {
            RewriteBase::Commit(sha) => args.push(sha.as_str()),
            RewriteBase::Root => args.push(flags::ROOT),
        }

        self.run_with_env(
            &args,
            &[
                (env::SEQUENCE_EDITOR, editor.as_str()),
                (env::EDITOR, env::NOOP_EDITOR),
            ],
        )?;
        Ok(())
    }

    fn continue_operation(&self, kind: SessionKind) -> Result<(), GitError> {
        let command = match kind {
            SessionKind::Rebase => commands::REBASE,
            SessionKind::Merge => commands::MERGE,
            SessionKind::Revert => commands::REVERT,
            SessionKind::CherryPick => commands::CHERRY_PICK,
        };
        self.run_non_interactive(&[command, flags::CONTINUE])?;
        Ok(())
    }

    fn skip_operation(&self, kind: SessionKind) -> Result<(), GitError> {
        let command = match kind {
            SessionKind::Rebase => commands::REBASE,
            SessionKind::Revert => commands::REVERT,
            SessionKind::CherryPick => commands::CHERRY_PICK,
            SessionKind::Merge => {
                return Err(GitError::CommandFailed {
                    stderr: "a merge cannot be skipped".to_string(),
                    exit_code: -1,
                });
            }
        };
        self.run_non_interactive(&[command, flags::SKIP])?;
        Ok(())
    }

    fn abort_in_progress_operation(&self, kind: SessionKind) -> Result<(), GitError> {
        let command = match kind {
            SessionKind::Rebase => commands::REBASE,
            SessionKind::Merge => commands::MERGE,
            SessionKind::Revert => commands::REVERT,
            SessionKind::CherryPick => commands::CHERRY_PICK,
        };
        self.run(&[command, flags::ABORT])?;
        Ok(())
    }

    fn checkout(&self, target: &str, autostash: bool) -> Result<(), GitError> {
        let work = || self.run(&[commands::CHECKOUT, target]).map(|_| ());
        if autostash {
            self.with_autostash(work)
        } else {
            work()
        }
    }

    fn reset(&self, request: &ResetRequest) -> Result<(), GitError> {
        let mode = match request.mode {
            ResetMode::Soft => flags::SOFT,
            ResetMode::Hard => flags::HARD,
        };
        let work = || {
            let args = [commands::RESET, mode, request.sha.as_str()];
            let result = match &request.reflog_action {
                Some(action) => {
                    self.run_with_env(&args, &[(env::REFLOG_ACTION, action.as_str())])
                }
                None => self.run(&args),
            };
            result.map(|_| ())
        };
        if request.autostash {
            self.with_autostash(work)
        } else {
            work()
        }
    }

    fn stage_all(&self) -> Result<(), GitError> {
        self.run(&[commands::ADD, flags::ALL])?;
        Ok(())
    }

    fn amend_head_message(&self, message: &str) -> Result<(), GitError> {
        self.run(&[
            commands::COMMIT,
            flags::AMEND,
            flags::ONLY,
            flags::ALLOW_EMPTY,
            flags::MESSAGE,
            message,
        ])?;
        Ok(())
    }

    fn revert(&self, shas: &[String]) -> Result<(), GitError> {
        let mut args = vec![commands::REVERT, flags::NO_EDIT];
        args.extend(shas.iter().map(String::as_str));
        self.run(&args)?;
        Ok(())
    }

    fn cherry_pick(&self, shas: &[String]) -> Result<(), GitError> {
        let mut args = vec![commands::CHERRY_PICK];
        args.extend(shas.iter().map(String::as_str));
        self.run_non_interactive(&args)?;
        Ok(())
    }

    fn commit_fixup(&self, sha: &str) -> Result<(), GitError> {
        let fixup = format!("{}={sha}", flags::FIXUP);
        self.run_non_interactive(&[commands::COMMIT, &fixup])?;
        Ok(())
    }
}
