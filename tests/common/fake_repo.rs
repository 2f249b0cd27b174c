//! FakeRepo helper for engine tests.
//!
//! An in-memory repository with a small rebase sequencer. It applies todo
//! files the way git does closely enough to drive the engine: picks create
//! new commits, `edit` and `break` pause, chosen commits stop on conflicts and
//! chosen exec commands fail.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use restack::git::parser::Parser;
use restack::git::{
    GitError, HeadRef, RebaseDirState, Repository, ResetMode, ResetRequest, RewriteBase,
    RewriteOptions,
};
use restack::model::{Branch, Commit, ReflogEntry, SessionKind, TodoItem, TodoKind};

/// Hash of the n-th commit created by a FakeRepo
pub fn sha(n: usize) -> String {
    format!("{n:040x}")
}

#[derive(Debug, Clone)]
struct Sequencer {
    /// Remaining items, file order
    todo: Vec<TodoItem>,
    done: Vec<TodoItem>,
    onto: String,
    orig_head: String,
    head_name: Option<String>,
    stopped_sha: Option<String>,
    amend: Option<String>,
    /// Pick that stopped on conflicts; committed on continue
    pending: Option<TodoItem>,
    update_refs: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct State {
    objects: HashMap<String, Commit>,
    created: usize,
    /// Empty before the first commit
    head: String,
    branch: Option<String>,
    branches: BTreeMap<String, String>,
    /// (sha, action), oldest first
    reflog: Vec<(String, String)>,
    rebase: Option<Sequencer>,
    unmerged: Vec<String>,
    unstaged: bool,
    staged: bool,
    conflicting: HashSet<String>,
    failing_exec: HashSet<String>,
    /// The next abort fails and leaves the session in place
    failing_abort: bool,
    writes: usize,
}

fn failure(stderr: impl Into<String>) -> GitError {
    GitError::CommandFailed {
        stderr: stderr.into(),
        exit_code: 1,
    }
}

impl State {
    fn new_commit(&mut self, parent: Option<&str>, subject: &str) -> String {
        self.created += 1;
        let id = sha(self.created);
        let parents = parent
            .filter(|p| !p.is_empty())
            .map(|p| vec![p.to_string()])
            .unwrap_or_default();
        self.objects
            .insert(id.clone(), Commit::new(id.clone(), subject, parents));
        id
    }

    fn set_head(&mut self, sha: &str, action: impl Into<String>) {
        self.head = sha.to_string();
        if let Some(branch) = &self.branch {
            self.branches.insert(branch.clone(), sha.to_string());
        }
        self.reflog.push((sha.to_string(), action.into()));
    }

    fn resolve(&self, name: &str) -> Option<String> {
        if let Some(sha) = self.branches.get(name) {
            return Some(sha.clone());
        }
        if name == "HEAD" && !self.head.is_empty() {
            return Some(self.head.clone());
        }
        if name.len() < 4 {
            return None;
        }
        self.objects.keys().find(|sha| sha.starts_with(name)).cloned()
    }

    fn first_parent(&self, sha: &str) -> Option<String> {
        self.objects
            .get(sha)
            .and_then(|c| c.parents.first().cloned())
    }

    fn subject(&self, sha: &str) -> String {
        self.objects
            .get(sha)
            .map(|c| c.subject.clone())
            .unwrap_or_default()
    }

    /// Apply todo items until the list is empty or the sequencer pauses
    fn run(&mut self) -> Result<(), GitError> {
        loop {
            let Some(seq) = self.rebase.as_mut() else {
                return Ok(());
            };
            if seq.todo.is_empty() {
                self.finish();
                return Ok(());
            }
            let item = seq.todo.remove(0);
            seq.done.push(item.clone());
            seq.stopped_sha = None;
            seq.amend = None;

            match item.kind {
                TodoKind::Pick | TodoKind::Edit | TodoKind::Reword => {
                    let original = item
                        .commit
                        .as_deref()
                        .and_then(|c| self.resolve(c))
                        .ok_or_else(|| failure("error: invalid commit in todo"))?;
                    if self.conflicting.contains(&original) {
                        let subject = self.subject(&original);
                        self.unmerged = vec![format!("file-{}", subject.replace(' ', "-"))];
                        let seq = self.rebase.as_mut().expect("rebase in progress");
                        seq.stopped_sha = Some(original.clone());
                        seq.pending = Some(item);
                        return Err(failure(format!(
                            "CONFLICT (content): Merge conflict in file\nerror: could not apply {}... {subject}",
                            &original[..7]
                        )));
                    }
                    let subject = self.subject(&original);
                    let head = self.head.clone();
                    let new = self.new_commit(Some(&head), &subject);
                    self.set_head(&new, format!("rebase (pick): {subject}"));
                    if item.kind == TodoKind::Edit {
                        let seq = self.rebase.as_mut().expect("rebase in progress");
                        seq.stopped_sha = Some(original);
                        seq.amend = Some(new);
                        return Ok(());
                    }
                }
                kind if kind.is_fixup_like() => {
                    let head = self.head.clone();
                    let parent = self.first_parent(&head);
                    let subject = match kind {
                        TodoKind::FixupUseOwnMessage => item
                            .commit
                            .as_deref()
                            .and_then(|c| self.resolve(c))
                            .map(|c| self.subject(&c))
                            .unwrap_or_default(),
                        _ => self.subject(&head),
                    };
                    let new = self.new_commit(parent.as_deref(), &subject);
                    self.set_head(&new, format!("rebase ({kind}): {subject}"));
                }
                TodoKind::Exec => {
                    let command = item.exec_command.clone().unwrap_or_default();
                    if self.failing_exec.contains(&command) {
                        return Err(failure(format!(
                            "Executing: {command}\nwarning: execution failed: {command}"
                        )));
                    }
                }
                TodoKind::Break => return Ok(()),
                TodoKind::UpdateRef => {
                    let target = item.target_ref.clone().unwrap_or_default();
                    let head = self.head.clone();
                    let seq = self.rebase.as_mut().expect("rebase in progress");
                    seq.update_refs.retain(|(r, _)| *r != target);
                    seq.update_refs.push((target, head));
                }
                _ => {}
            }
        }
    }

    fn finish(&mut self) {
        let Some(seq) = self.rebase.take() else {
            return;
        };
        for (target, sha) in seq.update_refs {
            let name = target.strip_prefix("refs/heads/").unwrap_or(&target);
            self.branches.insert(name.to_string(), sha);
        }
        self.branch = seq.head_name.clone();
        let head = self.head.clone();
        let returning = seq.head_name.as_deref().unwrap_or(&head).to_string();
        self.set_head(
            &head,
            format!("rebase (finish): returning to refs/heads/{returning}"),
        );
    }
}

pub struct FakeRepo {
    state: Mutex<State>,
}

impl FakeRepo {
    /// Repository on `master` with commits "commit 01" .. "commit NN"
    ///
    /// The hash of commit `i` is `sha(i)`.
    pub fn with_history(count: usize) -> Self {
        let mut state = State {
            branch: Some("master".to_string()),
            ..Default::default()
        };
        for i in 1..=count {
            let head = state.head.clone();
            let new = state.new_commit(Some(&head), &format!("commit {i:02}"));
            state.set_head(&new, format!("commit: commit {i:02}"));
        }
        Self {
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Add a commit on HEAD and return its hash
    pub fn commit(&self, subject: &str) -> String {
        let mut state = self.state();
        let head = state.head.clone();
        let new = state.new_commit(Some(&head), subject);
        state.set_head(&new, format!("commit: {subject}"));
        new
    }

    pub fn head(&self) -> String {
        self.state().head.clone()
    }

    /// Subjects from HEAD down to the root
    pub fn subjects(&self) -> Vec<String> {
        self.commits(usize::MAX)
            .unwrap()
            .into_iter()
            .map(|c| c.subject)
            .collect()
    }

    pub fn add_branch(&self, name: &str, sha: &str) {
        self.state()
            .branches
            .insert(name.to_string(), sha.to_string());
    }

    /// Create `name` at HEAD and check it out, as `git switch -c` would
    pub fn switch_new_branch(&self, name: &str) {
        let mut state = self.state();
        let head = state.head.clone();
        let from = state.branch.clone().unwrap_or_else(|| head.clone());
        state.branches.insert(name.to_string(), head.clone());
        state.branch = Some(name.to_string());
        state.set_head(&head, format!("checkout: moving from {from} to {name}"));
    }

    /// Check out an existing branch
    pub fn switch_to(&self, name: &str) {
        let mut state = self.state();
        let sha = state.branches[name].clone();
        let from = state.branch.clone().unwrap_or_else(|| state.head.clone());
        state.branch = Some(name.to_string());
        state.set_head(&sha, format!("checkout: moving from {from} to {name}"));
    }

    pub fn branch_sha(&self, name: &str) -> Option<String> {
        self.state().branches.get(name).cloned()
    }

    /// Picking this commit stops on conflicts until they are resolved
    pub fn conflict_on(&self, sha: &str) {
        self.state().conflicting.insert(sha.to_string());
    }

    pub fn fail_exec(&self, command: &str) {
        self.state().failing_exec.insert(command.to_string());
    }

    pub fn fail_next_abort(&self) {
        self.state().failing_abort = true;
    }

    /// Stage the conflict resolution, as `git add` would
    pub fn resolve_conflicts(&self) {
        let mut state = self.state();
        state.unmerged.clear();
        let stopped = state
            .rebase
            .as_ref()
            .and_then(|seq| seq.stopped_sha.clone());
        if let Some(sha) = stopped {
            state.conflicting.remove(&sha);
        }
    }

    /// Stage a change to a tracked file
    pub fn stage_change(&self) {
        self.state().staged = true;
    }

    /// Modify a tracked file without staging it
    pub fn touch_worktree(&self) {
        self.state().unstaged = true;
    }

    /// Number of write calls made so far
    pub fn writes(&self) -> usize {
        self.state().writes
    }

    /// Remaining todo text of the rebase in progress
    pub fn todo_text(&self) -> Option<String> {
        self.state()
            .rebase
            .as_ref()
            .map(|seq| Parser::serialize_todo(&seq.todo))
    }

    fn write(&self) -> std::sync::MutexGuard<'_, State> {
        let mut state = self.state();
        state.writes += 1;
        state
    }
}

impl Repository for FakeRepo {
    fn current_head(&self) -> Result<HeadRef, GitError> {
        let state = self.state();
        Ok(HeadRef {
            sha: state.head.clone(),
            branch: state.branch.clone(),
        })
    }

    fn commits(&self, limit: usize) -> Result<Vec<Commit>, GitError> {
        let state = self.state();
        let mut commits = Vec::new();
        let mut next = Some(state.head.clone()).filter(|h| !h.is_empty());
        while let Some(sha) = next {
            if commits.len() >= limit {
                break;
            }
            let Some(commit) = state.objects.get(&sha) else {
                break;
            };
            next = commit.parents.first().cloned();
            commits.push(commit.clone());
        }
        Ok(commits)
    }

    fn branches(&self) -> Result<Vec<Branch>, GitError> {
        let state = self.state();
        Ok(state
            .branches
            .iter()
            .map(|(name, sha)| Branch {
                name: name.clone(),
                sha: sha.clone(),
                is_head: state.branch.as_deref() == Some(name.as_str()),
            })
            .collect())
    }

    fn reflog_entries(&self, limit: usize) -> Result<Vec<ReflogEntry>, GitError> {
        let state = self.state();
        Ok(state
            .reflog
            .iter()
            .rev()
            .take(limit)
            .enumerate()
            .map(|(i, (sha, action))| ReflogEntry {
                selector: format!("HEAD@{{{i}}}"),
                sha: sha.clone(),
                time: 0,
                action: action.clone(),
            })
            .collect())
    }

    fn unmerged_paths(&self) -> Result<Vec<String>, GitError> {
        Ok(self.state().unmerged.clone())
    }

    fn has_unstaged_changes(&self) -> Result<bool, GitError> {
        Ok(self.state().unstaged)
    }

    fn has_staged_changes(&self) -> Result<bool, GitError> {
        Ok(self.state().staged)
    }

    fn is_working_tree_clean(&self) -> Result<bool, GitError> {
        let state = self.state();
        Ok(!state.unstaged && !state.staged && state.unmerged.is_empty())
    }

    fn rebase_directory_state(&self) -> Result<RebaseDirState, GitError> {
        let state = self.state();
        let Some(seq) = &state.rebase else {
            return Ok(RebaseDirState::default());
        };
        Ok(RebaseDirState {
            in_progress: true,
            todo: Parser::serialize_todo(&seq.todo),
            done: Parser::serialize_todo(&seq.done),
            done_count: seq.done.len(),
            onto: Some(seq.onto.clone()).filter(|o| !o.is_empty()),
            orig_head: Some(seq.orig_head.clone()),
            head_name: seq.head_name.as_ref().map(|b| format!("refs/heads/{b}")),
            stopped_sha: seq.stopped_sha.clone(),
            amend: seq.amend.clone(),
            ..Default::default()
        })
    }

    fn comment_char(&self) -> Result<char, GitError> {
        Ok('#')
    }

    fn resolve_ref(&self, name: &str) -> Result<Option<String>, GitError> {
        Ok(self.state().resolve(name))
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>, GitError> {
        let state = self.state();
        let (Some(a), Some(b)) = (state.resolve(a), state.resolve(b)) else {
            return Ok(None);
        };
        let mut ancestors = HashSet::new();
        let mut next = Some(a);
        while let Some(sha) = next {
            next = state.first_parent(&sha);
            ancestors.insert(sha);
        }
        let mut next = Some(b);
        while let Some(sha) = next {
            if ancestors.contains(&sha) {
                return Ok(Some(sha));
            }
            next = state.first_parent(&sha);
        }
        Ok(None)
    }

    fn write_instruction_file(&self, text: &str) -> Result<(), GitError> {
        let mut state = self.write();
        let seq = state.rebase.as_mut().ok_or(GitError::NoRebaseInProgress)?;
        seq.todo = Parser::parse_todo(text, '#');
        Ok(())
    }

    fn invoke_rewrite(&self, options: &RewriteOptions) -> Result<(), GitError> {
        let mut state = self.write();
        if state.rebase.is_some() {
            return Err(failure("fatal: It seems that there is already a rebase-merge directory"));
        }
        if !options.autostash && state.unstaged {
            return Err(failure("error: cannot rebase: You have unstaged changes."));
        }
        let onto = match &options.base {
            RewriteBase::Commit(sha) => sha.clone(),
            RewriteBase::Root => String::new(),
        };
        state.rebase = Some(Sequencer {
            todo: Parser::parse_todo(&options.todo, '#'),
            done: Vec::new(),
            onto: onto.clone(),
            orig_head: state.head.clone(),
            head_name: state.branch.take(),
            stopped_sha: None,
            amend: None,
            pending: None,
            update_refs: Vec::new(),
        });
        state.set_head(&onto, format!("rebase (start): checkout {onto}"));
        state.run()
    }

    fn continue_operation(&self, kind: SessionKind) -> Result<(), GitError> {
        let mut state = self.write();
        if kind != SessionKind::Rebase || state.rebase.is_none() {
            return Err(failure("fatal: No rebase in progress?"));
        }
        if !state.unmerged.is_empty() {
            return Err(failure(
                "error: Committing is not possible because you have unmerged files.",
            ));
        }
        if state.unstaged {
            return Err(failure("error: cannot continue: You have unstaged changes."));
        }
        let pending = state.rebase.as_mut().and_then(|seq| seq.pending.take());
        if let Some(item) = pending {
            let subject = item
                .commit
                .as_deref()
                .and_then(|c| state.resolve(c))
                .map(|c| state.subject(&c))
                .unwrap_or_default();
            let head = state.head.clone();
            let new = state.new_commit(Some(&head), &subject);
            state.set_head(&new, format!("rebase (continue): {subject}"));
        }
        state.run()
    }

    fn skip_operation(&self, kind: SessionKind) -> Result<(), GitError> {
        let mut state = self.write();
        if kind != SessionKind::Rebase || state.rebase.is_none() {
            return Err(failure("fatal: No rebase in progress?"));
        }
        state.unmerged.clear();
        if let Some(seq) = state.rebase.as_mut() {
            seq.pending = None;
            seq.stopped_sha = None;
        }
        state.run()
    }

    fn abort_in_progress_operation(&self, kind: SessionKind) -> Result<(), GitError> {
        let mut state = self.write();
        if kind != SessionKind::Rebase {
            return Err(failure("fatal: There is no merge to abort"));
        }
        if std::mem::take(&mut state.failing_abort) {
            return Err(failure("error: could not move back to original HEAD"));
        }
        let seq = state.rebase.take().ok_or(GitError::NoRebaseInProgress)?;
        state.unmerged.clear();
        state.branch = seq.head_name.clone();
        let returning = seq.head_name.unwrap_or_default();
        state.set_head(
            &seq.orig_head,
            format!("rebase (abort): returning to refs/heads/{returning}"),
        );
        Ok(())
    }

    fn checkout(&self, target: &str, _autostash: bool) -> Result<(), GitError> {
        let mut state = self.write();
        let from = state.branch.clone().unwrap_or_else(|| state.head.clone());
        let sha = state
            .resolve(target)
            .ok_or_else(|| failure(format!("error: pathspec '{target}' did not match")))?;
        state.branch = state
            .branches
            .contains_key(target)
            .then(|| target.to_string());
        state.set_head(&sha, format!("checkout: moving from {from} to {target}"));
        Ok(())
    }

    fn reset(&self, request: &ResetRequest) -> Result<(), GitError> {
        let mut state = self.write();
        let sha = state
            .resolve(&request.sha)
            .ok_or_else(|| failure(format!("fatal: ambiguous argument '{}'", request.sha)))?;
        if request.mode == ResetMode::Hard {
            state.unstaged = false;
            state.staged = false;
        }
        let action = request.reflog_action.as_deref().unwrap_or("reset");
        state.set_head(&sha, format!("{action}: moving to {sha}"));
        Ok(())
    }

    fn stage_all(&self) -> Result<(), GitError> {
        let mut state = self.write();
        state.unmerged.clear();
        state.unstaged = false;
        Ok(())
    }

    fn amend_head_message(&self, message: &str) -> Result<(), GitError> {
        let mut state = self.write();
        let head = state.head.clone();
        let parent = state.first_parent(&head);
        let subject = message.lines().next().unwrap_or_default().to_string();
        let new = state.new_commit(parent.as_deref(), &subject);
        state.set_head(&new, format!("commit (amend): {subject}"));
        if let Some(seq) = state.rebase.as_mut()
            && seq.amend.is_some()
        {
            seq.amend = Some(new);
        }
        Ok(())
    }

    fn revert(&self, shas: &[String]) -> Result<(), GitError> {
        let mut state = self.write();
        for sha in shas {
            let subject = format!("Revert \"{}\"", state.subject(sha));
            let head = state.head.clone();
            let new = state.new_commit(Some(&head), &subject);
            state.set_head(&new, format!("revert: {subject}"));
        }
        Ok(())
    }

    fn cherry_pick(&self, shas: &[String]) -> Result<(), GitError> {
        let mut state = self.write();
        for sha in shas {
            let subject = state.subject(sha);
            let head = state.head.clone();
            let new = state.new_commit(Some(&head), &subject);
            state.set_head(&new, format!("cherry-pick: {subject}"));
        }
        Ok(())
    }

    fn commit_fixup(&self, sha: &str) -> Result<(), GitError> {
        let mut state = self.write();
        if !std::mem::take(&mut state.staged) {
            return Err(failure("nothing added to commit"));
        }
        let subject = format!("fixup! {}", state.subject(sha));
        let head = state.head.clone();
        let new = state.new_commit(Some(&head), &subject);
        state.set_head(&new, format!("commit: {subject}"));
        Ok(())
    }
}
