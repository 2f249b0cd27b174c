//! Interactive rebase engine
//!
//! [`Engine`] is what the presentation layer drives. It owns the plan, the
//! session state, pending prompts and the undo/redo ledger, and hands every
//! repository write to a background [`Worker`].
//!
//! The repository is the source of truth: every mutating entry point re-reads
//! it before validating, and every finished command is followed by a resync.

mod controller;
mod effect;
mod error;
mod ledger;
mod operation;
mod prompt;
pub mod rules;
mod worker;

pub use controller::{build_plan, derive_state};
pub use effect::{Effect, EffectKind, RunOutcome, is_conflict_output};
pub use error::{Confirmation, EngineError, Rejection};
pub use ledger::{Ledger, LedgerAction, Replay};
pub use operation::{FixupScope, Operation, Outcome, PlanChangeSummary, SelectionRange};
pub use prompt::Prompt;
pub use worker::Worker;

use std::sync::Arc;

use crate::git::{GitError, Repository};
use crate::model::{ActionKind, RebasePlan, ReflogEntry, SessionState, UndoCheckpoint};

use self::rules::{RebaseTarget, RuleContext};

/// Engine settings (see `Config::engine`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Branches whose merge base with HEAD is the quick-start base
    pub main_branches: Vec<String>,
    /// Keep other local branches on rewritten commits (`update-ref`)
    pub update_refs: bool,
    /// Maximum number of commits read below HEAD
    pub commit_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            main_branches: vec!["main".to_string(), "master".to_string()],
            update_refs: false,
            commit_limit: 300,
        }
    }
}

/// Checkpoint to record once the in-flight command has finished
#[derive(Debug, Clone)]
struct PendingCheckpoint {
    branch_or_ref: String,
    sha_before: String,
    kind: ActionKind,
    description: String,
}

#[derive(Debug)]
struct InFlight {
    message: String,
    effect: EffectKind,
    checkpoint: Option<PendingCheckpoint>,
    replay: Option<Replay>,
}

/// What a running session is recorded as once it finishes
#[derive(Debug, Clone)]
struct SessionMemo {
    branch_or_ref: String,
    orig_head: String,
    description: String,
}

impl From<PendingCheckpoint> for SessionMemo {
    fn from(pending: PendingCheckpoint) -> Self {
        Self {
            branch_or_ref: pending.branch_or_ref,
            orig_head: pending.sha_before,
            description: pending.description,
        }
    }
}

pub struct Engine<R: Repository + 'static> {
    repo: Arc<R>,
    config: EngineConfig,
    plan: RebasePlan,
    state: SessionState,
    prompt: Option<Prompt>,
    ledger: Ledger,
    worker: Worker<RunOutcome>,
    in_flight: Option<InFlight>,
    memo: Option<SessionMemo>,
}

impl<R: Repository + 'static> Engine<R> {
    pub fn new(repo: Arc<R>, config: EngineConfig) -> Result<Self, EngineError> {
        let worker = Worker::spawn("restack-worker").map_err(GitError::from)?;
        let mut engine = Self {
            repo,
            config,
            plan: RebasePlan::default(),
            state: SessionState::Idle,
            prompt: None,
            ledger: Ledger::new(),
            worker,
            in_flight: None,
            memo: None,
        };
        engine.resync()?;
        Ok(engine)
    }

    pub fn current_plan(&self) -> &RebasePlan {
        &self.plan
    }

    pub fn session_state(&self) -> &SessionState {
        &self.state
    }

    pub fn pending_prompt(&self) -> Option<&Prompt> {
        self.prompt.as_ref()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Whether a repository command is in flight
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some() || self.worker.is_busy()
    }

    /// Re-read plan and state; skipped while a command is in flight
    pub fn refresh(&mut self) -> Result<(), EngineError> {
        if self.is_busy() {
            return Ok(());
        }
        self.resync()
    }

    fn ensure_not_busy(&self) -> Result<(), Rejection> {
        if self.is_busy() {
            Err(Rejection::Busy)
        } else {
            Ok(())
        }
    }

    // ── Operations ──────────────────────────────────────────────────

    /// Validate an operation and start its command in the background
    ///
    /// Returns the summary right away when nothing has to run (no-ops);
    /// otherwise `None`, and the result arrives through [`poll`](Self::poll).
    pub fn dispatch(
        &mut self,
        op: Operation,
        selection: SelectionRange,
    ) -> Result<Option<PlanChangeSummary>, EngineError> {
        self.ensure_not_busy()?;
        self.resync()?;

        let op = match op {
            Operation::CherryPick { commits } => Operation::CherryPick {
                commits: self.resolve_commits(&commits)?,
            },
            op => op,
        };
        let head = self.repo.current_head()?;
        let branches = self.repo.branches()?;
        let main_bases = if op.uses_main_bases() {
            self.main_bases(&head.sha)?
        } else {
            Vec::new()
        };
        let staged_changes = matches!(op, Operation::AmendTo) && self.repo.has_staged_changes()?;
        let rebase_target = match &op {
            Operation::RebaseBranch { onto } => Some(self.rebase_target(onto.trim(), &head.sha)?),
            _ => None,
        };
        let ctx = RuleContext {
            plan: &self.plan,
            state: &self.state,
            branches: &branches,
            head_branch: head.branch.as_deref(),
            main_bases: &main_bases,
            update_refs: self.config.update_refs,
            staged_changes,
            rebase_target: rebase_target.as_ref(),
        };

        let mutation = rules::apply(&ctx, &op, selection).inspect_err(|rejection| {
            tracing::debug!(op = op.name(), %rejection, "operation rejected");
        })?;
        tracing::info!(op = op.name(), message = %mutation.message, "operation accepted");
        if mutation.is_no_op() {
            return Ok(Some(PlanChangeSummary::no_op(mutation.message)));
        }

        let checkpoint = if self.state.is_idle() {
            let kind = match &mutation.effect {
                Effect::AmendHeadMessage { .. } => Some(ActionKind::Commit),
                effect if effect.rewrites_history() => Some(ActionKind::Rewrite),
                _ => None,
            };
            kind.map(|kind| PendingCheckpoint {
                branch_or_ref: head.name().to_string(),
                sha_before: head.sha.clone(),
                kind,
                description: mutation.message.clone(),
            })
        } else {
            None
        };

        if let Some(plan) = mutation.plan {
            self.plan = plan;
        }
        self.submit(mutation.effect, mutation.message, checkpoint, None)?;
        Ok(None)
    }

    /// Collect the result of the in-flight command, if it has finished
    pub fn poll(&mut self) -> Result<Option<PlanChangeSummary>, EngineError> {
        if self.in_flight.is_none() {
            return Ok(None);
        }
        match self.worker.try_recv() {
            Ok(Some(outcome)) => self.finish(outcome).map(Some),
            Ok(None) => Ok(None),
            Err(err) => {
                self.in_flight = None;
                Err(err)
            }
        }
    }

    /// Block until the in-flight command has finished
    pub fn wait(&mut self) -> Result<Option<PlanChangeSummary>, EngineError> {
        if self.in_flight.is_none() {
            return Ok(None);
        }
        match self.worker.wait() {
            Ok(outcome) => self.finish(outcome).map(Some),
            Err(err) => {
                self.in_flight = None;
                Err(err)
            }
        }
    }

    /// Validate, run and wait for an operation
    pub fn apply(
        &mut self,
        op: Operation,
        selection: SelectionRange,
    ) -> Result<PlanChangeSummary, EngineError> {
        match self.dispatch(op, selection)? {
            Some(summary) => Ok(summary),
            None => self.wait()?.ok_or(EngineError::WorkerStopped),
        }
    }

    // ── Session handshake ───────────────────────────────────────────

    /// Continue the session, re-checking the working tree now
    ///
    /// Raises [`Prompt::AutoStageAndContinue`] instead of continuing when
    /// files changed after the conflicts were resolved.
    pub fn confirm_continue(&mut self) -> Result<PlanChangeSummary, EngineError> {
        self.ensure_not_busy()?;
        self.resync()?;
        let kind = self.state.kind().ok_or(Rejection::NotRebasing)?;
        if self.state.is_waiting_on_conflict() {
            return Err(Rejection::ConflictsRemain.into());
        }

        if self.repo.has_unstaged_changes()? {
            let prompt = Prompt::AutoStageAndContinue;
            tracing::info!("unstaged changes since conflicts were resolved");
            self.prompt = Some(prompt.clone());
            return Ok(PlanChangeSummary {
                message: prompt.message().to_string(),
                effect: EffectKind::None,
                outcome: Outcome::Prompted(prompt),
            });
        }

        self.prompt = None;
        self.run(
            Effect::Continue {
                kind,
                stage_all: false,
            },
            format!("Continued {kind}"),
            None,
            None,
        )
    }

    /// Accept the pending prompt
    pub fn confirm_prompt(&mut self) -> Result<PlanChangeSummary, EngineError> {
        self.ensure_not_busy()?;
        let prompt = self.prompt.take().ok_or(Rejection::NoPendingPrompt)?;
        match prompt {
            Prompt::ContinueRebase => self.confirm_continue(),
            Prompt::AutoStageAndContinue => {
                self.resync()?;
                let kind = self.state.kind().ok_or(Rejection::NotRebasing)?;
                if self.state.is_waiting_on_conflict() {
                    return Err(Rejection::ConflictsRemain.into());
                }
                self.run(
                    Effect::Continue {
                        kind,
                        stage_all: true,
                    },
                    format!("Staged all changes and continued {kind}"),
                    None,
                    None,
                )
            }
            Prompt::Undo { checkpoint, .. } => self.replay(checkpoint, Replay::Undo),
            Prompt::Redo { checkpoint, .. } => self.replay(checkpoint, Replay::Redo),
        }
    }

    /// Dismiss the pending prompt; nothing is changed
    pub fn cancel_prompt(&mut self) -> Result<Prompt, EngineError> {
        Ok(self.prompt.take().ok_or(Rejection::NoPendingPrompt)?)
    }

    /// Abort the rebase, merge, revert or cherry-pick in progress
    pub fn abort(&mut self) -> Result<PlanChangeSummary, EngineError> {
        self.ensure_not_busy()?;
        self.resync()?;
        let kind = self.state.kind().ok_or(Rejection::NotRebasing)?;
        self.prompt = None;
        self.run(Effect::Abort { kind }, format!("Aborted {kind}"), None, None)
    }

    // ── Undo / redo ─────────────────────────────────────────────────

    /// Raise the confirmation for undoing the latest action
    pub fn undo(&mut self) -> Result<String, EngineError> {
        self.request_replay(Replay::Undo)
    }

    /// Raise the confirmation for redoing the latest undone action
    pub fn redo(&mut self) -> Result<String, EngineError> {
        self.request_replay(Replay::Redo)
    }

    /// Check out a ref and record it
    pub fn checkout(&mut self, target: &str) -> Result<PlanChangeSummary, EngineError> {
        self.ensure_not_busy()?;
        self.resync()?;
        if !self.state.is_idle() {
            return Err(Rejection::AlreadyRebasing.into());
        }
        let before = self.repo.current_head()?;
        let pending = PendingCheckpoint {
            branch_or_ref: target.to_string(),
            sha_before: before.sha.clone(),
            kind: ActionKind::Checkout {
                previous: before.name().to_string(),
            },
            description: format!("checkout {target}"),
        };
        self.run(
            Effect::Checkout {
                target: target.to_string(),
                autostash: false,
            },
            format!("Checked out '{target}'"),
            Some(pending),
            None,
        )
    }

    /// Record an action performed elsewhere in the application
    pub fn record(&mut self, checkpoint: UndoCheckpoint) {
        self.ledger.record(checkpoint);
    }

    fn request_replay(&mut self, replay: Replay) -> Result<String, EngineError> {
        self.ensure_not_busy()?;
        self.resync()?;
        self.ensure_idle_for(replay)?;
        let checkpoint = self.ledger.peek(replay).cloned().ok_or(match replay {
            Replay::Undo => Rejection::NothingToUndo,
            Replay::Redo => Rejection::NothingToRedo,
        })?;
        self.validate_head(&checkpoint, replay)?;

        let message = LedgerAction::for_checkpoint(&checkpoint, replay).prompt();
        self.prompt = Some(match replay {
            Replay::Undo => Prompt::Undo {
                checkpoint,
                message: message.clone(),
            },
            Replay::Redo => Prompt::Redo {
                checkpoint,
                message: message.clone(),
            },
        });
        Ok(message)
    }

    fn replay(
        &mut self,
        checkpoint: UndoCheckpoint,
        replay: Replay,
    ) -> Result<PlanChangeSummary, EngineError> {
        self.resync()?;
        self.ensure_idle_for(replay)?;
        if self.ledger.peek(replay) != Some(&checkpoint) {
            return Err(Rejection::LedgerOutOfDate(checkpoint.description).into());
        }
        self.validate_head(&checkpoint, replay)?;

        let verb = match replay {
            Replay::Undo => "Undid",
            Replay::Redo => "Redid",
        };
        let message = format!("{verb}: {}", checkpoint.description);
        let effect = LedgerAction::for_checkpoint(&checkpoint, replay).into_effect();
        self.run(effect, message, None, Some(replay))
    }

    fn ensure_idle_for(&self, replay: Replay) -> Result<(), Rejection> {
        match replay {
            _ if self.state.is_idle() => Ok(()),
            Replay::Undo => Err(Rejection::CantUndoWhileRebasing),
            Replay::Redo => Err(Rejection::CantRedoWhileRebasing),
        }
    }

    /// HEAD must still be where the checkpoint left it
    fn validate_head(&self, checkpoint: &UndoCheckpoint, replay: Replay) -> Result<(), EngineError> {
        let head = self.repo.current_head()?;
        if head.sha != ledger::expected_head(checkpoint, replay) {
            tracing::warn!(
                checkpoint = %checkpoint.summary(),
                head = %head.sha,
                "ledger out of date"
            );
            return Err(Rejection::LedgerOutOfDate(checkpoint.description.clone()).into());
        }
        Ok(())
    }

    // ── Command execution ───────────────────────────────────────────

    fn submit(
        &mut self,
        effect: Effect,
        message: String,
        checkpoint: Option<PendingCheckpoint>,
        replay: Option<Replay>,
    ) -> Result<(), EngineError> {
        let kind = effect.kind();
        let repo = Arc::clone(&self.repo);
        tracing::debug!(effect = ?kind, "submitting command");
        self.worker
            .submit(move || effect::run(repo.as_ref(), &effect))?;
        self.in_flight = Some(InFlight {
            message,
            effect: kind,
            checkpoint,
            replay,
        });
        Ok(())
    }

    fn run(
        &mut self,
        effect: Effect,
        message: String,
        checkpoint: Option<PendingCheckpoint>,
        replay: Option<Replay>,
    ) -> Result<PlanChangeSummary, EngineError> {
        self.submit(effect, message, checkpoint, replay)?;
        self.wait()?.ok_or(EngineError::WorkerStopped)
    }

    fn finish(&mut self, outcome: RunOutcome) -> Result<PlanChangeSummary, EngineError> {
        let job = self.in_flight.take().ok_or(EngineError::WorkerStopped)?;
        if job.effect == EffectKind::Abort && matches!(outcome, RunOutcome::Completed) {
            // Aborted sessions are never recorded
            self.memo = None;
        }
        self.resync()?;

        if let Some(pending) = job.checkpoint {
            if self.state.is_idle() {
                self.record_pending(pending)?;
            } else {
                // Recorded when the session ends
                self.memo = Some(pending.into());
            }
        }

        match outcome {
            RunOutcome::Completed => {
                if let Some(replay) = job.replay {
                    self.ledger.finish(replay);
                }
                let outcome = if self.state.is_idle() {
                    Outcome::Completed
                } else if job.effect == EffectKind::WriteTodo {
                    Outcome::Updated
                } else {
                    Outcome::Stopped
                };
                tracing::info!(effect = ?job.effect, ?outcome, "command finished");
                Ok(PlanChangeSummary {
                    message: job.message,
                    effect: job.effect,
                    outcome,
                })
            }
            RunOutcome::Conflict => {
                tracing::info!(effect = ?job.effect, state = %self.state, "stopped on conflicts");
                Ok(PlanChangeSummary {
                    message: job.message,
                    effect: job.effect,
                    outcome: Outcome::Conflict,
                })
            }
            RunOutcome::Failed(GitError::CommandFailed { stderr, exit_code }) => {
                tracing::warn!(effect = ?job.effect, exit_code, "command failed");
                Err(EngineError::CommandFailed {
                    message: stderr.trim().to_string(),
                })
            }
            RunOutcome::Failed(err) => Err(err.into()),
        }
    }

    fn record_pending(&mut self, pending: PendingCheckpoint) -> Result<(), EngineError> {
        let head = self.repo.current_head()?;
        let changed = match &pending.kind {
            ActionKind::Checkout { previous } => {
                head.sha != pending.sha_before || head.name() != previous
            }
            _ => head.sha != pending.sha_before,
        };
        if changed {
            self.ledger.record(UndoCheckpoint::new(
                pending.branch_or_ref,
                pending.sha_before,
                head.sha,
                pending.kind,
                pending.description,
            ));
        }
        Ok(())
    }

    /// Merge bases of HEAD with the configured main branches that exist
    fn main_bases(&self, head: &str) -> Result<Vec<String>, EngineError> {
        let mut bases = Vec::new();
        for name in &self.config.main_branches {
            if self.repo.resolve_ref(name)?.is_none() {
                continue;
            }
            if let Some(base) = self.repo.merge_base(head, name)? {
                bases.push(base);
            }
        }
        Ok(bases)
    }

    fn rebase_target(&self, name: &str, head: &str) -> Result<RebaseTarget, EngineError> {
        let tip = self.repo.resolve_ref(name)?;
        let merge_base = match &tip {
            Some(tip) => self.repo.merge_base(head, tip)?,
            None => None,
        };
        Ok(RebaseTarget {
            name: name.to_string(),
            tip,
            merge_base,
        })
    }

    /// Full hashes of commits named by the user, in the given order
    fn resolve_commits(&self, names: &[String]) -> Result<Vec<String>, EngineError> {
        names
            .iter()
            .map(|name| -> Result<String, EngineError> {
                let name = name.trim();
                self.repo
                    .resolve_ref(name)?
                    .ok_or_else(|| Rejection::UnknownRef(name.to_string()).into())
            })
            .collect()
    }

    // ── Resynchronization ───────────────────────────────────────────

    /// Re-derive plan and session state purely from the repository
    fn resync(&mut self) -> Result<(), EngineError> {
        let dir = self.repo.rebase_directory_state()?;
        let unmerged = self.repo.unmerged_paths()?;
        let comment_char = self.repo.comment_char()?;
        let commits = self.repo.commits(self.config.commit_limit)?;

        let state = derive_state(&dir, &unmerged, comment_char);
        let plan = build_plan(&dir, &unmerged, commits, comment_char);
        if state != self.state {
            tracing::info!(from = %self.state, to = %state, "session state changed");
        }

        let continuing = self.prompt.as_ref().is_some_and(Prompt::is_continue);
        if continuing && !state.is_ready_to_continue() {
            self.prompt = None;
        } else if self.prompt.is_none()
            && state.is_ready_to_continue()
            && !self.state.is_ready_to_continue()
        {
            self.prompt = Some(Prompt::ContinueRebase);
        }

        if state.is_idle() {
            if let Some(memo) = self.memo.take() {
                self.settle_session(memo)?;
            }
        } else if self.memo.is_none() {
            let head = self.repo.current_head()?;
            let kind = state.kind().map(|k| k.to_string()).unwrap_or_default();
            self.memo = Some(SessionMemo {
                branch_or_ref: dir.branch().unwrap_or(head.name()).to_string(),
                orig_head: dir.orig_head.clone().unwrap_or(head.sha),
                description: kind,
            });
        }

        self.state = state;
        self.plan = plan;
        Ok(())
    }

    /// A session ended (here or outside): record it unless it was aborted
    fn settle_session(&mut self, memo: SessionMemo) -> Result<(), EngineError> {
        let head = self.repo.current_head()?;
        let aborted = self
            .repo
            .reflog_entries(1)?
            .first()
            .is_some_and(ReflogEntry::is_abort);
        if aborted || head.sha == memo.orig_head {
            tracing::debug!(description = %memo.description, aborted, "session ended without changes");
            return Ok(());
        }
        self.ledger.record(UndoCheckpoint::new(
            memo.branch_or_ref,
            memo.orig_head,
            head.sha,
            ActionKind::Rewrite,
            memo.description,
        ));
        Ok(())
    }
}
