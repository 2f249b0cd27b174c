//! Selection and mutation rules
//!
//! Every operation is validated and applied against a copy of the plan.
//! Nothing here touches the repository: the result is the new plan plus the
//! effect the worker has to run, or a [`Rejection`].
//!
//! While a rebase is running, operations rewrite the pending todos. With no
//! session in progress they build a one-off rebase over the commits from HEAD
//! down to the selection.

use std::ops::Range;

use crate::git::parser::Parser;
use crate::git::{ResetMode, ResetRequest, RewriteBase};
use crate::model::{
    Branch, DisplayEntry, RebasePlan, SessionKind, SessionState, StopReason, TodoItem, TodoKind,
};

use super::effect::Effect;
use super::error::{Confirmation, Rejection};
use super::operation::{FixupScope, Operation, SelectionRange};

const CANNOT_MOVE: &str = "Cannot move any further";
const NO_FIXUPS: &str = "No fixup commits to squash";

/// Subject prefixes of commits made with `git commit --fixup/--squash`
const FIXUP_PREFIXES: [(&str, TodoKind); 3] = [
    ("fixup! ", TodoKind::Fixup),
    ("squash! ", TodoKind::Squash),
    ("amend! ", TodoKind::FixupUseOwnMessage),
];

/// Everything a rule needs to know besides the selection
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub plan: &'a RebasePlan,
    pub state: &'a SessionState,
    /// Local branches
    pub branches: &'a [Branch],
    /// Branch checked out (or being rebased)
    pub head_branch: Option<&'a str>,
    /// Merge bases of HEAD with the configured main branches
    pub main_bases: &'a [String],
    /// Include `update-ref` items for other branches in one-off rebases
    pub update_refs: bool,
    /// The index has staged changes (read for `AmendTo` only)
    pub staged_changes: bool,
    /// Where `RebaseBranch` would move the branch (read for `RebaseBranch` only)
    pub rebase_target: Option<&'a RebaseTarget>,
}

/// A ref the current branch is rebased onto, as resolved in the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebaseTarget {
    pub name: String,
    /// Commit the ref points at; `None` when it does not resolve
    pub tip: Option<String>,
    /// Merge base with HEAD; `None` for unrelated histories
    pub merge_base: Option<String>,
}

/// Result of a rule: the new plan (when it can be known up front) and the effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub plan: Option<RebasePlan>,
    pub effect: Effect,
    pub message: String,
}

impl Mutation {
    /// Rewrite of the pending todos of the running rebase
    fn todo(plan: RebasePlan, message: impl Into<String>) -> Self {
        let text = Parser::serialize_todo(&plan.file_order());
        Self {
            plan: Some(plan),
            effect: Effect::WriteTodo { text },
            message: message.into(),
        }
    }

    fn effect(effect: Effect, message: impl Into<String>) -> Self {
        Self {
            plan: None,
            effect,
            message: message.into(),
        }
    }

    fn no_op(message: impl Into<String>) -> Self {
        Self::effect(Effect::None, message)
    }

    pub fn is_no_op(&self) -> bool {
        self.effect == Effect::None
    }
}

/// Which part of the displayed list a validated selection covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    /// Pending todos only
    Todos,
    /// Exactly the "YOU ARE HERE" row
    Cursor,
    /// Finalized commits (everything when no rebase is running)
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

/// Validate and apply `op` to the selection
pub fn apply(
    ctx: &RuleContext<'_>,
    op: &Operation,
    sel: SelectionRange,
) -> Result<Mutation, Rejection> {
    if !ctx.state.is_idle() && !ctx.state.is_rebasing() {
        return Err(Rejection::AlreadyRebasing);
    }

    let region = if op.ignores_selection() {
        Region::Finalized
    } else {
        validate(ctx.plan, sel)?
    };

    match op {
        Operation::Drop { confirmed } => drop_selection(ctx, sel, region, *confirmed),
        Operation::Fixup => fold(ctx, sel, region, TodoKind::Fixup),
        Operation::FixupKeepMessage => fold(ctx, sel, region, TodoKind::FixupUseOwnMessage),
        Operation::Squash => fold(ctx, sel, region, TodoKind::Squash),
        Operation::Pick => match region {
            Region::Todos => change_kinds(ctx.plan, sel, TodoKind::Pick),
            _ if !ctx.plan.is_rebasing() => Err(Rejection::NotRebasing),
            _ => Err(Rejection::MustSelectTodoCommits),
        },
        Operation::Reword { message } => reword(ctx, sel, region, message),
        Operation::MoveUp => move_selection(ctx, sel, region, Direction::Up),
        Operation::MoveDown => move_selection(ctx, sel, region, Direction::Down),
        Operation::Edit => edit(ctx, sel, region),
        Operation::QuickStart => quick_start(ctx),
        Operation::SquashFixups { scope } => squash_fixups(ctx, sel, *scope),
        Operation::InsertUpdateRef { branch } => insert_update_ref(ctx, sel, region, branch),
        Operation::Revert => revert(ctx.plan, sel),
        Operation::AmendTo => amend_to(ctx, sel),
        Operation::RebaseBranch { onto } => rebase_branch(ctx, onto),
        Operation::CherryPick { commits } => cherry_pick(ctx.plan, commits),
    }
}

/// Shared gate: bounds first, then the todo/non-todo boundary
fn validate(plan: &RebasePlan, sel: SelectionRange) -> Result<Region, Rejection> {
    if sel.start > sel.end || sel.end >= plan.display_len() {
        return Err(Rejection::InvalidSelection);
    }
    if !plan.is_rebasing() {
        return Ok(Region::Finalized);
    }

    let pending = plan.pending_len();
    if sel.start < pending && sel.end >= pending {
        return Err(Rejection::MustSelectTodoCommits);
    }
    if sel.end < pending {
        Ok(Region::Todos)
    } else if sel.is_single() && plan.find_cursor() == Some(sel.start) {
        Ok(Region::Cursor)
    } else {
        Ok(Region::Finalized)
    }
}

/// Plan indices of the selected todos, top to bottom
fn selected_todos(plan: &RebasePlan, sel: SelectionRange) -> Vec<usize> {
    sel.indices().filter_map(|d| plan.todo_index(d)).collect()
}

fn kind_message(kind: TodoKind, count: usize) -> String {
    let noun = if count == 1 { "todo" } else { "todos" };
    format!("Set {count} {noun} to {kind}")
}

/// Change the kind of the selected todos of the running rebase
fn change_kinds(plan: &RebasePlan, sel: SelectionRange, kind: TodoKind) -> Result<Mutation, Rejection> {
    let indices = selected_todos(plan, sel);
    let mut plan = plan.clone();
    for &i in &indices {
        let Some(item) = plan.item_at(i) else {
            continue;
        };
        if !item.kind.is_standard() {
            return Err(Rejection::ChangingThisActionIsNotAllowed);
        }
        let changed = item.with_kind(kind);
        plan.replace_range(i..i + 1, vec![changed]);
    }
    Ok(Mutation::todo(plan, kind_message(kind, indices.len())))
}

fn drop_selection(
    ctx: &RuleContext<'_>,
    sel: SelectionRange,
    region: Region,
    confirmed: bool,
) -> Result<Mutation, Rejection> {
    let plan = ctx.plan;
    match region {
        Region::Todos => {
            let indices = selected_todos(plan, sel);
            let (refs, others): (Vec<usize>, Vec<usize>) = indices
                .into_iter()
                .partition(|&i| plan.todos()[i].kind == TodoKind::UpdateRef);
            if others.iter().any(|&i| !plan.todos()[i].kind.is_standard()) {
                return Err(Rejection::ChangingThisActionIsNotAllowed);
            }
            if !refs.is_empty() && !confirmed {
                return Err(Rejection::ConfirmationRequired(
                    Confirmation::DeleteUpdateRefs,
                ));
            }

            let mut next = plan.clone();
            for &i in &others {
                let dropped = plan.todos()[i].with_kind(TodoKind::Drop);
                next.replace_range(i..i + 1, vec![dropped]);
            }
            for &i in refs.iter().rev() {
                next.replace_range(i..i + 1, Vec::new());
            }
            let message = if refs.is_empty() {
                kind_message(TodoKind::Drop, others.len())
            } else {
                format!(
                    "Dropped {} todo(s), deleted {} update-ref(s)",
                    others.len(),
                    refs.len()
                )
            };
            Ok(Mutation::todo(next, message))
        }
        Region::Cursor => {
            let effect = match plan.current() {
                Some(stop) if stop.reason == StopReason::FailedExec => {
                    return Err(Rejection::ChangingThisActionIsNotAllowed);
                }
                Some(_) => Effect::Skip {
                    kind: SessionKind::Rebase,
                },
                None => {
                    let parent = plan
                        .commits()
                        .first()
                        .and_then(|head| head.parent())
                        .ok_or(Rejection::NoParentCommit)?;
                    Effect::ResetHard {
                        sha: parent.to_string(),
                    }
                }
            };
            if !confirmed {
                return Err(Rejection::ConfirmationRequired(Confirmation::DropCursor));
            }
            Ok(Mutation::effect(effect, "Dropped the current commit"))
        }
        Region::Finalized if plan.is_rebasing() => Err(Rejection::MustSelectTodoCommits),
        Region::Finalized => {
            let mut rewrite = OneOff::new(ctx, sel.end)?;
            for i in sel.indices() {
                rewrite.set_kind(i, TodoKind::Drop);
            }
            Ok(rewrite.into_mutation(format!("Dropping {} commit(s)", sel.len())))
        }
    }
}

/// Fixup, squash and fixup-keeping-message: fold into the entry below
fn fold(
    ctx: &RuleContext<'_>,
    sel: SelectionRange,
    region: Region,
    kind: TodoKind,
) -> Result<Mutation, Rejection> {
    if sel.end + 1 >= ctx.plan.display_len() {
        return Err(Rejection::NoCommitBelow);
    }
    match region {
        Region::Todos => change_kinds(ctx.plan, sel, kind),
        Region::Cursor | Region::Finalized if ctx.plan.is_rebasing() => {
            Err(Rejection::MustSelectTodoCommits)
        }
        _ => {
            let mut rewrite = OneOff::new(ctx, sel.end + 1)?;
            for i in sel.indices() {
                rewrite.set_kind(i, kind);
            }
            Ok(rewrite.into_mutation(kind_message(kind, sel.len())))
        }
    }
}

fn reword(
    ctx: &RuleContext<'_>,
    sel: SelectionRange,
    region: Region,
    message: &str,
) -> Result<Mutation, Rejection> {
    if !sel.is_single() {
        return Err(Rejection::SingleItemOnly);
    }
    let plan = ctx.plan;
    let amend = || {
        Mutation::effect(
            Effect::AmendHeadMessage {
                message: message.to_string(),
            },
            "Reworded HEAD",
        )
    };

    match region {
        Region::Todos => Err(Rejection::MustSelectTodoCommits),
        Region::Cursor => match plan.current().map(|stop| stop.reason) {
            Some(StopReason::Conflict) => Err(Rejection::RewordConflict),
            Some(StopReason::FailedExec) => Err(Rejection::ChangingThisActionIsNotAllowed),
            None => Ok(amend()),
        },
        Region::Finalized if plan.is_rebasing() => Err(Rejection::AlreadyRebasing),
        Region::Finalized if sel.start == 0 => Ok(amend()),
        Region::Finalized => {
            let mut rewrite = OneOff::new(ctx, sel.start)?;
            rewrite.set_kind(sel.start, TodoKind::Edit);
            let base = rewrite.base.clone();
            let todo = rewrite.todo_text();
            Ok(Mutation::effect(
                Effect::RewordViaRebase {
                    base,
                    todo,
                    message: message.to_string(),
                },
                "Rewording commit",
            ))
        }
    }
}

fn edit(ctx: &RuleContext<'_>, sel: SelectionRange, region: Region) -> Result<Mutation, Rejection> {
    match region {
        Region::Todos => change_kinds(ctx.plan, sel, TodoKind::Edit),
        _ if ctx.plan.is_rebasing() => Err(Rejection::MustSelectTodoCommits),
        _ => {
            let mut rewrite = OneOff::new(ctx, sel.end)?;
            for i in sel.indices() {
                rewrite.set_kind(i, TodoKind::Edit);
            }
            Ok(rewrite.into_mutation("Started interactive rebase"))
        }
    }
}

fn move_selection(
    ctx: &RuleContext<'_>,
    sel: SelectionRange,
    region: Region,
    direction: Direction,
) -> Result<Mutation, Rejection> {
    let plan = ctx.plan;
    match region {
        Region::Todos => {
            let selected = selected_todos(plan, sel);
            match move_block(plan.todos(), &selected, direction)? {
                Some(todos) => {
                    let mut next = plan.clone();
                    next.replace_range(0..plan.todos().len(), todos);
                    Ok(Mutation::todo(next, "Moved todo(s)"))
                }
                None => Ok(Mutation::no_op(CANNOT_MOVE)),
            }
        }
        _ if plan.is_rebasing() => Err(Rejection::MustSelectTodoCommits),
        _ => {
            let last = match direction {
                Direction::Up if sel.start == 0 => return Ok(Mutation::no_op(CANNOT_MOVE)),
                Direction::Up => sel.end,
                Direction::Down if sel.end + 1 >= plan.commits().len() => {
                    return Ok(Mutation::no_op(CANNOT_MOVE));
                }
                Direction::Down => sel.end + 1,
            };
            let mut rewrite = OneOff::new(ctx, last)?;
            let selected: Vec<usize> = sel.indices().map(|i| rewrite.positions[i]).collect();
            match move_block(&rewrite.todos, &selected, direction)? {
                Some(todos) => {
                    rewrite.todos = todos;
                    Ok(rewrite.into_mutation("Moving commit(s)"))
                }
                None => Ok(Mutation::no_op(CANNOT_MOVE)),
            }
        }
    }
}

/// Index of the first commit (from HEAD) that is a merge or sits on a main branch
///
/// Without configured main branches, the nearest commit another local branch
/// points at is used instead.
fn quick_start_base(ctx: &RuleContext<'_>) -> Option<usize> {
    let other_branch_at = |sha: &str| {
        ctx.branches
            .iter()
            .any(|b| !b.is_head && Some(b.name.as_str()) != ctx.head_branch && b.sha == sha)
    };
    ctx.plan.commits().iter().enumerate().position(|(i, c)| {
        c.is_merge()
            || ctx.main_bases.contains(&c.sha)
            || (ctx.main_bases.is_empty() && i > 0 && other_branch_at(&c.sha))
    })
}

fn quick_start(ctx: &RuleContext<'_>) -> Result<Mutation, Rejection> {
    if ctx.plan.is_rebasing() {
        return Err(Rejection::AlreadyRebasing);
    }
    let base = quick_start_base(ctx)
        .filter(|&i| i > 0)
        .ok_or(Rejection::CannotQuickStart)?;

    let mut rewrite = OneOff::new(ctx, base - 1)?;
    rewrite.set_kind(base - 1, TodoKind::Edit);
    Ok(rewrite.into_mutation("Started interactive rebase"))
}

fn squash_fixups(
    ctx: &RuleContext<'_>,
    sel: SelectionRange,
    scope: FixupScope,
) -> Result<Mutation, Rejection> {
    if ctx.plan.is_rebasing() {
        return Err(Rejection::AlreadyRebasing);
    }
    let last = match scope {
        FixupScope::AboveSelected => sel.end,
        FixupScope::CurrentBranch => quick_start_base(ctx)
            .filter(|&i| i > 0)
            .map(|i| i - 1)
            .ok_or(Rejection::CannotSquashInCurrentBranch)?,
    };

    let mut rewrite = OneOff::new(ctx, last)?;
    let mut file_order: Vec<TodoItem> = rewrite.todos.iter().rev().cloned().collect();
    let Some(squashed) = autosquash(&file_order) else {
        return Ok(Mutation::no_op(NO_FIXUPS));
    };
    file_order = squashed;
    file_order.reverse();
    rewrite.todos = file_order;
    Ok(rewrite.into_mutation("Squashing fixup commits"))
}

fn insert_update_ref(
    ctx: &RuleContext<'_>,
    sel: SelectionRange,
    region: Region,
    branch: &str,
) -> Result<Mutation, Rejection> {
    let plan = ctx.plan;
    if !plan.is_rebasing() {
        return Err(Rejection::NotRebasing);
    }
    if !sel.is_single() {
        return Err(Rejection::SingleItemOnly);
    }
    let name = branch.trim();
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(Rejection::InvalidBranchName(branch.to_string()));
    }
    let target = if name.starts_with("refs/") {
        name.to_string()
    } else {
        format!("refs/heads/{name}")
    };
    if plan
        .todos()
        .iter()
        .any(|item| item.target_ref.as_deref() == Some(target.as_str()))
    {
        return Err(Rejection::DuplicateUpdateRef(name.to_string()));
    }

    let at = match region {
        Region::Todos => {
            let index = plan.todo_index(sel.start).ok_or(Rejection::InvalidSelection)?;
            if !plan.todos()[index].is_commit() {
                return Err(Rejection::ChangingThisActionIsNotAllowed);
            }
            index
        }
        // Applied right after the commit the rebase is stopped on
        Region::Cursor => plan.todos().len(),
        Region::Finalized => return Err(Rejection::MustSelectTodoCommits),
    };

    let mut next = plan.clone();
    next.replace_range(at..at, vec![TodoItem::update_ref(&target)]);
    Ok(Mutation::todo(next, format!("Added update-ref for '{name}'")))
}

/// Idle: `git revert` now. Rebasing: queue `exec git revert` entries to run next.
fn revert(plan: &RebasePlan, sel: SelectionRange) -> Result<Mutation, Rejection> {
    let mut commits = Vec::new();
    for d in sel.indices() {
        match plan.entry_at(d) {
            Some(DisplayEntry::Commit { commit, .. }) => commits.push(commit),
            _ => return Err(Rejection::CannotRevertPendingTodo),
        }
    }
    if commits.iter().any(|c| c.is_merge()) {
        return Err(Rejection::CannotRewriteMerges);
    }

    if !plan.is_rebasing() {
        let shas = commits.iter().map(|c| c.sha.clone()).collect();
        return Ok(Mutation::effect(
            Effect::Revert { shas },
            format!("Reverting {} commit(s)", commits.len()),
        ));
    }

    // Appended entries run next; the newest commit is reverted first
    let items: Vec<TodoItem> = commits
        .iter()
        .rev()
        .map(|c| TodoItem::exec(format!("git revert --no-edit {}", c.sha)))
        .collect();
    let mut next = plan.clone();
    let end = next.todos().len();
    let count = items.len();
    next.replace_range(end..end, items);
    Ok(Mutation::todo(next, format!("Added {count} revert todo(s)")))
}

/// Commit the staged changes as a fixup of the selection and squash it in
fn amend_to(ctx: &RuleContext<'_>, sel: SelectionRange) -> Result<Mutation, Rejection> {
    if ctx.plan.is_rebasing() {
        return Err(Rejection::AlreadyRebasing);
    }
    if !sel.is_single() {
        return Err(Rejection::SingleItemOnly);
    }
    if !ctx.staged_changes {
        return Err(Rejection::NothingStaged);
    }
    let rewrite = OneOff::new(ctx, sel.start)?;
    let target = &ctx.plan.commits()[sel.start];
    Ok(Mutation::effect(
        Effect::AmendTo {
            target: target.sha.clone(),
            todo: rewrite.todo_text(),
            base: rewrite.base,
        },
        format!("Amended staged changes into '{}'", target.subject),
    ))
}

/// Replay the commits above the merge base on top of another ref
///
/// When HEAD is already an ancestor of the ref the branch fast-forwards.
fn rebase_branch(ctx: &RuleContext<'_>, onto: &str) -> Result<Mutation, Rejection> {
    if ctx.plan.is_rebasing() {
        return Err(Rejection::AlreadyRebasing);
    }
    let name = onto.trim();
    if Some(name) == ctx.head_branch {
        return Err(Rejection::CannotRebaseOntoItself);
    }
    let unknown = || Rejection::UnknownRef(name.to_string());
    let target = ctx
        .rebase_target
        .filter(|t| t.name == name)
        .ok_or_else(unknown)?;
    let tip = target.tip.as_deref().ok_or_else(unknown)?;
    let base = target
        .merge_base
        .as_deref()
        .ok_or_else(|| Rejection::NoCommonAncestor(name.to_string()))?;
    if base == tip {
        return Ok(Mutation::no_op(format!(
            "Current branch is already based on '{name}'"
        )));
    }

    let count = ctx
        .plan
        .commits()
        .iter()
        .position(|c| c.sha == base)
        .ok_or_else(|| Rejection::NoCommonAncestor(name.to_string()))?;
    if count == 0 {
        return Ok(Mutation::effect(
            Effect::ResetTo(ResetRequest {
                sha: tip.to_string(),
                mode: ResetMode::Hard,
                autostash: true,
                reflog_action: Some(format!("rebase (fast-forward) onto {name}")),
            }),
            format!("Fast-forwarded to '{name}'"),
        ));
    }

    let mut rewrite = OneOff::new(ctx, count - 1)?;
    rewrite.base = RewriteBase::Commit(tip.to_string());
    Ok(rewrite.into_mutation(format!("Rebasing onto '{name}'")))
}

/// Idle: `git cherry-pick` now. Rebasing: queue picks to run next.
fn cherry_pick(plan: &RebasePlan, commits: &[String]) -> Result<Mutation, Rejection> {
    if commits.is_empty() {
        return Err(Rejection::NothingToCherryPick);
    }
    let count = commits.len();
    if !plan.is_rebasing() {
        return Ok(Mutation::effect(
            Effect::CherryPick {
                shas: commits.to_vec(),
            },
            format!("Cherry-picking {count} commit(s)"),
        ));
    }

    let items: Vec<TodoItem> = commits
        .iter()
        .rev()
        .map(|sha| TodoItem::pick(sha, ""))
        .collect();
    let mut next = plan.clone();
    let end = next.todos().len();
    next.replace_range(end..end, items);
    Ok(Mutation::todo(
        next,
        format!("Added {count} cherry-pick todo(s)"),
    ))
}

/// A fresh interactive rebase over commits `0..=last` of the current list
struct OneOff {
    /// Todos in display order
    todos: Vec<TodoItem>,
    /// Plan index of each commit of the rewritten range
    positions: Vec<usize>,
    base: RewriteBase,
}

impl OneOff {
    fn new(ctx: &RuleContext<'_>, last: usize) -> Result<Self, Rejection> {
        let commits = ctx.plan.commits();
        let range = commits.get(..=last).ok_or(Rejection::InvalidSelection)?;
        if range.iter().any(|c| c.is_merge()) {
            return Err(Rejection::CannotRewriteMerges);
        }
        let base = match commits[last].parent() {
            Some(parent) => RewriteBase::Commit(parent.to_string()),
            None => RewriteBase::Root,
        };

        let mut todos = Vec::new();
        let mut positions = Vec::with_capacity(range.len());
        for commit in range {
            if ctx.update_refs {
                for branch in ctx.branches.iter().filter(|b| {
                    b.sha == commit.sha && !b.is_head && Some(b.name.as_str()) != ctx.head_branch
                }) {
                    todos.push(TodoItem::update_ref(branch.full_ref()));
                }
            }
            positions.push(todos.len());
            todos.push(TodoItem::pick(&commit.sha, &commit.subject));
        }

        Ok(Self {
            todos,
            positions,
            base,
        })
    }

    fn set_kind(&mut self, commit_index: usize, kind: TodoKind) {
        if let Some(item) = self
            .positions
            .get(commit_index)
            .and_then(|&p| self.todos.get_mut(p))
        {
            item.kind = kind;
        }
    }

    fn todo_text(&self) -> String {
        let file_order: Vec<TodoItem> = self.todos.iter().rev().cloned().collect();
        Parser::serialize_todo(&file_order)
    }

    fn into_mutation(self, message: impl Into<String>) -> Mutation {
        let todo = self.todo_text();
        Mutation::effect(
            Effect::StartRewrite {
                base: self.base,
                todo,
            },
            message,
        )
    }
}

/// Plan index ranges of the movable units, top to bottom
///
/// A unit is a commit item plus everything between it and the commit above
/// (the `update-ref`s anchored to it and hidden items). A dropped commit with
/// `update-ref`s above it stays in the unit of the kept commit those refs point
/// at. Hidden items at the very top and items below the last commit (anchored
/// to HEAD) belong to no unit.
fn units(todos: &[TodoItem]) -> Vec<Range<usize>> {
    let fixed_top = todos
        .iter()
        .take_while(|item| !item.kind.is_visible())
        .count();
    let mut units = Vec::new();
    let mut start = fixed_top;
    for (i, item) in todos.iter().enumerate().skip(fixed_top) {
        if !item.is_commit() {
            continue;
        }
        let carries_refs = todos[start..i]
            .iter()
            .any(|t| t.kind == TodoKind::UpdateRef);
        if item.is_kept_commit() || !carries_refs {
            units.push(start..i + 1);
            start = i + 1;
        }
    }
    units
}

/// Swap two adjacent index ranges (`upper` directly above `lower`)
fn swap_ranges(todos: &[TodoItem], upper: Range<usize>, lower: Range<usize>) -> Vec<TodoItem> {
    let mut out = Vec::with_capacity(todos.len());
    out.extend_from_slice(&todos[..upper.start]);
    out.extend_from_slice(&todos[lower.clone()]);
    out.extend_from_slice(&todos[upper]);
    out.extend_from_slice(&todos[lower.end..]);
    out
}

/// Move the selected todos one unit; `None` at the boundary
fn move_block(
    todos: &[TodoItem],
    selected: &[usize],
    direction: Direction,
) -> Result<Option<Vec<TodoItem>>, Rejection> {
    if selected.iter().any(|&i| {
        let kind = todos[i].kind;
        !kind.is_standard() && kind != TodoKind::UpdateRef
    }) {
        return Err(Rejection::ChangingThisActionIsNotAllowed);
    }
    let Some(&first) = selected.first() else {
        return Ok(None);
    };
    let Some(&last_commit) = selected.iter().rev().find(|&&i| todos[i].is_commit()) else {
        return Ok(move_refs(todos, selected, direction));
    };

    let units = units(todos);
    let unit_of = |p: usize| units.iter().position(|u| u.contains(&p));
    let (Some(a), Some(b)) = (unit_of(first), unit_of(last_commit)) else {
        return Ok(None);
    };
    let mut block = units[a].start..units[b].end;
    // Selected `update-ref`s below the last commit travel with the block
    if let Some(&last) = selected.last()
        && last >= block.end
    {
        block.end = last + 1;
    }

    let moved = match direction {
        Direction::Up if a > 0 => swap_ranges(todos, units[a - 1].clone(), block),
        Direction::Down if b + 1 < units.len() => swap_ranges(todos, block, units[b + 1].clone()),
        _ => return Ok(None),
    };
    Ok(Some(moved))
}

/// Re-anchor a selection of only `update-ref`s to the next commit up or down
fn move_refs(todos: &[TodoItem], selected: &[usize], direction: Direction) -> Option<Vec<TodoItem>> {
    let first = *selected.first()?;
    let last = *selected.last()?;
    let moving: Vec<TodoItem> = selected.iter().map(|&i| todos[i].clone()).collect();
    let mut out = Vec::with_capacity(todos.len());

    match direction {
        Direction::Up => {
            let above = (0..first).rev().find(|&i| todos[i].is_kept_commit())?;
            for (i, item) in todos.iter().enumerate() {
                if i == above {
                    out.extend(moving.iter().cloned());
                }
                if !selected.contains(&i) {
                    out.push(item.clone());
                }
            }
        }
        Direction::Down => {
            let below = (last + 1..todos.len()).find(|&i| todos[i].is_kept_commit())?;
            for (i, item) in todos.iter().enumerate() {
                if !selected.contains(&i) {
                    out.push(item.clone());
                }
                if i == below {
                    out.extend(moving.iter().cloned());
                }
            }
        }
    }
    Some(out)
}

/// Split a `fixup! ` / `squash! ` / `amend! ` subject into its kind and target text
///
/// Repeated prefixes are all stripped; the first one decides the kind.
fn fixup_target(subject: &str) -> Option<(TodoKind, &str)> {
    let mut rest = subject;
    let mut kind = None;
    'strip: loop {
        for (prefix, prefix_kind) in FIXUP_PREFIXES {
            if let Some(stripped) = rest.strip_prefix(prefix) {
                kind.get_or_insert(prefix_kind);
                rest = stripped;
                continue 'strip;
            }
        }
        break;
    }
    kind.map(|kind| (kind, rest))
}

/// Reorder a file-order todo list the way `git rebase --autosquash` does
///
/// Returns `None` when there is nothing to squash.
fn autosquash(items: &[TodoItem]) -> Option<Vec<TodoItem>> {
    let is_target = |candidate: &TodoItem, text: &str| {
        candidate.subject == text
            || (text.len() >= 4
                && candidate
                    .commit
                    .as_deref()
                    .is_some_and(|sha| sha.starts_with(text)))
    };

    let mut attached: Vec<Vec<TodoItem>> = vec![Vec::new(); items.len()];
    let mut order = Vec::with_capacity(items.len());
    let mut changed = false;

    for (i, item) in items.iter().enumerate() {
        if item.is_commit()
            && let Some((kind, text)) = fixup_target(&item.subject)
        {
            let target = items[..i]
                .iter()
                .position(|c| c.is_commit() && fixup_target(&c.subject).is_none() && is_target(c, text))
                .or_else(|| {
                    items[..i].iter().position(|c| {
                        c.is_commit() && fixup_target(&c.subject).is_none() && c.subject.starts_with(text)
                    })
                });
            if let Some(target) = target {
                attached[target].push(item.with_kind(kind));
                changed = true;
                continue;
            }
        }
        order.push(i);
    }

    if !changed {
        return None;
    }
    let mut out = Vec::with_capacity(items.len());
    for i in order {
        out.push(items[i].clone());
        out.append(&mut attached[i]);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Anchor, Commit, CurrentStop, Phase};

    const REBASING: SessionState = SessionState::Rebasing(Phase::Running);
    const IDLE: SessionState = SessionState::Idle;

    fn sha(n: usize) -> String {
        format!("{n:040x}")
    }

    /// Linear history `commit 01..=count`, HEAD first
    fn history(count: usize) -> Vec<Commit> {
        (1..=count)
            .rev()
            .map(|n| {
                let parents = if n > 1 { vec![sha(n - 1)] } else { vec![] };
                Commit::new(sha(n), format!("commit {n:02}"), parents)
            })
            .collect()
    }

    fn ctx<'a>(plan: &'a RebasePlan, state: &'a SessionState) -> RuleContext<'a> {
        RuleContext {
            plan,
            state,
            branches: &[],
            head_branch: Some("master"),
            main_bases: &[],
            update_refs: false,
            staged_changes: false,
            rebase_target: None,
        }
    }

    /// Stopped at `edit commit 02` of five commits; todos 05, 04, 03
    fn edit_stop() -> RebasePlan {
        RebasePlan::rebasing(
            vec![
                TodoItem::comment("# Rebase 1..5 onto 1"),
                TodoItem::pick(sha(5), "commit 05"),
                TodoItem::pick(sha(4), "commit 04"),
                TodoItem::pick(sha(3), "commit 03"),
            ],
            None,
            history(2),
            Some(sha(1)),
        )
    }

    fn todo_kinds(m: &Mutation) -> Vec<TodoKind> {
        m.plan
            .as_ref()
            .map(|p| {
                p.visible_todo_indices()
                    .into_iter()
                    .map(|i| p.todos()[i].kind)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn rewrite_todo(m: &Mutation) -> &str {
        match &m.effect {
            Effect::StartRewrite { todo, .. } => todo,
            other => panic!("expected a rewrite, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_selection() {
        let plan = edit_stop();
        let r = apply(&ctx(&plan, &REBASING), &Operation::Fixup, SelectionRange::new(0, 9));
        assert_eq!(r, Err(Rejection::InvalidSelection));
        let backwards = SelectionRange { start: 2, end: 1 };
        let r = apply(&ctx(&plan, &REBASING), &Operation::Pick, backwards);
        assert_eq!(r, Err(Rejection::InvalidSelection));
    }

    #[test]
    fn test_mixed_selection_rejected_before_kind_checks() {
        let plan = edit_stop();
        for op in [
            Operation::Drop { confirmed: true },
            Operation::Fixup,
            Operation::Reword {
                message: "x".into(),
            },
            Operation::MoveDown,
            Operation::Revert,
        ] {
            let r = apply(&ctx(&plan, &REBASING), &op, SelectionRange::new(2, 3));
            assert_eq!(r, Err(Rejection::MustSelectTodoCommits), "{}", op.name());
        }
    }

    #[test]
    fn test_other_session_rejected() {
        let plan = RebasePlan::idle(history(3));
        let state = SessionState::Merging(Phase::WaitingOnConflict);
        let r = apply(&ctx(&plan, &state), &Operation::Edit, SelectionRange::single(1));
        assert_eq!(r, Err(Rejection::AlreadyRebasing));
    }

    #[test]
    fn test_fixup_and_drop_todos() {
        let plan = edit_stop();
        let m = apply(&ctx(&plan, &REBASING), &Operation::Fixup, SelectionRange::single(1)).unwrap();
        assert_eq!(
            todo_kinds(&m),
            vec![TodoKind::Pick, TodoKind::Fixup, TodoKind::Pick]
        );
        let Effect::WriteTodo { text } = &m.effect else {
            panic!("expected todo write");
        };
        insta::assert_snapshot!(text.trim_end(), @r"
pick 0000000000000000000000000000000000000003 commit 03
fixup 0000000000000000000000000000000000000004 commit 04
pick 0000000000000000000000000000000000000005 commit 05
# Rebase 1..5 onto 1
");

        let plan = m.plan.unwrap();
        let m = apply(
            &ctx(&plan, &REBASING),
            &Operation::Drop { confirmed: false },
            SelectionRange::single(2),
        )
        .unwrap();
        assert_eq!(
            todo_kinds(&m),
            vec![TodoKind::Pick, TodoKind::Fixup, TodoKind::Drop]
        );
    }

    #[test]
    fn test_fixup_needs_commit_below() {
        let plan = RebasePlan::idle(history(3));
        let r = apply(&ctx(&plan, &IDLE), &Operation::Squash, SelectionRange::single(2));
        assert_eq!(r, Err(Rejection::NoCommitBelow));
        let r = apply(&ctx(&plan, &IDLE), &Operation::Fixup, SelectionRange::new(1, 2));
        assert_eq!(r, Err(Rejection::NoCommitBelow));
    }

    #[test]
    fn test_idle_fixup_starts_one_off_rebase() {
        let plan = RebasePlan::idle(history(4));
        let m = apply(
            &ctx(&plan, &IDLE),
            &Operation::FixupKeepMessage,
            SelectionRange::single(1),
        )
        .unwrap();
        let Effect::StartRewrite { base, .. } = &m.effect else {
            panic!("expected a rewrite");
        };
        assert_eq!(base, &RewriteBase::Commit(sha(1)));
        insta::assert_snapshot!(rewrite_todo(&m).trim_end(), @r"
pick 0000000000000000000000000000000000000002 commit 02
fixup -C 0000000000000000000000000000000000000003 commit 03
pick 0000000000000000000000000000000000000004 commit 04
");
    }

    #[test]
    fn test_drop_update_ref_needs_confirmation() {
        let plan = RebasePlan::rebasing(
            vec![
                TodoItem::pick(sha(5), "commit 05"),
                TodoItem::update_ref("refs/heads/branch1"),
                TodoItem::pick(sha(4), "commit 04"),
            ],
            None,
            history(3),
            None,
        );
        let r = apply(
            &ctx(&plan, &REBASING),
            &Operation::Drop { confirmed: false },
            SelectionRange::new(0, 1),
        );
        assert_eq!(
            r,
            Err(Rejection::ConfirmationRequired(Confirmation::DeleteUpdateRefs))
        );

        let m = apply(
            &ctx(&plan, &REBASING),
            &Operation::Drop { confirmed: true },
            SelectionRange::new(0, 1),
        )
        .unwrap();
        assert_eq!(todo_kinds(&m), vec![TodoKind::Drop, TodoKind::Pick]);
        assert!(m.plan.unwrap().anchors().is_empty());
    }

    #[test]
    fn test_drop_cursor() {
        let plan = edit_stop();
        let cursor = SelectionRange::single(3);
        let r = apply(&ctx(&plan, &REBASING), &Operation::Drop { confirmed: false }, cursor);
        assert_eq!(
            r,
            Err(Rejection::ConfirmationRequired(Confirmation::DropCursor))
        );
        let m = apply(&ctx(&plan, &REBASING), &Operation::Drop { confirmed: true }, cursor).unwrap();
        assert_eq!(m.effect, Effect::ResetHard { sha: sha(1) });

        let conflicted = RebasePlan::rebasing(
            vec![TodoItem::pick(sha(5), "commit 05")],
            Some(CurrentStop {
                item: TodoItem::pick(sha(4), "commit 04"),
                reason: StopReason::Conflict,
            }),
            history(3),
            None,
        );
        let m = apply(
            &ctx(&conflicted, &REBASING),
            &Operation::Drop { confirmed: true },
            SelectionRange::single(1),
        )
        .unwrap();
        assert!(matches!(m.effect, Effect::Skip { .. }));
    }

    #[test]
    fn test_kind_change_only_for_standard_todos() {
        let plan = RebasePlan::rebasing(
            vec![TodoItem::exec("make test"), TodoItem::pick(sha(3), "commit 03")],
            None,
            history(2),
            None,
        );
        let r = apply(&ctx(&plan, &REBASING), &Operation::Edit, SelectionRange::single(0));
        assert_eq!(r, Err(Rejection::ChangingThisActionIsNotAllowed));
    }

    #[test]
    fn test_reword_rules() {
        let plan = edit_stop();
        let reword = Operation::Reword {
            message: "new".into(),
        };
        let c = ctx(&plan, &REBASING);
        assert_eq!(
            apply(&c, &reword, SelectionRange::new(0, 1)),
            Err(Rejection::SingleItemOnly)
        );
        assert_eq!(
            apply(&c, &reword, SelectionRange::single(1)),
            Err(Rejection::MustSelectTodoCommits)
        );
        assert_eq!(
            apply(&c, &reword, SelectionRange::single(4)),
            Err(Rejection::AlreadyRebasing)
        );
        let m = apply(&c, &reword, SelectionRange::single(3)).unwrap();
        assert_eq!(
            m.effect,
            Effect::AmendHeadMessage {
                message: "new".into()
            }
        );

        let idle = RebasePlan::idle(history(3));
        let m = apply(&ctx(&idle, &IDLE), &reword, SelectionRange::single(1)).unwrap();
        let Effect::RewordViaRebase { todo, base, .. } = &m.effect else {
            panic!("expected reword via rebase");
        };
        assert_eq!(base, &RewriteBase::Commit(sha(1)));
        assert!(todo.starts_with(&format!("edit {}", sha(2))));
    }

    #[test]
    fn test_reword_conflict_rejected() {
        let plan = RebasePlan::rebasing(
            vec![],
            Some(CurrentStop {
                item: TodoItem::pick(sha(3), "commit 03"),
                reason: StopReason::Conflict,
            }),
            history(2),
            None,
        );
        let r = apply(
            &ctx(&plan, &REBASING),
            &Operation::Reword {
                message: "x".into(),
            },
            SelectionRange::single(0),
        );
        assert_eq!(r, Err(Rejection::RewordConflict));
    }

    #[test]
    fn test_move_keeps_update_ref_with_its_commit() {
        // display: 05, branch1, 04, 03
        let plan = RebasePlan::rebasing(
            vec![
                TodoItem::pick(sha(5), "commit 05"),
                TodoItem::update_ref("refs/heads/branch1"),
                TodoItem::pick(sha(4), "commit 04"),
                TodoItem::pick(sha(3), "commit 03"),
            ],
            None,
            history(2),
            None,
        );
        let m = apply(&ctx(&plan, &REBASING), &Operation::MoveUp, SelectionRange::single(2)).unwrap();
        let moved = m.plan.unwrap();
        assert_eq!(
            moved.anchors(),
            vec![("refs/heads/branch1".to_string(), Anchor::Commit(sha(4)))]
        );
        assert_eq!(moved.todos()[0].kind, TodoKind::UpdateRef);
        assert_eq!(moved.todos()[2].commit.as_deref(), Some(sha(5).as_str()));

        // Moving 05 down across branch1 keeps branch1 on 04
        let m = apply(&ctx(&plan, &REBASING), &Operation::MoveDown, SelectionRange::single(0)).unwrap();
        let moved = m.plan.unwrap();
        assert_eq!(
            moved.anchors(),
            vec![("refs/heads/branch1".to_string(), Anchor::Commit(sha(4)))]
        );
    }

    #[test]
    fn test_move_update_ref_alone_reanchors() {
        let plan = RebasePlan::rebasing(
            vec![
                TodoItem::pick(sha(5), "commit 05"),
                TodoItem::update_ref("refs/heads/branch1"),
                TodoItem::pick(sha(4), "commit 04"),
            ],
            None,
            history(3),
            None,
        );
        let c = ctx(&plan, &REBASING);
        let up = apply(&c, &Operation::MoveUp, SelectionRange::single(1)).unwrap();
        assert_eq!(
            up.plan.unwrap().anchors(),
            vec![("refs/heads/branch1".to_string(), Anchor::Commit(sha(5)))]
        );
        let down = apply(&c, &Operation::MoveDown, SelectionRange::single(1)).unwrap();
        assert_eq!(
            down.plan.unwrap().anchors(),
            vec![("refs/heads/branch1".to_string(), Anchor::Head)]
        );
    }

    #[test]
    fn test_move_at_boundary_is_no_op() {
        let plan = edit_stop();
        let c = ctx(&plan, &REBASING);
        let m = apply(&c, &Operation::MoveUp, SelectionRange::single(0)).unwrap();
        assert!(m.is_no_op());
        assert_eq!(m.message, CANNOT_MOVE);
        let m = apply(&c, &Operation::MoveDown, SelectionRange::single(2)).unwrap();
        assert!(m.is_no_op());

        let idle = RebasePlan::idle(history(3));
        let m = apply(&ctx(&idle, &IDLE), &Operation::MoveDown, SelectionRange::single(2)).unwrap();
        assert!(m.is_no_op());
    }

    #[test]
    fn test_idle_move_down() {
        let plan = RebasePlan::idle(history(3));
        let m = apply(&ctx(&plan, &IDLE), &Operation::MoveDown, SelectionRange::single(0)).unwrap();
        insta::assert_snapshot!(rewrite_todo(&m).trim_end(), @r"
pick 0000000000000000000000000000000000000003 commit 03
pick 0000000000000000000000000000000000000002 commit 02
");
    }

    #[test]
    fn test_idle_edit_with_update_refs() {
        let plan = RebasePlan::idle(history(4));
        let branches = vec![
            Branch {
                name: "master".into(),
                sha: sha(4),
                is_head: true,
            },
            Branch {
                name: "branch1".into(),
                sha: sha(3),
                is_head: false,
            },
        ];
        let c = RuleContext {
            branches: &branches,
            update_refs: true,
            ..ctx(&plan, &IDLE)
        };
        let m = apply(&c, &Operation::Edit, SelectionRange::single(2)).unwrap();
        insta::assert_snapshot!(rewrite_todo(&m).trim_end(), @r"
edit 0000000000000000000000000000000000000002 commit 02
pick 0000000000000000000000000000000000000003 commit 03
update-ref refs/heads/branch1
pick 0000000000000000000000000000000000000004 commit 04
");
    }

    #[test]
    fn test_one_off_across_merge_rejected() {
        let mut commits = history(3);
        commits[1].parents.push(sha(9));
        let plan = RebasePlan::idle(commits);
        let r = apply(&ctx(&plan, &IDLE), &Operation::Edit, SelectionRange::single(2));
        assert_eq!(r, Err(Rejection::CannotRewriteMerges));
    }

    #[test]
    fn test_root_commit_uses_root_base() {
        let plan = RebasePlan::idle(history(2));
        let m = apply(&ctx(&plan, &IDLE), &Operation::Edit, SelectionRange::single(1)).unwrap();
        let Effect::StartRewrite { base, .. } = m.effect else {
            panic!("expected a rewrite");
        };
        assert_eq!(base, RewriteBase::Root);
    }

    #[test]
    fn test_quick_start() {
        let plan = RebasePlan::idle(history(5));
        let bases = vec![sha(2)];
        let c = RuleContext {
            main_bases: &bases,
            ..ctx(&plan, &IDLE)
        };
        let m = apply(&c, &Operation::QuickStart, SelectionRange::single(0)).unwrap();
        let Effect::StartRewrite { base, todo } = &m.effect else {
            panic!("expected a rewrite");
        };
        assert_eq!(base, &RewriteBase::Commit(sha(2)));
        assert!(todo.starts_with(&format!("edit {}", sha(3))));

        let on_main = vec![sha(5)];
        let c = RuleContext {
            main_bases: &on_main,
            ..ctx(&plan, &IDLE)
        };
        let r = apply(&c, &Operation::QuickStart, SelectionRange::single(0));
        assert_eq!(r, Err(Rejection::CannotQuickStart));

        let rebasing = edit_stop();
        let r = apply(&ctx(&rebasing, &REBASING), &Operation::QuickStart, SelectionRange::single(0));
        assert_eq!(r, Err(Rejection::AlreadyRebasing));
    }

    #[test]
    fn test_quick_start_falls_back_to_branch_boundary() {
        let plan = RebasePlan::idle(history(4));
        let branches = vec![Branch {
            name: "base".into(),
            sha: sha(2),
            is_head: false,
        }];
        let c = RuleContext {
            branches: &branches,
            ..ctx(&plan, &IDLE)
        };
        let m = apply(&c, &Operation::QuickStart, SelectionRange::single(0)).unwrap();
        let Effect::StartRewrite { base, .. } = m.effect else {
            panic!("expected a rewrite");
        };
        assert_eq!(base, RewriteBase::Commit(sha(2)));
    }

    #[test]
    fn test_squash_fixups() {
        let commits = vec![
            Commit::new(sha(5), "fixup! commit 02", vec![sha(4)]),
            Commit::new(sha(4), "squash! commit 03", vec![sha(3)]),
            Commit::new(sha(3), "commit 03", vec![sha(2)]),
            Commit::new(sha(2), "commit 02", vec![sha(1)]),
            Commit::new(sha(1), "commit 01", vec![]),
        ];
        let plan = RebasePlan::idle(commits);
        let bases = vec![sha(1)];
        let c = RuleContext {
            main_bases: &bases,
            ..ctx(&plan, &IDLE)
        };
        let m = apply(
            &c,
            &Operation::SquashFixups {
                scope: FixupScope::CurrentBranch,
            },
            SelectionRange::single(0),
        )
        .unwrap();
        insta::assert_snapshot!(rewrite_todo(&m).trim_end(), @r"
pick 0000000000000000000000000000000000000002 commit 02
fixup 0000000000000000000000000000000000000005 fixup! commit 02
pick 0000000000000000000000000000000000000003 commit 03
squash 0000000000000000000000000000000000000004 squash! commit 03
");

        let m = apply(
            &ctx(&plan, &IDLE),
            &Operation::SquashFixups {
                scope: FixupScope::AboveSelected,
            },
            SelectionRange::single(2),
        )
        .unwrap();
        assert!(rewrite_todo(&m).contains("squash "));
        assert!(!rewrite_todo(&m).contains("fixup "));

        let r = apply(
            &ctx(&plan, &IDLE),
            &Operation::SquashFixups {
                scope: FixupScope::CurrentBranch,
            },
            SelectionRange::single(0),
        );
        assert_eq!(r, Err(Rejection::CannotSquashInCurrentBranch));
    }

    #[test]
    fn test_squash_fixups_without_fixups_is_no_op() {
        let plan = RebasePlan::idle(history(3));
        let m = apply(
            &ctx(&plan, &IDLE),
            &Operation::SquashFixups {
                scope: FixupScope::AboveSelected,
            },
            SelectionRange::single(1),
        )
        .unwrap();
        assert!(m.is_no_op());
    }

    #[test]
    fn test_fixup_target_prefixes() {
        assert_eq!(
            fixup_target("fixup! fixup! commit 02"),
            Some((TodoKind::Fixup, "commit 02"))
        );
        assert_eq!(
            fixup_target("amend! commit 02"),
            Some((TodoKind::FixupUseOwnMessage, "commit 02"))
        );
        assert_eq!(fixup_target("commit 02"), None);
    }

    #[test]
    fn test_insert_update_ref() {
        let plan = edit_stop();
        let c = ctx(&plan, &REBASING);
        let op = Operation::InsertUpdateRef {
            branch: "feature".into(),
        };
        let m = apply(&c, &op, SelectionRange::single(1)).unwrap();
        let next = m.plan.unwrap();
        assert_eq!(
            next.anchors(),
            vec![("refs/heads/feature".to_string(), Anchor::Commit(sha(4)))]
        );

        let m = apply(&ctx(&next, &REBASING), &op, SelectionRange::single(0));
        assert_eq!(m, Err(Rejection::DuplicateUpdateRef("feature".into())));

        let m = apply(&c, &op, SelectionRange::single(3)).unwrap();
        assert_eq!(
            m.plan.unwrap().anchors(),
            vec![("refs/heads/feature".to_string(), Anchor::Head)]
        );

        let bad = Operation::InsertUpdateRef {
            branch: "  ".into(),
        };
        assert_eq!(
            apply(&c, &bad, SelectionRange::single(1)),
            Err(Rejection::InvalidBranchName("  ".into()))
        );

        let idle = RebasePlan::idle(history(2));
        assert_eq!(
            apply(&ctx(&idle, &IDLE), &op, SelectionRange::single(0)),
            Err(Rejection::NotRebasing)
        );
    }

    #[test]
    fn test_revert() {
        let idle = RebasePlan::idle(history(3));
        let m = apply(&ctx(&idle, &IDLE), &Operation::Revert, SelectionRange::new(0, 1)).unwrap();
        assert_eq!(
            m.effect,
            Effect::Revert {
                shas: vec![sha(3), sha(2)]
            }
        );

        let plan = edit_stop();
        let c = ctx(&plan, &REBASING);
        assert_eq!(
            apply(&c, &Operation::Revert, SelectionRange::single(0)),
            Err(Rejection::CannotRevertPendingTodo)
        );
        let m = apply(&c, &Operation::Revert, SelectionRange::new(3, 4)).unwrap();
        let Effect::WriteTodo { text } = &m.effect else {
            panic!("expected todo write");
        };
        let first_lines: Vec<&str> = text.lines().take(2).collect();
        assert_eq!(
            first_lines,
            vec![
                format!("exec git revert --no-edit {}", sha(2)),
                format!("exec git revert --no-edit {}", sha(1)),
            ]
        );
    }

    /// Pending picks 05, 04, 03 with `topic` anchored to HEAD below them
    fn trailing_ref_plan() -> RebasePlan {
        RebasePlan::rebasing(
            vec![
                TodoItem::pick(sha(5), "commit 05"),
                TodoItem::pick(sha(4), "commit 04"),
                TodoItem::pick(sha(3), "commit 03"),
                TodoItem::update_ref("refs/heads/topic"),
            ],
            None,
            history(2),
            Some(sha(1)),
        )
    }

    #[test]
    fn test_move_up_carries_selected_trailing_ref() {
        let plan = trailing_ref_plan();
        let m = apply(
            &ctx(&plan, &REBASING),
            &Operation::MoveUp,
            SelectionRange::new(2, 3),
        )
        .unwrap();
        let next = m.plan.unwrap();
        let order: Vec<String> = next
            .todos()
            .iter()
            .map(|t| t.display_text().to_string())
            .collect();
        assert_eq!(
            order,
            vec!["commit 05", "commit 03", "topic", "commit 04"]
        );
        assert_eq!(next.todos().len(), plan.todos().len());

        // Nothing below the trailing ref to move into
        let m = apply(
            &ctx(&plan, &REBASING),
            &Operation::MoveDown,
            SelectionRange::new(2, 3),
        )
        .unwrap();
        assert!(m.is_no_op());
    }

    #[test]
    fn test_moves_keep_refs_above_dropped_commit() {
        let plan = RebasePlan::rebasing(
            vec![
                TodoItem::pick(sha(6), "commit 06"),
                TodoItem::update_ref("refs/heads/topic"),
                TodoItem::new(TodoKind::Drop, sha(5), "commit 05"),
                TodoItem::pick(sha(4), "commit 04"),
                TodoItem::pick(sha(3), "commit 03"),
            ],
            None,
            history(2),
            Some(sha(1)),
        );
        assert_eq!(
            plan.anchors(),
            vec![("refs/heads/topic".to_string(), Anchor::Commit(sha(4)))]
        );

        for (row, op) in [(0, Operation::MoveDown), (3, Operation::MoveUp), (4, Operation::MoveUp)] {
            let m = apply(&ctx(&plan, &REBASING), &op, SelectionRange::single(row)).unwrap();
            let next = m.plan.unwrap();
            assert_eq!(next.anchors(), plan.anchors(), "{} row {row}", op.name());
            assert_eq!(next.kept_commits().len(), 3);
        }
    }

    #[test]
    fn test_amend_to_builds_fixup_rewrite() {
        let plan = RebasePlan::idle(history(4));
        let staged = RuleContext {
            staged_changes: true,
            ..ctx(&plan, &IDLE)
        };
        let m = apply(&staged, &Operation::AmendTo, SelectionRange::single(2)).unwrap();
        let Effect::AmendTo { target, base, todo } = &m.effect else {
            panic!("expected amend-to, got {:?}", m.effect);
        };
        assert_eq!(target, &sha(2));
        assert_eq!(base, &RewriteBase::Commit(sha(1)));
        insta::assert_snapshot!(todo.trim_end(), @r"
pick 0000000000000000000000000000000000000002 commit 02
pick 0000000000000000000000000000000000000003 commit 03
pick 0000000000000000000000000000000000000004 commit 04
");

        let r = apply(&ctx(&plan, &IDLE), &Operation::AmendTo, SelectionRange::single(2));
        assert_eq!(r, Err(Rejection::NothingStaged));
        let r = apply(&staged, &Operation::AmendTo, SelectionRange::new(1, 2));
        assert_eq!(r, Err(Rejection::SingleItemOnly));

        let rebasing = edit_stop();
        let c = RuleContext {
            staged_changes: true,
            ..ctx(&rebasing, &REBASING)
        };
        let r = apply(&c, &Operation::AmendTo, SelectionRange::single(3));
        assert_eq!(r, Err(Rejection::AlreadyRebasing));
    }

    fn rebase_onto(plan: &RebasePlan, target: &RebaseTarget) -> Result<Mutation, Rejection> {
        let c = RuleContext {
            rebase_target: Some(target),
            ..ctx(plan, &IDLE)
        };
        let op = Operation::RebaseBranch {
            onto: target.name.clone(),
        };
        apply(&c, &op, SelectionRange::single(0))
    }

    #[test]
    fn test_rebase_branch_picks_commits_above_merge_base() {
        let plan = RebasePlan::idle(history(4));
        let target = RebaseTarget {
            name: "main".into(),
            tip: Some(sha(9)),
            merge_base: Some(sha(2)),
        };
        let m = rebase_onto(&plan, &target).unwrap();
        let Effect::StartRewrite { base, todo } = &m.effect else {
            panic!("expected a rewrite");
        };
        assert_eq!(base, &RewriteBase::Commit(sha(9)));
        insta::assert_snapshot!(todo.trim_end(), @r"
pick 0000000000000000000000000000000000000003 commit 03
pick 0000000000000000000000000000000000000004 commit 04
");
        assert_eq!(m.message, "Rebasing onto 'main'");
    }

    #[test]
    fn test_rebase_branch_edge_cases() {
        let plan = RebasePlan::idle(history(4));

        let up_to_date = RebaseTarget {
            name: "main".into(),
            tip: Some(sha(2)),
            merge_base: Some(sha(2)),
        };
        assert!(rebase_onto(&plan, &up_to_date).unwrap().is_no_op());

        let ahead = RebaseTarget {
            name: "main".into(),
            tip: Some(sha(9)),
            merge_base: Some(sha(4)),
        };
        let m = rebase_onto(&plan, &ahead).unwrap();
        let Effect::ResetTo(request) = &m.effect else {
            panic!("expected a fast-forward");
        };
        assert_eq!(request.sha, sha(9));
        assert_eq!(request.mode, ResetMode::Hard);

        let unrelated = RebaseTarget {
            name: "orphan".into(),
            tip: Some(sha(9)),
            merge_base: None,
        };
        assert_eq!(
            rebase_onto(&plan, &unrelated),
            Err(Rejection::NoCommonAncestor("orphan".into()))
        );

        let missing = RebaseTarget {
            name: "nope".into(),
            tip: None,
            merge_base: None,
        };
        assert_eq!(
            rebase_onto(&plan, &missing),
            Err(Rejection::UnknownRef("nope".into()))
        );

        let current = RebaseTarget {
            name: "master".into(),
            tip: Some(sha(4)),
            merge_base: Some(sha(4)),
        };
        assert_eq!(
            rebase_onto(&plan, &current),
            Err(Rejection::CannotRebaseOntoItself)
        );
    }

    #[test]
    fn test_cherry_pick_mid_rebase_queues_picks() {
        let plan = edit_stop();
        let op = Operation::CherryPick {
            commits: vec![sha(7), sha(8)],
        };
        let m = apply(&ctx(&plan, &REBASING), &op, SelectionRange::single(0)).unwrap();
        let Effect::WriteTodo { text } = &m.effect else {
            panic!("expected todo write");
        };
        insta::assert_snapshot!(text.trim_end(), @r"
pick 0000000000000000000000000000000000000007
pick 0000000000000000000000000000000000000008
pick 0000000000000000000000000000000000000003 commit 03
pick 0000000000000000000000000000000000000004 commit 04
pick 0000000000000000000000000000000000000005 commit 05
# Rebase 1..5 onto 1
");

        let idle = RebasePlan::idle(history(2));
        let m = apply(&ctx(&idle, &IDLE), &op, SelectionRange::single(0)).unwrap();
        assert_eq!(
            m.effect,
            Effect::CherryPick {
                shas: vec![sha(7), sha(8)]
            }
        );

        let none = Operation::CherryPick { commits: vec![] };
        let r = apply(&ctx(&idle, &IDLE), &none, SelectionRange::single(0));
        assert_eq!(r, Err(Rejection::NothingToCherryPick));
    }
}
