//! Data models for restack
//!
//! This module contains UI-independent data structures representing
//! git concepts like commits, rebase todos, and undo checkpoints.

mod branch;
mod checkpoint;
mod commit;
mod file_status;
mod plan;
mod reflog;
mod session;
mod todo;

pub use branch::Branch;
pub use checkpoint::{ActionKind, UndoCheckpoint};
pub use commit::{Commit, short_sha};
pub use file_status::FileStatus;
pub use plan::{Anchor, CurrentStop, DisplayEntry, RebasePlan, StopReason};
pub use reflog::ReflogEntry;
pub use session::{Phase, SessionKind, SessionState};
pub use todo::{TodoItem, TodoKind};
