//! restack - interactive rebase from the command line
//!
//! Thin front end over the engine: prints the plan and drives the session.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use restack::config;
use restack::engine::{
    Engine, FixupScope, Operation, Outcome, PlanChangeSummary, SelectionRange,
};
use restack::git::{GitExecutor, Repository};
use restack::model::{DisplayEntry, StopReason};

/// Interactive rebase from a list of commits
#[derive(Parser)]
#[command(name = "restack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Repository path (default: current directory)
    #[arg(short = 'C', long)]
    repo: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the commit list (default)
    Status,
    /// Start an interactive rebase that stops at the row
    Edit { row: usize },
    /// Start an interactive rebase from where the branch left the main branch
    QuickStart,
    /// Squash fixup commits on the current branch into their targets
    SquashFixups,
    /// Drop the rows from START to END
    Drop {
        start: usize,
        end: Option<usize>,
        /// Skip the confirmation for destructive drops
        #[arg(long)]
        yes: bool,
    },
    /// Fold the staged changes into the commit at the row
    AmendTo { row: usize },
    /// Move the current branch onto another branch or commit
    Rebase { onto: String },
    /// Apply commits on top of HEAD, or queue them during a rebase
    CherryPick {
        #[arg(required = true)]
        commits: Vec<String>,
    },
    /// Continue the rebase, merge, revert or cherry-pick in progress
    Continue {
        /// Stage modified files without asking
        #[arg(long)]
        stage: bool,
    },
    /// Abort the rebase, merge, revert or cherry-pick in progress
    Abort,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let mut report = config::load_config_with_report();
    report
        .issues
        .extend(restack::logging::init(&report.config.log));
    for issue in &report.issues {
        tracing::warn!(%issue, "config issue");
        eprintln!("Warning: {issue}");
    }

    let executor = match cli.repo {
        Some(path) => GitExecutor::with_repo_path(path),
        None => GitExecutor::new(),
    };
    let mut engine = Engine::new(Arc::new(executor), report.config.engine())?;

    let summary = match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => None,
        Commands::Edit { row } => {
            Some(engine.apply(Operation::Edit, SelectionRange::single(row))?)
        }
        Commands::QuickStart => Some(engine.apply(Operation::QuickStart, SelectionRange::single(0))?),
        Commands::SquashFixups => Some(engine.apply(
            Operation::SquashFixups {
                scope: FixupScope::CurrentBranch,
            },
            SelectionRange::single(0),
        )?),
        Commands::Drop { start, end, yes } => Some(engine.apply(
            Operation::Drop { confirmed: yes },
            SelectionRange::new(start, end.unwrap_or(start)),
        )?),
        Commands::AmendTo { row } => {
            Some(engine.apply(Operation::AmendTo, SelectionRange::single(row))?)
        }
        Commands::Rebase { onto } => Some(engine.apply(
            Operation::RebaseBranch { onto },
            SelectionRange::single(0),
        )?),
        Commands::CherryPick { commits } => Some(engine.apply(
            Operation::CherryPick { commits },
            SelectionRange::single(0),
        )?),
        Commands::Continue { stage } => {
            let summary = engine.confirm_continue()?;
            match summary.outcome {
                Outcome::Prompted(_) if stage => Some(engine.confirm_prompt()?),
                _ => Some(summary),
            }
        }
        Commands::Abort => Some(engine.abort()?),
    };

    if let Some(summary) = summary {
        print_summary(&summary);
    }
    print_plan(&engine);
    Ok(())
}

fn print_summary(summary: &PlanChangeSummary) {
    match &summary.outcome {
        Outcome::Conflict => println!("{} (stopped on conflicts)", summary.message),
        Outcome::Prompted(_) => println!("{} (re-run with --stage)", summary.message),
        _ => println!("{}", summary.message),
    }
}

fn print_plan<R: Repository + 'static>(engine: &Engine<R>) {
    let plan = engine.current_plan();
    println!("{}", engine.session_state());

    let cursor = plan.find_cursor();
    for (row, entry) in plan.entries().into_iter().enumerate() {
        let line = match entry {
            DisplayEntry::Todo { item, .. } => {
                let sha = item.commit.as_deref().map(restack::model::short_sha);
                format!(
                    "{:<10} {:<8} {}",
                    item.kind.to_string(),
                    sha.unwrap_or(""),
                    item.display_text()
                )
            }
            DisplayEntry::Current(stop) => {
                let label = match stop.reason {
                    StopReason::Conflict => "conflict",
                    StopReason::FailedExec => "failed",
                };
                format!("{label:<10} {:<8} {}", "", stop.item.display_text())
            }
            DisplayEntry::Commit { commit, .. } => {
                format!("{:<10} {:<8} {}", "", commit.short_sha(), commit.subject)
            }
        };
        let marker = if Some(row) == cursor {
            "  <-- YOU ARE HERE"
        } else {
            ""
        };
        println!("{row:>3} {line}{marker}");
    }

    if let Some(prompt) = engine.pending_prompt() {
        println!();
        println!("{}", prompt.message());
    }
}
