//! CLI interface for goaltrack.
//!
//! Each subcommand is non-interactive: arguments in, plain text out.
//! Results go to stdout; confirmations and warnings go to stderr.
//!
//! Commands act on one user, resolved from `--user`, `GOALTRACK_USER`,
//! the config file, or `default`. Goal arguments take a full UUID or an
//! unambiguous prefix of one (e.g. `a3b`).

mod backup;
mod data;
mod format;
mod goal;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;
use uuid::Uuid;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::manager::GoalManager;
use crate::model::{Goal, GoalStatus, GoalType};
use crate::storage::Storage;
use crate::user::{resolve_data_dir, resolve_user};

use backup::BackupCommand;
use data::{DataCommand, ExportArgs};
use goal::AddArgs;

type Manager = GoalManager<Storage, SystemClock>;

/// goaltrack: track goals and the progress toward them.
#[derive(Debug, Parser)]
#[command(name = "goaltrack", version, after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// User whose goals to act on.
    #[arg(long, global = true)]
    user: Option<String>,

    /// Directory holding goals.json and backups.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow: tracking a goal
  1. goaltrack add "Read books" "Read 12 books this year" --target 12
     → prints the goal ID (e.g. a3b0fc12-...)
  2. goaltrack progress a3b 3 --note "Finished the trilogy"
  3. goaltrack list --status active
  4. goaltrack stats

Backups:
  goaltrack backup create
  goaltrack backup list
  goaltrack backup restore backup_20240101_120000.json.zst

Moving goals:
  goaltrack export --status active -o goals.json
  goaltrack --user bob import goals.json"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a goal. Prints the goal ID.
    Add(AddArgs),

    /// List goals, optionally filtered.
    List {
        /// active, completed, or paused (any case).
        #[arg(long)]
        status: Option<GoalStatus>,

        /// Category, compared ignoring case.
        #[arg(long)]
        category: Option<String>,

        /// general, personal, or business (any case).
        #[arg(long = "type")]
        goal_type: Option<GoalType>,
    },

    /// Find goals whose title or description contains the text.
    Search { text: String },

    /// Show one goal with its history and details.
    Show { goal: String },

    /// Record a new progress value.
    Progress {
        goal: String,

        #[arg(allow_negative_numbers = true)]
        value: f64,

        #[arg(long, default_value = "")]
        note: String,
    },

    /// Remove a goal.
    Remove { goal: String },

    /// Pause an active goal.
    Pause { goal: String },

    /// Resume a paused goal.
    Resume { goal: String },

    /// Add a motivation note to a personal goal.
    Note { goal: String, text: String },

    /// Add a milestone to a business goal.
    Milestone {
        goal: String,

        name: String,

        /// Value at which the milestone is reached, in the goal's units.
        threshold: f64,
    },

    /// Add a stakeholder to a business goal.
    Stakeholder { goal: String, name: String },

    /// Show statistics for the user's goals.
    Stats {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Show the goals closest to completion.
    Top {
        #[arg(short, default_value_t = 5)]
        n: usize,
    },

    /// Suggest what to do next.
    Recommend,

    /// Show a health summary across all users.
    Health {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Create, list, verify, and restore backups.
    Backup {
        #[command(subcommand)]
        command: BackupCommand,
    },

    /// Write the user's goals as a JSON document.
    Export(ExportArgs),

    /// Add goals from a JSON export or array of goal records.
    Import { file: PathBuf },

    /// Inspect the data directory.
    Data {
        #[command(subcommand)]
        command: DataCommand,
    },
}

/// Run the CLI, returning an error message on failure.
pub fn run(cli: Cli, config: &Config) -> Result<(), String> {
    let user = resolve_user(cli.user.as_deref(), config);
    let data_dir = resolve_data_dir(cli.data_dir, config)?;
    debug!(user = %user, data_dir = %data_dir.display(), "resolved context");

    let storage = Storage::new(&data_dir, config.max_backups)
        .map_err(|e| format!("failed to initialize storage at {}: {e}", data_dir.display()))?;
    let mut manager = GoalManager::new(storage, SystemClock, config.policy());

    // Backup and data commands read the store directly, so a corrupt goals
    // file does not block restoring or checking it.
    match &cli.command {
        Command::Backup { .. } | Command::Data { .. } => Ok(0),
        Command::Health { .. } => manager.load_all(),
        _ => manager.load_user(&user),
    }
    .map_err(|e| format!("failed to load goals: {e}"))?;

    dispatch(&mut manager, &user, cli.command)
}

fn dispatch(manager: &mut Manager, user: &str, command: Command) -> Result<(), String> {
    match command {
        Command::Add(args) => goal::cmd_add(manager, user, args),
        Command::List {
            status,
            category,
            goal_type,
        } => goal::cmd_list(manager, user, status, category.as_deref(), goal_type),
        Command::Search { text } => goal::cmd_search(manager, user, &text),
        Command::Show { goal } => {
            let id = resolve_goal_id(manager, user, &goal)?;
            goal::cmd_show(manager, user, id)
        }
        Command::Progress { goal, value, note } => {
            let id = resolve_goal_id(manager, user, &goal)?;
            goal::cmd_progress(manager, user, id, value, &note)
        }
        Command::Remove { goal } => {
            let id = resolve_goal_id(manager, user, &goal)?;
            goal::cmd_remove(manager, user, id)
        }
        Command::Pause { goal } => {
            let id = resolve_goal_id(manager, user, &goal)?;
            goal::cmd_pause(manager, user, id)
        }
        Command::Resume { goal } => {
            let id = resolve_goal_id(manager, user, &goal)?;
            goal::cmd_resume(manager, user, id)
        }
        Command::Note { goal, text } => {
            let id = resolve_goal_id(manager, user, &goal)?;
            goal::cmd_note(manager, user, id, &text)
        }
        Command::Milestone {
            goal,
            name,
            threshold,
        } => {
            let id = resolve_goal_id(manager, user, &goal)?;
            goal::cmd_milestone(manager, user, id, &name, threshold)
        }
        Command::Stakeholder { goal, name } => {
            let id = resolve_goal_id(manager, user, &goal)?;
            goal::cmd_stakeholder(manager, user, id, &name)
        }
        Command::Stats { json } => report::cmd_stats(manager, user, json),
        Command::Top { n } => report::cmd_top(manager, user, n),
        Command::Recommend => report::cmd_recommend(manager, user),
        Command::Health { json } => report::cmd_health(manager, json),
        Command::Backup { command } => backup::run(manager, command),
        Command::Export(args) => data::cmd_export(manager, user, args),
        Command::Import { file } => data::cmd_import(manager, user, &file),
        Command::Data { command } => data::run(manager, command),
    }
}

/// Resolve a goal reference (full UUID or unambiguous prefix) among a user's goals.
fn resolve_goal_id(manager: &Manager, user: &str, reference: &str) -> Result<Uuid, String> {
    let goals = manager.user_goals(user);

    // Try full UUID first.
    if let Ok(id) = reference.parse::<Uuid>() {
        return goals
            .iter()
            .find(|g| g.id == id)
            .map(|g| g.id)
            .ok_or_else(|| format!("goal not found: {id}"));
    }

    let reference = reference.trim().to_lowercase();
    if reference.is_empty() {
        return Err("goal ID must not be empty".to_string());
    }

    // Try as a prefix match against the user's goals.
    let matches: Vec<&Goal> = goals
        .iter()
        .filter(|g| g.id.to_string().starts_with(&reference))
        .collect();

    match matches.as_slice() {
        [] => Err(format!("no goal matching '{reference}'")),
        [goal] => Ok(goal.id),
        _ => {
            let ids: Vec<String> = matches.iter().map(|g| format::short_id(g.id)).collect();
            Err(format!(
                "'{reference}' is ambiguous: matches {} goals: {}",
                matches.len(),
                ids.join(", ")
            ))
        }
    }
}
