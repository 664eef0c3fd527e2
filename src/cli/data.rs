//! Data commands: export, import, and checks on the data directory.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use jiff::civil::Date;

use crate::manager::ExportFilter;
use crate::model::GoalStatus;

use super::Manager;
use super::format::{format_data_statistics, format_integrity};

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// active, completed, or paused (any case).
    #[arg(long)]
    status: Option<GoalStatus>,

    /// Category, compared ignoring case.
    #[arg(long)]
    category: Option<String>,

    /// Earliest creation date as YYYY-MM-DD, inclusive.
    #[arg(long)]
    from: Option<Date>,

    /// Latest creation date as YYYY-MM-DD, inclusive.
    #[arg(long)]
    to: Option<Date>,

    /// Write to this file instead of stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum DataCommand {
    /// Show sizes and counts for the data directory.
    Stats {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Check stored records and verify every backup.
    Check,
}

pub(super) fn cmd_export(manager: &Manager, user: &str, args: ExportArgs) -> Result<(), String> {
    let filter = ExportFilter {
        status: args.status,
        category: args.category,
        created_from: args.from,
        created_to: args.to,
    };
    let document = manager.export_goals(user, &filter);
    let json = serde_json::to_string_pretty(&document)
        .map_err(|e| format!("failed to serialize goals: {e}"))?;

    match args.output {
        Some(path) => {
            fs::write(&path, json + "\n")
                .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
            eprintln!(
                "Exported {} goal(s) to {}",
                document.metadata.total_goals,
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Imports goals from a file. Prints the new goal IDs.
pub(super) fn cmd_import(manager: &mut Manager, user: &str, path: &Path) -> Result<(), String> {
    let json = fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let report = manager
        .import_goals(user, &json)
        .map_err(|e| format!("failed to import goals: {e}"))?;

    for id in &report.imported {
        println!("{id}");
    }
    for failure in &report.failures {
        eprintln!("Skipped record {}: {}", failure.record, failure.reason);
    }
    eprintln!(
        "Imported {} of {} goal(s)",
        report.imported.len(),
        report.total
    );

    if report.total > 0 && report.imported.is_empty() {
        return Err("no goals were imported".to_string());
    }
    Ok(())
}

pub(super) fn run(manager: &Manager, command: DataCommand) -> Result<(), String> {
    match command {
        DataCommand::Stats { json } => cmd_stats(manager, json),
        DataCommand::Check => cmd_check(manager),
    }
}

fn cmd_stats(manager: &Manager, json: bool) -> Result<(), String> {
    let stats = manager
        .store()
        .data_statistics()
        .map_err(|e| format!("failed to read data statistics: {e}"))?;

    if json {
        let json = serde_json::to_string_pretty(&stats)
            .map_err(|e| format!("failed to serialize statistics: {e}"))?;
        println!("{json}");
    } else {
        print!("{}", format_data_statistics(&stats));
    }
    Ok(())
}

fn cmd_check(manager: &Manager) -> Result<(), String> {
    let report = manager
        .store()
        .check_integrity()
        .map_err(|e| format!("failed to check data: {e}"))?;

    print!("{}", format_integrity(&report));
    if !report.is_sound() {
        return Err("data integrity check found problems".to_string());
    }
    Ok(())
}
