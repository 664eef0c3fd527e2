//! Backup commands: create, list, verify, restore.

use clap::Subcommand;

use super::Manager;
use super::format::format_backup_line;

#[derive(Debug, Subcommand)]
pub enum BackupCommand {
    /// Snapshot all goals. Prints the backup name.
    Create,

    /// List backups, oldest first.
    List,

    /// Check a backup against its recorded checksum.
    Verify { name: String },

    /// Replace all goals with a backup's contents.
    Restore { name: String },
}

pub(super) fn run(manager: &mut Manager, command: BackupCommand) -> Result<(), String> {
    match command {
        BackupCommand::Create => cmd_create(manager),
        BackupCommand::List => cmd_list(manager),
        BackupCommand::Verify { name } => cmd_verify(manager, &name),
        BackupCommand::Restore { name } => cmd_restore(manager, &name),
    }
}

fn cmd_create(manager: &Manager) -> Result<(), String> {
    let backup = manager
        .backup_data()
        .map_err(|e| format!("failed to create backup: {e}"))?;

    println!("{}", backup.name);
    Ok(())
}

fn cmd_list(manager: &Manager) -> Result<(), String> {
    let backups = manager
        .list_backups()
        .map_err(|e| format!("failed to list backups: {e}"))?;

    if backups.is_empty() {
        println!("No backups");
        return Ok(());
    }
    for backup in &backups {
        println!("{}", format_backup_line(backup));
    }
    Ok(())
}

fn cmd_verify(manager: &Manager, name: &str) -> Result<(), String> {
    let ok = manager
        .store()
        .verify_backup(name)
        .map_err(|e| format!("failed to verify backup: {e}"))?;

    if !ok {
        return Err(format!("backup {name} failed verification"));
    }
    println!("{name}: ok");
    Ok(())
}

fn cmd_restore(manager: &mut Manager, name: &str) -> Result<(), String> {
    let count = manager
        .restore_backup(name)
        .map_err(|e| format!("failed to restore backup: {e}"))?;

    eprintln!("Restored {name}: {count} goal(s)");
    Ok(())
}
