//! Output formatting for CLI display.

use uuid::Uuid;

use crate::manager::{SystemHealth, UserStatistics};
use crate::model::Goal;
use crate::storage::{BackupInfo, DataStatistics, IntegrityReport};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// First eight characters of a goal ID.
pub(super) fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// One-line summary: `a3b0fc12  [active] [general]  Title  25/100 (25.0%)`.
pub(super) fn format_goal_line(goal: &Goal) -> String {
    format!(
        "{}  [{}] [{}]  {}  {}/{} ({:.1}%)",
        short_id(goal.id),
        goal.status,
        goal.goal_type(),
        goal.title,
        goal.current_value,
        goal.target_value,
        goal.progress_percentage()
    )
}

/// Multi-line view of a goal, its kind details, and its history.
pub(super) fn format_goal_detail(goal: &Goal) -> String {
    let mut lines = vec![
        format!("{} ({})", goal.title, goal.id),
        format!("Type:        {}", goal.goal_type()),
        format!("Status:      {}", goal.status),
        format!("Category:    {}", goal.category),
        format!("Description: {}", goal.description),
        format!(
            "Progress:    {}/{} ({:.1}%)",
            goal.current_value,
            goal.target_value,
            goal.progress_percentage()
        ),
        format!("Created:     {}", goal.created_at.strftime(TIME_FORMAT)),
    ];
    if let Some(deadline) = goal.deadline {
        lines.push(format!("Deadline:    {deadline}"));
    }

    if let Some(details) = goal.personal() {
        lines.push(format!("Priority:    {}", details.priority));
        lines.push(format!(
            "Public:      {}",
            if details.is_public { "yes" } else { "no" }
        ));
        lines.push(format!("Motivation:  {}", details.motivation_summary()));
    }

    if let Some(details) = goal.business() {
        if let Some(department) = &details.department {
            lines.push(format!("Department:  {department}"));
        }
        if let Some(budget) = details.budget {
            lines.push(format!("Budget:      {budget}"));
        }
        if !details.stakeholders.is_empty() {
            let names: Vec<&str> = details.stakeholders.iter().map(String::as_str).collect();
            lines.push(format!("Stakeholders: {}", names.join(", ")));
        }
        if !details.milestones.is_empty() {
            lines.push("Milestones:".to_string());
            let reached = goal.check_milestones();
            for milestone in &details.milestones {
                let mark = if reached.contains(&milestone) { "x" } else { " " };
                lines.push(format!("  [{mark}] {} ({})", milestone.name, milestone.threshold));
            }
        }
    }

    if goal.history().is_empty() {
        lines.push("History:     none".to_string());
    } else {
        lines.push("History:".to_string());
        for entry in goal.history() {
            lines.push(format!("  {}", entry.formatted()));
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub(super) fn format_statistics(stats: &UserStatistics) -> String {
    let mut lines = vec![
        format!("Total goals:      {}", stats.total_goals),
        format!("Active:           {}", stats.active_goals),
        format!("Completed:        {}", stats.completed_goals),
        format!("Paused:           {}", stats.paused_goals),
        format!("Average progress: {:.1}%", stats.average_progress),
    ];
    if !stats.category_distribution.is_empty() {
        lines.push("Categories:".to_string());
        for (category, count) in &stats.category_distribution {
            lines.push(format!("  {category}: {count}"));
        }
    }
    if !stats.type_distribution.is_empty() {
        lines.push("Types:".to_string());
        for (goal_type, count) in &stats.type_distribution {
            lines.push(format!("  {goal_type}: {count}"));
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub(super) fn format_health(health: &SystemHealth) -> String {
    let last_backup = health
        .last_backup
        .map_or_else(|| "none".to_string(), |t| t.strftime(TIME_FORMAT).to_string());
    let lines = [
        format!("Status:           {}", health.status()),
        format!("Users:            {}", health.total_users),
        format!("Total goals:      {}", health.total_goals),
        format!("Active:           {}", health.active_goals),
        format!("Completed:        {}", health.completed_goals),
        format!("Paused:           {}", health.paused_goals),
        format!("Stalled:          {}", health.stalled_goals),
        format!("Average progress: {:.1}%", health.average_progress),
        format!("Last backup:      {last_backup}"),
    ];

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// `backup_20240101_120000.json.zst  1234 bytes`, flagged when unchecked.
pub(super) fn format_backup_line(backup: &BackupInfo) -> String {
    let flag = if backup.checksum.is_some() { "" } else { "  (no checksum)" };
    format!("{}  {} bytes{flag}", backup.name, backup.size_bytes)
}

pub(super) fn format_data_statistics(stats: &DataStatistics) -> String {
    let modified = stats
        .goals_file_modified
        .map_or_else(|| "never".to_string(), |t| t.strftime(TIME_FORMAT).to_string());
    let lines = [
        format!("Goals file:       {} bytes", stats.goals_file_bytes),
        format!("Last written:     {modified}"),
        format!("Users:            {}", stats.users),
        format!("Goal records:     {}", stats.goal_records),
        format!("Progress entries: {}", stats.progress_entries),
        format!("Backups:          {}", stats.backups),
        format!("Backup size:      {} bytes", stats.backup_bytes),
    ];

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// One line per check, then one line per finding.
pub(super) fn format_integrity(report: &IntegrityReport) -> String {
    let mark = |ok: bool| if ok { "ok" } else { "FAILED" };
    let mut lines = vec![
        format!("Goals file:       {}", mark(report.goals_file_valid)),
        format!(
            "Records:          {}",
            mark(report.unreadable_records.is_empty() && report.blank_usernames == 0)
        ),
        format!("Goal IDs:         {}", mark(report.duplicate_ids.is_empty())),
        format!(
            "Backups:          {} ({} checked)",
            mark(report.failed_backups.is_empty()),
            report.backups_checked
        ),
    ];
    for location in &report.unreadable_records {
        lines.push(format!(
            "  unreadable record {} of user '{}'",
            location.index + 1,
            location.username
        ));
    }
    if report.blank_usernames > 0 {
        lines.push(format!("  {} blank username(s)", report.blank_usernames));
    }
    for id in &report.duplicate_ids {
        lines.push(format!("  duplicate goal ID {id}"));
    }
    for name in &report.failed_backups {
        lines.push(format!("  backup {name} failed verification"));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
