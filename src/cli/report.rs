//! Read-only reports: statistics, top goals, recommendations, health.

use super::Manager;
use super::format::{format_goal_line, format_health, format_statistics};

pub(super) fn cmd_stats(manager: &Manager, user: &str, json: bool) -> Result<(), String> {
    let stats = manager.user_statistics(user);
    if json {
        let json = serde_json::to_string_pretty(&stats)
            .map_err(|e| format!("failed to serialize statistics: {e}"))?;
        println!("{json}");
    } else {
        print!("{}", format_statistics(&stats));
    }
    Ok(())
}

pub(super) fn cmd_top(manager: &Manager, user: &str, n: usize) -> Result<(), String> {
    let top = manager.top_performing_goals(user, n);
    if top.is_empty() {
        println!("No goals");
        return Ok(());
    }
    for (rank, (goal, _)) in top.iter().enumerate() {
        println!("{}. {}", rank + 1, format_goal_line(goal));
    }
    Ok(())
}

pub(super) fn cmd_recommend(manager: &Manager, user: &str) -> Result<(), String> {
    for hint in manager.recommendations(user) {
        println!("- {hint}");
    }
    Ok(())
}

pub(super) fn cmd_health(manager: &Manager, json: bool) -> Result<(), String> {
    let health = manager.system_health();
    if json {
        let json = serde_json::to_string_pretty(&health)
            .map_err(|e| format!("failed to serialize health: {e}"))?;
        println!("{json}");
    } else {
        print!("{}", format_health(&health));
    }
    Ok(())
}
