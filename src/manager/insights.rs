//! Derived reads: statistics, rankings, recommendations, and system health.
//!
//! Nothing here mutates state. System health also reads the backup list.

use std::collections::BTreeMap;

use jiff::Timestamp;
use jiff::tz::TimeZone;
use serde::Serialize;
use tracing::warn;

use crate::clock::Clock;
use crate::model::{Goal, GoalStatus, GoalType};
use crate::storage::GoalStore;

use super::GoalManager;

/// Active goals at or above this percentage count as nearly complete.
const NEAR_COMPLETION_PERCENT: f64 = 75.0;

/// Aggregate numbers for one user's goals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserStatistics {
    pub total_goals: usize,
    pub active_goals: usize,
    pub completed_goals: usize,
    pub paused_goals: usize,

    /// Mean progress percentage, each goal clamped to 100. Zero with no goals.
    pub average_progress: f64,

    pub category_distribution: BTreeMap<String, usize>,
    pub type_distribution: BTreeMap<GoalType, usize>,
}

/// A snapshot across every user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemHealth {
    pub healthy: bool,
    pub total_users: usize,
    pub total_goals: usize,
    pub active_goals: usize,
    pub completed_goals: usize,
    pub paused_goals: usize,

    /// Paused goals plus active goals with no progress at all.
    pub stalled_goals: usize,

    pub average_progress: f64,
    pub last_backup: Option<Timestamp>,
}

impl SystemHealth {
    pub fn status(&self) -> &'static str {
        if self.healthy { "healthy" } else { "degraded" }
    }
}

#[derive(Default)]
struct Tally {
    total: usize,
    active: usize,
    completed: usize,
    paused: usize,
    stalled: usize,
    progress_sum: f64,
}

impl Tally {
    fn add(&mut self, goal: &Goal) {
        self.total += 1;
        self.progress_sum += goal.progress_percentage();
        match goal.status {
            GoalStatus::Active => {
                self.active += 1;
                if goal.current_value <= 0.0 {
                    self.stalled += 1;
                }
            }
            GoalStatus::Completed => self.completed += 1,
            GoalStatus::Paused => {
                self.paused += 1;
                self.stalled += 1;
            }
        }
    }

    fn average_progress(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.progress_sum / as_f64(self.total)
    }
}

impl<S: GoalStore, C: Clock> GoalManager<S, C> {
    pub fn user_statistics(&self, username: &str) -> UserStatistics {
        let mut tally = Tally::default();
        let mut stats = UserStatistics::default();
        for goal in self.user_goals(username) {
            tally.add(goal);
            *stats
                .category_distribution
                .entry(goal.category.clone())
                .or_default() += 1;
            *stats.type_distribution.entry(goal.goal_type()).or_default() += 1;
        }

        stats.total_goals = tally.total;
        stats.active_goals = tally.active;
        stats.completed_goals = tally.completed;
        stats.paused_goals = tally.paused;
        stats.average_progress = tally.average_progress();
        stats
    }

    /// Up to `n` goals with the highest progress ratio, paired with their
    /// percentage. Equal ratios keep insertion order.
    pub fn top_performing_goals(&self, username: &str, n: usize) -> Vec<(&Goal, f64)> {
        let mut goals: Vec<&Goal> = self.user_goals(username).iter().collect();
        goals.sort_by(|a, b| b.progress_ratio().total_cmp(&a.progress_ratio()));
        goals
            .into_iter()
            .take(n)
            .map(|g| (g, g.progress_percentage()))
            .collect()
    }

    /// Plain-language hints about a user's goals.
    pub fn recommendations(&self, username: &str) -> Vec<String> {
        let goals = self.user_goals(username);
        if goals.is_empty() {
            return vec!["You have no goals yet. Add your first goal to get started.".to_string()];
        }

        let today = self.clock.now().to_zoned(TimeZone::system()).date();
        let threshold = self.policy.low_progress_percent;

        let mut hints = Vec::new();

        let low = count(goals, |g| is_active(g) && g.progress_percentage() < threshold);
        if low > 0 {
            hints.push(format!(
                "You have {low} goal(s) with low progress (below {threshold}%). \
                 Consider breaking them into smaller steps."
            ));
        }

        let paused = count(goals, |g| g.status == GoalStatus::Paused);
        if paused > 0 {
            hints.push(format!(
                "You have {paused} paused goal(s). Consider resuming or removing them."
            ));
        }

        let overdue = count(goals, |g| g.is_overdue(today));
        if overdue > 0 {
            hints.push(format!(
                "{overdue} goal(s) are past their deadline. \
                 Review the deadline or adjust the target."
            ));
        }

        let near = count(goals, |g| {
            is_active(g) && g.progress_percentage() >= NEAR_COMPLETION_PERCENT
        });
        if near > 0 {
            hints.push(format!(
                "{near} goal(s) are at least {NEAR_COMPLETION_PERCENT}% complete. One more push!"
            ));
        }

        if goals.iter().all(|g| g.status == GoalStatus::Completed) {
            hints.push("All your goals are completed. Time to set new ones!".to_string());
        }

        hints
    }

    /// Aggregates every user's goals into one health snapshot.
    ///
    /// Unhealthy when the share of stalled goals exceeds the policy's limit.
    pub fn system_health(&self) -> SystemHealth {
        let mut tally = Tally::default();
        for goal in self.goals.values().flatten() {
            tally.add(goal);
        }

        let healthy = tally.total == 0
            || as_f64(tally.stalled) / as_f64(tally.total) <= self.policy.stalled_share;
        let last_backup = match self.store.list_backups() {
            Ok(backups) => backups.iter().map(|b| b.created_at).max(),
            Err(e) => {
                warn!(error = %e, "could not list backups for health check");
                None
            }
        };

        SystemHealth {
            healthy,
            total_users: self.goals.values().filter(|goals| !goals.is_empty()).count(),
            total_goals: tally.total,
            active_goals: tally.active,
            completed_goals: tally.completed,
            paused_goals: tally.paused,
            stalled_goals: tally.stalled,
            average_progress: tally.average_progress(),
            last_backup,
        }
    }
}

/// Goal counts stay far below `u32::MAX`, so this conversion is exact.
fn as_f64(count: usize) -> f64 {
    f64::from(u32::try_from(count).unwrap_or(u32::MAX))
}

fn count(goals: &[Goal], predicate: impl Fn(&Goal) -> bool) -> usize {
    goals.iter().filter(|g| predicate(g)).count()
}

fn is_active(goal: &Goal) -> bool {
    goal.status == GoalStatus::Active
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use crate::manager::tests::{USER, base_time, goal, goal_at, test_manager};
    use crate::model::{Goal, GoalStatus, GoalType, Priority};

    #[test]
    fn counts_convert_exactly() {
        assert!(super::as_f64(0).abs() < f64::EPSILON);
        assert!((super::as_f64(1_000) - 1_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn statistics_for_unknown_user_are_zero() {
        let manager = test_manager();

        let stats = manager.user_statistics("nobody");

        assert_eq!(stats.total_goals, 0);
        assert!(stats.average_progress.abs() < f64::EPSILON);
        assert!(stats.category_distribution.is_empty());
    }

    #[test]
    fn statistics_count_statuses() {
        let mut manager = test_manager();
        manager.add_goal(USER, goal_at("Done", 100.0)).unwrap();
        for title in ["A", "B", "C"] {
            manager.add_goal(USER, goal(title)).unwrap();
        }

        let stats = manager.user_statistics(USER);

        assert_eq!(stats.total_goals, 4);
        assert_eq!(stats.completed_goals, 1);
        assert_eq!(stats.active_goals, 3);
        assert_eq!(stats.paused_goals, 0);
        assert!((stats.average_progress - 25.0).abs() < 1e-9);
    }

    #[test]
    fn statistics_for_mixed_kinds() {
        let mut manager = test_manager();
        let goals = [
            Goal::new("General", "desc", 100.0, base_time()).unwrap(),
            Goal::new_personal(
                "Personal",
                "desc",
                100.0,
                Priority::Medium,
                false,
                base_time(),
            )
            .unwrap(),
            Goal::new_business(
                "Business",
                "desc",
                100.0,
                Some("IT".into()),
                Some(50_000.0),
                base_time(),
            )
            .unwrap(),
        ];
        for mut g in goals {
            g.record_progress(30.0, "", base_time()).unwrap();
            manager.add_goal(USER, g).unwrap();
        }

        let stats = manager.user_statistics(USER);

        assert_eq!(stats.total_goals, 3);
        assert!((stats.average_progress - 30.0).abs() < 1e-9);
        for category in ["general", "personal", "business"] {
            assert_eq!(stats.category_distribution[category], 1, "{category}");
        }
        assert_eq!(stats.type_distribution[&GoalType::Business], 1);
    }

    #[test]
    fn average_progress_clamps_overshoot() {
        let mut manager = test_manager();
        manager.add_goal(USER, goal_at("Over", 250.0)).unwrap();
        manager.add_goal(USER, goal("Zero")).unwrap();

        assert!((manager.user_statistics(USER).average_progress - 50.0).abs() < 1e-9);
    }

    #[test]
    fn statistics_serialize_type_keys_as_strings() {
        let mut manager = test_manager();
        manager.add_goal(USER, goal("A")).unwrap();

        let json = serde_json::to_value(manager.user_statistics(USER)).unwrap();

        assert_eq!(json["type_distribution"]["general"], 1);
        assert_eq!(json["category_distribution"]["general"], 1);
    }

    #[test]
    fn top_performing_orders_by_ratio() {
        let mut manager = test_manager();
        for (title, value) in [("Low", 10.0), ("High", 90.0), ("Mid", 50.0)] {
            manager.add_goal(USER, goal_at(title, value)).unwrap();
        }

        let top = manager.top_performing_goals(USER, 2);

        let titles: Vec<&str> = top.iter().map(|(g, _)| g.title.as_str()).collect();
        assert_eq!(titles, ["High", "Mid"]);
        assert!((top[0].1 - 90.0).abs() < 1e-9);
        assert!(top[0].1 >= top[1].1);
    }

    #[test]
    fn top_performing_keeps_insertion_order_on_ties() {
        let mut manager = test_manager();
        for title in ["First", "Second", "Third"] {
            manager.add_goal(USER, goal_at(title, 40.0)).unwrap();
        }

        let top = manager.top_performing_goals(USER, 10);

        let titles: Vec<&str> = top.iter().map(|(g, _)| g.title.as_str()).collect();
        assert_eq!(titles, ["First", "Second", "Third"]);
    }

    #[test]
    fn top_performing_ranks_overshoot_first() {
        let mut manager = test_manager();
        manager.add_goal(USER, goal_at("Done", 100.0)).unwrap();
        manager.add_goal(USER, goal_at("Beyond", 150.0)).unwrap();

        let top = manager.top_performing_goals(USER, 1);

        assert_eq!(top[0].0.title, "Beyond");
        assert!((top[0].1 - 100.0).abs() < 1e-9);
    }

    #[test]
    fn recommendations_flag_low_progress_and_paused() {
        let mut manager = test_manager();
        for (title, value) in [("Low 1", 5.0), ("Low 2", 10.0), ("Medium", 45.0), ("High", 85.0)] {
            manager.add_goal(USER, goal_at(title, value)).unwrap();
        }
        let first = manager.user_goals(USER)[0].id;
        manager.pause_goal(USER, first).unwrap();

        let text = manager.recommendations(USER).join(" ");

        assert!(text.contains("1 goal(s) with low progress"), "{text}");
        assert!(text.contains("1 paused goal(s)"), "{text}");
        assert!(text.contains("at least 75% complete"), "{text}");
    }

    #[test]
    fn recommendations_for_new_user() {
        let manager = test_manager();

        let hints = manager.recommendations(USER);

        assert_eq!(hints.len(), 1);
        assert!(hints[0].contains("no goals yet"));
    }

    #[test]
    fn recommendations_when_everything_is_done() {
        let mut manager = test_manager();
        manager.add_goal(USER, goal_at("Done", 100.0)).unwrap();

        let hints = manager.recommendations(USER);

        assert_eq!(hints.len(), 1);
        assert!(hints[0].contains("All your goals are completed"));
    }

    #[test]
    fn recommendations_flag_overdue_goals() {
        let mut manager = test_manager();
        manager
            .add_goal(USER, goal_at("Late", 50.0).with_deadline(date(2020, 1, 1)))
            .unwrap();
        manager
            .add_goal(USER, goal_at("Future", 50.0).with_deadline(date(2099, 1, 1)))
            .unwrap();

        let text = manager.recommendations(USER).join(" ");

        assert!(text.contains("1 goal(s) are past their deadline"), "{text}");
    }

    #[test]
    fn recommendations_do_not_change_state() {
        let mut manager = test_manager();
        manager.add_goal(USER, goal("Untouched")).unwrap();
        let before = manager.user_goals(USER).to_vec();
        let saves = manager.store().saves.get();

        manager.recommendations(USER);

        assert_eq!(manager.user_goals(USER), before.as_slice());
        assert_eq!(manager.store().saves.get(), saves);
    }

    #[test]
    fn empty_system_is_healthy() {
        let manager = test_manager();

        let health = manager.system_health();

        assert!(health.healthy);
        assert_eq!(health.status(), "healthy");
        assert_eq!(health.total_users, 0);
        assert_eq!(health.total_goals, 0);
        assert!(health.last_backup.is_none());
    }

    #[test]
    fn health_aggregates_across_users() {
        let mut manager = test_manager();
        manager.add_goal("user1", goal_at("Moving", 50.0)).unwrap();
        manager.add_goal("user1", goal_at("Done", 100.0)).unwrap();
        manager.add_goal("user2", goal("Stuck")).unwrap();

        let health = manager.system_health();

        assert!(health.healthy);
        assert_eq!(health.total_users, 2);
        assert_eq!(health.total_goals, 3);
        assert_eq!(health.active_goals, 2);
        assert_eq!(health.completed_goals, 1);
        assert_eq!(health.stalled_goals, 1);
        assert!((health.average_progress - 50.0).abs() < 1e-9);
    }

    #[test]
    fn mostly_stalled_system_is_degraded() {
        let mut manager = test_manager();
        let paused = manager.add_goal(USER, goal_at("Paused", 10.0)).unwrap();
        manager.pause_goal(USER, paused).unwrap();
        manager.add_goal(USER, goal("Untouched")).unwrap();
        manager.add_goal(USER, goal_at("Moving", 20.0)).unwrap();

        let health = manager.system_health();

        assert_eq!(health.stalled_goals, 2);
        assert_eq!(health.paused_goals, 1);
        assert!(!health.healthy);
        assert_eq!(health.status(), "degraded");
    }

    #[test]
    fn health_records_last_backup() {
        let mut manager = test_manager();
        manager.add_goal(USER, goal("A")).unwrap();

        manager.backup_data().unwrap();

        assert_eq!(manager.system_health().last_backup, Some(base_time()));
    }

    #[test]
    fn status_filters_see_paused_goals() {
        let mut manager = test_manager();
        let id = manager.add_goal(USER, goal("Pausable")).unwrap();
        manager.pause_goal(USER, id).unwrap();

        assert_eq!(manager.user_statistics(USER).paused_goals, 1);
        assert_eq!(manager.goals_by_status(USER, GoalStatus::Paused).len(), 1);
    }
}
