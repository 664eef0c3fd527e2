//! Goal commands: add, list, search, show, progress, and per-goal edits.

use clap::{Args, ValueEnum};
use jiff::civil::Date;
use uuid::Uuid;

use crate::clock::Clock;
use crate::model::{Goal, GoalStatus, GoalType, Priority};

use super::Manager;
use super::format::{format_goal_detail, format_goal_line, short_id};

#[derive(Debug, Args)]
pub struct AddArgs {
    title: String,

    description: String,

    /// Value that completes the goal.
    #[arg(long)]
    target: f64,

    /// Free-text category. Defaults to the goal type.
    #[arg(long)]
    category: Option<String>,

    /// general, personal, or business (any case).
    #[arg(long = "type", default_value = "general")]
    goal_type: GoalType,

    /// Priority of a personal goal.
    #[arg(long, value_enum)]
    priority: Option<PriorityArg>,

    /// Mark a personal goal as public.
    #[arg(long)]
    public: bool,

    /// Department owning a business goal.
    #[arg(long)]
    department: Option<String>,

    /// Budget of a business goal.
    #[arg(long)]
    budget: Option<f64>,

    /// Deadline as YYYY-MM-DD.
    #[arg(long)]
    deadline: Option<Date>,
}

/// CLI-facing priority, mapped to the domain `Priority`.
#[derive(Debug, Clone, ValueEnum)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
}

impl PriorityArg {
    fn to_domain(&self) -> Priority {
        match self {
            Self::Low => Priority::Low,
            Self::Medium => Priority::Medium,
            Self::High => Priority::High,
        }
    }
}

impl AddArgs {
    fn into_goal(self, created_at: jiff::Timestamp) -> Result<Goal, String> {
        if self.goal_type != GoalType::Personal && (self.priority.is_some() || self.public) {
            return Err("--priority and --public only apply to personal goals".to_string());
        }
        if self.goal_type != GoalType::Business
            && (self.department.is_some() || self.budget.is_some())
        {
            return Err("--department and --budget only apply to business goals".to_string());
        }

        let goal = match self.goal_type {
            GoalType::General => Goal::new(&self.title, &self.description, self.target, created_at),
            GoalType::Personal => Goal::new_personal(
                &self.title,
                &self.description,
                self.target,
                self.priority
                    .as_ref()
                    .map(PriorityArg::to_domain)
                    .unwrap_or_default(),
                self.public,
                created_at,
            ),
            GoalType::Business => Goal::new_business(
                &self.title,
                &self.description,
                self.target,
                self.department,
                self.budget,
                created_at,
            ),
        }
        .map_err(|e| format!("invalid goal: {e}"))?;

        let goal = goal.with_category(self.category.as_deref().unwrap_or_default());
        Ok(match self.deadline {
            Some(deadline) => goal.with_deadline(deadline),
            None => goal,
        })
    }
}

pub(super) fn cmd_add(manager: &mut Manager, user: &str, args: AddArgs) -> Result<(), String> {
    let goal = args.into_goal(manager.clock().now())?;
    let id = manager
        .add_goal(user, goal)
        .map_err(|e| format!("failed to add goal: {e}"))?;

    println!("{id}");
    Ok(())
}

pub(super) fn cmd_list(
    manager: &Manager,
    user: &str,
    status: Option<GoalStatus>,
    category: Option<&str>,
    goal_type: Option<GoalType>,
) -> Result<(), String> {
    let mut goals: Vec<&Goal> = manager.user_goals(user).iter().collect();
    if let Some(status) = status {
        keep_matching(&mut goals, &manager.goals_by_status(user, status));
    }
    if let Some(category) = category {
        keep_matching(&mut goals, &manager.goals_by_category(user, category));
    }
    if let Some(goal_type) = goal_type {
        keep_matching(&mut goals, &manager.goals_by_type(user, goal_type));
    }

    print_goals(&goals);
    Ok(())
}

pub(super) fn cmd_search(manager: &Manager, user: &str, text: &str) -> Result<(), String> {
    print_goals(&manager.search_goals(user, text));
    Ok(())
}

fn keep_matching(goals: &mut Vec<&Goal>, matching: &[&Goal]) {
    goals.retain(|g| matching.iter().any(|m| m.id == g.id));
}

fn print_goals(goals: &[&Goal]) {
    if goals.is_empty() {
        println!("No goals");
        return;
    }
    for goal in goals {
        println!("{}", format_goal_line(goal));
    }
}

pub(super) fn cmd_show(manager: &Manager, user: &str, id: Uuid) -> Result<(), String> {
    let goal = manager
        .goal(user, id)
        .ok_or_else(|| format!("goal not found: {id}"))?;
    print!("{}", format_goal_detail(goal));
    Ok(())
}

pub(super) fn cmd_progress(
    manager: &mut Manager,
    user: &str,
    id: Uuid,
    value: f64,
    note: &str,
) -> Result<(), String> {
    let update = manager
        .update_goal_progress(user, id, value, note)
        .map_err(|e| format!("failed to update progress: {e}"))?;

    if let Some(goal) = manager.goal(user, id) {
        println!("{}", goal.progress_info());
    }
    for milestone in &update.milestones_reached {
        eprintln!("Milestone reached: {milestone}");
    }
    if update.completed {
        eprintln!("Goal completed!");
    }
    Ok(())
}

pub(super) fn cmd_remove(manager: &mut Manager, user: &str, id: Uuid) -> Result<(), String> {
    let goal = manager
        .remove_goal(user, id)
        .map_err(|e| format!("failed to remove goal: {e}"))?;

    eprintln!("Removed goal {}: {}", short_id(goal.id), goal.title);
    Ok(())
}

pub(super) fn cmd_pause(manager: &mut Manager, user: &str, id: Uuid) -> Result<(), String> {
    manager
        .pause_goal(user, id)
        .map_err(|e| format!("failed to pause goal: {e}"))?;

    eprintln!("Goal {} paused", short_id(id));
    Ok(())
}

pub(super) fn cmd_resume(manager: &mut Manager, user: &str, id: Uuid) -> Result<(), String> {
    manager
        .resume_goal(user, id)
        .map_err(|e| format!("failed to resume goal: {e}"))?;

    eprintln!("Goal {} resumed", short_id(id));
    Ok(())
}

pub(super) fn cmd_note(
    manager: &mut Manager,
    user: &str,
    id: Uuid,
    text: &str,
) -> Result<(), String> {
    let added = manager
        .add_motivation_note(user, id, text)
        .map_err(|e| format!("failed to add note: {e}"))?;

    if !added {
        return Err("note must not be empty".to_string());
    }
    eprintln!("Note added to goal {}", short_id(id));
    Ok(())
}

pub(super) fn cmd_milestone(
    manager: &mut Manager,
    user: &str,
    id: Uuid,
    name: &str,
    threshold: f64,
) -> Result<(), String> {
    manager
        .add_milestone(user, id, name, threshold)
        .map_err(|e| format!("failed to add milestone: {e}"))?;

    eprintln!("Milestone '{}' added to goal {}", name.trim(), short_id(id));
    Ok(())
}

pub(super) fn cmd_stakeholder(
    manager: &mut Manager,
    user: &str,
    id: Uuid,
    name: &str,
) -> Result<(), String> {
    let added = manager
        .add_stakeholder(user, id, name)
        .map_err(|e| format!("failed to add stakeholder: {e}"))?;

    if added {
        eprintln!("Stakeholder '{}' added to goal {}", name.trim(), short_id(id));
    } else {
        eprintln!("Stakeholder '{}' not added: blank or already present", name.trim());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;
    use jiff::civil::date;

    fn args(goal_type: GoalType) -> AddArgs {
        AddArgs {
            title: "Read books".into(),
            description: "Read 12 books".into(),
            target: 12.0,
            category: None,
            goal_type,
            priority: None,
            public: false,
            department: None,
            budget: None,
            deadline: None,
        }
    }

    #[test]
    fn general_goal_defaults_category_to_type() {
        let goal = args(GoalType::General)
            .into_goal(Timestamp::UNIX_EPOCH)
            .unwrap();

        assert_eq!(goal.category, "general");
        assert_eq!(goal.goal_type(), GoalType::General);
    }

    #[test]
    fn personal_goal_carries_priority_category_and_deadline() {
        let goal = AddArgs {
            priority: Some(PriorityArg::High),
            public: true,
            category: Some("Health".into()),
            deadline: Some(date(2024, 12, 31)),
            ..args(GoalType::Personal)
        }
        .into_goal(Timestamp::UNIX_EPOCH)
        .unwrap();

        let details = goal.personal().unwrap();
        assert_eq!(details.priority, Priority::High);
        assert!(details.is_public);
        assert_eq!(goal.category, "Health");
        assert_eq!(goal.deadline, Some(date(2024, 12, 31)));
    }

    #[test]
    fn business_goal_carries_department_and_budget() {
        let goal = AddArgs {
            department: Some("Sales".into()),
            budget: Some(100_000.0),
            ..args(GoalType::Business)
        }
        .into_goal(Timestamp::UNIX_EPOCH)
        .unwrap();

        let details = goal.business().unwrap();
        assert_eq!(details.department.as_deref(), Some("Sales"));
        assert_eq!(details.budget, Some(100_000.0));
    }

    #[test]
    fn kind_flags_must_match_type() {
        let err = AddArgs {
            budget: Some(5.0),
            ..args(GoalType::Personal)
        }
        .into_goal(Timestamp::UNIX_EPOCH)
        .unwrap_err();
        assert!(err.contains("business goals"), "{err}");

        let err = AddArgs {
            public: true,
            ..args(GoalType::General)
        }
        .into_goal(Timestamp::UNIX_EPOCH)
        .unwrap_err();
        assert!(err.contains("personal goals"), "{err}");
    }

    #[test]
    fn invalid_goal_is_reported() {
        let err = AddArgs {
            target: 0.0,
            ..args(GoalType::General)
        }
        .into_goal(Timestamp::UNIX_EPOCH)
        .unwrap_err();

        assert!(err.starts_with("invalid goal:"), "{err}");
    }
}
