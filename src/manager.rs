//! Goal management: per-user goal collections and the rules around them.
//!
//! The manager owns every user's goals in memory and writes a user's whole
//! collection back to the store after each change to it. Nothing is rolled
//! back when that write fails: the change stays in memory and the error is
//! returned, so callers can retry or warn.

mod insights;
mod transfer;

use std::collections::BTreeMap;

use jiff::SignedDuration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::model::{Goal, GoalStatus, GoalType, ValidationError, validate_progress};
use crate::storage::{BackupInfo, GoalStore, StorageError};

pub use insights::{SystemHealth, UserStatistics};
pub use transfer::{ExportDocument, ExportFilter, ImportReport};

/// Goals a single user may hold unless configured otherwise.
pub const DEFAULT_MAX_GOALS_PER_USER: usize = 50;

/// Minimum minutes between progress updates on one goal unless configured otherwise.
pub const DEFAULT_MIN_UPDATE_INTERVAL_MINUTES: i64 = 60;

/// Below this percentage an active goal counts as low progress.
pub const DEFAULT_LOW_PROGRESS_PERCENT: f64 = 25.0;

/// Above this share of stalled goals the system reports unhealthy.
pub const DEFAULT_STALLED_SHARE: f64 = 0.5;

/// Errors returned by goal management operations.
#[derive(Debug, thiserror::Error)]
pub enum GoalError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("username must not be empty")]
    EmptyUsername,

    #[error("goal not found: {0}")]
    NotFound(Uuid),

    #[error("goal already exists: {0}")]
    AlreadyExists(Uuid),

    #[error("progress was updated too recently; try again in {retry_in_minutes} minute(s)")]
    RateLimited { retry_in_minutes: i64 },

    #[error("goal limit of {limit} reached")]
    Capacity { limit: usize },

    #[error("goal {id} is not a {expected} goal")]
    WrongKind { id: Uuid, expected: GoalType },

    #[error("goal {id} is {status}")]
    InvalidTransition { id: Uuid, status: GoalStatus },

    #[error("invalid import: {0}")]
    InvalidImport(String),

    #[error("storage error: {0}")]
    Persistence(#[from] StorageError),
}

pub type Result<T> = core::result::Result<T, GoalError>;

/// Tunable limits and thresholds.
#[derive(Debug, Clone)]
pub struct Policy {
    pub max_goals_per_user: usize,
    pub min_update_interval: SignedDuration,
    pub low_progress_percent: f64,
    pub stalled_share: f64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            max_goals_per_user: DEFAULT_MAX_GOALS_PER_USER,
            min_update_interval: SignedDuration::from_mins(DEFAULT_MIN_UPDATE_INTERVAL_MINUTES),
            low_progress_percent: DEFAULT_LOW_PROGRESS_PERCENT,
            stalled_share: DEFAULT_STALLED_SHARE,
        }
    }
}

/// What a successful progress update changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressUpdate {
    /// This update completed the goal.
    pub completed: bool,

    /// Milestones reached by this update that were not reached before it.
    pub milestones_reached: Vec<String>,
}

/// Owns every user's goals and enforces the rules around them.
pub struct GoalManager<S, C> {
    goals: BTreeMap<String, Vec<Goal>>,
    store: S,
    clock: C,
    policy: Policy,
}

impl<S: GoalStore, C: Clock> GoalManager<S, C> {
    pub fn new(store: S, clock: C, policy: Policy) -> Self {
        Self {
            goals: BTreeMap::new(),
            store,
            clock,
            policy,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // ── Loading ──

    /// Replaces one user's in-memory goals with the stored ones.
    ///
    /// Returns how many goals were loaded.
    pub fn load_user(&mut self, username: &str) -> Result<usize> {
        let goals = self.store.load_goals(username)?;
        let count = goals.len();
        if goals.is_empty() {
            self.goals.remove(username);
        } else {
            self.goals.insert(username.to_string(), goals);
        }
        Ok(count)
    }

    /// Replaces all in-memory goals with everything in the store.
    ///
    /// Returns how many goals were loaded across all users.
    pub fn load_all(&mut self) -> Result<usize> {
        let mut goals = BTreeMap::new();
        let mut count = 0;
        for username in self.store.list_users()? {
            let user_goals = self.store.load_goals(&username)?;
            count += user_goals.len();
            goals.insert(username, user_goals);
        }
        self.goals = goals;
        Ok(count)
    }

    // ── Mutations ──

    /// Adds a goal to a user's collection and persists it.
    pub fn add_goal(&mut self, username: &str, goal: Goal) -> Result<Uuid> {
        validate_username(username)?;

        let limit = self.policy.max_goals_per_user;
        let user_goals = self.goals.entry(username.to_string()).or_default();
        if user_goals.len() >= limit {
            warn!(username, limit, "goal limit reached");
            return Err(GoalError::Capacity { limit });
        }
        if user_goals.iter().any(|g| g.id == goal.id) {
            return Err(GoalError::AlreadyExists(goal.id));
        }

        let id = goal.id;
        info!(username, %id, title = %goal.title, "adding goal");
        user_goals.push(goal);
        self.persist(username)?;
        Ok(id)
    }

    /// Records new progress on a goal.
    ///
    /// Rejected when the goal is unknown, the value is invalid, or the goal's
    /// last update is more recent than the configured interval.
    pub fn update_goal_progress(
        &mut self,
        username: &str,
        id: Uuid,
        value: f64,
        note: &str,
    ) -> Result<ProgressUpdate> {
        validate_username(username)?;
        let now = self.clock.now();
        let interval = self.policy.min_update_interval;
        let goal = self.goal_mut(username, id)?;
        validate_progress(value)?;

        if let Some(last) = goal.last_update() {
            let elapsed = now.duration_since(last);
            if elapsed < interval {
                let remaining = interval - elapsed;
                let retry_in_minutes = (remaining.as_secs() + 59) / 60;
                warn!(username, %id, retry_in_minutes, "progress update too soon");
                return Err(GoalError::RateLimited { retry_in_minutes });
            }
        }

        let reached_before: Vec<String> = milestone_names(goal);
        let previous = goal.current_value;
        let completed = goal.record_progress(value, note, now)?;
        let milestones_reached: Vec<String> = milestone_names(goal)
            .into_iter()
            .filter(|name| !reached_before.contains(name))
            .collect();

        info!(username, %id, previous, value, "progress updated");
        for milestone in &milestones_reached {
            info!(username, %id, milestone = %milestone, "milestone reached");
        }
        if completed {
            info!(username, %id, "goal completed");
        }

        self.persist(username)?;
        Ok(ProgressUpdate {
            completed,
            milestones_reached,
        })
    }

    /// Removes a goal and persists the smaller collection.
    pub fn remove_goal(&mut self, username: &str, id: Uuid) -> Result<Goal> {
        validate_username(username)?;
        let user_goals = self
            .goals
            .get_mut(username)
            .ok_or(GoalError::NotFound(id))?;
        let index = user_goals
            .iter()
            .position(|g| g.id == id)
            .ok_or(GoalError::NotFound(id))?;
        let goal = user_goals.remove(index);

        info!(username, %id, title = %goal.title, "removed goal");
        self.persist(username)?;
        Ok(goal)
    }

    /// Pauses an active goal.
    pub fn pause_goal(&mut self, username: &str, id: Uuid) -> Result<()> {
        self.transition(username, id, GoalStatus::Active, GoalStatus::Paused)
    }

    /// Resumes a paused goal.
    pub fn resume_goal(&mut self, username: &str, id: Uuid) -> Result<()> {
        self.transition(username, id, GoalStatus::Paused, GoalStatus::Active)
    }

    fn transition(
        &mut self,
        username: &str,
        id: Uuid,
        from: GoalStatus,
        to: GoalStatus,
    ) -> Result<()> {
        validate_username(username)?;
        let goal = self.goal_mut(username, id)?;
        if goal.status != from {
            return Err(GoalError::InvalidTransition {
                id,
                status: goal.status,
            });
        }
        goal.status = to;
        info!(username, %id, status = %to, "goal status changed");
        self.persist(username)
    }

    /// Adds a motivation note to a personal goal.
    ///
    /// Returns whether the note was kept; blank notes are dropped.
    pub fn add_motivation_note(&mut self, username: &str, id: Uuid, note: &str) -> Result<bool> {
        validate_username(username)?;
        let goal = self.goal_mut(username, id)?;
        let details = goal.personal_mut().ok_or(GoalError::WrongKind {
            id,
            expected: GoalType::Personal,
        })?;
        if !details.add_motivation_note(note) {
            return Ok(false);
        }
        self.persist(username)?;
        Ok(true)
    }

    /// Adds a milestone to a business goal.
    pub fn add_milestone(
        &mut self,
        username: &str,
        id: Uuid,
        name: &str,
        threshold: f64,
    ) -> Result<()> {
        validate_username(username)?;
        let goal = self.goal_mut(username, id)?;
        if !goal.add_milestone(name, threshold)? {
            return Err(GoalError::WrongKind {
                id,
                expected: GoalType::Business,
            });
        }
        self.persist(username)
    }

    /// Adds a stakeholder to a business goal.
    ///
    /// Returns whether the stakeholder was new.
    pub fn add_stakeholder(&mut self, username: &str, id: Uuid, name: &str) -> Result<bool> {
        validate_username(username)?;
        let goal = self.goal_mut(username, id)?;
        let details = goal.business_mut().ok_or(GoalError::WrongKind {
            id,
            expected: GoalType::Business,
        })?;
        if !details.add_stakeholder(name) {
            return Ok(false);
        }
        self.persist(username)?;
        Ok(true)
    }

    // ── Queries ──

    /// A user's goals in insertion order.
    pub fn user_goals(&self, username: &str) -> &[Goal] {
        self.goals.get(username).map_or(&[], Vec::as_slice)
    }

    pub fn goal(&self, username: &str, id: Uuid) -> Option<&Goal> {
        self.user_goals(username).iter().find(|g| g.id == id)
    }

    pub fn goals_by_status(&self, username: &str, status: GoalStatus) -> Vec<&Goal> {
        self.filter(username, |g| g.status == status)
    }

    /// Goals whose category matches, ignoring case.
    pub fn goals_by_category(&self, username: &str, category: &str) -> Vec<&Goal> {
        let category = category.trim().to_lowercase();
        self.filter(username, |g| g.category.to_lowercase() == category)
    }

    pub fn goals_by_type(&self, username: &str, goal_type: GoalType) -> Vec<&Goal> {
        self.filter(username, |g| g.goal_type() == goal_type)
    }

    /// Goals whose title or description contains `text`, ignoring case.
    pub fn search_goals(&self, username: &str, text: &str) -> Vec<&Goal> {
        let needle = text.trim().to_lowercase();
        self.filter(username, |g| {
            g.title.to_lowercase().contains(&needle)
                || g.description.to_lowercase().contains(&needle)
        })
    }

    fn filter(&self, username: &str, predicate: impl Fn(&Goal) -> bool) -> Vec<&Goal> {
        self.user_goals(username)
            .iter()
            .filter(|g| predicate(g))
            .collect()
    }

    // ── Backups ──

    /// Snapshots the stored goals.
    pub fn backup_data(&self) -> Result<BackupInfo> {
        Ok(self.store.create_backup(self.clock.now())?)
    }

    pub fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        Ok(self.store.list_backups()?)
    }

    /// Restores a backup and reloads every user from it.
    ///
    /// Returns how many goals were loaded.
    pub fn restore_backup(&mut self, name: &str) -> Result<usize> {
        self.store.restore_backup(name)?;
        let count = self.load_all()?;
        info!(backup = name, goals = count, "reloaded goals from backup");
        Ok(count)
    }

    // ── Internals ──

    fn goal_mut(&mut self, username: &str, id: Uuid) -> Result<&mut Goal> {
        self.goals
            .get_mut(username)
            .and_then(|goals| goals.iter_mut().find(|g| g.id == id))
            .ok_or(GoalError::NotFound(id))
    }

    fn persist(&self, username: &str) -> Result<()> {
        self.store
            .save_goals(username, self.user_goals(username))
            .map_err(|e| {
                warn!(username, error = %e, "failed to persist goals; in-memory state kept");
                GoalError::Persistence(e)
            })
    }
}

fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(GoalError::EmptyUsername);
    }
    Ok(())
}

fn milestone_names(goal: &Goal) -> Vec<String> {
    goal.check_milestones()
        .into_iter()
        .map(|m| m.name.clone())
        .collect()
}
