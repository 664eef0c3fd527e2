//! The goal record: identity, target, progress, and history.

use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::kind::{BusinessDetails, GoalKind, GoalType, Milestone, PersonalDetails, Priority};
use super::progress::ProgressEntry;

/// Longest accepted title, in characters.
pub const MAX_TITLE_CHARS: usize = 100;

/// Largest accepted target value.
pub const MAX_TARGET_VALUE: f64 = 1_000_000.0;

/// Largest accepted progress value.
pub const MAX_PROGRESS_VALUE: f64 = 999_999.0;

/// Reasons a goal or a change to it is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("title must be at most {max} characters", max = MAX_TITLE_CHARS)]
    TitleTooLong,

    #[error("description must not be empty")]
    EmptyDescription,

    #[error("target value must be a positive number, got {0}")]
    NonPositiveTarget(f64),

    #[error("target value must be at most {max}, got {0}", max = MAX_TARGET_VALUE)]
    TargetTooLarge(f64),

    #[error("progress value must not be negative, got {0}")]
    NegativeProgress(f64),

    #[error("progress value must be at most {max}, got {0}", max = MAX_PROGRESS_VALUE)]
    ProgressTooLarge(f64),

    #[error("milestone name must not be empty")]
    EmptyMilestoneName,

    #[error("milestone threshold must be in (0, {target}], got {threshold}")]
    MilestoneOutOfRange { threshold: f64, target: f64 },

    #[error("unknown goal status: {0}")]
    UnknownStatus(String),

    #[error("unknown goal type: {0}")]
    UnknownType(String),
}

/// Where a goal stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GoalStatus {
    Active,
    Completed,
    Paused,
}

impl GoalStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GoalStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        [Self::Active, Self::Completed, Self::Paused]
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::UnknownStatus(s.to_string()))
    }
}

/// A trackable objective with a numeric target and recorded progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub target_value: f64,
    #[serde(default)]
    pub current_value: f64,
    pub category: String,
    pub status: GoalStatus,
    pub created_at: Timestamp,
    #[serde(default)]
    pub deadline: Option<Date>,
    #[serde(default)]
    history: Vec<ProgressEntry>,
    #[serde(flatten)]
    pub kind: GoalKind,
}

impl Goal {
    /// Creates a general goal.
    ///
    /// Title and description are trimmed and must not be empty.
    /// The category defaults to the goal type's label.
    pub fn new(
        title: &str,
        description: &str,
        target_value: f64,
        created_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        Self::from_kind(GoalKind::General, title, description, target_value, created_at)
    }

    /// Creates a personal goal.
    pub fn new_personal(
        title: &str,
        description: &str,
        target_value: f64,
        priority: Priority,
        is_public: bool,
        created_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        let details = PersonalDetails {
            priority,
            is_public,
            motivation_notes: Vec::new(),
        };
        Self::from_kind(
            GoalKind::Personal(details),
            title,
            description,
            target_value,
            created_at,
        )
    }

    /// Creates a business goal.
    pub fn new_business(
        title: &str,
        description: &str,
        target_value: f64,
        department: Option<String>,
        budget: Option<f64>,
        created_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        let details = BusinessDetails {
            department,
            budget,
            ..BusinessDetails::default()
        };
        Self::from_kind(
            GoalKind::Business(details),
            title,
            description,
            target_value,
            created_at,
        )
    }

    /// Creates a goal of any kind.
    ///
    /// Runs the checks of the typed constructors. Milestones already in a
    /// business payload must satisfy the same rules as [`Goal::add_milestone`].
    pub fn from_kind(
        kind: GoalKind,
        title: &str,
        description: &str,
        target_value: f64,
        created_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        let title = title.trim();
        let description = description.trim();

        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(ValidationError::TitleTooLong);
        }
        if description.is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        validate_target(target_value)?;
        if let GoalKind::Business(details) = &kind {
            for milestone in &details.milestones {
                validate_milestone(&milestone.name, milestone.threshold, target_value)?;
            }
        }

        Ok(Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            target_value,
            current_value: 0.0,
            category: kind.goal_type().label().to_string(),
            status: GoalStatus::Active,
            created_at,
            deadline: None,
            history: Vec::new(),
            kind,
        })
    }

    /// Replaces the category. Blank categories keep the current one.
    #[must_use]
    pub fn with_category(mut self, category: &str) -> Self {
        let category = category.trim();
        if !category.is_empty() {
            self.category = category.to_string();
        }
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Date) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn goal_type(&self) -> GoalType {
        self.kind.goal_type()
    }

    /// Records a new progress value.
    ///
    /// Appends a history entry and flips the status to completed when the
    /// target is reached. A completed goal stays completed.
    /// Returns whether this update completed the goal.
    pub fn record_progress(
        &mut self,
        value: f64,
        note: &str,
        at: Timestamp,
    ) -> Result<bool, ValidationError> {
        validate_progress(value)?;

        let previous = self.current_value;
        self.history.push(ProgressEntry::new(at, previous, value, note));
        self.current_value = value;

        if self.status != GoalStatus::Completed && self.current_value >= self.target_value {
            self.status = GoalStatus::Completed;
            return Ok(true);
        }
        Ok(false)
    }

    /// Read-only view of the progress history, oldest first.
    pub fn history(&self) -> &[ProgressEntry] {
        &self.history
    }

    /// When progress was last recorded, if ever.
    pub fn last_update(&self) -> Option<Timestamp> {
        self.history.last().map(|entry| entry.recorded_at)
    }

    /// Current value over target, unclamped.
    pub fn progress_ratio(&self) -> f64 {
        self.current_value / self.target_value
    }

    /// Progress as a percentage, clamped to 100.
    pub fn progress_percentage(&self) -> f64 {
        (self.progress_ratio() * 100.0).min(100.0)
    }

    /// `title: current/target (pct%)`.
    pub fn progress_info(&self) -> String {
        format!(
            "{}: {}/{} ({:.1}%)",
            self.title,
            self.current_value,
            self.target_value,
            self.progress_percentage()
        )
    }

    /// Whether an active goal has passed its deadline.
    pub fn is_overdue(&self, today: Date) -> bool {
        self.status == GoalStatus::Active && self.deadline.is_some_and(|d| d < today)
    }

    // ── Kind capabilities ──

    pub fn personal(&self) -> Option<&PersonalDetails> {
        match &self.kind {
            GoalKind::Personal(details) => Some(details),
            _ => None,
        }
    }

    pub fn personal_mut(&mut self) -> Option<&mut PersonalDetails> {
        match &mut self.kind {
            GoalKind::Personal(details) => Some(details),
            _ => None,
        }
    }

    pub fn business(&self) -> Option<&BusinessDetails> {
        match &self.kind {
            GoalKind::Business(details) => Some(details),
            _ => None,
        }
    }

    pub fn business_mut(&mut self) -> Option<&mut BusinessDetails> {
        match &mut self.kind {
            GoalKind::Business(details) => Some(details),
            _ => None,
        }
    }

    /// Adds a milestone to a business goal.
    ///
    /// The threshold is in the goal's own units and must lie in `(0, target]`.
    /// Returns `Ok(false)` for goals that are not business goals.
    pub fn add_milestone(&mut self, name: &str, threshold: f64) -> Result<bool, ValidationError> {
        let name = name.trim();
        validate_milestone(name, threshold, self.target_value)?;
        let Some(details) = self.business_mut() else {
            return Ok(false);
        };
        details.milestones.push(Milestone {
            name: name.to_string(),
            threshold,
        });
        Ok(true)
    }

    /// Milestones whose threshold is at or below the current value.
    ///
    /// Computed fresh on every call. Empty for non-business goals.
    pub fn check_milestones(&self) -> Vec<&Milestone> {
        self.business()
            .map(|details| {
                details
                    .milestones
                    .iter()
                    .filter(|m| m.threshold <= self.current_value)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn validate_target(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::NonPositiveTarget(value));
    }
    if value > MAX_TARGET_VALUE {
        return Err(ValidationError::TargetTooLarge(value));
    }
    Ok(())
}

fn validate_milestone(name: &str, threshold: f64, target: f64) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyMilestoneName);
    }
    if !(threshold > 0.0 && threshold <= target) {
        return Err(ValidationError::MilestoneOutOfRange { threshold, target });
    }
    Ok(())
}

/// Checks a progress value without recording it.
pub fn validate_progress(value: f64) -> Result<(), ValidationError> {
    // NaN fails the `>= 0` check and is reported as negative.
    if !(value >= 0.0) {
        return Err(ValidationError::NegativeProgress(value));
    }
    if value > MAX_PROGRESS_VALUE {
        return Err(ValidationError::ProgressTooLarge(value));
    }
    Ok(())
}
