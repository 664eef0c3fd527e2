//! Moving a user's goals in and out as JSON documents.
//!
//! An export is a metadata header plus full goal records. Import takes that
//! document or a bare array of records. Each record is checked like a new
//! goal and added under a fresh id; its progress history is not carried over.

use jiff::Timestamp;
use jiff::civil::Date;
use jiff::tz::TimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::model::{Goal, GoalKind, GoalStatus, ValidationError, validate_progress};
use crate::storage::GoalStore;

use super::{GoalError, GoalManager, Result, validate_username};

/// Largest import document accepted, in bytes.
pub const MAX_IMPORT_BYTES: usize = 10_000_000;

const EXPORT_FORMAT_VERSION: u32 = 1;

/// Which goals an export includes. Unset criteria match everything.
#[derive(Debug, Clone, Default)]
pub struct ExportFilter {
    pub status: Option<GoalStatus>,

    /// Compared ignoring case.
    pub category: Option<String>,

    /// Earliest creation date, inclusive, in UTC.
    pub created_from: Option<Date>,

    /// Latest creation date, inclusive, in UTC.
    pub created_to: Option<Date>,
}

impl ExportFilter {
    fn matches(&self, goal: &Goal) -> bool {
        let created = goal.created_at.to_zoned(TimeZone::UTC).date();
        self.status.is_none_or(|status| goal.status == status)
            && self.category.as_deref().is_none_or(|category| {
                goal.category.to_lowercase() == category.trim().to_lowercase()
            })
            && self.created_from.is_none_or(|from| created >= from)
            && self.created_to.is_none_or(|to| created <= to)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub format_version: u32,
    pub exported_at: Timestamp,
    pub username: String,
    pub total_goals: usize,
}

/// A user's goals as written by `export`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportDocument {
    pub metadata: ExportMetadata,
    pub goals: Vec<Goal>,
}

/// A record that could not be imported.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportFailure {
    /// 1-based position in the imported array.
    pub record: usize,
    pub reason: String,
}

/// What an import did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub total: usize,

    /// Ids given to the imported goals, in record order.
    pub imported: Vec<Uuid>,

    pub failures: Vec<ImportFailure>,
}

/// The fields an imported record may carry besides its kind payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportRecord {
    title: String,
    description: String,
    target_value: f64,
    #[serde(default)]
    current_value: f64,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    status: Option<GoalStatus>,
    #[serde(default)]
    created_at: Option<Timestamp>,
    #[serde(default)]
    deadline: Option<Date>,
}

#[derive(Debug, thiserror::Error)]
enum RecordError {
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl<S: GoalStore, C: Clock> GoalManager<S, C> {
    /// Copies the user's goals that match `filter` into an export document.
    pub fn export_goals(&self, username: &str, filter: &ExportFilter) -> ExportDocument {
        let goals: Vec<Goal> = self
            .user_goals(username)
            .iter()
            .filter(|g| filter.matches(g))
            .cloned()
            .collect();
        info!(username, count = goals.len(), "exported goals");

        ExportDocument {
            metadata: ExportMetadata {
                format_version: EXPORT_FORMAT_VERSION,
                exported_at: self.clock.now(),
                username: username.to_string(),
                total_goals: goals.len(),
            },
            goals,
        }
    }

    /// Adds every valid record in `json` to the user's goals.
    ///
    /// Invalid records and records refused by the manager (for example over
    /// the goal limit) are reported and skipped. A document that is not JSON,
    /// has the wrong shape, or is too large fails as a whole, as does a
    /// storage error.
    pub fn import_goals(&mut self, username: &str, json: &str) -> Result<ImportReport> {
        validate_username(username)?;
        if json.len() > MAX_IMPORT_BYTES {
            return Err(GoalError::InvalidImport(format!(
                "document is {} bytes; the limit is {MAX_IMPORT_BYTES}",
                json.len()
            )));
        }
        let document: Value = serde_json::from_str(json)
            .map_err(|e| GoalError::InvalidImport(format!("not valid JSON: {e}")))?;
        let records = match document {
            Value::Array(records) => records,
            Value::Object(mut document) => match document.remove("goals") {
                Some(Value::Array(records)) => records,
                _ => {
                    return Err(GoalError::InvalidImport(
                        "expected a \"goals\" array".to_string(),
                    ));
                }
            },
            _ => {
                return Err(GoalError::InvalidImport(
                    "expected an array of goals or an export document".to_string(),
                ));
            }
        };

        let now = self.clock.now();
        let mut report = ImportReport {
            total: records.len(),
            ..ImportReport::default()
        };
        for (index, record) in records.iter().enumerate() {
            let reason = match goal_from_record(record, now) {
                Ok(goal) => match self.add_goal(username, goal) {
                    Ok(id) => {
                        report.imported.push(id);
                        continue;
                    }
                    Err(e @ GoalError::Persistence(_)) => return Err(e),
                    Err(e) => e.to_string(),
                },
                Err(e) => e.to_string(),
            };
            warn!(username, record = index + 1, reason = %reason, "skipping imported goal");
            report.failures.push(ImportFailure {
                record: index + 1,
                reason,
            });
        }

        info!(
            username,
            imported = report.imported.len(),
            failed = report.failures.len(),
            "imported goals"
        );
        Ok(report)
    }
}

/// Builds a new goal from one imported record.
///
/// Records without a `type` tag become general goals. A goal whose value
/// already meets its target is marked completed.
fn goal_from_record(record: &Value, now: Timestamp) -> core::result::Result<Goal, RecordError> {
    let fields = ImportRecord::deserialize(record)?;
    let kind = if record.get("type").is_some() {
        GoalKind::deserialize(record)?
    } else {
        GoalKind::General
    };
    validate_progress(fields.current_value)?;

    let created_at = fields.created_at.unwrap_or(now);
    let mut goal = Goal::from_kind(
        kind,
        &fields.title,
        &fields.description,
        fields.target_value,
        created_at,
    )?;
    if let Some(category) = &fields.category {
        goal = goal.with_category(category);
    }
    goal.deadline = fields.deadline;
    goal.current_value = fields.current_value;
    goal.status = fields.status.unwrap_or(GoalStatus::Active);
    if goal.status != GoalStatus::Completed && goal.current_value >= goal.target_value {
        goal.status = GoalStatus::Completed;
    }
    Ok(goal)
}
