//! Goal kinds: the per-type payload carried alongside the base goal record.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::goal::ValidationError;

/// What kind of goal this is, together with its kind-specific details.
///
/// Flattened into the goal record, so each serialized goal carries a
/// `"type"` tag next to its base fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GoalKind {
    /// A plain goal with no extras.
    General,

    /// A personal goal: priority, visibility, and motivation notes.
    Personal(PersonalDetails),

    /// A business goal: department, budget, stakeholders, and milestones.
    Business(BusinessDetails),
}

impl GoalKind {
    pub fn goal_type(&self) -> GoalType {
        match self {
            Self::General => GoalType::General,
            Self::Personal(_) => GoalType::Personal,
            Self::Business(_) => GoalType::Business,
        }
    }
}

/// The payload-free type tag, used for filtering and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GoalType {
    General,
    Personal,
    Business,
}

impl GoalType {
    pub fn label(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Personal => "personal",
            Self::Business => "business",
        }
    }
}

impl fmt::Display for GoalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GoalType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        [Self::General, Self::Personal, Self::Business]
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::UnknownType(s.to_string()))
    }
}

/// How much a personal goal matters to its owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalDetails {
    #[serde(default)]
    pub priority: Priority,

    /// Whether the goal may be shown to others.
    #[serde(default)]
    pub is_public: bool,

    /// Motivation notes, oldest first.
    #[serde(default)]
    pub motivation_notes: Vec<String>,
}

impl PersonalDetails {
    /// Appends a motivation note. Blank notes are ignored.
    ///
    /// Returns whether the note was kept.
    pub fn add_motivation_note(&mut self, note: &str) -> bool {
        let note = note.trim();
        if note.is_empty() {
            return false;
        }
        self.motivation_notes.push(note.to_string());
        true
    }

    pub fn motivation_summary(&self) -> String {
        if self.motivation_notes.is_empty() {
            return "No motivation notes".to_string();
        }
        self.motivation_notes.join("; ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessDetails {
    #[serde(default)]
    pub department: Option<String>,

    #[serde(default)]
    pub budget: Option<f64>,

    #[serde(default)]
    pub stakeholders: BTreeSet<String>,

    /// Milestones in the order they were added.
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

impl BusinessDetails {
    /// Adds a stakeholder. Duplicates and blank names are ignored.
    ///
    /// Returns whether the stakeholder was new.
    pub fn add_stakeholder(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.stakeholders.insert(name.to_string())
    }
}

/// A named threshold within a business goal.
///
/// Reached once the goal's current value meets the threshold; nothing is
/// stored beyond what the current value implies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub name: String,
    pub threshold: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_type_parses_case_insensitively() {
        assert_eq!("Personal".parse::<GoalType>().unwrap(), GoalType::Personal);
        assert_eq!(" BUSINESS ".parse::<GoalType>().unwrap(), GoalType::Business);
        assert_eq!("general".parse::<GoalType>().unwrap(), GoalType::General);
    }

    #[test]
    fn goal_type_rejects_unknown_label() {
        let err = "hobby".parse::<GoalType>().unwrap_err();
        assert!(matches!(err, ValidationError::UnknownType(ref s) if s == "hobby"));
    }

    #[test]
    fn blank_motivation_notes_are_ignored() {
        let mut details = PersonalDetails::default();

        assert!(!details.add_motivation_note(""));
        assert!(!details.add_motivation_note("   "));
        assert_eq!(details.motivation_summary(), "No motivation notes");
    }

    #[test]
    fn motivation_summary_lists_notes_oldest_first() {
        let mut details = PersonalDetails::default();
        details.add_motivation_note("Great start!");
        details.add_motivation_note("  Feeling better every day ");

        assert_eq!(
            details.motivation_summary(),
            "Great start!; Feeling better every day"
        );
    }

    #[test]
    fn stakeholders_have_set_semantics() {
        let mut details = BusinessDetails::default();
        for name in ["Jan Kowalski", "Anna Nowak", "Piotr Wiśniewski"] {
            assert!(details.add_stakeholder(name));
        }

        assert!(!details.add_stakeholder("Jan Kowalski"));
        assert!(!details.add_stakeholder("  "));
        assert_eq!(details.stakeholders.len(), 3);
    }

    #[test]
    fn kind_reports_its_type() {
        assert_eq!(GoalKind::General.goal_type(), GoalType::General);
        assert_eq!(
            GoalKind::Personal(PersonalDetails::default()).goal_type(),
            GoalType::Personal
        );
        assert_eq!(
            GoalKind::Business(BusinessDetails::default()).goal_type(),
            GoalType::Business
        );
    }
}
