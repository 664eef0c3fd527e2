//! Core data model for goaltrack.
//!
//! Goals are one record type with a tagged kind: general, personal, or
//! business. Kind-specific behavior is reached through capability accessors
//! on [`Goal`] rather than through separate types.

mod goal;
mod kind;
mod progress;

pub use goal::{Goal, GoalStatus, ValidationError, validate_progress};
pub use kind::{GoalKind, GoalType, Priority};
