//! Merge rules for authoritative push events.
//!
//! A locally-initiated mutation is authoritative for its own fields until
//! the feed confirms a value at least as new; pushes for entities the
//! engine did not touch are applied wholesale. There are no sequence
//! numbers on the feed - conflicts resolve last-write-wins by arrival -
//! except that a task's confirmed status never moves backwards: a stale
//! echo of an earlier write must not revert a completion. Per-field
//! version stamps would strengthen this; the feed contract does not
//! carry them today.
//!
//! Everything here is pure so the rules are testable without the actor.

use brigade_atoms::{EngineError, Result};
use brigade_shared::types::{Activity, Notification, Task, User};

/// Typed mapping boundary for pushed rows. A row that does not parse is
/// rejected here, never half-applied.
pub fn task_from_row(row: &serde_json::Value) -> Result<Task> {
    serde_json::from_value(row.clone())
        .map_err(|e| EngineError::invalid_payload(format!("task row: {}", e)))
}

pub fn user_from_row(row: &serde_json::Value) -> Result<User> {
    serde_json::from_value(row.clone())
        .map_err(|e| EngineError::invalid_payload(format!("user row: {}", e)))
}

pub fn notification_from_row(row: &serde_json::Value) -> Result<Notification> {
    serde_json::from_value(row.clone())
        .map_err(|e| EngineError::invalid_payload(format!("notification row: {}", e)))
}

pub fn activity_from_row(row: &serde_json::Value) -> Result<Activity> {
    serde_json::from_value(row.clone())
        .map_err(|e| EngineError::invalid_payload(format!("activity row: {}", e)))
}

/// What to do with a pushed task row.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskMerge {
    /// The feed confirmed exactly what we wrote; clear the pending mark.
    Confirmed(Task),
    /// Another writer's (or newer) state; replace wholesale.
    Replaced(Task),
    /// Echo of a state older than what we hold; dropped.
    IgnoredStale,
}

pub fn merge_task(
    current: Option<&Task>,
    pending: Option<&serde_json::Value>,
    incoming: Task,
) -> TaskMerge {
    // Status order is monotonic. An echo carrying an earlier status than
    // the row we hold is a replay of history, not news - applying it
    // would let observers see a completion revert.
    if let Some(current) = current {
        if incoming.status.rank() < current.status.rank() {
            return TaskMerge::IgnoredStale;
        }
    }
    if let Some(pending) = pending {
        if matches!(serde_json::to_value(&incoming), Ok(ref value) if value == pending) {
            return TaskMerge::Confirmed(incoming);
        }
    }
    TaskMerge::Replaced(incoming)
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserMerge {
    Confirmed(User),
    Replaced(User),
}

pub fn merge_user(
    current: Option<&User>,
    pending: Option<&serde_json::Value>,
    incoming: User,
) -> UserMerge {
    if let Some(pending) = pending {
        if matches!(serde_json::to_value(&incoming), Ok(ref value) if value == pending) {
            return UserMerge::Confirmed(incoming);
        }
    }
    let mut merged = incoming;
    // Level is derived and monotonic non-decreasing; a push carrying a
    // lower level is behind our confirmed awards
    if let Some(current) = current {
        if merged.level < current.level {
            merged.level = current.level;
        }
    }
    UserMerge::Replaced(merged)
}
