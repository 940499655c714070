use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task status. Transitions are strictly pending -> in_progress -> done;
/// no regression, no skipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Done,
}

impl TaskStatus {
    /// Position in the lifecycle order, for monotonicity checks.
    pub fn rank(self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::InProgress => 1,
            TaskStatus::Done => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Experience reward a task of this priority earns by default.
    pub fn default_reward(self) -> u32 {
        match self {
            Priority::High => 50,
            Priority::Medium => 30,
            Priority::Low => 20,
        }
    }
}

/// Task domain model - a unit of work assigned to a staff member.
///
/// Invariant: `started_at` is set iff status is in_progress or done;
/// `completed_at`, `duration_secs` and `photo_proof` are set only once
/// the task is done.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Task {
    pub task_id: String,
    pub company_id: String,
    pub title: String,
    pub assigned_to: String,
    pub created_by: String,
    pub status: TaskStatus,
    pub priority: Priority,

    /// Fixed at creation from priority unless explicitly overridden.
    /// Later priority changes do not touch it.
    pub experience_reward: u32,

    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Stable object-store reference to the completion photo.
    #[serde(default)]
    pub photo_proof: Option<String>,
    #[serde(default)]
    pub duration_secs: Option<u32>,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskPayload {
    pub title: String,
    pub assigned_to: String,
    pub priority: Priority,
    /// Overrides the priority-derived reward when set.
    pub experience_reward: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskPayload {
    pub title: Option<String>,
    pub assigned_to: Option<String>,
    pub priority: Option<Priority>,
    pub experience_reward: Option<u32>,
}
