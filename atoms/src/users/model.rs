use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Staff role within a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Employee,
    Manager,
    Owner,
}

impl Role {
    /// Managers and owners administer staff, tasks and schedules.
    pub fn can_administer(self) -> bool {
        matches!(self, Role::Manager | Role::Owner)
    }
}

/// Whether the user is currently on shift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Active,
    #[default]
    Offline,
}

/// User domain model - the engine holds a cached projection of the
/// backend row.
///
/// Invariant: `shift_status == Active` iff `last_check_in` is set and no
/// check-out has been recorded since.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    pub user_id: String,
    pub user_name: String,
    pub company_id: String,
    pub role: Role,

    /// Cumulative experience points. Level is derived from this.
    #[serde(default)]
    pub experience: u32,
    /// Derived from experience; monotonic non-decreasing.
    #[serde(default)]
    pub level: u32,
    /// Consecutive check-in days.
    #[serde(default)]
    pub streak: u32,

    #[serde(default)]
    pub shift_status: ShiftStatus,
    #[serde(default)]
    pub last_check_in: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_check_out: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserPayload {
    pub user_name: String,
    pub company_id: String,
    pub role: Role,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserPayload {
    pub user_name: Option<String>,
    pub role: Option<Role>,
}
