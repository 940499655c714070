//! Contracts the engine requires from the backend data service.
//!
//! The backend itself (relational storage, auth, object storage, realtime
//! transport) is an external collaborator; the engine only depends on the
//! operations below. [`memory::MemoryStore`] is the in-repo reference
//! implementation and the test double.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::achievements::model::UserAchievement;
use crate::feed::model::{Activity, Notification};
use crate::shifts::model::{AttendanceRecord, Shift};
use crate::tasks::model::{Task, TaskStatus};
use crate::users::model::User;
use crate::Result;

/// Which logical table a change event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Users,
    Tasks,
    Notifications,
    Activities,
    Shifts,
    UserAchievements,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One change pushed over the realtime feed.
///
/// The row travels as raw JSON; mapping it onto a typed entity happens at
/// the reconciliation boundary, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub entity_id: String,
    /// Company the row belongs to, for feed scoping. Absent on deletes
    /// of rows the backend no longer has.
    #[serde(default)]
    pub company_id: Option<String>,
    /// Full row as the backend stores it; empty for deletes.
    #[serde(default)]
    pub row: serde_json::Value,
}

/// Result of a conditional status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    /// The stored status no longer matched; carries what it actually was.
    Conflict(TaskStatus),
}

/// Row read/write contract over the backend store.
///
/// Calling convention follows the service layer: the store handle is the
/// first argument of every domain operation built on top of this.
#[async_trait]
pub trait DataStore: Send + Sync {
    // users
    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;
    async fn put_user(&self, user: &User) -> Result<()>;
    async fn users_for_company(&self, company_id: &str) -> Result<Vec<User>>;

    // tasks
    async fn get_task(&self, task_id: &str) -> Result<Option<Task>>;
    async fn put_task(&self, task: &Task) -> Result<()>;
    async fn delete_task(&self, task_id: &str) -> Result<()>;
    async fn tasks_for_company(&self, company_id: &str) -> Result<Vec<Task>>;
    /// Write `task` only if the stored status still equals `expected`.
    /// The check and the write are one atomic step on the backend; two
    /// racing transitions cannot both apply.
    async fn transition_task(&self, task: &Task, expected: TaskStatus)
        -> Result<TransitionOutcome>;

    // attendance
    async fn append_attendance(&self, record: &AttendanceRecord) -> Result<()>;
    /// Close the user's open attendance record.
    async fn close_attendance(
        &self,
        user_id: &str,
        check_out: DateTime<Utc>,
        duration_secs: u32,
    ) -> Result<()>;

    // achievements
    async fn unlocked_achievements(&self, user_id: &str) -> Result<Vec<UserAchievement>>;
    /// Insert the join row under the (user, achievement) uniqueness
    /// constraint. Fails with `DuplicateUnlock` when the pair already
    /// exists; callers swallow that, never surface it.
    async fn insert_user_achievement(&self, row: &UserAchievement) -> Result<()>;

    // feed
    async fn append_notification(&self, notification: &Notification) -> Result<()>;
    async fn notifications_for_user(&self, user_id: &str) -> Result<Vec<Notification>>;
    async fn mark_notification_read(&self, notification_id: &str) -> Result<()>;
    async fn append_activity(&self, activity: &Activity) -> Result<()>;
    async fn activities_for_company(&self, company_id: &str) -> Result<Vec<Activity>>;

    // schedule
    async fn put_shift(&self, shift: &Shift) -> Result<()>;
    async fn shifts_for_company(&self, company_id: &str) -> Result<Vec<Shift>>;
    async fn delete_shift(&self, shift_id: &str) -> Result<()>;

    /// Subscribe to the realtime change feed.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// Object storage contract: raw bytes in, stable reference out.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;
}
