//! In-memory reference implementation of the store contracts.
//!
//! Backs the engine's test suites and doubles as documentation of what
//! each operation must guarantee: writes are atomic under one lock, the
//! conditional transition checks and writes in the same critical section,
//! the user-achievement insert enforces the uniqueness constraint, and
//! every successful write echoes a [`ChangeEvent`] on the feed the same
//! way the real backend's realtime channel does.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tokio::sync::RwLock;

use super::{ChangeEvent, ChangeKind, DataStore, ObjectStore, Table, TransitionOutcome};
use crate::achievements::model::UserAchievement;
use crate::feed::model::{Activity, Notification};
use crate::shifts::model::{AttendanceRecord, Shift};
use crate::tasks::model::{Task, TaskStatus};
use crate::users::model::User;
use crate::{EngineError, Result};

#[derive(Default)]
struct StoreState {
    users: HashMap<String, User>,
    tasks: HashMap<String, Task>,
    attendance: Vec<AttendanceRecord>,
    user_achievements: Vec<UserAchievement>,
    notifications: HashMap<String, Notification>,
    activities: Vec<Activity>,
    shifts: HashMap<String, Shift>,
}

pub struct MemoryStore {
    state: RwLock<StoreState>,
    feed: broadcast::Sender<ChangeEvent>,
    fail_writes: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(256);
        Self {
            state: RwLock::new(StoreState::default()),
            feed,
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail with `PersistenceFailed`. Tests
    /// use this to exercise optimistic-rollback paths.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Re-deliver an arbitrary feed frame, as a backend replaying stale
    /// or out-of-order change events would. Test hook.
    pub fn emit(&self, event: ChangeEvent) {
        let _ = self.feed.send(event);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(EngineError::persistence("store rejected the write"));
        }
        Ok(())
    }

    fn broadcast<T: serde::Serialize>(
        &self,
        table: Table,
        kind: ChangeKind,
        entity_id: &str,
        company_id: Option<&str>,
        row: Option<&T>,
    ) {
        let row = row
            .map(|r| serde_json::to_value(r).unwrap_or(serde_json::Value::Null))
            .unwrap_or(serde_json::Value::Null);
        // No subscribers is fine; send only fails then.
        let _ = self.feed.send(ChangeEvent {
            table,
            kind,
            entity_id: entity_id.to_string(),
            company_id: company_id.map(|c| c.to_string()),
            row,
        });
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(user_id).cloned())
    }

    async fn put_user(&self, user: &User) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        let kind = if state.users.contains_key(&user.user_id) {
            ChangeKind::Update
        } else {
            ChangeKind::Insert
        };
        state.users.insert(user.user_id.clone(), user.clone());
        drop(state);
        self.broadcast(
            Table::Users,
            kind,
            &user.user_id,
            Some(&user.company_id),
            Some(user),
        );
        Ok(())
    }

    async fn users_for_company(&self, company_id: &str) -> Result<Vec<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .filter(|u| u.company_id == company_id)
            .cloned()
            .collect())
    }

    async fn get_task(&self, task_id: &str) -> Result<Option<Task>> {
        Ok(self.state.read().await.tasks.get(task_id).cloned())
    }

    async fn put_task(&self, task: &Task) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        let kind = if state.tasks.contains_key(&task.task_id) {
            ChangeKind::Update
        } else {
            ChangeKind::Insert
        };
        state.tasks.insert(task.task_id.clone(), task.clone());
        drop(state);
        self.broadcast(
            Table::Tasks,
            kind,
            &task.task_id,
            Some(&task.company_id),
            Some(task),
        );
        Ok(())
    }

    async fn delete_task(&self, task_id: &str) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        let removed = state.tasks.remove(task_id);
        drop(state);
        if let Some(task) = removed {
            self.broadcast::<Task>(
                Table::Tasks,
                ChangeKind::Delete,
                task_id,
                Some(&task.company_id),
                None,
            );
        }
        Ok(())
    }

    async fn tasks_for_company(&self, company_id: &str) -> Result<Vec<Task>> {
        let state = self.state.read().await;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| t.company_id == company_id)
            .cloned()
            .collect();
        // Newest first, matching what the app lists
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn transition_task(
        &self,
        task: &Task,
        expected: TaskStatus,
    ) -> Result<TransitionOutcome> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        let stored = state
            .tasks
            .get(&task.task_id)
            .ok_or_else(|| EngineError::not_found("task", &task.task_id))?;
        if stored.status != expected {
            return Ok(TransitionOutcome::Conflict(stored.status));
        }
        state.tasks.insert(task.task_id.clone(), task.clone());
        drop(state);
        self.broadcast(
            Table::Tasks,
            ChangeKind::Update,
            &task.task_id,
            Some(&task.company_id),
            Some(task),
        );
        Ok(TransitionOutcome::Applied)
    }

    async fn append_attendance(&self, record: &AttendanceRecord) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        state.attendance.push(record.clone());
        Ok(())
    }

    async fn close_attendance(
        &self,
        user_id: &str,
        check_out: DateTime<Utc>,
        duration_secs: u32,
    ) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        if let Some(open) = state
            .attendance
            .iter_mut()
            .rev()
            .find(|r| r.user_id == user_id && r.check_out.is_none())
        {
            open.check_out = Some(check_out);
            open.duration_secs = Some(duration_secs);
        }
        Ok(())
    }

    async fn unlocked_achievements(&self, user_id: &str) -> Result<Vec<UserAchievement>> {
        let state = self.state.read().await;
        Ok(state
            .user_achievements
            .iter()
            .filter(|ua| ua.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_user_achievement(&self, row: &UserAchievement) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        // Uniqueness constraint: checked and inserted under the same lock
        let exists = state
            .user_achievements
            .iter()
            .any(|ua| ua.user_id == row.user_id && ua.achievement_id == row.achievement_id);
        if exists {
            return Err(EngineError::DuplicateUnlock);
        }
        state.user_achievements.push(row.clone());
        drop(state);
        self.broadcast(
            Table::UserAchievements,
            ChangeKind::Insert,
            &row.achievement_id,
            None,
            Some(row),
        );
        Ok(())
    }

    async fn append_notification(&self, notification: &Notification) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        state
            .notifications
            .insert(notification.notification_id.clone(), notification.clone());
        drop(state);
        self.broadcast(
            Table::Notifications,
            ChangeKind::Insert,
            &notification.notification_id,
            None,
            Some(notification),
        );
        Ok(())
    }

    async fn notifications_for_user(&self, user_id: &str) -> Result<Vec<Notification>> {
        let state = self.state.read().await;
        let mut rows: Vec<Notification> = state
            .notifications
            .values()
            .filter(|n| n.recipient_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn mark_notification_read(&self, notification_id: &str) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        let notification = state
            .notifications
            .get_mut(notification_id)
            .ok_or_else(|| EngineError::not_found("notification", notification_id))?;
        notification.read = true;
        let row = notification.clone();
        drop(state);
        self.broadcast(
            Table::Notifications,
            ChangeKind::Update,
            notification_id,
            None,
            Some(&row),
        );
        Ok(())
    }

    async fn append_activity(&self, activity: &Activity) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        state.activities.push(activity.clone());
        drop(state);
        self.broadcast(
            Table::Activities,
            ChangeKind::Insert,
            &activity.activity_id,
            Some(&activity.company_id),
            Some(activity),
        );
        Ok(())
    }

    async fn activities_for_company(&self, company_id: &str) -> Result<Vec<Activity>> {
        let state = self.state.read().await;
        let mut rows: Vec<Activity> = state
            .activities
            .iter()
            .filter(|a| a.company_id == company_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn put_shift(&self, shift: &Shift) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        let kind = if state.shifts.contains_key(&shift.shift_id) {
            ChangeKind::Update
        } else {
            ChangeKind::Insert
        };
        state.shifts.insert(shift.shift_id.clone(), shift.clone());
        drop(state);
        self.broadcast(
            Table::Shifts,
            kind,
            &shift.shift_id,
            Some(&shift.company_id),
            Some(shift),
        );
        Ok(())
    }

    async fn shifts_for_company(&self, company_id: &str) -> Result<Vec<Shift>> {
        let state = self.state.read().await;
        let mut rows: Vec<Shift> = state
            .shifts
            .values()
            .filter(|s| s.company_id == company_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (a.date, a.start_time).cmp(&(b.date, b.start_time)));
        Ok(rows)
    }

    async fn delete_shift(&self, shift_id: &str) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        let removed = state.shifts.remove(shift_id);
        drop(state);
        if let Some(shift) = removed {
            self.broadcast::<Shift>(
                Table::Shifts,
                ChangeKind::Delete,
                shift_id,
                Some(&shift.company_id),
                None,
            );
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}

/// Object store keeping bytes in memory; references look like
/// `mem://<key>`.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String> {
        let mut objects = self.objects.write().await;
        objects.insert(key.to_string(), bytes);
        Ok(format!("mem://{}", key))
    }
}
