//! The engine's in-memory projection of backend state.
//!
//! One actor owns a `Projection`; every mutation - user command or feed
//! event - goes through that actor, so reads here never see a half-applied
//! write.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use brigade_atoms::progression::{self, streak::StreakTier};
use brigade_atoms::store::Table;
use brigade_atoms::time;
use brigade_atoms::{EngineError, Result};
use brigade_shared::types::{
    Activity, Notification, Role, ShiftStatus, Task, TaskStatus, User,
};

/// Cached rows plus the registry of writes awaiting feed confirmation.
pub struct Projection {
    pub company_id: String,
    pub users: HashMap<String, User>,
    pub tasks: HashMap<String, Task>,
    pub notifications: HashMap<String, Notification>,
    pub activities: Vec<Activity>,
    /// Rows this engine wrote, keyed by table and id, holding the exact
    /// value written. A feed event matching the value is a confirmation;
    /// anything else for the same key means another writer got there.
    pending: HashMap<(Table, String), serde_json::Value>,
}

impl Projection {
    pub fn new(company_id: &str) -> Self {
        Self {
            company_id: company_id.to_string(),
            users: HashMap::new(),
            tasks: HashMap::new(),
            notifications: HashMap::new(),
            activities: Vec::new(),
            pending: HashMap::new(),
        }
    }

    pub fn apply_user(&mut self, user: User) {
        self.users.insert(user.user_id.clone(), user);
    }

    pub fn apply_task(&mut self, task: Task) {
        self.tasks.insert(task.task_id.clone(), task);
    }

    pub fn remove_task(&mut self, task_id: &str) {
        self.tasks.remove(task_id);
        self.clear_pending(Table::Tasks, task_id);
    }

    pub fn apply_notification(&mut self, notification: Notification) {
        self.notifications
            .insert(notification.notification_id.clone(), notification);
    }

    pub fn apply_activity(&mut self, activity: Activity) {
        // Feed replays can re-deliver; keep the list free of duplicates
        if !self
            .activities
            .iter()
            .any(|a| a.activity_id == activity.activity_id)
        {
            self.activities.push(activity);
        }
    }

    pub fn mark_pending<T: Serialize>(&mut self, table: Table, id: &str, row: &T) {
        if let Ok(value) = serde_json::to_value(row) {
            self.pending.insert((table, id.to_string()), value);
        }
    }

    pub fn clear_pending(&mut self, table: Table, id: &str) {
        self.pending.remove(&(table, id.to_string()));
    }

    pub fn pending_row(&self, table: Table, id: &str) -> Option<&serde_json::Value> {
        self.pending.get(&(table, id.to_string()))
    }

    // ---- pure reads the engine serves to the UI ----

    pub fn tasks_for_company(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.values().cloned().collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks
    }

    pub fn tasks_for_user(&self, user_id: &str, status: Option<TaskStatus>) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .values()
            .filter(|t| t.assigned_to == user_id)
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks
    }

    pub fn notifications_for_user(&self, user_id: &str) -> Vec<Notification> {
        let mut rows: Vec<Notification> = self
            .notifications
            .values()
            .filter(|n| n.recipient_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }

    pub fn unread_count(&self, user_id: &str) -> u32 {
        self.notifications
            .values()
            .filter(|n| n.recipient_id == user_id && !n.read)
            .count() as u32
    }

    pub fn activities(&self) -> Vec<Activity> {
        let mut rows = self.activities.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }

    /// Seconds on shift right now; 0 when off shift. Derived from the
    /// stored check-in timestamp, so display polling can pause and
    /// resume without losing anything.
    pub fn shift_duration_secs(&self, user_id: &str, now: DateTime<Utc>) -> u32 {
        match self.users.get(user_id) {
            Some(user) if user.shift_status == ShiftStatus::Active => user
                .last_check_in
                .map(|start| time::elapsed_secs(start, now))
                .unwrap_or(0),
            _ => 0,
        }
    }

    /// Gate for administrative commands (task and schedule management).
    pub fn require_admin(&self, actor_id: &str) -> Result<User> {
        let actor = self
            .users
            .get(actor_id)
            .ok_or_else(|| EngineError::not_found("user", actor_id))?;
        if !actor.role.can_administer() {
            return Err(EngineError::precondition("requires manager or owner role"));
        }
        Ok(actor.clone())
    }

    pub fn profile(&self, user_id: &str, now: DateTime<Utc>) -> Result<UserProfile> {
        let user = self
            .users
            .get(user_id)
            .ok_or_else(|| EngineError::not_found("user", user_id))?;
        Ok(UserProfile {
            user_id: user.user_id.clone(),
            user_name: user.user_name.clone(),
            role: user.role,
            experience: user.experience,
            level: user.level,
            next_level_threshold: progression::next_level_threshold(user.level),
            progress_percent: progression::progress_percent(user.experience, user.level),
            streak: user.streak,
            streak_tier: progression::tier(user.streak),
            shift_status: user.shift_status,
            on_shift_secs: self.shift_duration_secs(user_id, now),
            unread_notifications: self.unread_count(user_id),
        })
    }
}

/// Everything the profile screen renders, derived in one place.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub user_id: String,
    pub user_name: String,
    pub role: Role,
    pub experience: u32,
    pub level: u32,
    pub next_level_threshold: u32,
    pub progress_percent: u32,
    pub streak: u32,
    pub streak_tier: StreakTier,
    pub shift_status: ShiftStatus,
    pub on_shift_secs: u32,
    pub unread_notifications: u32,
}
