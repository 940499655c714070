use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TaskAssigned,
    TaskCompleted,
    AchievementUnlocked,
}

/// Per-recipient notification. Append-only apart from the `read` flag.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Notification {
    pub notification_id: String,
    pub recipient_id: String,
    pub kind: NotificationKind,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Company-visible feed event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    CheckIn,
    CheckOut,
    TaskCompleted,
    LevelUp,
    AchievementUnlocked,
}

/// Append-only event record; never mutated after creation.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Activity {
    pub activity_id: String,
    pub company_id: String,
    pub user_id: String,
    pub kind: ActivityKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
