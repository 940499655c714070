use serde::{Deserialize, Serialize};

use brigade_atoms::store::{ChangeEvent, ChangeKind, Table};

/// Incoming frame from a UI client (subscribe, mark-read, ...).
#[derive(Debug, Deserialize)]
pub struct ClientMessage {
    pub action: String,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Frame pushed to UI clients when the engine's projection changes.
#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub r#type: String,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

impl PushMessage {
    pub fn new(message_type: &str, data: serde_json::Value) -> Self {
        Self {
            r#type: message_type.to_string(),
            data,
        }
    }

    /// UI frame for an applied change event, e.g. `task_updated` with the
    /// row inline.
    pub fn from_change(event: &ChangeEvent) -> Self {
        let entity = match event.table {
            Table::Users => "user",
            Table::Tasks => "task",
            Table::Notifications => "notification",
            Table::Activities => "activity",
            Table::Shifts => "shift",
            Table::UserAchievements => "achievement",
        };
        let verb = match event.kind {
            ChangeKind::Insert => "created",
            ChangeKind::Update => "updated",
            ChangeKind::Delete => "deleted",
        };
        Self {
            r#type: format!("{}_{}", entity, verb),
            data: serde_json::json!({
                "id": event.entity_id.clone(),
                "row": event.row.clone(),
            }),
        }
    }
}
