use super::model::{Activity, ActivityKind, Notification, NotificationKind};
use crate::store::DataStore;
use crate::time::Clock;
use crate::Result;

/// Append a company-feed activity record.
pub async fn record_activity(
    store: &dyn DataStore,
    clock: &dyn Clock,
    company_id: &str,
    user_id: &str,
    kind: ActivityKind,
    message: impl Into<String>,
) -> Result<Activity> {
    let activity = Activity {
        activity_id: uuid::Uuid::new_v4().to_string(),
        company_id: company_id.to_string(),
        user_id: user_id.to_string(),
        kind,
        message: message.into(),
        created_at: clock.now(),
    };
    store.append_activity(&activity).await?;
    Ok(activity)
}

/// Append a notification for one recipient.
pub async fn notify(
    store: &dyn DataStore,
    clock: &dyn Clock,
    recipient_id: &str,
    kind: NotificationKind,
    message: impl Into<String>,
) -> Result<Notification> {
    let notification = Notification {
        notification_id: uuid::Uuid::new_v4().to_string(),
        recipient_id: recipient_id.to_string(),
        kind,
        message: message.into(),
        read: false,
        created_at: clock.now(),
    };
    store.append_notification(&notification).await?;
    Ok(notification)
}
