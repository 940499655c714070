pub mod model;
pub mod service;

pub use model::{Activity, ActivityKind, Notification, NotificationKind};
