// ========== USER ==========
pub use brigade_atoms::users::model::{CreateUserPayload, Role, ShiftStatus, UpdateUserPayload, User};

// ========== TASK ==========
pub use brigade_atoms::tasks::model::{
    CreateTaskPayload, Priority, Task, TaskStatus, UpdateTaskPayload,
};

// ========== SHIFT / ATTENDANCE ==========
pub use brigade_atoms::shifts::model::{AttendanceRecord, CreateShiftPayload, GeoPoint, Shift};

// ========== GAMIFICATION ==========
pub use brigade_atoms::achievements::model::{Achievement, Condition, UserAchievement};
pub use brigade_atoms::progression::streak::StreakTier;

// ========== FEED ==========
pub use brigade_atoms::feed::model::{Activity, ActivityKind, Notification, NotificationKind};

// ========== MEDIA ==========
pub use brigade_atoms::media::model::PhotoProof;

// ========== STORE ==========
pub use brigade_atoms::error::EngineError;
pub use brigade_atoms::store::{ChangeEvent, ChangeKind, Table};
