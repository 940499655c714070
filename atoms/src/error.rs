use thiserror::Error;

/// Error taxonomy surfaced to the UI collaborator.
///
/// Gating failures (`PreconditionFailed`, `NotFound`, `AlreadyActive`,
/// `NotActive`) are returned synchronously and never retried.
/// `PersistenceFailed` means the backend rejected a write; the optimistic
/// local change has already been rolled back when it surfaces.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A status or attendance precondition failed. The reason is short
    /// enough to show to the user as-is.
    #[error("{reason}")]
    PreconditionFailed { reason: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Check-in attempted while already on shift.
    #[error("already checked in")]
    AlreadyActive,

    /// Check-out attempted while off shift.
    #[error("not checked in")]
    NotActive,

    /// The backend rejected a write. Transient; the UI may retry.
    #[error("persistence failed: {message}")]
    PersistenceFailed { message: String },

    /// The (user, achievement) pair already exists. Swallowed by the
    /// achievement engine, never shown to the user.
    #[error("achievement already unlocked")]
    DuplicateUnlock,

    /// A pushed row did not map onto a typed entity.
    #[error("invalid payload: {message}")]
    InvalidPayload { message: String },
}

impl EngineError {
    pub fn precondition(reason: impl Into<String>) -> Self {
        EngineError::PreconditionFailed {
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        EngineError::PersistenceFailed {
            message: message.into(),
        }
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        EngineError::InvalidPayload {
            message: message.into(),
        }
    }
}
