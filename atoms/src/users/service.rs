use super::model::{CreateUserPayload, UpdateUserPayload, User};
use crate::store::DataStore;
use crate::time::Clock;
use crate::{EngineError, Result};

/// Create the user row after the auth collaborator has signed the user
/// up; `user_id` comes from the identity provider.
pub async fn create_user(
    store: &dyn DataStore,
    clock: &dyn Clock,
    user_id: &str,
    payload: CreateUserPayload,
) -> Result<User> {
    let user = User {
        user_id: user_id.to_string(),
        user_name: payload.user_name,
        company_id: payload.company_id,
        role: payload.role,
        experience: 0,
        level: 0,
        streak: 0,
        shift_status: Default::default(),
        last_check_in: None,
        last_check_out: None,
        created_at: clock.now(),
    };
    store.put_user(&user).await?;
    Ok(user)
}

pub async fn get_user(store: &dyn DataStore, user_id: &str) -> Result<User> {
    store
        .get_user(user_id)
        .await?
        .ok_or_else(|| EngineError::not_found("user", user_id))
}

/// Update profile fields. Gamification and attendance fields are owned
/// by the engine components and are not writable here.
pub async fn update_user(
    store: &dyn DataStore,
    user_id: &str,
    payload: UpdateUserPayload,
) -> Result<User> {
    let mut user = get_user(store, user_id).await?;
    if let Some(name) = payload.user_name {
        user.user_name = name;
    }
    if let Some(role) = payload.role {
        user.role = role;
    }
    store.put_user(&user).await?;
    Ok(user)
}
