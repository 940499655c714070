use tracing::debug;

use super::model::{Achievement, UserAchievement};
use crate::store::DataStore;
use crate::time::Clock;
use crate::{EngineError, Result};

/// Insert the unlock row for a user; returns whether it was new.
///
/// Idempotent through the data layer: the (user, achievement) uniqueness
/// constraint rejects a second insert with `DuplicateUnlock`, which is
/// swallowed here. Two triggers racing on the same unlock (a task
/// completion and a level-up, say) therefore cannot produce two rows -
/// whichever insert lands second loses, quietly.
pub async fn unlock(
    store: &dyn DataStore,
    clock: &dyn Clock,
    user_id: &str,
    achievement: &Achievement,
) -> Result<bool> {
    let row = UserAchievement {
        user_id: user_id.to_string(),
        achievement_id: achievement.achievement_id.to_string(),
        unlocked_at: clock.now(),
    };
    match store.insert_user_achievement(&row).await {
        Ok(()) => Ok(true),
        Err(EngineError::DuplicateUnlock) => {
            debug!(
                user_id,
                achievement_id = achievement.achievement_id,
                "achievement already unlocked, skipping"
            );
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Ids of achievements the user already holds.
pub async fn unlocked_ids(store: &dyn DataStore, user_id: &str) -> Result<Vec<String>> {
    let rows = store.unlocked_achievements(user_id).await?;
    Ok(rows.into_iter().map(|ua| ua.achievement_id).collect())
}
