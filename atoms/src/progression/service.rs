use tracing::{debug, warn};

use super::level;
use crate::feed::model::ActivityKind;
use crate::feed::service::record_activity;
use crate::store::DataStore;
use crate::time::Clock;
use crate::users::model::User;
use crate::{EngineError, Result};

/// Outcome of an experience award.
#[derive(Debug, Clone)]
pub struct ExperienceAward {
    /// User row after the award, as persisted.
    pub user: User,
    pub amount: u32,
    /// Levels crossed by this award, in order. Empty when no level-up.
    pub levels_crossed: Vec<u32>,
}

/// Add experience to a user, recompute the level, and persist.
///
/// The amount is unsigned so a negative award is unrepresentable; zero
/// is rejected as a caller bug. Crossing a level boundary appends a
/// level-up activity; crossing several in one award reports every level
/// so the achievement engine checks exactly those.
pub async fn add_experience(
    store: &dyn DataStore,
    clock: &dyn Clock,
    user_id: &str,
    amount: u32,
    reason: &str,
) -> Result<ExperienceAward> {
    if amount == 0 {
        return Err(EngineError::precondition("experience award must be positive"));
    }

    let mut user = store
        .get_user(user_id)
        .await?
        .ok_or_else(|| EngineError::not_found("user", user_id))?;

    let prior_level = user.level;
    user.experience = user.experience.saturating_add(amount);
    let recomputed = level::level_for(user.experience);
    // Level never moves backwards, whatever the stored row said
    if recomputed > user.level {
        user.level = recomputed;
    }
    store.put_user(&user).await?;

    let crossed = level::levels_crossed(prior_level, user.level);
    debug!(user_id, amount, reason, level = user.level, "experience awarded");

    if let Some(&new_level) = crossed.last() {
        let message = format!("{} reached level {}", user.user_name, new_level);
        if let Err(e) = record_activity(
            store,
            clock,
            &user.company_id,
            user_id,
            ActivityKind::LevelUp,
            message,
        )
        .await
        {
            // The award itself is persisted; a lost feed row is not
            // worth failing the command over
            warn!(user_id, error = %e, "failed to record level-up activity");
        }
    }

    Ok(ExperienceAward {
        user,
        amount,
        levels_crossed: crossed,
    })
}
