//! Achievement rule engine: evaluates the catalog against current user
//! state and unlocks anything newly earned.

use tracing::{info, warn};

use brigade_atoms::achievements::model::{Condition, CATALOG};
use brigade_atoms::achievements::service as achievement_service;
use brigade_atoms::feed::model::{ActivityKind, NotificationKind};
use brigade_atoms::feed::service::{notify, record_activity};
use brigade_atoms::progression;
use brigade_atoms::store::{DataStore, Table};
use brigade_atoms::time::Clock;
use brigade_atoms::{EngineError, Result};

use crate::state::Projection;

/// A catalog entry this check unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unlocked {
    pub achievement_id: &'static str,
    pub name: &'static str,
    pub experience_reward: u32,
}

/// Evaluate every catalog predicate for the user and unlock whatever is
/// newly earned.
///
/// Idempotent end to end: the unlock row insert is refused by the data
/// layer when the pair exists, and the experience reward is only awarded
/// when the insert actually landed. Runs until a pass unlocks nothing,
/// so a reward that tips a level boundary immediately unlocks the
/// level-gated entries it enabled.
pub async fn check(
    store: &dyn DataStore,
    clock: &dyn Clock,
    projection: &mut Projection,
    user_id: &str,
) -> Result<Vec<Unlocked>> {
    let mut unlocked = Vec::new();
    loop {
        let user = store
            .get_user(user_id)
            .await?
            .ok_or_else(|| EngineError::not_found("user", user_id))?;
        let held = achievement_service::unlocked_ids(store, user_id).await?;

        let mut newly = Vec::new();
        for achievement in CATALOG.iter() {
            if held.iter().any(|id| id == achievement.achievement_id) {
                continue;
            }
            let met = match achievement.condition {
                Condition::LevelReached(n) => user.level >= n,
                Condition::StreakReached(n) => user.streak >= n,
            };
            if !met {
                continue;
            }
            if !achievement_service::unlock(store, clock, user_id, achievement).await? {
                // Lost a race with another trigger; that one awards
                continue;
            }
            info!(
                user_id,
                achievement_id = achievement.achievement_id,
                "achievement unlocked"
            );

            match progression::add_experience(
                store,
                clock,
                user_id,
                achievement.experience_reward,
                "achievement unlocked",
            )
            .await
            {
                Ok(award) => {
                    projection.mark_pending(Table::Users, user_id, &award.user);
                    projection.apply_user(award.user);
                }
                Err(e) => {
                    // Unlock row is in; the reward will surface once the
                    // backend row catches up on the feed
                    warn!(user_id, error = %e, "achievement reward write failed");
                }
            }

            let message = format!("{} unlocked \"{}\"", user.user_name, achievement.name);
            if let Err(e) = record_activity(
                store,
                clock,
                &user.company_id,
                user_id,
                ActivityKind::AchievementUnlocked,
                message.clone(),
            )
            .await
            {
                warn!(user_id, error = %e, "failed to record unlock activity");
            }
            if let Err(e) = notify(
                store,
                clock,
                user_id,
                NotificationKind::AchievementUnlocked,
                format!("You unlocked \"{}\"", achievement.name),
            )
            .await
            {
                warn!(user_id, error = %e, "failed to notify unlock");
            }

            newly.push(Unlocked {
                achievement_id: achievement.achievement_id,
                name: achievement.name,
                experience_reward: achievement.experience_reward,
            });
        }

        if newly.is_empty() {
            break;
        }
        unlocked.extend(newly);
    }
    Ok(unlocked)
}
