//! Shift attendance gate: the single source of truth for "is this user
//! currently on shift".

use tracing::{info, warn};

use brigade_atoms::feed::model::ActivityKind;
use brigade_atoms::feed::service::record_activity;
use brigade_atoms::progression::streak::{self, StreakChange, StreakTier, StreakUpdate};
use brigade_atoms::shifts::model::{AttendanceRecord, GeoPoint};
use brigade_atoms::store::{DataStore, Table};
use brigade_atoms::time::{self, Clock};
use brigade_atoms::users::model::ShiftStatus;
use brigade_atoms::{EngineError, Result};
use brigade_shared::types::User;

use crate::achievements::{self, Unlocked};
use crate::state::Projection;

#[derive(Debug, Clone)]
pub struct CheckInOutcome {
    /// User row after the check-in (and any achievement rewards).
    pub user: User,
    pub streak: StreakUpdate,
    pub tier: StreakTier,
    pub unlocked: Vec<Unlocked>,
}

#[derive(Debug, Clone)]
pub struct CheckOutOutcome {
    pub user: User,
    pub shift_duration_secs: u32,
}

pub async fn check_in(
    store: &dyn DataStore,
    clock: &dyn Clock,
    projection: &mut Projection,
    user_id: &str,
    location: Option<GeoPoint>,
) -> Result<CheckInOutcome> {
    let user = projection
        .users
        .get(user_id)
        .ok_or_else(|| EngineError::not_found("user", user_id))?
        .clone();
    if user.shift_status == ShiftStatus::Active {
        return Err(EngineError::AlreadyActive);
    }
    let now = clock.now();

    // 1) Streak first - the tier badge shows immediately after check-in
    let update = streak::advance(user.last_check_in, user.streak, now);

    // 2) Optimistic local apply, then persist; roll back if rejected
    let prior = user.clone();
    let mut updated = user;
    updated.shift_status = ShiftStatus::Active;
    updated.last_check_in = Some(now);
    updated.streak = update.streak;
    projection.apply_user(updated.clone());
    if let Err(e) = store.put_user(&updated).await {
        projection.apply_user(prior);
        return Err(e);
    }
    projection.mark_pending(Table::Users, user_id, &updated);

    // 3) Attendance row and feed entry are audit appends; a lost row is
    // logged, not surfaced
    let record = AttendanceRecord {
        attendance_id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        company_id: updated.company_id.clone(),
        check_in: now,
        check_out: None,
        duration_secs: None,
        location,
    };
    if let Err(e) = store.append_attendance(&record).await {
        warn!(user_id, error = %e, "failed to persist attendance record");
    }
    let message = format!("{} checked in", updated.user_name);
    if let Err(e) = record_activity(
        store,
        clock,
        &updated.company_id,
        user_id,
        ActivityKind::CheckIn,
        message,
    )
    .await
    {
        warn!(user_id, error = %e, "failed to record check-in activity");
    }

    // 4) Streak-gated achievements
    let unlocked = if update.change != StreakChange::Unchanged {
        achievements::check(store, clock, projection, user_id).await?
    } else {
        Vec::new()
    };

    info!(user_id, streak = update.streak, "checked in");
    let user = projection
        .users
        .get(user_id)
        .cloned()
        .unwrap_or(updated);
    Ok(CheckInOutcome {
        user,
        streak: update,
        tier: streak::tier(update.streak),
        unlocked,
    })
}

pub async fn check_out(
    store: &dyn DataStore,
    clock: &dyn Clock,
    projection: &mut Projection,
    user_id: &str,
) -> Result<CheckOutOutcome> {
    let user = projection
        .users
        .get(user_id)
        .ok_or_else(|| EngineError::not_found("user", user_id))?
        .clone();
    if user.shift_status != ShiftStatus::Active {
        return Err(EngineError::NotActive);
    }
    let now = clock.now();
    let duration_secs = user
        .last_check_in
        .map(|start| time::elapsed_secs(start, now))
        .unwrap_or(0);

    let prior = user.clone();
    let mut updated = user;
    updated.shift_status = ShiftStatus::Offline;
    updated.last_check_out = Some(now);
    projection.apply_user(updated.clone());
    if let Err(e) = store.put_user(&updated).await {
        projection.apply_user(prior);
        return Err(e);
    }
    projection.mark_pending(Table::Users, user_id, &updated);

    if let Err(e) = store.close_attendance(user_id, now, duration_secs).await {
        warn!(user_id, error = %e, "failed to close attendance record");
    }
    let message = format!(
        "{} checked out after {}",
        updated.user_name,
        time::format_elapsed(duration_secs)
    );
    if let Err(e) = record_activity(
        store,
        clock,
        &updated.company_id,
        user_id,
        ActivityKind::CheckOut,
        message,
    )
    .await
    {
        warn!(user_id, error = %e, "failed to record check-out activity");
    }

    info!(user_id, duration_secs, "checked out");
    Ok(CheckOutOutcome {
        user: updated,
        shift_duration_secs: duration_secs,
    })
}
