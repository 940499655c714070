//! Task lifecycle state machine.
//!
//! Owns the pending -> in_progress -> done transitions, gates starting
//! on shift attendance, and fires the completion side effects
//! (experience award, achievement check, creator notification).

use serde::Serialize;
use tracing::{info, warn};

use brigade_atoms::feed::model::{ActivityKind, NotificationKind};
use brigade_atoms::feed::service::{notify, record_activity};
use brigade_atoms::progression;
use brigade_atoms::store::{DataStore, Table, TransitionOutcome};
use brigade_atoms::tasks::model::TaskStatus;
use brigade_atoms::tasks::service as task_service;
use brigade_atoms::time::{self, Clock};
use brigade_atoms::users::model::ShiftStatus;
use brigade_atoms::{EngineError, Result};
use brigade_shared::types::{CreateTaskPayload, Task, UpdateTaskPayload, User};

use crate::achievements::{self, Unlocked};
use crate::config::EngineConfig;
use crate::state::Projection;

/// Why a start request is denied. Machine-readable so the UI can
/// pre-disable controls with the right hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    TaskNotFound,
    UserNotFound,
    NotOnShift,
    AlreadyDone,
    AlreadyStarted,
    InProgressElsewhere,
}

impl DenyReason {
    pub fn message(self) -> &'static str {
        match self {
            DenyReason::TaskNotFound => "task not found",
            DenyReason::UserNotFound => "user not found",
            DenyReason::NotOnShift => "must be on shift to start tasks",
            DenyReason::AlreadyDone => "task already completed",
            DenyReason::AlreadyStarted => "task already started",
            DenyReason::InProgressElsewhere => "task already in progress",
        }
    }
}

/// Outcome of the pure start-gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDecision {
    Allowed,
    Denied(DenyReason),
}

impl StartDecision {
    pub fn allowed(self) -> bool {
        matches!(self, StartDecision::Allowed)
    }
}

/// Read-only gate check; the UI calls this to pre-disable the start
/// button. `start` re-validates before mutating.
pub fn can_start(projection: &Projection, task_id: &str, user_id: &str) -> StartDecision {
    let Some(task) = projection.tasks.get(task_id) else {
        return StartDecision::Denied(DenyReason::TaskNotFound);
    };
    let Some(user) = projection.users.get(user_id) else {
        return StartDecision::Denied(DenyReason::UserNotFound);
    };
    if user.shift_status != ShiftStatus::Active {
        return StartDecision::Denied(DenyReason::NotOnShift);
    }
    match task.status {
        TaskStatus::Done => StartDecision::Denied(DenyReason::AlreadyDone),
        TaskStatus::InProgress if task.assigned_to != user_id => {
            StartDecision::Denied(DenyReason::InProgressElsewhere)
        }
        TaskStatus::InProgress => StartDecision::Denied(DenyReason::AlreadyStarted),
        TaskStatus::Pending => StartDecision::Allowed,
    }
}

/// Start a pending task. Claims the task for the starting user.
pub async fn start(
    store: &dyn DataStore,
    clock: &dyn Clock,
    projection: &mut Projection,
    task_id: &str,
    user_id: &str,
) -> Result<Task> {
    if let StartDecision::Denied(reason) = can_start(projection, task_id, user_id) {
        return Err(EngineError::precondition(reason.message()));
    }
    let prior = projection
        .tasks
        .get(task_id)
        .cloned()
        .ok_or_else(|| EngineError::not_found("task", task_id))?;
    let mut started = prior.clone();
    started.status = TaskStatus::InProgress;
    started.started_at = Some(clock.now());
    started.assigned_to = user_id.to_string();

    // Optimistic apply; the conditional write is the atomic
    // check-and-set that decides a race
    projection.apply_task(started.clone());
    match store.transition_task(&started, TaskStatus::Pending).await {
        Ok(TransitionOutcome::Applied) => {
            projection.mark_pending(Table::Tasks, task_id, &started);
            info!(task_id, user_id, "task started");
            Ok(started)
        }
        Ok(TransitionOutcome::Conflict(actual)) => {
            projection.apply_task(prior);
            let reason = match actual {
                TaskStatus::Done => DenyReason::AlreadyDone,
                _ => DenyReason::InProgressElsewhere,
            };
            Err(EngineError::precondition(reason.message()))
        }
        Err(e) => {
            projection.apply_task(prior);
            Err(e)
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub task: Task,
    /// User row after the award and any achievement rewards.
    pub user: User,
    /// Experience actually persisted for this completion.
    pub awarded_experience: u32,
    pub levels_crossed: Vec<u32>,
    pub unlocked: Vec<Unlocked>,
}

/// Complete an in-progress task.
///
/// Awards `reward + speed bonus (under the threshold) + photo bonus
/// (when a proof is attached)`. A missing `elapsed_secs` falls back to
/// the stored start timestamp, and to 0 when that is missing too.
pub async fn complete(
    store: &dyn DataStore,
    clock: &dyn Clock,
    config: &EngineConfig,
    projection: &mut Projection,
    task_id: &str,
    user_id: &str,
    photo_proof: Option<String>,
    elapsed_secs: Option<u32>,
) -> Result<CompletionOutcome> {
    let task = projection
        .tasks
        .get(task_id)
        .ok_or_else(|| EngineError::not_found("task", task_id))?
        .clone();
    if !projection.users.contains_key(user_id) {
        return Err(EngineError::not_found("user", user_id));
    }
    if task.status != TaskStatus::InProgress {
        return Err(EngineError::precondition("task is not in progress"));
    }
    if task.assigned_to != user_id {
        return Err(EngineError::precondition("task assigned to another user"));
    }

    let now = clock.now();
    let elapsed = elapsed_secs
        .or_else(|| task.started_at.map(|start| time::elapsed_secs(start, now)))
        .unwrap_or(0);

    let prior = task.clone();
    let mut done = task;
    done.status = TaskStatus::Done;
    done.completed_at = Some(now);
    done.photo_proof = photo_proof.clone();
    done.duration_secs = Some(elapsed);

    projection.apply_task(done.clone());
    match store.transition_task(&done, TaskStatus::InProgress).await {
        Ok(TransitionOutcome::Applied) => {
            projection.mark_pending(Table::Tasks, task_id, &done);
        }
        Ok(TransitionOutcome::Conflict(_)) => {
            projection.apply_task(prior);
            return Err(EngineError::precondition("task is not in progress"));
        }
        Err(e) => {
            projection.apply_task(prior);
            return Err(e);
        }
    }

    // Reward: base + bonuses
    let mut total = done.experience_reward;
    if elapsed < config.speed_bonus_threshold_secs {
        total += config.speed_bonus;
    }
    if photo_proof.is_some() {
        total += config.photo_bonus;
    }

    // The task row is committed at this point. A failed reward write is
    // logged and skipped, not rolled into a completion failure the UI
    // would retry against a task that is already done.
    let (awarded, levels_crossed) =
        match progression::add_experience(store, clock, user_id, total, "task completed").await {
            Ok(award) => {
                projection.mark_pending(Table::Users, user_id, &award.user);
                projection.apply_user(award.user);
                (total, award.levels_crossed)
            }
            Err(e) => {
                warn!(task_id, user_id, error = %e, "experience award write failed");
                (0, Vec::new())
            }
        };

    let unlocked = achievements::check(store, clock, projection, user_id).await?;

    let completer = projection
        .users
        .get(user_id)
        .cloned()
        .ok_or_else(|| EngineError::not_found("user", user_id))?;
    let message = format!("{} completed \"{}\"", completer.user_name, done.title);
    if let Err(e) = record_activity(
        store,
        clock,
        &done.company_id,
        user_id,
        ActivityKind::TaskCompleted,
        message.clone(),
    )
    .await
    {
        warn!(task_id, error = %e, "failed to record completion activity");
    }
    if done.created_by != user_id {
        if let Err(e) = notify(
            store,
            clock,
            &done.created_by,
            NotificationKind::TaskCompleted,
            message,
        )
        .await
        {
            warn!(task_id, error = %e, "failed to notify task creator");
        }
    }

    info!(task_id, user_id, awarded, elapsed, "task completed");
    Ok(CompletionOutcome {
        task: done,
        user: completer,
        awarded_experience: awarded,
        levels_crossed,
        unlocked,
    })
}

/// Create a task (managers/owners only) and notify the assignee.
pub async fn create(
    store: &dyn DataStore,
    clock: &dyn Clock,
    projection: &mut Projection,
    actor_id: &str,
    payload: CreateTaskPayload,
) -> Result<Task> {
    let actor = projection.require_admin(actor_id)?;
    let task =
        task_service::create_task(store, clock, &projection.company_id, actor_id, payload).await?;
    projection.mark_pending(Table::Tasks, &task.task_id, &task);
    projection.apply_task(task.clone());

    if task.assigned_to != actor_id {
        let message = format!("{} assigned you \"{}\"", actor.user_name, task.title);
        if let Err(e) = notify(
            store,
            clock,
            &task.assigned_to,
            NotificationKind::TaskAssigned,
            message,
        )
        .await
        {
            warn!(task_id = %task.task_id, error = %e, "failed to notify assignee");
        }
    }
    Ok(task)
}

/// Administrative field update (managers/owners only).
pub async fn update(
    store: &dyn DataStore,
    projection: &mut Projection,
    actor_id: &str,
    task_id: &str,
    payload: UpdateTaskPayload,
) -> Result<Task> {
    projection.require_admin(actor_id)?;
    if !projection.tasks.contains_key(task_id) {
        return Err(EngineError::not_found("task", task_id));
    }
    let task = task_service::update_task(store, task_id, payload).await?;
    projection.mark_pending(Table::Tasks, task_id, &task);
    projection.apply_task(task.clone());
    Ok(task)
}

/// Remove a task (managers/owners only).
pub async fn remove(
    store: &dyn DataStore,
    projection: &mut Projection,
    actor_id: &str,
    task_id: &str,
) -> Result<()> {
    projection.require_admin(actor_id)?;
    if !projection.tasks.contains_key(task_id) {
        return Err(EngineError::not_found("task", task_id));
    }
    task_service::delete_task(store, task_id).await?;
    projection.remove_task(task_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use brigade_atoms::tasks::model::Priority;
    use brigade_shared::types::Role;
    use chrono::{TimeZone, Utc};

    fn user(id: &str, status: ShiftStatus) -> User {
        User {
            user_id: id.to_string(),
            user_name: "Sam".to_string(),
            company_id: "c1".to_string(),
            role: Role::Employee,
            experience: 0,
            level: 0,
            streak: 0,
            shift_status: status,
            last_check_in: None,
            last_check_out: None,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        }
    }

    fn task(id: &str, status: TaskStatus, assigned_to: &str) -> Task {
        Task {
            task_id: id.to_string(),
            company_id: "c1".to_string(),
            title: "Polish glassware".to_string(),
            assigned_to: assigned_to.to_string(),
            created_by: "m1".to_string(),
            status,
            priority: Priority::Low,
            experience_reward: 20,
            started_at: None,
            completed_at: None,
            photo_proof: None,
            duration_secs: None,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        }
    }

    fn projection_with(users: Vec<User>, tasks: Vec<Task>) -> Projection {
        let mut projection = Projection::new("c1");
        for u in users {
            projection.apply_user(u);
        }
        for t in tasks {
            projection.apply_task(t);
        }
        projection
    }

    #[test]
    fn denies_unknown_task_then_unknown_user() {
        let projection = projection_with(vec![user("u1", ShiftStatus::Active)], vec![]);
        assert_eq!(
            can_start(&projection, "missing", "u1"),
            StartDecision::Denied(DenyReason::TaskNotFound)
        );

        let projection =
            projection_with(vec![], vec![task("t1", TaskStatus::Pending, "u1")]);
        assert_eq!(
            can_start(&projection, "t1", "ghost"),
            StartDecision::Denied(DenyReason::UserNotFound)
        );
    }

    #[test]
    fn denies_off_shift_regardless_of_task_state() {
        let projection = projection_with(
            vec![user("u1", ShiftStatus::Offline)],
            vec![task("t1", TaskStatus::Pending, "u1")],
        );
        assert_eq!(
            can_start(&projection, "t1", "u1"),
            StartDecision::Denied(DenyReason::NotOnShift)
        );
    }

    #[test]
    fn denies_done_and_foreign_in_progress() {
        let projection = projection_with(
            vec![user("u1", ShiftStatus::Active)],
            vec![
                task("t1", TaskStatus::Done, "u1"),
                task("t2", TaskStatus::InProgress, "other"),
                task("t3", TaskStatus::InProgress, "u1"),
            ],
        );
        assert_eq!(
            can_start(&projection, "t1", "u1"),
            StartDecision::Denied(DenyReason::AlreadyDone)
        );
        assert_eq!(
            can_start(&projection, "t2", "u1"),
            StartDecision::Denied(DenyReason::InProgressElsewhere)
        );
        assert_eq!(
            can_start(&projection, "t3", "u1"),
            StartDecision::Denied(DenyReason::AlreadyStarted)
        );
    }

    #[test]
    fn allows_pending_task_on_shift() {
        let projection = projection_with(
            vec![user("u1", ShiftStatus::Active)],
            vec![task("t1", TaskStatus::Pending, "someone-else")],
        );
        assert!(can_start(&projection, "t1", "u1").allowed());
    }
}
