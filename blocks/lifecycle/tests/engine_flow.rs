//! Command-path scenarios through the full engine.

mod common;

use common::{eventually, harness, COMPANY};

use brigade_atoms::store::DataStore;
use brigade_atoms::tasks::model::{CreateTaskPayload, Priority, TaskStatus, UpdateTaskPayload};
use brigade_atoms::users::model::{Role, ShiftStatus, User};
use brigade_atoms::EngineError;
use chrono::{TimeZone, Utc};

fn high_priority_task(assigned_to: &str) -> CreateTaskPayload {
    CreateTaskPayload {
        title: "Deep clean the espresso machine".to_string(),
        assigned_to: assigned_to.to_string(),
        priority: Priority::High,
        experience_reward: None,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn end_to_end_first_shift() {
    let h = harness().await;

    // Fresh employee: offline, nothing earned yet
    let profile = h.engine.profile("u1").await.unwrap();
    assert_eq!(profile.experience, 0);
    assert_eq!(profile.streak, 0);
    assert_eq!(profile.shift_status, ShiftStatus::Offline);

    let checked_in = h.engine.check_in("u1", None).await.unwrap();
    assert_eq!(checked_in.streak.streak, 1);
    assert!(!checked_in.tier.on_fire());

    let task = h
        .engine
        .create_task("m1", high_priority_task("u1"))
        .await
        .unwrap();
    assert_eq!(task.experience_reward, 50);
    assert_eq!(task.status, TaskStatus::Pending);

    assert!(h
        .engine
        .can_start(&task.task_id, "u1")
        .await
        .unwrap()
        .allowed());
    let started = h.engine.start_task(&task.task_id, "u1").await.unwrap();
    assert_eq!(started.status, TaskStatus::InProgress);

    h.clock.advance_secs(200);
    let proof = h
        .engine
        .upload_photo_proof(&task.task_id, vec![0xFF, 0xD8, 0xFF])
        .await
        .unwrap();
    assert!(proof.reference.starts_with("mem://proofs/"));
    let done = h
        .engine
        .complete_task(&task.task_id, "u1", Some(proof.reference), None)
        .await
        .unwrap();

    // 50 base + 20 speed (200s < 300s) + 10 photo
    assert_eq!(done.task.status, TaskStatus::Done);
    assert_eq!(done.task.duration_secs, Some(200));
    assert_eq!(done.awarded_experience, 80);
    assert_eq!(done.user.experience, 80);
    assert_eq!(done.user.level, 0);
    assert!(done.levels_crossed.is_empty());
    assert!(done.unlocked.is_empty());
    assert!(h.store.unlocked_achievements("u1").await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn start_requires_active_shift() {
    let h = harness().await;
    let task = h
        .engine
        .create_task("m1", high_priority_task("u1"))
        .await
        .unwrap();

    let decision = h.engine.can_start(&task.task_id, "u1").await.unwrap();
    assert!(!decision.allowed());

    let err = h.engine.start_task(&task.task_id, "u1").await.unwrap_err();
    match err {
        EngineError::PreconditionFailed { reason } => {
            assert_eq!(reason, "must be on shift to start tasks");
        }
        other => panic!("expected precondition failure, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn racing_starts_have_exactly_one_winner() {
    let h = harness().await;
    h.engine.check_in("u1", None).await.unwrap();
    h.engine.check_in("u2", None).await.unwrap();
    let task = h
        .engine
        .create_task("m1", high_priority_task("u1"))
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        h.engine.start_task(&task.task_id, "u1"),
        h.engine.start_task(&task.task_id, "u2"),
    );
    assert_eq!(
        a.is_ok() as u8 + b.is_ok() as u8,
        1,
        "exactly one start may win"
    );
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(
        loser.unwrap_err(),
        EngineError::PreconditionFailed { .. }
    ));

    let winner_id = h.engine.tasks_for_company().await.unwrap()[0]
        .assigned_to
        .clone();
    assert!(winner_id == "u1" || winner_id == "u2");
}

#[tokio::test(flavor = "multi_thread")]
async fn completion_bonus_arithmetic() {
    let h = harness().await;
    h.engine.check_in("u1", None).await.unwrap();

    // Medium task, fast, with photo: 30 + 20 + 10
    let task = h
        .engine
        .create_task(
            "m1",
            CreateTaskPayload {
                title: "Restock napkins".to_string(),
                assigned_to: "u1".to_string(),
                priority: Priority::Medium,
                experience_reward: None,
            },
        )
        .await
        .unwrap();
    h.engine.start_task(&task.task_id, "u1").await.unwrap();
    let done = h
        .engine
        .complete_task(
            &task.task_id,
            "u1",
            Some("mem://proofs/a.jpg".to_string()),
            Some(120),
        )
        .await
        .unwrap();
    assert_eq!(done.awarded_experience, 60);

    // Low task, slow, no photo: base only
    let task = h
        .engine
        .create_task(
            "m1",
            CreateTaskPayload {
                title: "Rotate stock".to_string(),
                assigned_to: "u1".to_string(),
                priority: Priority::Low,
                experience_reward: None,
            },
        )
        .await
        .unwrap();
    h.engine.start_task(&task.task_id, "u1").await.unwrap();
    let done = h
        .engine
        .complete_task(&task.task_id, "u1", None, Some(400))
        .await
        .unwrap();
    assert_eq!(done.awarded_experience, 20);

    let profile = h.engine.profile("u1").await.unwrap();
    assert_eq!(profile.experience, 80);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_start_timestamp_falls_back_to_zero() {
    let h = harness().await;
    h.engine.check_in("u1", None).await.unwrap();
    let task = h
        .engine
        .create_task("m1", high_priority_task("u1"))
        .await
        .unwrap();
    h.engine.start_task(&task.task_id, "u1").await.unwrap();

    // Simulate a row that lost its start timestamp upstream
    let mut broken = h.store.get_task(&task.task_id).await.unwrap().unwrap();
    broken.started_at = None;
    h.store.put_task(&broken).await.unwrap();
    assert!(
        eventually(|| async {
            h.engine
                .tasks_for_company()
                .await
                .unwrap()
                .iter()
                .any(|t| t.task_id == task.task_id && t.started_at.is_none())
        })
        .await
    );

    let done = h
        .engine
        .complete_task(&task.task_id, "u1", None, None)
        .await
        .unwrap();
    assert_eq!(done.task.duration_secs, Some(0));
    // Zero elapsed still lands under the speed threshold
    assert_eq!(done.awarded_experience, 70);
}

#[tokio::test(flavor = "multi_thread")]
async fn streak_follows_calendar_days() {
    let h = harness().await;

    assert_eq!(h.engine.check_in("u1", None).await.unwrap().streak.streak, 1);
    h.engine.check_out("u1").await.unwrap();

    h.clock.advance_days(1);
    assert_eq!(h.engine.check_in("u1", None).await.unwrap().streak.streak, 2);
    h.engine.check_out("u1").await.unwrap();

    // Second check-in on the same calendar day: unchanged
    h.clock.advance_secs(3600);
    assert_eq!(h.engine.check_in("u1", None).await.unwrap().streak.streak, 2);
    h.engine.check_out("u1").await.unwrap();

    // Three days away: back to one
    h.clock.advance_days(3);
    assert_eq!(h.engine.check_in("u1", None).await.unwrap().streak.streak, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn double_check_in_is_rejected() {
    let h = harness().await;
    h.engine.check_in("u1", None).await.unwrap();
    assert!(matches!(
        h.engine.check_in("u1", None).await.unwrap_err(),
        EngineError::AlreadyActive
    ));

    h.engine.check_out("u1").await.unwrap();
    assert!(matches!(
        h.engine.check_out("u1").await.unwrap_err(),
        EngineError::NotActive
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn shift_duration_tracks_the_clock() {
    let h = harness().await;
    assert_eq!(h.engine.current_shift_duration("u1").await.unwrap(), 0);

    h.engine.check_in("u1", None).await.unwrap();
    h.clock.advance_secs(3700);
    assert_eq!(h.engine.current_shift_duration("u1").await.unwrap(), 3700);

    let out = h.engine.check_out("u1").await.unwrap();
    assert_eq!(out.shift_duration_secs, 3700);
    assert_eq!(h.engine.current_shift_duration("u1").await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn week_long_streak_unlocks_first_week_once() {
    let h = harness().await;

    // Six-day streak as of yesterday, written straight to the store
    let yesterday = Utc.with_ymd_and_hms(2024, 4, 30, 9, 0, 0).unwrap();
    let seeded = User {
        user_id: "vet".to_string(),
        user_name: "Noor".to_string(),
        company_id: COMPANY.to_string(),
        role: Role::Employee,
        experience: 0,
        level: 0,
        streak: 6,
        shift_status: ShiftStatus::Offline,
        last_check_in: Some(yesterday),
        last_check_out: Some(yesterday),
        created_at: yesterday,
    };
    h.store.put_user(&seeded).await.unwrap();
    assert!(
        eventually(|| async { h.engine.profile("vet").await.is_ok() }).await,
        "seeded user must reach the projection"
    );

    let checked_in = h.engine.check_in("vet", None).await.unwrap();
    assert_eq!(checked_in.streak.streak, 7);
    assert!(checked_in.tier.blazing());
    assert_eq!(checked_in.unlocked.len(), 1);
    assert_eq!(checked_in.unlocked[0].achievement_id, "first_week");

    let profile = h.engine.profile("vet").await.unwrap();
    assert_eq!(profile.experience, 75);

    // Re-running the check after a same-day re-entry unlocks nothing new
    h.engine.check_out("vet").await.unwrap();
    h.clock.advance_secs(60);
    let again = h.engine.check_in("vet", None).await.unwrap();
    assert!(again.unlocked.is_empty());
    assert_eq!(h.store.unlocked_achievements("vet").await.unwrap().len(), 1);
    assert_eq!(h.engine.profile("vet").await.unwrap().experience, 75);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_write_rolls_back_check_in() {
    let h = harness().await;

    h.store.set_fail_writes(true);
    assert!(matches!(
        h.engine.check_in("u1", None).await.unwrap_err(),
        EngineError::PersistenceFailed { .. }
    ));

    let profile = h.engine.profile("u1").await.unwrap();
    assert_eq!(profile.shift_status, ShiftStatus::Offline);
    assert_eq!(profile.streak, 0);

    // Transient: the retry goes through once the store recovers
    h.store.set_fail_writes(false);
    assert!(h.engine.check_in("u1", None).await.is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_transition_rolls_back_start() {
    let h = harness().await;
    h.engine.check_in("u1", None).await.unwrap();
    let task = h
        .engine
        .create_task("m1", high_priority_task("u1"))
        .await
        .unwrap();

    h.store.set_fail_writes(true);
    assert!(matches!(
        h.engine.start_task(&task.task_id, "u1").await.unwrap_err(),
        EngineError::PersistenceFailed { .. }
    ));
    let tasks = h.engine.tasks_for_company().await.unwrap();
    assert_eq!(tasks[0].status, TaskStatus::Pending);
    assert!(tasks[0].started_at.is_none());

    h.store.set_fail_writes(false);
    assert!(h.engine.start_task(&task.task_id, "u1").await.is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn administration_is_role_gated() {
    let h = harness().await;

    assert!(matches!(
        h.engine.create_task("u1", high_priority_task("u2")).await,
        Err(EngineError::PreconditionFailed { .. })
    ));

    let task = h
        .engine
        .create_task(
            "m1",
            CreateTaskPayload {
                title: "Count the till".to_string(),
                assigned_to: "u1".to_string(),
                priority: Priority::Medium,
                experience_reward: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(task.experience_reward, 30);

    // Raising priority later does not retroactively raise the reward
    let updated = h
        .engine
        .update_task(
            "m1",
            &task.task_id,
            UpdateTaskPayload {
                priority: Some(Priority::High),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.priority, Priority::High);
    assert_eq!(updated.experience_reward, 30);

    // Unless the update names the reward explicitly
    let updated = h
        .engine
        .update_task(
            "m1",
            &task.task_id,
            UpdateTaskPayload {
                experience_reward: Some(90),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.experience_reward, 90);

    assert!(matches!(
        h.engine.delete_task("u1", &task.task_id).await,
        Err(EngineError::PreconditionFailed { .. })
    ));
    h.engine.delete_task("m1", &task.task_id).await.unwrap();
    assert!(h.engine.tasks_for_company().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn assignment_notifies_and_mark_read_clears() {
    let h = harness().await;
    h.engine
        .create_task("m1", high_priority_task("u1"))
        .await
        .unwrap();

    assert!(
        eventually(|| async { h.engine.unread_notifications("u1").await.unwrap() == 1 }).await,
        "assignment notification must arrive on the feed"
    );

    let notifications = h.engine.notifications("u1").await.unwrap();
    assert_eq!(notifications.len(), 1);
    h.engine
        .mark_notification_read(&notifications[0].notification_id)
        .await
        .unwrap();
    assert_eq!(h.engine.unread_notifications("u1").await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn schedule_crud_is_manager_gated() {
    let h = harness().await;
    let payload = || brigade_atoms::shifts::model::CreateShiftPayload {
        name: "Friday close".to_string(),
        shift_type: "evening".to_string(),
        date: chrono::NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
        start_time: chrono::NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        end_time: chrono::NaiveTime::from_hms_opt(23, 30, 0).unwrap(),
        assigned_to: "u1".to_string(),
    };

    assert!(matches!(
        h.engine.create_shift("u1", payload()).await,
        Err(EngineError::PreconditionFailed { .. })
    ));

    let shift = h.engine.create_shift("m1", payload()).await.unwrap();
    let listed = h
        .engine
        .shifts(Some(chrono::NaiveDate::from_ymd_opt(2024, 5, 3).unwrap()))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].shift_id, shift.shift_id);
    assert!(h
        .engine
        .shifts(Some(chrono::NaiveDate::from_ymd_opt(2024, 5, 4).unwrap()))
        .await
        .unwrap()
        .is_empty());

    h.engine.delete_shift("m1", &shift.shift_id).await.unwrap();
    assert!(h.engine.shifts(None).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn completion_notifies_the_creator() {
    let h = harness().await;
    h.engine.check_in("u1", None).await.unwrap();
    let task = h
        .engine
        .create_task("m1", high_priority_task("u1"))
        .await
        .unwrap();
    h.engine.start_task(&task.task_id, "u1").await.unwrap();
    h.engine
        .complete_task(&task.task_id, "u1", None, Some(30))
        .await
        .unwrap();

    assert!(
        eventually(|| async {
            h.engine
                .notifications("m1")
                .await
                .unwrap()
                .iter()
                .any(|n| n.message.contains("completed"))
        })
        .await
    );
}
