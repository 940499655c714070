//! The serialized engine actor.
//!
//! One spawned task owns the projection. User commands and realtime feed
//! events both arrive at its `select!` loop and are handled one at a
//! time, so every read-modify-write (including the `can_start` check
//! inside `start`) is atomic with respect to the in-memory state - two
//! rapid taps on the same task cannot both pass the gate. The backend
//! conditional transition backs that up across processes.
//!
//! [`LifecycleEngine`] is the cloneable handle the UI layer talks to;
//! dropping every handle stops the actor.

use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use brigade_atoms::shifts::model::{CreateShiftPayload, GeoPoint, Shift};
use brigade_atoms::shifts::service as shift_service;
use brigade_atoms::store::{
    ChangeEvent, ChangeKind, DataStore, ObjectStore, Table,
};
use brigade_atoms::media::model::PhotoProof;
use brigade_atoms::media::service as media_service;
use brigade_atoms::time::Clock;
use brigade_atoms::{EngineError, Result};
use brigade_shared::realtime::PushMessage;
use brigade_shared::types::{
    Activity, CreateTaskPayload, Notification, Task, TaskStatus, UpdateTaskPayload,
};

use crate::attendance::{self, CheckInOutcome, CheckOutOutcome};
use crate::config::EngineConfig;
use crate::reconcile::{self, TaskMerge, UserMerge};
use crate::state::{Projection, UserProfile};
use crate::tasks::{self, CompletionOutcome, StartDecision};

type Reply<T> = oneshot::Sender<Result<T>>;

enum Command {
    CheckIn {
        user_id: String,
        location: Option<GeoPoint>,
        reply: Reply<CheckInOutcome>,
    },
    CheckOut {
        user_id: String,
        reply: Reply<CheckOutOutcome>,
    },
    CanStart {
        task_id: String,
        user_id: String,
        reply: Reply<StartDecision>,
    },
    StartTask {
        task_id: String,
        user_id: String,
        reply: Reply<Task>,
    },
    CompleteTask {
        task_id: String,
        user_id: String,
        photo_proof: Option<String>,
        elapsed_secs: Option<u32>,
        reply: Reply<CompletionOutcome>,
    },
    CreateTask {
        actor_id: String,
        payload: CreateTaskPayload,
        reply: Reply<Task>,
    },
    UpdateTask {
        actor_id: String,
        task_id: String,
        payload: UpdateTaskPayload,
        reply: Reply<Task>,
    },
    DeleteTask {
        actor_id: String,
        task_id: String,
        reply: Reply<()>,
    },
    MarkNotificationRead {
        notification_id: String,
        reply: Reply<()>,
    },
    CreateShift {
        actor_id: String,
        payload: CreateShiftPayload,
        reply: Reply<Shift>,
    },
    DeleteShift {
        actor_id: String,
        shift_id: String,
        reply: Reply<()>,
    },
    ShiftsForCompany {
        date: Option<NaiveDate>,
        reply: Reply<Vec<Shift>>,
    },
    TasksForCompany {
        reply: Reply<Vec<Task>>,
    },
    TasksForUser {
        user_id: String,
        status: Option<TaskStatus>,
        reply: Reply<Vec<Task>>,
    },
    Profile {
        user_id: String,
        reply: Reply<UserProfile>,
    },
    NotificationsForUser {
        user_id: String,
        reply: Reply<Vec<Notification>>,
    },
    UnreadCount {
        user_id: String,
        reply: Reply<u32>,
    },
    Activities {
        reply: Reply<Vec<Activity>>,
    },
    ShiftDuration {
        user_id: String,
        reply: Reply<u32>,
    },
}

struct Engine {
    store: Arc<dyn DataStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    projection: Projection,
    ui: broadcast::Sender<PushMessage>,
}

impl Engine {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut feed: broadcast::Receiver<ChangeEvent>,
    ) {
        let mut feed_open = true;
        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => break,
                },
                event = feed.recv(), if feed_open => match event {
                    Ok(event) => self.handle_push(event),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "change feed lagged; waiting for fresh echoes");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("change feed closed");
                        feed_open = false;
                    }
                },
            }
        }
        debug!("engine actor stopped");
    }

    async fn handle_command(&mut self, cmd: Command) {
        let store = self.store.as_ref();
        let clock = self.clock.as_ref();
        match cmd {
            Command::CheckIn {
                user_id,
                location,
                reply,
            } => {
                let result =
                    attendance::check_in(store, clock, &mut self.projection, &user_id, location)
                        .await;
                let _ = reply.send(result);
            }
            Command::CheckOut { user_id, reply } => {
                let result =
                    attendance::check_out(store, clock, &mut self.projection, &user_id).await;
                let _ = reply.send(result);
            }
            Command::CanStart {
                task_id,
                user_id,
                reply,
            } => {
                let _ = reply.send(Ok(tasks::can_start(&self.projection, &task_id, &user_id)));
            }
            Command::StartTask {
                task_id,
                user_id,
                reply,
            } => {
                let result =
                    tasks::start(store, clock, &mut self.projection, &task_id, &user_id).await;
                let _ = reply.send(result);
            }
            Command::CompleteTask {
                task_id,
                user_id,
                photo_proof,
                elapsed_secs,
                reply,
            } => {
                let result = tasks::complete(
                    store,
                    clock,
                    &self.config,
                    &mut self.projection,
                    &task_id,
                    &user_id,
                    photo_proof,
                    elapsed_secs,
                )
                .await;
                let _ = reply.send(result);
            }
            Command::CreateTask {
                actor_id,
                payload,
                reply,
            } => {
                let result =
                    tasks::create(store, clock, &mut self.projection, &actor_id, payload).await;
                let _ = reply.send(result);
            }
            Command::UpdateTask {
                actor_id,
                task_id,
                payload,
                reply,
            } => {
                let result =
                    tasks::update(store, &mut self.projection, &actor_id, &task_id, payload).await;
                let _ = reply.send(result);
            }
            Command::DeleteTask {
                actor_id,
                task_id,
                reply,
            } => {
                let result = tasks::remove(store, &mut self.projection, &actor_id, &task_id).await;
                let _ = reply.send(result);
            }
            Command::MarkNotificationRead {
                notification_id,
                reply,
            } => {
                let result = self.mark_notification_read(&notification_id).await;
                let _ = reply.send(result);
            }
            Command::CreateShift {
                actor_id,
                payload,
                reply,
            } => {
                let result = match self.projection.require_admin(&actor_id) {
                    Ok(_) => {
                        shift_service::create_shift(
                            store,
                            clock,
                            &self.projection.company_id,
                            payload,
                        )
                        .await
                    }
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }
            Command::DeleteShift {
                actor_id,
                shift_id,
                reply,
            } => {
                let result = match self.projection.require_admin(&actor_id) {
                    Ok(_) => {
                        shift_service::delete_shift(store, &self.projection.company_id, &shift_id)
                            .await
                    }
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }
            Command::ShiftsForCompany { date, reply } => {
                let company_id = self.projection.company_id.clone();
                let result = match date {
                    Some(date) => shift_service::shifts_on(store, &company_id, date).await,
                    None => shift_service::shifts_for_company(store, &company_id).await,
                };
                let _ = reply.send(result);
            }
            Command::TasksForCompany { reply } => {
                let _ = reply.send(Ok(self.projection.tasks_for_company()));
            }
            Command::TasksForUser {
                user_id,
                status,
                reply,
            } => {
                let _ = reply.send(Ok(self.projection.tasks_for_user(&user_id, status)));
            }
            Command::Profile { user_id, reply } => {
                let _ = reply.send(self.projection.profile(&user_id, self.clock.now()));
            }
            Command::NotificationsForUser { user_id, reply } => {
                let _ = reply.send(Ok(self.projection.notifications_for_user(&user_id)));
            }
            Command::UnreadCount { user_id, reply } => {
                let _ = reply.send(Ok(self.projection.unread_count(&user_id)));
            }
            Command::Activities { reply } => {
                let _ = reply.send(Ok(self.projection.activities()));
            }
            Command::ShiftDuration { user_id, reply } => {
                let _ = reply.send(Ok(self
                    .projection
                    .shift_duration_secs(&user_id, self.clock.now())));
            }
        }
    }

    async fn mark_notification_read(&mut self, notification_id: &str) -> Result<()> {
        let notification = self
            .projection
            .notifications
            .get(notification_id)
            .ok_or_else(|| EngineError::not_found("notification", notification_id))?
            .clone();
        let mut updated = notification.clone();
        updated.read = true;
        self.projection.apply_notification(updated.clone());
        if let Err(e) = self.store.mark_notification_read(notification_id).await {
            self.projection.apply_notification(notification);
            return Err(e);
        }
        self.projection
            .mark_pending(Table::Notifications, notification_id, &updated);
        Ok(())
    }

    /// Merge one feed event into the projection.
    fn handle_push(&mut self, event: ChangeEvent) {
        if let Some(company_id) = &event.company_id {
            if company_id != &self.projection.company_id {
                return;
            }
        }
        match event.table {
            Table::Tasks => {
                if event.kind == ChangeKind::Delete {
                    self.projection.remove_task(&event.entity_id);
                } else {
                    let incoming = match reconcile::task_from_row(&event.row) {
                        Ok(task) => task,
                        Err(e) => {
                            warn!(entity_id = %event.entity_id, error = %e, "unusable task push");
                            return;
                        }
                    };
                    let merge = reconcile::merge_task(
                        self.projection.tasks.get(&event.entity_id),
                        self.projection.pending_row(Table::Tasks, &event.entity_id),
                        incoming,
                    );
                    match merge {
                        TaskMerge::Confirmed(task) => {
                            debug!(task_id = %task.task_id, "pending task write confirmed");
                            self.projection.clear_pending(Table::Tasks, &event.entity_id);
                            self.projection.apply_task(task);
                        }
                        TaskMerge::Replaced(task) => {
                            self.projection.clear_pending(Table::Tasks, &event.entity_id);
                            self.projection.apply_task(task);
                        }
                        TaskMerge::IgnoredStale => {
                            debug!(entity_id = %event.entity_id, "dropped stale task echo");
                            return;
                        }
                    }
                }
            }
            Table::Users => {
                let incoming = match reconcile::user_from_row(&event.row) {
                    Ok(user) => user,
                    Err(e) => {
                        warn!(entity_id = %event.entity_id, error = %e, "unusable user push");
                        return;
                    }
                };
                let merge = reconcile::merge_user(
                    self.projection.users.get(&event.entity_id),
                    self.projection.pending_row(Table::Users, &event.entity_id),
                    incoming,
                );
                match merge {
                    UserMerge::Confirmed(user) => {
                        debug!(user_id = %user.user_id, "pending user write confirmed");
                        self.projection.clear_pending(Table::Users, &event.entity_id);
                        self.projection.apply_user(user);
                    }
                    UserMerge::Replaced(user) => {
                        self.projection.clear_pending(Table::Users, &event.entity_id);
                        self.projection.apply_user(user);
                    }
                }
            }
            Table::Notifications => {
                let incoming = match reconcile::notification_from_row(&event.row) {
                    Ok(notification) => notification,
                    Err(e) => {
                        warn!(entity_id = %event.entity_id, error = %e, "unusable notification push");
                        return;
                    }
                };
                // Only recipients this projection tracks matter here
                if self.projection.users.contains_key(&incoming.recipient_id) {
                    self.projection
                        .clear_pending(Table::Notifications, &event.entity_id);
                    self.projection.apply_notification(incoming);
                } else {
                    return;
                }
            }
            Table::Activities => {
                let incoming = match reconcile::activity_from_row(&event.row) {
                    Ok(activity) => activity,
                    Err(e) => {
                        warn!(entity_id = %event.entity_id, error = %e, "unusable activity push");
                        return;
                    }
                };
                self.projection.apply_activity(incoming);
            }
            // Schedule and unlock rows are queried from the store on
            // demand, not cached here
            Table::Shifts | Table::UserAchievements => return,
        }
        let _ = self.ui.send(PushMessage::from_change(&event));
    }
}

/// Cloneable handle to the engine actor.
#[derive(Clone)]
pub struct LifecycleEngine {
    commands: mpsc::Sender<Command>,
    ui: broadcast::Sender<PushMessage>,
    objects: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
}

impl LifecycleEngine {
    /// Hydrate the projection for one company and spawn the actor.
    pub async fn spawn(
        store: Arc<dyn DataStore>,
        objects: Arc<dyn ObjectStore>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
        company_id: &str,
    ) -> Result<Self> {
        // Subscribe before the snapshot reads so nothing written in
        // between is lost; replayed echoes merge idempotently
        let feed = store.subscribe();

        let mut projection = Projection::new(company_id);
        for user in store.users_for_company(company_id).await? {
            for notification in store.notifications_for_user(&user.user_id).await? {
                projection.apply_notification(notification);
            }
            projection.apply_user(user);
        }
        for task in store.tasks_for_company(company_id).await? {
            projection.apply_task(task);
        }
        for activity in store.activities_for_company(company_id).await? {
            projection.apply_activity(activity);
        }
        info!(
            company_id,
            users = projection.users.len(),
            tasks = projection.tasks.len(),
            "engine hydrated"
        );

        let (commands, command_rx) = mpsc::channel(config.command_capacity);
        let (ui, _) = broadcast::channel(config.ui_capacity);
        let engine = Engine {
            store,
            clock: Arc::clone(&clock),
            config,
            projection,
            ui: ui.clone(),
        };
        tokio::spawn(engine.run(command_rx, feed));

        Ok(Self {
            commands,
            ui,
            objects,
            clock,
        })
    }

    /// Frames describing every applied projection change, for the UI's
    /// realtime layer.
    pub fn subscribe_ui(&self) -> broadcast::Receiver<PushMessage> {
        self.ui.subscribe()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| EngineError::persistence("engine stopped"))?;
        rx.await
            .map_err(|_| EngineError::persistence("engine stopped"))?
    }

    // ---- commands ----

    pub async fn check_in(
        &self,
        user_id: &str,
        location: Option<GeoPoint>,
    ) -> Result<CheckInOutcome> {
        let user_id = user_id.to_string();
        self.request(|reply| Command::CheckIn {
            user_id,
            location,
            reply,
        })
        .await
    }

    pub async fn check_out(&self, user_id: &str) -> Result<CheckOutOutcome> {
        let user_id = user_id.to_string();
        self.request(|reply| Command::CheckOut { user_id, reply }).await
    }

    pub async fn can_start(&self, task_id: &str, user_id: &str) -> Result<StartDecision> {
        let (task_id, user_id) = (task_id.to_string(), user_id.to_string());
        self.request(|reply| Command::CanStart {
            task_id,
            user_id,
            reply,
        })
        .await
    }

    pub async fn start_task(&self, task_id: &str, user_id: &str) -> Result<Task> {
        let (task_id, user_id) = (task_id.to_string(), user_id.to_string());
        self.request(|reply| Command::StartTask {
            task_id,
            user_id,
            reply,
        })
        .await
    }

    pub async fn complete_task(
        &self,
        task_id: &str,
        user_id: &str,
        photo_proof: Option<String>,
        elapsed_secs: Option<u32>,
    ) -> Result<CompletionOutcome> {
        let (task_id, user_id) = (task_id.to_string(), user_id.to_string());
        self.request(|reply| Command::CompleteTask {
            task_id,
            user_id,
            photo_proof,
            elapsed_secs,
            reply,
        })
        .await
    }

    /// Upload the completion photo and return the reference to pass to
    /// `complete_task`. Pure upload; no engine state involved.
    pub async fn upload_photo_proof(&self, task_id: &str, bytes: Vec<u8>) -> Result<PhotoProof> {
        media_service::upload_photo_proof(self.objects.as_ref(), self.clock.as_ref(), task_id, bytes)
            .await
    }

    pub async fn create_task(&self, actor_id: &str, payload: CreateTaskPayload) -> Result<Task> {
        let actor_id = actor_id.to_string();
        self.request(|reply| Command::CreateTask {
            actor_id,
            payload,
            reply,
        })
        .await
    }

    pub async fn update_task(
        &self,
        actor_id: &str,
        task_id: &str,
        payload: UpdateTaskPayload,
    ) -> Result<Task> {
        let (actor_id, task_id) = (actor_id.to_string(), task_id.to_string());
        self.request(|reply| Command::UpdateTask {
            actor_id,
            task_id,
            payload,
            reply,
        })
        .await
    }

    pub async fn delete_task(&self, actor_id: &str, task_id: &str) -> Result<()> {
        let (actor_id, task_id) = (actor_id.to_string(), task_id.to_string());
        self.request(|reply| Command::DeleteTask {
            actor_id,
            task_id,
            reply,
        })
        .await
    }

    pub async fn mark_notification_read(&self, notification_id: &str) -> Result<()> {
        let notification_id = notification_id.to_string();
        self.request(|reply| Command::MarkNotificationRead {
            notification_id,
            reply,
        })
        .await
    }

    pub async fn create_shift(&self, actor_id: &str, payload: CreateShiftPayload) -> Result<Shift> {
        let actor_id = actor_id.to_string();
        self.request(|reply| Command::CreateShift {
            actor_id,
            payload,
            reply,
        })
        .await
    }

    pub async fn delete_shift(&self, actor_id: &str, shift_id: &str) -> Result<()> {
        let (actor_id, shift_id) = (actor_id.to_string(), shift_id.to_string());
        self.request(|reply| Command::DeleteShift {
            actor_id,
            shift_id,
            reply,
        })
        .await
    }

    // ---- queries ----

    pub async fn shifts(&self, date: Option<NaiveDate>) -> Result<Vec<Shift>> {
        self.request(|reply| Command::ShiftsForCompany { date, reply }).await
    }

    pub async fn tasks_for_company(&self) -> Result<Vec<Task>> {
        self.request(|reply| Command::TasksForCompany { reply }).await
    }

    pub async fn tasks_for_user(
        &self,
        user_id: &str,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>> {
        let user_id = user_id.to_string();
        self.request(|reply| Command::TasksForUser {
            user_id,
            status,
            reply,
        })
        .await
    }

    pub async fn profile(&self, user_id: &str) -> Result<UserProfile> {
        let user_id = user_id.to_string();
        self.request(|reply| Command::Profile { user_id, reply }).await
    }

    pub async fn notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        let user_id = user_id.to_string();
        self.request(|reply| Command::NotificationsForUser { user_id, reply })
            .await
    }

    pub async fn unread_notifications(&self, user_id: &str) -> Result<u32> {
        let user_id = user_id.to_string();
        self.request(|reply| Command::UnreadCount { user_id, reply }).await
    }

    pub async fn activities(&self) -> Result<Vec<Activity>> {
        self.request(|reply| Command::Activities { reply }).await
    }

    /// Seconds the user has been on shift; 0 when off shift. The UI's
    /// once-a-second timer re-asks this rather than counting itself.
    pub async fn current_shift_duration(&self, user_id: &str) -> Result<u32> {
        let user_id = user_id.to_string();
        self.request(|reply| Command::ShiftDuration { user_id, reply }).await
    }
}
