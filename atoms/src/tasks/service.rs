use super::model::{CreateTaskPayload, Task, TaskStatus, UpdateTaskPayload};
use crate::store::DataStore;
use crate::time::Clock;
use crate::{EngineError, Result};

/// Create a new pending task. The reward is fixed here: either the
/// explicit override or the priority default.
pub async fn create_task(
    store: &dyn DataStore,
    clock: &dyn Clock,
    company_id: &str,
    created_by: &str,
    payload: CreateTaskPayload,
) -> Result<Task> {
    let task = Task {
        task_id: uuid::Uuid::new_v4().to_string(),
        company_id: company_id.to_string(),
        title: payload.title,
        assigned_to: payload.assigned_to,
        created_by: created_by.to_string(),
        status: TaskStatus::Pending,
        priority: payload.priority,
        experience_reward: payload
            .experience_reward
            .unwrap_or_else(|| payload.priority.default_reward()),
        started_at: None,
        completed_at: None,
        photo_proof: None,
        duration_secs: None,
        created_at: clock.now(),
    };
    store.put_task(&task).await?;
    Ok(task)
}

pub async fn get_task(store: &dyn DataStore, task_id: &str) -> Result<Task> {
    store
        .get_task(task_id)
        .await?
        .ok_or_else(|| EngineError::not_found("task", task_id))
}

/// Apply an administrative field update.
///
/// A priority change alone does not touch `experience_reward`; the
/// reward only moves when the payload carries it explicitly.
pub async fn update_task(
    store: &dyn DataStore,
    task_id: &str,
    payload: UpdateTaskPayload,
) -> Result<Task> {
    let mut task = get_task(store, task_id).await?;
    if let Some(title) = payload.title {
        task.title = title;
    }
    if let Some(assignee) = payload.assigned_to {
        task.assigned_to = assignee;
    }
    if let Some(priority) = payload.priority {
        task.priority = priority;
    }
    if let Some(reward) = payload.experience_reward {
        task.experience_reward = reward;
    }
    store.put_task(&task).await?;
    Ok(task)
}

pub async fn delete_task(store: &dyn DataStore, task_id: &str) -> Result<()> {
    // Existence check first so a bad id surfaces as NotFound, not a
    // silent no-op delete
    get_task(store, task_id).await?;
    store.delete_task(task_id).await
}
