//! In-memory task registry.
//!
//! Owns every [`Task`] created during the process lifetime plus an index of videos that
//! currently have a queued or downloading task. All access goes through one `RwLock`, and
//! readers only ever receive clones.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{DownloadError, Result};
use crate::types::{Task, TaskId, TaskStatus};

#[derive(Default)]
struct RegistryState {
    tasks: HashMap<TaskId, Task>,
    /// bvid -> id of its queued/downloading task
    in_flight: HashMap<String, TaskId>,
}

/// Synchronized store of download tasks
#[derive(Clone, Default)]
pub struct TaskRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl TaskRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new task
    ///
    /// Fails with [`DownloadError::AlreadyScheduled`] if the same video already has a task in
    /// flight. The check and the insert happen under one write lock.
    pub async fn register(&self, task: Task) -> Result<()> {
        let mut state = self.state.write().await;

        if let Some(existing) = state.in_flight.get(&task.bvid) {
            return Err(DownloadError::AlreadyScheduled {
                bvid: task.bvid.clone(),
                task_id: existing.clone(),
            }
            .into());
        }

        if task.status.is_in_flight() {
            state.in_flight.insert(task.bvid.clone(), task.id.clone());
        }
        state.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    /// Snapshot of one task
    pub async fn get(&self, id: &TaskId) -> Option<Task> {
        self.state.read().await.tasks.get(id).cloned()
    }

    /// Snapshot of every task, oldest first
    pub async fn list(&self) -> Vec<Task> {
        let state = self.state.read().await;
        let mut tasks: Vec<Task> = state.tasks.values().cloned().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        tasks
    }

    /// Tasks that are queued or downloading, oldest first
    pub async fn list_active(&self) -> Vec<Task> {
        let mut tasks = self.list().await;
        tasks.retain(|t| t.status.is_in_flight());
        tasks
    }

    /// The downloading task for `bvid`, if any
    ///
    /// Queued tasks are not reported.
    pub async fn active_by_bvid(&self, bvid: &str) -> Option<Task> {
        let state = self.state.read().await;
        let id = state.in_flight.get(bvid)?;
        state
            .tasks
            .get(id)
            .filter(|t| t.status == TaskStatus::Downloading)
            .cloned()
    }

    /// Videos with a queued or downloading task
    pub async fn in_flight_bvids(&self) -> std::collections::HashSet<String> {
        self.state.read().await.in_flight.keys().cloned().collect()
    }

    /// Move a task to `status`
    ///
    /// `progress` is taken as-is when a download starts. `Completed` always records 100 and
    /// `Canceled` never lowers the progress already reached. Failures go through
    /// [`fail`](Self::fail) so every failed task carries a message.
    pub async fn update_status(&self, id: &TaskId, status: TaskStatus, progress: f64) -> Result<()> {
        let mut state = self.state.write().await;
        let task = state
            .tasks
            .get_mut(id)
            .ok_or_else(|| DownloadError::TaskNotFound { id: id.clone() })?;

        if status == TaskStatus::Failed || !task.status.can_transition_to(status) {
            return Err(DownloadError::InvalidTransition {
                id: id.clone(),
                from: task.status,
                to: status,
            }
            .into());
        }

        task.progress = match status {
            TaskStatus::Completed => 100.0,
            TaskStatus::Downloading => clamp_progress(progress),
            _ => task.progress.max(clamp_progress(progress)),
        };
        task.status = status;
        task.updated_at = Utc::now();

        if status.is_terminal() {
            let bvid = task.bvid.clone();
            release(&mut state, &bvid, id);
        }
        Ok(())
    }

    /// Raise the progress of a downloading task
    ///
    /// Values are clamped to 0-100 and never lower the current progress.
    pub async fn update_progress(&self, id: &TaskId, progress: f64) -> Result<()> {
        let mut state = self.state.write().await;
        let task = state
            .tasks
            .get_mut(id)
            .ok_or_else(|| DownloadError::TaskNotFound { id: id.clone() })?;

        if task.status != TaskStatus::Downloading {
            return Err(DownloadError::InvalidTransition {
                id: id.clone(),
                from: task.status,
                to: TaskStatus::Downloading,
            }
            .into());
        }

        let progress = clamp_progress(progress);
        if progress > task.progress {
            task.progress = progress;
        }
        task.updated_at = Utc::now();
        Ok(())
    }

    /// Mark a task `Failed` with `message`, keeping its last progress
    pub async fn fail(&self, id: &TaskId, message: impl Into<String>) -> Result<()> {
        let mut state = self.state.write().await;
        let task = state
            .tasks
            .get_mut(id)
            .ok_or_else(|| DownloadError::TaskNotFound { id: id.clone() })?;

        if !task.status.can_transition_to(TaskStatus::Failed) {
            return Err(DownloadError::InvalidTransition {
                id: id.clone(),
                from: task.status,
                to: TaskStatus::Failed,
            }
            .into());
        }

        task.status = TaskStatus::Failed;
        task.error = Some(message.into());
        task.updated_at = Utc::now();

        let bvid = task.bvid.clone();
        release(&mut state, &bvid, id);
        Ok(())
    }

    /// Drop a task entirely (used when its submission was rejected)
    pub async fn remove(&self, id: &TaskId) -> Option<Task> {
        let mut state = self.state.write().await;
        let task = state.tasks.remove(id)?;
        release(&mut state, &task.bvid, id);
        Some(task)
    }

    /// Number of registered tasks
    pub async fn len(&self) -> usize {
        self.state.read().await.tasks.len()
    }

    /// True when no task was ever registered (or all were removed)
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.tasks.is_empty()
    }
}

fn release(state: &mut RegistryState, bvid: &str, id: &TaskId) {
    if state.in_flight.get(bvid) == Some(id) {
        state.in_flight.remove(bvid);
    }
}

fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 100.0)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn register_and_get_returns_copy() {
        let registry = TaskRegistry::new();
        let task = Task::new("BV1aa", "title", "");
        let id = task.id.clone();
        registry.register(task).await.unwrap();

        let mut copy = registry.get(&id).await.unwrap();
        copy.title = "mutated".to_string();
        copy.status = TaskStatus::Completed;

        let fresh = registry.get(&id).await.unwrap();
        assert_eq!(fresh.title, "title");
        assert_eq!(fresh.status, TaskStatus::Queued);
    }

    #[tokio::test]
    async fn second_in_flight_task_for_same_video_is_rejected() {
        let registry = TaskRegistry::new();
        let first = Task::new("BV1aa", "t", "");
        let first_id = first.id.clone();
        registry.register(first).await.unwrap();

        let err = registry
            .register(Task::new("BV1aa", "t", ""))
            .await
            .unwrap_err();
        match err {
            Error::Download(DownloadError::AlreadyScheduled { task_id, .. }) => {
                assert_eq!(task_id, first_id)
            }
            other => panic!("expected AlreadyScheduled, got {other:?}"),
        }
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn terminal_status_frees_the_video_for_a_new_task() {
        let registry = TaskRegistry::new();
        let task = Task::new("BV1aa", "t", "");
        let id = task.id.clone();
        registry.register(task).await.unwrap();
        registry
            .update_status(&id, TaskStatus::Downloading, 0.0)
            .await
            .unwrap();
        registry.fail(&id, "boom").await.unwrap();

        assert!(registry.in_flight_bvids().await.is_empty());
        registry.register(Task::new("BV1aa", "t", "")).await.unwrap();
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn invalid_transitions_are_rejected() {
        let registry = TaskRegistry::new();
        let task = Task::new("BV1aa", "t", "");
        let id = task.id.clone();
        registry.register(task).await.unwrap();

        assert!(
            registry
                .update_status(&id, TaskStatus::Completed, 100.0)
                .await
                .is_err()
        );
        registry
            .update_status(&id, TaskStatus::Downloading, 0.0)
            .await
            .unwrap();
        registry
            .update_status(&id, TaskStatus::Completed, 100.0)
            .await
            .unwrap();
        assert!(
            registry
                .update_status(&id, TaskStatus::Downloading, 0.0)
                .await
                .is_err()
        );
        assert!(registry.fail(&id, "late").await.is_err());
    }

    #[tokio::test]
    async fn progress_is_clamped_and_monotonic() {
        let registry = TaskRegistry::new();
        let task = Task::new("BV1aa", "t", "");
        let id = task.id.clone();
        registry.register(task).await.unwrap();

        // Not downloading yet
        assert!(registry.update_progress(&id, 10.0).await.is_err());

        registry
            .update_status(&id, TaskStatus::Downloading, 0.0)
            .await
            .unwrap();
        registry.update_progress(&id, 40.0).await.unwrap();
        registry.update_progress(&id, 20.0).await.unwrap();
        assert_eq!(registry.get(&id).await.unwrap().progress, 40.0);

        registry.update_progress(&id, 250.0).await.unwrap();
        assert_eq!(registry.get(&id).await.unwrap().progress, 100.0);
    }

    #[tokio::test]
    async fn restarting_a_download_cannot_lower_progress() {
        let registry = TaskRegistry::new();
        let task = Task::new("BV1aa", "t", "");
        let id = task.id.clone();
        registry.register(task).await.unwrap();
        registry
            .update_status(&id, TaskStatus::Downloading, 0.0)
            .await
            .unwrap();
        registry.update_progress(&id, 50.0).await.unwrap();

        let err = registry
            .update_status(&id, TaskStatus::Downloading, 10.0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Download(DownloadError::InvalidTransition { .. })
        ));
        assert_eq!(registry.get(&id).await.unwrap().progress, 50.0);
    }

    #[tokio::test]
    async fn failure_requires_a_message() {
        let registry = TaskRegistry::new();
        let task = Task::new("BV1aa", "t", "");
        let id = task.id.clone();
        registry.register(task).await.unwrap();
        registry
            .update_status(&id, TaskStatus::Downloading, 0.0)
            .await
            .unwrap();

        assert!(
            registry
                .update_status(&id, TaskStatus::Failed, 10.0)
                .await
                .is_err()
        );
        let task = registry.get(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Downloading);
        assert!(task.error.is_none());
        assert!(registry.in_flight_bvids().await.contains("BV1aa"));
    }

    #[tokio::test]
    async fn completion_always_records_full_progress() {
        let registry = TaskRegistry::new();
        let task = Task::new("BV1aa", "t", "");
        let id = task.id.clone();
        registry.register(task).await.unwrap();
        registry
            .update_status(&id, TaskStatus::Downloading, 0.0)
            .await
            .unwrap();
        registry.update_progress(&id, 62.0).await.unwrap();

        registry
            .update_status(&id, TaskStatus::Completed, 30.0)
            .await
            .unwrap();
        assert_eq!(registry.get(&id).await.unwrap().progress, 100.0);
    }

    #[tokio::test]
    async fn cancellation_keeps_reached_progress() {
        let registry = TaskRegistry::new();
        let task = Task::new("BV1aa", "t", "");
        let id = task.id.clone();
        registry.register(task).await.unwrap();
        registry
            .update_status(&id, TaskStatus::Downloading, 0.0)
            .await
            .unwrap();
        registry.update_progress(&id, 45.0).await.unwrap();

        registry
            .update_status(&id, TaskStatus::Canceled, 0.0)
            .await
            .unwrap();
        let task = registry.get(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Canceled);
        assert_eq!(task.progress, 45.0);
    }

    #[tokio::test]
    async fn fail_keeps_progress_and_sets_message() {
        let registry = TaskRegistry::new();
        let task = Task::new("BV1aa", "t", "");
        let id = task.id.clone();
        registry.register(task).await.unwrap();
        registry
            .update_status(&id, TaskStatus::Downloading, 0.0)
            .await
            .unwrap();
        registry.update_progress(&id, 37.5).await.unwrap();

        registry.fail(&id, "max retry attempts reached (3)").await.unwrap();

        let task = registry.get(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.progress, 37.5);
        assert_eq!(task.error.as_deref(), Some("max retry attempts reached (3)"));
    }

    #[tokio::test]
    async fn active_by_bvid_only_reports_downloading() {
        let registry = TaskRegistry::new();
        let task = Task::new("BV1aa", "t", "");
        let id = task.id.clone();
        registry.register(task).await.unwrap();

        assert!(registry.active_by_bvid("BV1aa").await.is_none());
        registry
            .update_status(&id, TaskStatus::Downloading, 0.0)
            .await
            .unwrap();
        assert_eq!(registry.active_by_bvid("BV1aa").await.unwrap().id, id);
    }

    #[tokio::test]
    async fn list_active_excludes_terminal_tasks() {
        let registry = TaskRegistry::new();
        let done = Task::new("BV1done", "t", "");
        let done_id = done.id.clone();
        registry.register(done).await.unwrap();
        registry
            .update_status(&done_id, TaskStatus::Downloading, 0.0)
            .await
            .unwrap();
        registry
            .update_status(&done_id, TaskStatus::Completed, 100.0)
            .await
            .unwrap();
        registry
            .register(Task::new("BV1queued", "t", ""))
            .await
            .unwrap();

        let active = registry.list_active().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].bvid, "BV1queued");
        assert_eq!(registry.list().await.len(), 2);
    }

    #[tokio::test]
    async fn remove_releases_in_flight_entry() {
        let registry = TaskRegistry::new();
        let task = Task::new("BV1aa", "t", "");
        let id = task.id.clone();
        registry.register(task).await.unwrap();

        assert!(registry.remove(&id).await.is_some());
        assert!(registry.is_empty().await);
        assert!(registry.in_flight_bvids().await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_registrations_keep_every_distinct_video() {
        let registry = TaskRegistry::new();
        let mut handles = Vec::new();
        for i in 0..32 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .register(Task::new(format!("BV1{i}"), "t", ""))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(registry.len().await, 32);
        assert_eq!(registry.in_flight_bvids().await.len(), 32);
    }
}
