//! Task state synchronizer.
//!
//! Owns the session's task list and the loading/error flag, and is the only
//! place either is mutated. Every intent becomes a remote-store call plus a
//! local transition:
//!
//! | Operation | Local change                    | When                      |
//! |-----------|---------------------------------|---------------------------|
//! | `refresh` | replace list                    | after the store answers   |
//! | `create`  | append server task              | after the store answers   |
//! | `update`  | replace with server task        | after the store answers   |
//! | `move`    | set status, roll back on error  | before the store answers  |
//! | `delete`  | remove                          | after the store answers   |
//!
//! Each id carries a monotonically increasing request number. A successful
//! response replaces local state only when no newer request for that id is
//! pending or accepted. A rejected request rolls back unless a newer one is
//! accepted or still pending; in the pending case the rollback is deferred,
//! and if that newer request fails too the task returns to the status before
//! the oldest rejected request.
//!
//! Readers take a `snapshot()` or `subscribe()` to a `watch` channel that is
//! published after every mutation.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::client::TaskStore;
use super::models::{ColumnView, DropTarget, Task, TaskDraft, TaskPatch, TaskStatus};
use crate::errors::{StoreError, SyncError};

/// Loading/error flag shown by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SyncStatus {
    #[default]
    Idle,
    Loading,
    Error(String),
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardState {
    pub tasks: Vec<Task>,
    pub status: SyncStatus,
}

impl BoardState {
    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Tasks in one column, in local order.
    pub fn tasks_by_status(&self, status: TaskStatus) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| t.status == status)
            .cloned()
            .collect()
    }

    /// All three columns in board order.
    pub fn columns(&self) -> Vec<ColumnView> {
        TaskStatus::ALL
            .into_iter()
            .map(|status| ColumnView {
                status,
                title: status.title(),
                tasks: self.tasks_by_status(status),
            })
            .collect()
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            SyncStatus::Error(message) => Some(message),
            _ => None,
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Replace the task with the same id, or append when absent.
    fn upsert(&mut self, task: Task) {
        match self.position(&task.id) {
            Some(idx) => self.tasks[idx] = task,
            None => self.tasks.push(task),
        }
    }

    /// Overwrite the task at `id`'s position. Absent ids are left alone.
    fn replace(&mut self, id: &str, task: Task) {
        if let Some(idx) = self.position(id) {
            self.tasks[idx] = task;
        }
    }

    /// Index of `id` within its own column.
    fn column_index(&self, id: &str) -> Option<usize> {
        let task = self.find(id)?;
        self.tasks
            .iter()
            .filter(|t| t.status == task.status)
            .position(|t| t.id == id)
    }
}

/// Request bookkeeping for one task id.
#[derive(Debug, Default)]
struct RequestLog {
    issued: u64,
    /// Requests still waiting on the store.
    pending: BTreeSet<u64>,
    /// Highest request the store accepted.
    applied: u64,
    /// Rejected requests whose rollback waits on a newer pending request,
    /// keyed by request with the status each one started from.
    deferred: BTreeMap<u64, TaskStatus>,
}

impl RequestLog {
    fn begin(&mut self) -> u64 {
        self.issued += 1;
        self.pending.insert(self.issued);
        self.issued
    }

    fn has_newer_pending(&self, request: u64) -> bool {
        self.pending.range(request + 1..).next().is_some()
    }

    /// Settle an accepted request. Returns whether its response may
    /// replace the local task.
    fn accept(&mut self, request: u64) -> bool {
        self.pending.remove(&request);
        let current = self.applied < request && !self.has_newer_pending(request);
        self.applied = self.applied.max(request);
        self.deferred = self.deferred.split_off(&(self.applied + 1));
        current
    }

    /// Settle a rejected request that started from `previous`. Returns the
    /// status to restore, or `None` when a newer request was accepted or may
    /// still be.
    fn reject(&mut self, request: u64, previous: TaskStatus) -> Option<TaskStatus> {
        self.pending.remove(&request);
        if self.applied > request {
            return None;
        }
        if self.has_newer_pending(request) {
            self.deferred.insert(request, previous);
            return None;
        }
        // The latest request before this one that may still hold.
        let live = self
            .pending
            .range(..request)
            .next_back()
            .copied()
            .unwrap_or(0)
            .max(self.applied);
        let restored = self
            .deferred
            .range(live + 1..)
            .next()
            .map_or(previous, |(_, status)| *status);
        self.deferred.retain(|&r, _| r <= live);
        Some(restored)
    }
}

#[derive(Default)]
struct Inner {
    state: BoardState,
    requests: HashMap<String, RequestLog>,
}

impl Inner {
    fn begin_request(&mut self, id: &str) -> u64 {
        self.requests.entry(id.to_string()).or_default().begin()
    }

    /// Replace the local task with the store's copy if `request` is current.
    fn accept(&mut self, id: &str, request: u64, mut task: Task) {
        let current = self
            .requests
            .get_mut(id)
            .is_some_and(|log| log.accept(request));
        if !current {
            debug!(id, request, "discarding stale response");
            return;
        }
        task.id = id.to_string();
        self.state.replace(id, task);
    }

    /// Roll the task's status back after a rejected request, unless a newer
    /// request outranks it.
    fn reject(&mut self, id: &str, request: u64, previous: TaskStatus) {
        let restored = self
            .requests
            .get_mut(id)
            .and_then(|log| log.reject(request, previous));
        let Some(restored) = restored else {
            debug!(id, request, "newer request outstanding, rollback deferred");
            return;
        };
        if let Some(idx) = self.state.position(id) {
            if self.state.tasks[idx].status != restored {
                self.state.tasks[idx].status = restored;
                warn!(id, %restored, "request rejected, status rolled back");
            }
        }
    }

    fn set_error(&mut self, err: &SyncError) {
        if let Some(message) = err.user_message() {
            self.state.status = SyncStatus::Error(message.to_string());
        }
    }
}

pub struct TaskSynchronizer {
    store: Arc<dyn TaskStore>,
    inner: Mutex<Inner>,
    changes: watch::Sender<BoardState>,
}

impl TaskSynchronizer {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        let (changes, _) = watch::channel(BoardState::default());
        Self {
            store,
            inner: Mutex::new(Inner::default()),
            changes,
        }
    }

    // ── Observation ───────────────────────────────────────────────────

    pub fn snapshot(&self) -> BoardState {
        self.lock().state.clone()
    }

    /// Receive a fresh `BoardState` after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<BoardState> {
        self.changes.subscribe()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock().state.tasks.clone()
    }

    pub fn status(&self) -> SyncStatus {
        self.lock().state.status.clone()
    }

    pub fn tasks_by_status(&self, status: TaskStatus) -> Vec<Task> {
        self.lock().state.tasks_by_status(status)
    }

    pub fn board(&self) -> Vec<ColumnView> {
        self.lock().state.columns()
    }

    // ── Operations ────────────────────────────────────────────────────

    /// Load the full list from the store, replacing local tasks.
    /// On failure the previous list is kept.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        self.mutate(|inner| inner.state.status = SyncStatus::Loading);
        debug!("refreshing task list");

        match self.store.list_tasks().await {
            Ok(tasks) => {
                let tasks = dedup_by_id(tasks);
                info!(count = tasks.len(), "task list loaded");
                self.mutate(|inner| {
                    inner.state.tasks = tasks;
                    inner.state.status = SyncStatus::Idle;
                });
                Ok(())
            }
            Err(source) => Err(self.report(SyncError::FetchFailed(source))),
        }
    }

    /// Submit a new task. It appears locally only once the store has
    /// assigned it an id.
    pub async fn create(&self, draft: TaskDraft) -> Result<Task, SyncError> {
        ensure_title(&draft.title)?;
        let task = draft.into_task();

        match self.store.create_task(&task).await {
            Ok(created) if !created.is_persisted() => Err(self.report(SyncError::CreateFailed(
                StoreError::Decode("created task has no id".to_string()),
            ))),
            Ok(created) => {
                info!(id = %created.id, title = %created.title, "task created");
                self.mutate(|inner| inner.state.upsert(created.clone()));
                Ok(created)
            }
            Err(source) => Err(self.report(SyncError::CreateFailed(source))),
        }
    }

    /// Edit an existing task. The local copy is replaced by the store's
    /// response, not by the patched value.
    pub async fn update(&self, id: &str, patch: TaskPatch) -> Result<Task, SyncError> {
        if let Some(title) = &patch.title {
            ensure_title(title)?;
        }
        let (request, previous, payload) = self.try_mutate(|inner| {
            let current = inner.state.find(id).ok_or_else(|| not_found(id))?;
            let previous = current.status;
            let payload = patch.apply_to(current);
            ensure_title(&payload.title)?;
            Ok((inner.begin_request(id), previous, payload))
        })?;

        match self.store.update_task(id, &payload).await {
            Ok(mut updated) => {
                updated.id = id.to_string();
                self.mutate(|inner| inner.accept(id, request, updated.clone()));
                Ok(updated)
            }
            Err(source) => {
                let err = SyncError::UpdateFailed {
                    id: id.to_string(),
                    source,
                };
                warn!(error = %err, "task store call failed");
                self.mutate(|inner| {
                    inner.reject(id, request, previous);
                    inner.set_error(&err);
                });
                Err(err)
            }
        }
    }

    /// Move a task to another column, optimistically.
    ///
    /// The new status is visible to readers before the store is contacted.
    /// If the store rejects the change the previous status is restored.
    /// Moving to the current column is a no-op.
    pub async fn move_task(&self, id: &str, status: TaskStatus) -> Result<(), SyncError> {
        let Some((request, previous, payload)) = self.try_mutate(|inner| {
            let idx = inner.state.position(id).ok_or_else(|| not_found(id))?;
            let previous = inner.state.tasks[idx].status;
            if previous == status {
                return Ok(None);
            }
            let request = inner.begin_request(id);
            inner.state.tasks[idx].status = status;
            Ok(Some((request, previous, inner.state.tasks[idx].clone())))
        })?
        else {
            return Ok(());
        };
        debug!(id, from = %previous, to = %status, request, "optimistic move applied");

        match self.store.update_task(id, &payload).await {
            Ok(confirmed) => {
                self.mutate(|inner| inner.accept(id, request, confirmed));
                info!(id, to = %status, "task moved");
                Ok(())
            }
            Err(source) => {
                let err = SyncError::MoveFailed {
                    id: id.to_string(),
                    from: previous,
                    to: status,
                    source,
                };
                warn!(error = %err, "task store call failed");
                self.mutate(|inner| {
                    inner.reject(id, request, previous);
                    inner.set_error(&err);
                });
                Err(err)
            }
        }
    }

    /// Move one column to the right.
    pub async fn move_forward(&self, id: &str) -> Result<(), SyncError> {
        let current = self.current_status(id)?;
        let next = current.next().ok_or_else(|| SyncError::NoAdjacentColumn {
            id: id.to_string(),
            status: current,
        })?;
        self.move_task(id, next).await
    }

    /// Move one column to the left.
    pub async fn move_backward(&self, id: &str) -> Result<(), SyncError> {
        let current = self.current_status(id)?;
        let previous = current.previous().ok_or_else(|| SyncError::NoAdjacentColumn {
            id: id.to_string(),
            status: current,
        })?;
        self.move_task(id, previous).await
    }

    /// Remove a task once the store confirms the deletion.
    /// Confirming with the user is the caller's job.
    pub async fn delete(&self, id: &str) -> Result<(), SyncError> {
        if self.lock().state.find(id).is_none() {
            return Err(not_found(id));
        }

        match self.store.delete_task(id).await {
            Ok(()) => {
                self.mutate(|inner| {
                    inner.state.tasks.retain(|t| t.id != id);
                    inner.requests.remove(id);
                });
                info!(id, "task deleted");
                Ok(())
            }
            Err(source) => Err(self.report(SyncError::DeleteFailed {
                id: id.to_string(),
                source,
            })),
        }
    }

    /// Move a task to `index` within its own column. Local only; the
    /// store has no notion of ordering.
    pub fn reorder(&self, id: &str, index: usize) -> Result<(), SyncError> {
        self.try_mutate(|inner| {
            let tasks = &mut inner.state.tasks;
            let from = tasks
                .iter()
                .position(|t| t.id == id)
                .ok_or_else(|| not_found(id))?;
            let status = tasks[from].status;
            let task = tasks.remove(from);

            let siblings: Vec<usize> = tasks
                .iter()
                .enumerate()
                .filter(|(_, t)| t.status == status)
                .map(|(i, _)| i)
                .collect();
            let to = match siblings.get(index) {
                Some(&i) => i,
                None => siblings.last().map_or(from, |&i| i + 1),
            };
            tasks.insert(to, task);
            Ok(())
        })
    }

    /// Handle a drag-and-drop release.
    ///
    /// Dropping outside any column or back onto the same slot does nothing.
    /// A different column is a `move_task`; a different slot in the same
    /// column is a local `reorder`.
    pub async fn drop_task(
        &self,
        id: &str,
        destination: Option<DropTarget>,
    ) -> Result<(), SyncError> {
        let Some(target) = destination else {
            return Ok(());
        };
        let (status, index) = {
            let inner = self.lock();
            let task = inner.state.find(id).ok_or_else(|| not_found(id))?;
            (task.status, inner.state.column_index(id).unwrap_or(0))
        };

        if target.status != status {
            self.move_task(id, target.status).await
        } else if target.index != index {
            self.reorder(id, target.index)
        } else {
            Ok(())
        }
    }

    /// Clear the error slot.
    pub fn dismiss_error(&self) {
        self.mutate(|inner| {
            if matches!(inner.state.status, SyncStatus::Error(_)) {
                inner.state.status = SyncStatus::Idle;
            }
        });
    }

    // ── Internals ─────────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` and publish the resulting state while still holding the lock,
    /// so subscribers see mutations in order.
    fn mutate<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.lock();
        let result = f(&mut inner);
        self.changes.send_replace(inner.state.clone());
        result
    }

    /// Like `mutate`, but nothing is published when `f` fails.
    fn try_mutate<R>(
        &self,
        f: impl FnOnce(&mut Inner) -> Result<R, SyncError>,
    ) -> Result<R, SyncError> {
        let mut inner = self.lock();
        let result = f(&mut inner)?;
        self.changes.send_replace(inner.state.clone());
        Ok(result)
    }

    fn current_status(&self, id: &str) -> Result<TaskStatus, SyncError> {
        self.lock()
            .state
            .find(id)
            .map(|t| t.status)
            .ok_or_else(|| not_found(id))
    }

    /// Put a remote failure in the error slot and hand it back.
    fn report(&self, err: SyncError) -> SyncError {
        warn!(error = %err, "task store call failed");
        self.mutate(|inner| inner.set_error(&err));
        err
    }
}

fn ensure_title(title: &str) -> Result<(), SyncError> {
    if title.trim().is_empty() {
        return Err(SyncError::EmptyTitle);
    }
    Ok(())
}

fn not_found(id: &str) -> SyncError {
    SyncError::TaskNotFound { id: id.to_string() }
}

/// Keep the first task for each id.
fn dedup_by_id(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = std::collections::HashSet::new();
    let total = tasks.len();
    let unique: Vec<Task> = tasks
        .into_iter()
        .filter(|t| seen.insert(t.id.clone()))
        .collect();
    if unique.len() != total {
        warn!(dropped = total - unique.len(), "store returned duplicate task ids");
    }
    unique
}
