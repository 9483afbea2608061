//! Kanban board: client-side task state plus a reference task store.
//!
//! ## Overview
//!
//! The board has three fixed columns (To Do, In Progress, Done). The
//! `TaskSynchronizer` keeps the session's task list and mirrors every change
//! to a remote REST task store, applying moves optimistically and rolling
//! them back when the store refuses.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────────┐ intents ┌───────────────────────────┐   HTTP   ┌──────────────────┐
//! │ Presentation │ ──────> │ sync.rs (TaskSynchronizer)│ ───────> │ api.rs / server  │
//! │  (CLI / UI)  │ <────── │   └─ client.rs (TaskStore)│ <─────── │ (reference store)│
//! └──────────────┘ watch   └───────────────────────────┘   JSON   └──────────────────┘
//! ```
//!
//! | Module    | Responsibility                                           |
//! |-----------|----------------------------------------------------------|
//! | `models`  | `Task`, `TaskStatus`, drafts, patches, column views      |
//! | `client`  | `TaskStore` trait and the reqwest `HttpTaskStore`        |
//! | `sync`    | `TaskSynchronizer`: local state, optimistic move/rollback|
//! | `api`     | axum handlers for the in-memory reference store          |
//! | `server`  | router assembly, CORS, `start_server`                    |
//!
//! ## Typical Flow (drag a card to "In Progress")
//!
//! 1. Presentation calls `drop_task(id, Some(DropTarget { InProgress, .. }))`.
//! 2. `move_task` flips the local status and publishes the new state.
//! 3. `PUT /tasks/{id}` is sent through `TaskStore::update_task`.
//! 4. On success the server's copy replaces the local one; on failure the
//!    old status is restored and the error slot is set.

pub mod api;
pub mod client;
pub mod models;
pub mod server;
pub mod sync;

pub use client::{HttpTaskStore, TaskStore};
pub use models::{ColumnView, DropTarget, Task, TaskDraft, TaskPatch, TaskStatus};
pub use sync::{BoardState, SyncStatus, TaskSynchronizer};
